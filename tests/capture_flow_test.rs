//! End-to-end capture flows driven by a manual clock

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use notation_capture::capture::{CaptureEvent, Delivery, EventKind, KeyboardCapture, SinkError};
use notation_capture::config::{CaptureConfig, ErrorRecoveryMode, RenderingOptions};
use notation_capture::renderers::{AbcRenderer, RenderError, RenderSurface, Renderer};
use notation_capture::shortcuts::KeyInput;
use notation_capture::utils::clock::ManualClock;
use notation_capture::{CaptureMode, DurationValue, ErrorCode, Fragment, MusicalElement, Severity};
use serde_json::json;

/// Renderer that forwards to a shared `AbcRenderer` so tests can read its output
struct SharedAbc(Rc<RefCell<AbcRenderer>>);

impl Renderer for SharedAbc {
    fn initialize(&mut self, surface: &RenderSurface, options: &RenderingOptions) -> Result<(), RenderError> {
        self.0.borrow_mut().initialize(surface, options)
    }

    fn render(&mut self, fragment: &Fragment) -> Result<(), RenderError> {
        self.0.borrow_mut().render(fragment)
    }

    fn update(&mut self, elements: &[MusicalElement]) -> Result<(), RenderError> {
        self.0.borrow_mut().update(elements)
    }

    fn highlight(&mut self, index: usize) {
        self.0.borrow_mut().highlight(index)
    }

    fn clear_highlight(&mut self) {
        self.0.borrow_mut().clear_highlight()
    }

    fn clear(&mut self) {
        self.0.borrow_mut().clear()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.0.borrow_mut().resize(width, height)
    }

    fn destroy(&mut self) {
        self.0.borrow_mut().destroy()
    }

    fn is_available(&self) -> bool {
        self.0.borrow().is_available()
    }
}

/// Resolves on the second poll
struct YieldOnce {
    polled: bool,
    result: Option<Result<(), SinkError>>,
}

impl Future for YieldOnce {
    type Output = Result<(), SinkError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if !self.polled {
            self.polled = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        Poll::Ready(self.result.take().unwrap_or(Ok(())))
    }
}

struct Harness {
    capture: KeyboardCapture,
    clock: Rc<ManualClock>,
    events: Rc<RefCell<Vec<CaptureEvent>>>,
}

impl Harness {
    fn new(config: CaptureConfig) -> Self {
        let clock = Rc::new(ManualClock::new(0));
        let capture = KeyboardCapture::new(config).with_clock(clock.clone());
        Self::wrap(capture, clock)
    }

    fn wrap(capture: KeyboardCapture, clock: Rc<ManualClock>) -> Self {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        capture
            .notifier()
            .subscribe_all(move |event| sink.borrow_mut().push(event.clone()));
        Self { capture, clock, events }
    }

    fn keys(&mut self, keys: &[&str]) {
        for key in keys {
            self.capture.handle_key(&KeyInput::new(*key));
        }
    }

    fn advance(&mut self, ms: u64) -> usize {
        self.clock.advance(ms);
        self.capture.tick()
    }

    fn count(&self, kind: EventKind) -> usize {
        self.events.borrow().iter().filter(|event| event.kind() == kind).count()
    }

    fn errors(&self) -> Vec<(ErrorCode, Severity, String)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                CaptureEvent::Error(error) => Some((error.code, error.severity, error.message.clone())),
                _ => None,
            })
            .collect()
    }
}

/// Octave, duration and dot flag of the engine
fn input_state(harness: &Harness) -> (u8, DurationValue, bool) {
    let state = harness.capture.engine_state();
    (state.octave, state.duration, state.dotted)
}

fn failing_later(message: &'static str) -> KeyboardCapture {
    KeyboardCapture::new(CaptureConfig::default()).with_commit_sink(Box::new(move |_: Fragment| {
        Delivery::pending(YieldOnce {
            polled: false,
            result: Some(Err(SinkError::new(message))),
        })
    }))
}

fn with_abc(config: CaptureConfig) -> (Harness, Rc<RefCell<AbcRenderer>>) {
    let abc = Rc::new(RefCell::new(AbcRenderer::new()));
    let clock = Rc::new(ManualClock::new(0));
    let capture = KeyboardCapture::new(config)
        .with_clock(clock.clone())
        .with_renderer(Box::new(SharedAbc(abc.clone())), RenderSurface::default());
    (Harness::wrap(capture, clock), abc)
}

#[test]
fn test_preview_renders_once_per_burst() {
    let (mut harness, abc) = with_abc(CaptureConfig::default());
    harness.capture.start();

    for key in ["c", "d", "e"] {
        harness.clock.advance(10);
        harness.capture.handle_key(&KeyInput::new(key));
    }
    assert_eq!(harness.advance(99), 0);
    assert_eq!(harness.count(EventKind::PreviewUpdated), 0);

    assert_eq!(harness.advance(1), 1);
    assert_eq!(harness.count(EventKind::PreviewUpdated), 1);
    assert_eq!(harness.capture.preview().map(|p| p.render_count()), Some(1));

    let abc = abc.borrow();
    assert!(abc.output().ends_with("C16 D16 E16\n"));
    assert_eq!(abc.highlighted(), Some(2));
}

#[test]
fn test_chord_mode_round_trip() {
    let mut harness = Harness::new(CaptureConfig::default());
    harness.capture.start();

    harness.capture.handle_key(&KeyInput::new("c").ctrl());
    assert_eq!(harness.capture.mode(), CaptureMode::ChordMode);
    harness.keys(&["e", "g", "Enter"]);

    assert_eq!(harness.capture.mode(), CaptureMode::Capture);
    match &harness.capture.fragment().elements[0] {
        MusicalElement::Chord { pitches, .. } => {
            let names: Vec<String> = pitches.iter().map(ToString::to_string).collect();
            assert_eq!(names, vec!["C4", "E4", "G4"]);
        }
        other => panic!("expected chord, got {:?}", other),
    }
    assert_eq!(harness.count(EventKind::ModeChanged), 3);
}

#[test]
fn test_chord_timeout_measured_from_last_note() {
    let mut harness = Harness::new(CaptureConfig::default());
    harness.capture.start();

    harness.capture.handle_key(&KeyInput::new("a").ctrl());
    harness.clock.advance(800);
    harness.keys(&["c"]);

    harness.advance(800);
    assert_eq!(harness.capture.mode(), CaptureMode::ChordMode);

    harness.advance(200);
    assert_eq!(harness.capture.mode(), CaptureMode::Capture);
    assert!(matches!(
        harness.capture.fragment().elements[0],
        MusicalElement::Chord { .. }
    ));
}

#[test]
fn test_commit_of_empty_fragment_reports_warning() {
    let delivered = Rc::new(RefCell::new(0));
    let counter = delivered.clone();
    let capture = KeyboardCapture::new(CaptureConfig::default()).with_commit_sink(Box::new(move |_: Fragment| {
        *counter.borrow_mut() += 1;
        Delivery::ok()
    }));
    let mut harness = Harness::wrap(capture, Rc::new(ManualClock::new(0)));
    harness.capture.start();
    harness.keys(&["Tab"]);

    assert_eq!(*delivered.borrow(), 0);
    assert_eq!(
        harness.errors(),
        vec![(
            ErrorCode::EmptyFragment,
            Severity::Warning,
            "Cannot commit an empty fragment".to_string()
        )]
    );
}

#[test]
fn test_failing_sink_keeps_commit() {
    let capture = KeyboardCapture::new(CaptureConfig::default())
        .with_commit_sink(Box::new(|_: Fragment| Delivery::failed("disk full")));
    let mut harness = Harness::wrap(capture, Rc::new(ManualClock::new(0)));
    harness.capture.start();
    harness.keys(&["c", "d", "Tab"]);

    assert_eq!(harness.capture.committed().len(), 1);
    assert!(harness.capture.fragment().is_empty());
    assert_eq!(harness.count(EventKind::FragmentCommitted), 1);
    assert_eq!(
        harness.errors(),
        vec![(
            ErrorCode::CommitHandlerError,
            Severity::Error,
            "Commit handler failed: disk full".to_string()
        )]
    );
}

#[test]
fn test_pending_delivery_failure_is_reported_after_flush() {
    let capture = KeyboardCapture::new(CaptureConfig::default()).with_commit_sink(Box::new(|_: Fragment| {
        Delivery::pending(YieldOnce {
            polled: false,
            result: Some(Err(SinkError::new("timeout"))),
        })
    }));
    let mut harness = Harness::wrap(capture, Rc::new(ManualClock::new(0)));
    harness.capture.start();
    harness.keys(&["f", "Tab"]);

    assert_eq!(harness.capture.pending_deliveries(), 1);
    assert!(harness.errors().is_empty());

    pollster::block_on(harness.capture.flush_deliveries());
    assert_eq!(harness.capture.pending_deliveries(), 0);
    assert_eq!(harness.errors()[0].0, ErrorCode::CommitHandlerError);
    assert_eq!(harness.capture.committed().len(), 1);
}

#[test]
fn test_auto_commit_after_inactivity() {
    let mut config = CaptureConfig::default();
    config.behavior.auto_commit_delay_ms = Some(500);
    let mut harness = Harness::new(config);
    harness.capture.start();

    harness.keys(&["c"]);
    harness.advance(300);
    harness.keys(&["d"]);
    harness.advance(300);
    assert!(harness.capture.committed().is_empty());

    harness.advance(200);
    assert_eq!(harness.capture.committed().len(), 1);
    assert_eq!(harness.capture.committed()[0].len(), 2);
    assert_eq!(harness.capture.next_deadline(), Some(900));
}

#[test]
fn test_nothing_fires_after_stop_or_destroy() {
    let mut config = CaptureConfig::default();
    config.behavior.auto_commit_delay_ms = Some(500);
    let mut harness = Harness::new(config);
    harness.capture.start();

    harness.capture.handle_key(&KeyInput::new("c").ctrl());
    assert!(harness.capture.next_deadline().is_some());

    assert!(harness.capture.stop());
    assert_eq!(harness.capture.next_deadline(), None);
    assert_eq!(harness.advance(5_000), 0);
    assert!(harness.capture.engine_state().chord_notes.is_empty());

    harness.capture.start();
    harness.keys(&["e"]);
    harness.capture.destroy();
    harness.capture.destroy();
    assert_eq!(harness.advance(5_000), 0);
    assert!(harness.capture.committed().is_empty());
    assert_eq!(harness.capture.handle_key(&KeyInput::new("f")), None);
    assert!(!harness.capture.start());
}

#[test]
fn test_strict_renderer_failure_enters_error_mode() {
    let mut config = CaptureConfig::default();
    config.behavior.error_recovery_mode = ErrorRecoveryMode::Strict;
    let clock = Rc::new(ManualClock::new(0));
    let capture = KeyboardCapture::new(config)
        .with_clock(clock.clone())
        .with_renderer(Box::new(AbcRenderer::unavailable()), RenderSurface::default());
    let mut harness = Harness::wrap(capture, clock);

    assert!(!harness.capture.start());
    assert_eq!(harness.capture.mode(), CaptureMode::Error);
    assert_eq!(harness.errors()[0].0, ErrorCode::RendererInitFailed);
    assert_eq!(harness.errors()[0].1, Severity::Error);
    assert_eq!(harness.capture.handle_key(&KeyInput::new("c")), None);
}

#[test]
fn test_lenient_renderer_failure_continues_without_preview() {
    let clock = Rc::new(ManualClock::new(0));
    let capture = KeyboardCapture::new(CaptureConfig::default())
        .with_clock(clock.clone())
        .with_renderer(Box::new(AbcRenderer::unavailable()), RenderSurface::default());
    let mut harness = Harness::wrap(capture, clock);

    assert!(harness.capture.start());
    assert_eq!(harness.capture.mode(), CaptureMode::Capture);
    assert_eq!(harness.errors()[0].1, Severity::Warning);
    assert!(harness.capture.preview().is_none());

    harness.keys(&["g"]);
    harness.advance(100);
    assert_eq!(harness.count(EventKind::PreviewUpdated), 1);
}

#[test]
fn test_strict_mode_reports_rejected_keys() {
    let mut config = CaptureConfig::default();
    config.behavior.error_recovery_mode = ErrorRecoveryMode::Strict;
    let mut harness = Harness::new(config);
    harness.capture.start();
    harness.keys(&["F13"]);

    assert_eq!(harness.errors()[0].0, ErrorCode::InvalidInput);
    assert_eq!(harness.capture.mode(), CaptureMode::Capture);
}

#[test]
fn test_keyboard_undo_redo_and_delete() {
    let mut harness = Harness::new(CaptureConfig::default());
    harness.capture.start();
    harness.keys(&["c", "d", "e", "Backspace"]);
    assert_eq!(harness.capture.fragment().len(), 2);
    assert_eq!(harness.count(EventKind::ElementDeleted), 1);

    harness.capture.handle_key(&KeyInput::new("z").ctrl());
    assert_eq!(harness.capture.fragment().len(), 3);
    harness.capture.handle_key(&KeyInput::new("y").ctrl());
    assert_eq!(harness.capture.fragment().len(), 2);
    assert_eq!(harness.count(EventKind::HistoryChanged), 2);

    harness.keys(&["Escape"]);
    assert!(harness.capture.fragment().is_empty());
    assert_eq!(harness.count(EventKind::FragmentCleared), 1);
}

#[test]
fn test_paused_capture_ignores_keys() {
    let mut harness = Harness::new(CaptureConfig::default());
    harness.capture.start();
    harness.capture.handle_key(&KeyInput::new("b").ctrl());
    assert!(harness.capture.pause());
    assert!(harness.capture.engine_state().chord_notes.is_empty());

    assert_eq!(harness.capture.handle_key(&KeyInput::new("c")), None);
    assert!(harness.capture.resume());
    harness.keys(&["c"]);
    assert_eq!(harness.capture.fragment().len(), 1);
}

#[test]
fn test_stop_restores_default_input_state() {
    let mut harness = Harness::new(CaptureConfig::default());
    harness.capture.start();
    harness.keys(&["ArrowUp", "5", "."]);
    assert_eq!(input_state(&harness), (5, DurationValue::Eighth, true));

    assert!(harness.capture.stop());
    assert_eq!(input_state(&harness), (4, DurationValue::Quarter, false));
}

#[test]
fn test_clear_restores_default_input_state() {
    let mut harness = Harness::new(CaptureConfig::default());
    harness.capture.start();
    harness.keys(&["ArrowUp", "c", "Escape"]);
    assert!(harness.capture.fragment().is_empty());
    assert_eq!(input_state(&harness).0, 4);

    harness.keys(&["d"]);
    match &harness.capture.fragment().elements[0] {
        MusicalElement::Note { pitch, .. } => assert_eq!(pitch.to_string(), "D4"),
        other => panic!("expected note, got {:?}", other),
    }
}

#[test]
fn test_chord_completion_restores_default_input_state() {
    let mut harness = Harness::new(CaptureConfig::default());
    harness.capture.start();
    harness.capture.handle_key(&KeyInput::new("c").ctrl());
    harness.keys(&["ArrowUp", "e", "Enter"]);

    assert_eq!(harness.capture.mode(), CaptureMode::Capture);
    assert_eq!(input_state(&harness).0, 4);
    match &harness.capture.fragment().elements[0] {
        MusicalElement::Chord { pitches, .. } => {
            let names: Vec<String> = pitches.iter().map(ToString::to_string).collect();
            assert_eq!(names, vec!["C4", "E5"]);
        }
        other => panic!("expected chord, got {:?}", other),
    }
}

#[test]
fn test_commit_outside_chord_mode_keeps_input_state() {
    let mut harness = Harness::new(CaptureConfig::default());
    harness.capture.start();
    harness.keys(&["ArrowDown", "5", "c", "Tab"]);
    assert_eq!(harness.capture.committed().len(), 1);
    assert_eq!(input_state(&harness), (3, DurationValue::Eighth, false));
}

#[test]
fn test_destroy_drops_in_flight_deliveries() {
    let mut harness = Harness::wrap(failing_later("offline"), Rc::new(ManualClock::new(0)));
    harness.capture.start();
    harness.keys(&["f", "Tab"]);
    assert_eq!(harness.capture.pending_deliveries(), 1);

    harness.capture.destroy();
    assert_eq!(harness.capture.pending_deliveries(), 0);
    pollster::block_on(harness.capture.flush_deliveries());
    assert!(harness.errors().is_empty());
}

#[test]
fn test_detached_deliveries_go_quiet_after_destroy() {
    let mut harness = Harness::wrap(failing_later("offline"), Rc::new(ManualClock::new(0)));
    harness.capture.start();
    harness.keys(&["f", "Tab", "g", "Tab"]);

    let mut detached = harness.capture.detach_deliveries();
    assert_eq!(detached.len(), 2);
    assert_eq!(harness.capture.pending_deliveries(), 0);

    pollster::block_on(detached.remove(0));
    assert_eq!(
        harness.errors(),
        vec![(
            ErrorCode::CommitHandlerError,
            Severity::Error,
            "Commit handler failed: offline".to_string()
        )]
    );

    harness.capture.destroy();
    pollster::block_on(detached.remove(0));
    assert_eq!(harness.errors().len(), 1);
}

#[test]
fn test_rejected_config_is_reported() {
    let mut harness = Harness::new(CaptureConfig::default());
    harness.capture.start();

    let rejected = harness
        .capture
        .apply_config_value(json!({ "behavior": { "defaultOctave": 9 } }));
    assert!(rejected.is_err());
    assert_eq!(harness.errors()[0].0, ErrorCode::InvalidConfig);
    assert_eq!(harness.errors()[0].1, Severity::Warning);
    assert_eq!(harness.capture.config(), &CaptureConfig::default());

    harness
        .capture
        .apply_config_value(json!({ "behavior": { "defaultOctave": 3 } }))
        .unwrap();
    assert_eq!(input_state(&harness).0, 3);
    assert_eq!(harness.errors().len(), 1);
}
