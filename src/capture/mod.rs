//! Capture orchestrator
//!
//! [`KeyboardCapture`] gates key events by mode, turns them into
//! instructions through the shortcut engine, applies those to the fragment
//! manager and fans the results out as notifications, preview renders and
//! commit deliveries.
//!
//! Nothing here runs on its own. Hosts call [`KeyboardCapture::tick`] when
//! [`KeyboardCapture::next_deadline`] passes, and drive in-flight commit
//! deliveries with [`KeyboardCapture::poll_deliveries`] or
//! [`KeyboardCapture::flush_deliveries`].

pub mod events;
pub mod mode;
pub mod sink;
pub mod timers;

pub use events::{CaptureEvent, EventBus, EventKind, SubscriptionId};
pub use mode::CaptureMode;
pub use sink::{CommitSink, Delivery, PendingDelivery, SinkError};
pub use timers::{TimerId, TimerKind, TimerQueue};

use std::future::Future;
use std::rc::Rc;
use std::task::{Context, Poll};

use crate::config::{CaptureConfig, ConfigError, ErrorRecoveryMode, KeyMappingSetting};
use crate::diagnostics::{CaptureError, ErrorCode, Severity};
use crate::fragments::{FragmentError, FragmentManager};
use crate::models::{Fragment, KeySignature, MusicalElement, TimeSignature};
use crate::renderers::{Preview, RenderSurface, Renderer};
use crate::shortcuts::{
    ControlAction, EngineState, Instruction, KeyInput, KeyMappings, MappingCategory, ModifierChange,
    ShortcutEngine,
};
use crate::utils::clock::{Clock, SystemClock};

/// Source of raw key events (a DOM listener in browsers)
pub trait KeySource {
    fn attach(&mut self);
    fn detach(&mut self);
}

pub struct KeyboardCapture {
    config: CaptureConfig,
    mode: CaptureMode,
    engine: ShortcutEngine,
    fragments: FragmentManager,
    preview: Option<Preview>,
    sink: Option<Box<dyn CommitSink>>,
    key_source: Option<Box<dyn KeySource>>,
    clock: Rc<dyn Clock>,
    timers: TimerQueue,
    events: Rc<EventBus>,
    deliveries: Vec<PendingDelivery>,
    alive: Rc<()>,
    pending_articulations: Vec<String>,
    pending_dynamic: Option<String>,
    destroyed: bool,
}

fn build_engine(config: &CaptureConfig, clock: Rc<dyn Clock>) -> ShortcutEngine {
    let mut engine = ShortcutEngine::with_clock(config.key_mappings.resolve(), clock);
    engine.set_defaults(config.behavior.default_duration, config.behavior.default_octave);
    engine
}

impl KeyboardCapture {
    pub fn new(config: CaptureConfig) -> Self {
        let clock: Rc<dyn Clock> = Rc::new(SystemClock);
        Self {
            engine: build_engine(&config, clock.clone()),
            fragments: FragmentManager::new(config.behavior.undo_history_size),
            config,
            mode: CaptureMode::Stopped,
            preview: None,
            sink: None,
            key_source: None,
            clock,
            timers: TimerQueue::new(),
            events: Rc::new(EventBus::new()),
            deliveries: Vec::new(),
            alive: Rc::new(()),
            pending_articulations: Vec::new(),
            pending_dynamic: None,
            destroyed: false,
        }
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>, surface: RenderSurface) -> Self {
        self.preview = Some(Preview::new(renderer, surface));
        self
    }

    pub fn with_commit_sink(mut self, sink: Box<dyn CommitSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Replace the time source; the engine is rebuilt against it
    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.engine = build_engine(&self.config, clock.clone());
        self.clock = clock;
        self
    }

    pub fn with_key_source(mut self, source: Box<dyn KeySource>) -> Self {
        self.key_source = Some(source);
        self
    }

    // --- mode transitions ---

    /// STOPPED -> CAPTURE
    ///
    /// Initializes the renderer on first start. In strict recovery mode a
    /// renderer failure moves to ERROR instead.
    pub fn start(&mut self) -> bool {
        if self.destroyed || self.mode != CaptureMode::Stopped {
            log::warn!("start ignored in {} mode", self.mode);
            return false;
        }

        if let Err(error) = self.initialize_preview() {
            let strict = self.config.behavior.error_recovery_mode == ErrorRecoveryMode::Strict;
            let severity = if strict { Severity::Error } else { Severity::Warning };
            self.report(CaptureError::new(
                ErrorCode::RendererInitFailed,
                severity,
                error.to_string(),
            ));
            if strict {
                self.set_mode(CaptureMode::Error);
                return false;
            }
            self.preview = None;
        }

        if let Some(source) = self.key_source.as_mut() {
            source.attach();
        }
        self.set_mode(CaptureMode::Capture);
        self.schedule_preview();
        true
    }

    /// CAPTURE/CHORD_MODE -> PAUSED; any pending chord is dropped
    pub fn pause(&mut self) -> bool {
        if self.destroyed || !self.mode.accepts_keys() {
            log::warn!("pause ignored in {} mode", self.mode);
            return false;
        }
        self.timers.cancel(TimerKind::ChordTimeout);
        self.engine.clear_chord();
        self.set_mode(CaptureMode::Paused);
        true
    }

    /// PAUSED -> CAPTURE
    pub fn resume(&mut self) -> bool {
        if self.destroyed || self.mode != CaptureMode::Paused {
            log::warn!("resume ignored in {} mode", self.mode);
            return false;
        }
        self.set_mode(CaptureMode::Capture);
        true
    }

    /// Any mode -> STOPPED
    ///
    /// Detaches the key source, cancels every timer, clears the preview and
    /// resets the engine to its defaults. The working fragment is kept.
    pub fn stop(&mut self) -> bool {
        if self.destroyed || self.mode == CaptureMode::Stopped {
            return false;
        }
        self.teardown();
        if let Some(preview) = self.preview.as_mut() {
            preview.clear();
        }
        self.set_mode(CaptureMode::Stopped);
        true
    }

    /// Stop and release collaborators; later calls do nothing
    ///
    /// In-flight commit deliveries are dropped unreported.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.teardown();
        if !self.deliveries.is_empty() {
            log::debug!("dropping {} in-flight deliveries", self.deliveries.len());
            self.deliveries.clear();
        }
        self.alive = Rc::new(());
        if let Some(preview) = self.preview.as_mut() {
            preview.destroy();
        }
        self.set_mode(CaptureMode::Stopped);
        self.destroyed = true;
        log::info!("keyboard capture destroyed");
    }

    fn teardown(&mut self) {
        if let Some(source) = self.key_source.as_mut() {
            source.detach();
        }
        self.timers.cancel_all();
        self.engine.reset();
        self.pending_articulations.clear();
        self.pending_dynamic = None;
    }

    fn set_mode(&mut self, mode: CaptureMode) {
        if self.mode == mode {
            return;
        }
        let previous = std::mem::replace(&mut self.mode, mode);
        log::debug!("mode {} -> {}", previous, mode);
        self.events.emit(&CaptureEvent::ModeChanged {
            previous,
            current: mode,
        });
    }

    // --- key handling ---

    /// Process one key event
    ///
    /// Returns `None` when the event was ignored without consulting the
    /// engine: capture is not accepting keys, the event targets a text
    /// input, or the capture was destroyed.
    pub fn handle_key(&mut self, input: &KeyInput) -> Option<Instruction> {
        if self.destroyed || !self.mode.accepts_keys() || input.target_is_text_input {
            return None;
        }
        let instruction = self.engine.process_key_input(input, self.mode);
        self.apply(&instruction);
        Some(instruction)
    }

    fn apply(&mut self, instruction: &Instruction) {
        match instruction {
            Instruction::Note { .. } | Instruction::Rest { .. } | Instruction::Barline { .. } => {
                self.add_from(instruction);
            }
            Instruction::Chord { .. } => {
                self.add_from(instruction);
                self.leave_chord_mode();
            }
            Instruction::Control { action } => self.apply_control(*action),
            Instruction::Modifier { change } => self.apply_modifier(change),
            Instruction::Rejected { reason } => {
                if self.config.behavior.error_recovery_mode == ErrorRecoveryMode::Strict {
                    self.report(CaptureError::warning(ErrorCode::InvalidInput, reason.to_string()));
                } else {
                    log::debug!("rejected input: {}", reason);
                }
            }
        }
    }

    fn add_from(&mut self, instruction: &Instruction) {
        let Some(mut element) = instruction.to_element() else {
            return;
        };
        self.attach_pending_marks(&mut element);
        self.add_element(element);
    }

    /// Pending articulations and dynamic go to the next note or chord
    fn attach_pending_marks(&mut self, element: &mut MusicalElement) {
        match element {
            MusicalElement::Note {
                articulations, dynamic, ..
            }
            | MusicalElement::Chord {
                articulations, dynamic, ..
            } => {
                articulations.append(&mut self.pending_articulations);
                if let Some(pending) = self.pending_dynamic.take() {
                    *dynamic = Some(pending);
                }
            }
            _ => {}
        }
    }

    fn apply_control(&mut self, action: ControlAction) {
        match action {
            ControlAction::Commit => {
                self.commit();
            }
            ControlAction::Delete => {
                self.delete_last_element();
            }
            ControlAction::Clear => {
                self.clear();
            }
            ControlAction::Undo => {
                self.undo();
            }
            ControlAction::Redo => {
                self.redo();
            }
            ControlAction::EnterChordMode => {
                self.set_mode(CaptureMode::ChordMode);
                self.arm_chord_timeout();
                let state = self.engine.current_state();
                if let Some(pitch) = state.chord_notes.last().copied() {
                    let change = ModifierChange::ChordNote {
                        pitch,
                        chord_notes: state.chord_notes.clone(),
                    };
                    self.events.emit(&CaptureEvent::ModifierChanged { change, state });
                }
            }
        }
    }

    fn apply_modifier(&mut self, change: &ModifierChange) {
        match change {
            ModifierChange::Articulation { name } => {
                if !self.pending_articulations.contains(name) {
                    self.pending_articulations.push(name.clone());
                }
            }
            ModifierChange::Dynamic { name } => self.pending_dynamic = Some(name.clone()),
            ModifierChange::ChordNote { .. } => self.arm_chord_timeout(),
            _ => {}
        }
        self.events.emit(&CaptureEvent::ModifierChanged {
            change: change.clone(),
            state: self.engine.current_state(),
        });
    }

    fn arm_chord_timeout(&mut self) {
        let now = self.clock.now_ms();
        self.timers
            .schedule(TimerKind::ChordTimeout, now, self.config.behavior.chord_mode_timeout_ms);
    }

    /// Octave, duration, dot and triplet return to their defaults when a
    /// chord ends; outside chord mode only the chord list is dropped
    fn leave_chord_mode(&mut self) {
        self.timers.cancel(TimerKind::ChordTimeout);
        if self.mode == CaptureMode::ChordMode {
            self.engine.reset();
            self.set_mode(CaptureMode::Capture);
        } else {
            self.engine.clear_chord();
        }
    }

    // --- fragment operations ---

    /// Validate and append an element, announcing it on success
    pub fn add_element(&mut self, element: MusicalElement) -> bool {
        if self.destroyed {
            return false;
        }
        match self.fragments.add_element(element.clone()) {
            Ok(()) => {
                let fragment = self.fragments.fragment();
                self.events.emit(&CaptureEvent::NoteAdded {
                    element,
                    index: fragment.len() - 1,
                    metadata: fragment.metadata.clone(),
                });
                self.after_mutation();
                true
            }
            Err(error) => {
                self.report(CaptureError::warning(ErrorCode::InvalidElement, error.to_string()));
                false
            }
        }
    }

    pub fn delete_last_element(&mut self) -> Option<MusicalElement> {
        if self.destroyed {
            return None;
        }
        let element = self.fragments.delete_last_element()?;
        self.events.emit(&CaptureEvent::ElementDeleted {
            element: element.clone(),
            metadata: self.fragments.fragment().metadata.clone(),
        });
        self.after_mutation();
        Some(element)
    }

    /// Empty the working fragment and reset the engine's input state
    pub fn clear(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        self.engine.reset();
        self.pending_articulations.clear();
        self.pending_dynamic = None;
        if !self.fragments.clear() {
            return false;
        }
        self.events.emit(&CaptureEvent::FragmentCleared {
            fragment_id: self.fragments.fragment().id.clone(),
        });
        self.after_mutation();
        true
    }

    pub fn undo(&mut self) -> bool {
        if self.destroyed || !self.fragments.undo() {
            return false;
        }
        self.history_changed();
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.destroyed || !self.fragments.redo() {
            return false;
        }
        self.history_changed();
        true
    }

    fn history_changed(&mut self) {
        self.events.emit(&CaptureEvent::HistoryChanged {
            can_undo: self.fragments.can_undo(),
            can_redo: self.fragments.can_redo(),
        });
        self.after_mutation();
    }

    pub fn set_time_signature(&mut self, time_signature: TimeSignature) -> Result<(), FragmentError> {
        self.fragments.set_time_signature(time_signature)?;
        self.after_mutation();
        Ok(())
    }

    pub fn set_key_signature(&mut self, key_signature: KeySignature) {
        self.fragments.set_key_signature(key_signature);
        self.after_mutation();
    }

    pub fn set_tempo(&mut self, bpm: u16) -> Result<(), FragmentError> {
        self.fragments.set_tempo(bpm)?;
        self.after_mutation();
        Ok(())
    }

    /// Commit the working fragment and hand it to the sink
    ///
    /// An empty fragment is reported as `EMPTY_FRAGMENT` and the sink is not
    /// called. A sink failure is reported as `COMMIT_HANDLER_ERROR`; the
    /// commit itself stands.
    pub fn commit(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        self.timers.cancel(TimerKind::AutoCommit);

        let fragment = match self.fragments.commit() {
            Ok(fragment) => fragment,
            Err(_) => {
                self.report(CaptureError::warning(
                    ErrorCode::EmptyFragment,
                    "Cannot commit an empty fragment",
                ));
                return false;
            }
        };

        self.leave_chord_mode();
        self.events.emit(&CaptureEvent::FragmentCommitted {
            fragment: fragment.clone(),
        });

        if let Some(sink) = self.sink.as_mut() {
            match sink.deliver(fragment) {
                Delivery::Done(Ok(())) => {}
                Delivery::Done(Err(error)) => self.report_sink_error(error),
                Delivery::Pending(future) => self.deliveries.push(future),
            }
        }

        self.after_mutation();
        true
    }

    fn report_sink_error(&self, error: SinkError) {
        self.report(sink_failure(error));
    }

    /// Advance in-flight deliveries; ready once none remain
    pub fn poll_deliveries(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        let mut index = 0;
        while index < self.deliveries.len() {
            match self.deliveries[index].as_mut().poll(cx) {
                Poll::Ready(result) => {
                    self.deliveries.remove(index);
                    if let Err(error) = result {
                        self.report_sink_error(error);
                    }
                }
                Poll::Pending => index += 1,
            }
        }
        if self.deliveries.is_empty() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }

    /// Wait for every in-flight delivery
    pub async fn flush_deliveries(&mut self) {
        std::future::poll_fn(|cx| self.poll_deliveries(cx)).await
    }

    pub fn pending_deliveries(&self) -> usize {
        self.deliveries.len()
    }

    /// Move in-flight deliveries out for a host executor to run
    ///
    /// Each future reports its own failure on the bus when it settles.
    /// Nothing is reported once the capture is destroyed or dropped.
    pub fn detach_deliveries(&mut self) -> Vec<impl Future<Output = ()> + 'static> {
        std::mem::take(&mut self.deliveries)
            .into_iter()
            .map(|delivery| {
                let events = self.events.clone();
                let alive = Rc::downgrade(&self.alive);
                async move {
                    if let Err(error) = delivery.await {
                        if alive.upgrade().is_some() {
                            report_on(&events, sink_failure(error));
                        } else {
                            log::debug!("delivery failed after teardown: {}", error);
                        }
                    }
                }
            })
            .collect()
    }

    // --- timers and preview ---

    fn after_mutation(&mut self) {
        let now = self.clock.now_ms();
        match self.config.behavior.auto_commit_delay_ms {
            Some(delay) if !self.fragments.is_empty() => {
                self.timers.schedule(TimerKind::AutoCommit, now, delay);
            }
            _ => {
                self.timers.cancel(TimerKind::AutoCommit);
            }
        }
        self.schedule_preview();
    }

    fn schedule_preview(&mut self) {
        if let Some(preview) = self.preview.as_mut() {
            preview.stage(self.fragments.snapshot());
        }
        let now = self.clock.now_ms();
        self.timers
            .schedule(TimerKind::PreviewDebounce, now, self.config.behavior.debounce_delay_ms);
    }

    fn initialize_preview(&mut self) -> Result<(), crate::renderers::RenderError> {
        match self.preview.as_mut() {
            Some(preview) if !preview.is_initialized() => preview.initialize(&self.config.rendering),
            _ => Ok(()),
        }
    }

    /// Fire every timer that is due; returns how many fired
    pub fn tick(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut fired = 0;
        while let Some(kind) = self.timers.pop_due(now) {
            fired += 1;
            log::trace!("timer {:?} fired at {}", kind, now);
            match kind {
                TimerKind::ChordTimeout => self.on_chord_timeout(),
                TimerKind::PreviewDebounce => self.flush_preview(),
                TimerKind::AutoCommit => self.on_auto_commit(),
            }
        }
        fired
    }

    /// Earliest time at which `tick` has work to do
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    fn on_chord_timeout(&mut self) {
        if self.mode != CaptureMode::ChordMode {
            return;
        }
        log::debug!("chord timed out, completing");
        let instruction = self.engine.complete_chord();
        if instruction.is_rejected() {
            self.leave_chord_mode();
        } else {
            self.apply(&instruction);
        }
    }

    fn on_auto_commit(&mut self) {
        match self.mode {
            CaptureMode::Capture => {
                self.commit();
            }
            CaptureMode::ChordMode => {
                if let Some(delay) = self.config.behavior.auto_commit_delay_ms {
                    let now = self.clock.now_ms();
                    self.timers.schedule(TimerKind::AutoCommit, now, delay);
                }
            }
            _ => {}
        }
    }

    fn flush_preview(&mut self) {
        let rendered = match self.preview.as_mut() {
            Some(preview) => preview.flush(),
            None => Ok(Some(self.fragments.snapshot())),
        };
        match rendered {
            Ok(Some(fragment)) => self.events.emit(&CaptureEvent::PreviewUpdated { fragment }),
            Ok(None) => {}
            Err(error) => self.report(CaptureError::warning(ErrorCode::RenderFailed, error.to_string())),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(preview) = self.preview.as_mut() {
            preview.resize(width, height);
        }
    }

    // --- mappings and configuration ---

    pub fn set_key_mappings(&mut self, mappings: KeyMappings) {
        self.engine.set_key_mappings(mappings.clone());
        self.config.key_mappings = KeyMappingSetting::Custom(mappings);
        self.events.emit(&CaptureEvent::KeyMappingChanged {
            category: None,
            key: None,
        });
    }

    pub fn update_key_mapping(&mut self, category: MappingCategory, key: &str, value: &str) {
        self.engine.update_key_mapping(category, key, value);
        self.config.key_mappings = KeyMappingSetting::Custom(self.engine.key_mappings().clone());
        self.events.emit(&CaptureEvent::KeyMappingChanged {
            category: Some(category),
            key: Some(key.to_string()),
        });
    }

    /// Apply a new configuration to the running capture
    ///
    /// Engine defaults take effect immediately and reset transient state.
    pub fn apply_config(&mut self, config: CaptureConfig) {
        self.engine.set_key_mappings(config.key_mappings.resolve());
        self.engine
            .set_defaults(config.behavior.default_duration, config.behavior.default_octave);
        self.fragments.set_max_history(config.behavior.undo_history_size);
        if let Some(preview) = self.preview.as_mut() {
            preview.set_highlight_current(config.rendering.highlight_current);
        }
        if config.behavior.auto_commit_delay_ms.is_none() {
            self.timers.cancel(TimerKind::AutoCommit);
        }
        self.config = config;
        self.events.emit(&CaptureEvent::KeyMappingChanged {
            category: None,
            key: None,
        });
    }

    /// Validate a partial configuration document and apply it
    ///
    /// A rejected document is reported as `INVALID_CONFIG` and leaves the
    /// running configuration untouched.
    pub fn apply_config_value(&mut self, value: serde_json::Value) -> Result<(), ConfigError> {
        match CaptureConfig::from_value(value) {
            Ok(config) => {
                self.apply_config(config);
                Ok(())
            }
            Err(error) => {
                self.report(CaptureError::warning(ErrorCode::InvalidConfig, error.to_string()));
                Err(error)
            }
        }
    }

    // --- reporting and accessors ---

    fn report(&self, error: CaptureError) {
        report_on(&self.events, error);
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Borrow the working fragment
    pub fn fragment(&self) -> &Fragment {
        self.fragments.fragment()
    }

    /// Owned copy of the working fragment
    pub fn snapshot(&self) -> Fragment {
        self.fragments.snapshot()
    }

    pub fn committed(&self) -> &[Fragment] {
        self.fragments.committed()
    }

    pub fn can_undo(&self) -> bool {
        self.fragments.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.fragments.can_redo()
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine.current_state()
    }

    pub fn key_mappings(&self) -> &KeyMappings {
        self.engine.key_mappings()
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Shared notification bus
    pub fn notifier(&self) -> Rc<EventBus> {
        self.events.clone()
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }
}

fn sink_failure(error: SinkError) -> CaptureError {
    CaptureError::error(ErrorCode::CommitHandlerError, format!("Commit handler failed: {}", error))
}

fn report_on(events: &EventBus, error: CaptureError) {
    match error.severity {
        Severity::Error => log::error!("{}", error),
        Severity::Warning => log::warn!("{}", error),
        Severity::Info => log::info!("{}", error),
    }
    events.emit(&CaptureEvent::Error(error));
}
