//! Ordered dispatch table for the shortcut engine
//!
//! Keys are shared between categories depending on modifiers, so the order
//! of this table is the priority policy: the first rule whose matcher
//! accepts the input produces the instruction.

use serde::Serialize;

use super::instruction::{ControlCommand, DurationToken, Instruction, Rejection};
use super::keymap::MappingCategory;
use super::{KeyInput, ShortcutEngine};
use crate::capture::CaptureMode;
use crate::models::Letter;

/// Named step in the dispatch order
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DispatchStage {
    ModeGate,
    Control,
    ChordAccumulation,
    Duration,
    Articulation,
    Dynamic,
    Pitch,
    Unrecognized,
}

type Matcher = fn(&ShortcutEngine, &KeyInput, CaptureMode) -> bool;
type Handler = fn(&mut ShortcutEngine, &KeyInput, CaptureMode) -> Instruction;

pub(crate) struct Rule {
    pub stage: DispatchStage,
    pub matches: Matcher,
    pub apply: Handler,
}

pub(crate) const RULES: &[Rule] = &[
    Rule {
        stage: DispatchStage::ModeGate,
        matches: |_, _, mode| matches!(mode, CaptureMode::Stopped | CaptureMode::Error),
        apply: |_, _, _| Instruction::rejected(Rejection::ModeForbidsInput),
    },
    Rule {
        stage: DispatchStage::Control,
        matches: |engine, input, _| control_command(engine, input).is_some(),
        apply: |engine, input, _| match control_command(engine, input) {
            Some(command) => engine.apply_control(command),
            None => Instruction::rejected(Rejection::Unrecognized),
        },
    },
    Rule {
        stage: DispatchStage::ChordAccumulation,
        matches: |_, input, mode| mode == CaptureMode::ChordMode && !input.ctrl_key,
        apply: |engine, input, _| {
            if input.key == "Enter" {
                return engine.complete_chord();
            }
            match pitch_letter(engine, input) {
                Some(letter) => engine.append_chord_note(letter, input),
                None => Instruction::rejected(Rejection::Unrecognized),
            }
        },
    },
    Rule {
        stage: DispatchStage::Duration,
        matches: |engine, input, _| duration_token(engine, input).is_some(),
        apply: |engine, input, _| match duration_token(engine, input) {
            Some(token) => engine.select_duration(token),
            None => Instruction::rejected(Rejection::Unrecognized),
        },
    },
    Rule {
        stage: DispatchStage::Articulation,
        matches: |engine, input, _| {
            engine
                .mappings
                .lookup(MappingCategory::Articulations, &input.key)
                .is_some()
        },
        apply: |engine, input, _| {
            match engine.mappings.lookup(MappingCategory::Articulations, &input.key) {
                Some(name) => ShortcutEngine::articulation(name),
                None => Instruction::rejected(Rejection::Unrecognized),
            }
        },
    },
    Rule {
        stage: DispatchStage::Dynamic,
        matches: |engine, input, _| {
            engine
                .mappings
                .lookup(MappingCategory::Dynamics, &input.key)
                .is_some()
        },
        apply: |engine, input, _| match engine.mappings.lookup(MappingCategory::Dynamics, &input.key) {
            Some(name) => ShortcutEngine::dynamic(name),
            None => Instruction::rejected(Rejection::Unrecognized),
        },
    },
    Rule {
        stage: DispatchStage::Pitch,
        matches: |engine, input, _| pitch_letter(engine, input).is_some(),
        apply: |engine, input, _| match pitch_letter(engine, input) {
            Some(letter) => engine.play_pitch(letter, input),
            None => Instruction::rejected(Rejection::Unrecognized),
        },
    },
    Rule {
        stage: DispatchStage::Unrecognized,
        matches: |_, _, _| true,
        apply: |_, _, _| Instruction::rejected(Rejection::Unrecognized),
    },
];

/// Control lookup; undo and redo fall through without Ctrl
fn control_command(engine: &ShortcutEngine, input: &KeyInput) -> Option<ControlCommand> {
    let command = engine
        .mappings
        .lookup(MappingCategory::Controls, &input.key)
        .and_then(ControlCommand::from_name)?;
    if command.requires_ctrl() && !input.ctrl_key {
        return None;
    }
    Some(command)
}

fn duration_token(engine: &ShortcutEngine, input: &KeyInput) -> Option<DurationToken> {
    engine
        .mappings
        .lookup(MappingCategory::Durations, &input.key)
        .and_then(DurationToken::from_name)
}

fn pitch_letter(engine: &ShortcutEngine, input: &KeyInput) -> Option<Letter> {
    let name = engine.mappings.lookup_pitch(&input.key)?;
    let mut chars = name.chars();
    let letter = Letter::from_char(chars.next()?)?;
    chars.next().is_none().then_some(letter)
}
