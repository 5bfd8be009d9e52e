// NEWSREEL Character State Machine
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL
//
// Maps (time, amplitude, previous amplitude) to the anchor's pose.
// Evaluated independently per frame; the previous amplitude is the only memory.

use std::collections::BTreeSet;
use std::fmt;

/// Every threshold and rate used by the state machine.
pub mod tuning {
    pub const SMOOTHING_CURRENT: f32 = 0.7;
    pub const SMOOTHING_PREVIOUS: f32 = 0.3;
    pub const MOUTH_HALF_OPEN: f32 = 0.2;
    pub const MOUTH_OPEN: f32 = 0.6;

    pub const EMPHASIS_RATE: f64 = 0.9;
    pub const EMPHASIS_GATE: f64 = 0.95;
    pub const EMPHASIS_MIN_AMPLITUDE: f32 = 0.4;

    pub const BLINK_PERIOD: f64 = 5.0;
    pub const BLINK_PHASE: f64 = 4.9;
    pub const EXPRESSION_PERIOD: f64 = 15.0;
    pub const EXPRESSION_PHASE: f64 = 14.4;
    pub const SPIKE_AMPLITUDE: f32 = 0.7;
    pub const SPIKE_RATE: f64 = 3.7;
    pub const SPIKE_GATE: f64 = 0.9;

    pub const SWAY_DEGREES: f64 = 3.0;
    pub const SWAY_RATE: f64 = 0.8;
    pub const JITTER_DEGREES: f64 = 1.5;
    pub const JITTER_RATE: f64 = 11.0;
    pub const TILT_DEGREES: f64 = 2.5;
    pub const TILT_RATE: f64 = 0.45;
    pub const TILT_GATE: f64 = 0.9;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MouthState {
    Closed,
    HalfOpen,
    Open,
}

impl MouthState {
    pub const ALL: [MouthState; 3] = [Self::Closed, Self::HalfOpen, Self::Open];

    /// Classify an (already smoothed) loudness level.
    pub fn from_level(level: f32) -> Self {
        if level < tuning::MOUTH_HALF_OPEN {
            Self::Closed
        } else if level < tuning::MOUTH_OPEN {
            Self::HalfOpen
        } else {
            Self::Open
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::HalfOpen => "half",
            Self::Open => "open",
        }
    }
}

impl fmt::Display for MouthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EyeState {
    Neutral,
    Squint,
    Wide,
    Rolling,
    Wink,
}

impl EyeState {
    pub const ALL: [EyeState; 5] = [Self::Neutral, Self::Squint, Self::Wide, Self::Rolling, Self::Wink];

    /// Expressions injected at the end of each 15 second cycle, in rotation.
    const EXPRESSIONS: [EyeState; 3] = [Self::Wide, Self::Rolling, Self::Wink];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Squint => "squint",
            Self::Wide => "wide",
            Self::Rolling => "rolling",
            Self::Wink => "wink",
        }
    }
}

impl fmt::Display for EyeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    pub eye: EyeState,
    pub mouth: MouthState,
    pub head_rotation: f32,
    pub accessories: BTreeSet<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct CharacterStateMachine {
    accessories: BTreeSet<usize>,
}

impl CharacterStateMachine {
    pub fn new(accessories: BTreeSet<usize>) -> Self {
        Self { accessories }
    }

    pub fn state_at(&self, time: f64, amplitude: f32, previous_amplitude: f32) -> AnimationState {
        AnimationState {
            eye: eye_state(time, amplitude),
            mouth: mouth_state(time, amplitude, previous_amplitude),
            head_rotation: head_rotation(time, amplitude),
            accessories: self.accessories.clone(),
        }
    }
}

pub fn smoothed_level(amplitude: f32, previous_amplitude: f32) -> f32 {
    tuning::SMOOTHING_CURRENT * amplitude + tuning::SMOOTHING_PREVIOUS * previous_amplitude
}

pub fn mouth_state(time: f64, amplitude: f32, previous_amplitude: f32) -> MouthState {
    let emphasis = (time * tuning::EMPHASIS_RATE).sin() > tuning::EMPHASIS_GATE
        && amplitude > tuning::EMPHASIS_MIN_AMPLITUDE;
    if emphasis {
        return MouthState::Open;
    }
    MouthState::from_level(smoothed_level(amplitude, previous_amplitude))
}

pub fn eye_state(time: f64, amplitude: f32) -> EyeState {
    if time.rem_euclid(tuning::BLINK_PERIOD) > tuning::BLINK_PHASE {
        return EyeState::Squint;
    }

    if time.rem_euclid(tuning::EXPRESSION_PERIOD) > tuning::EXPRESSION_PHASE {
        let cycle = (time / tuning::EXPRESSION_PERIOD).floor().max(0.0) as usize;
        return EyeState::EXPRESSIONS[cycle % EyeState::EXPRESSIONS.len()];
    }

    if amplitude > tuning::SPIKE_AMPLITUDE && (time * tuning::SPIKE_RATE).sin() > tuning::SPIKE_GATE {
        return EyeState::Wide;
    }

    EyeState::Neutral
}

pub fn head_rotation(time: f64, amplitude: f32) -> f32 {
    let sway = tuning::SWAY_DEGREES * (time * tuning::SWAY_RATE).sin();
    let jitter = amplitude as f64 * tuning::JITTER_DEGREES * (time * tuning::JITTER_RATE).sin();
    let tilt = if (time * tuning::TILT_RATE).sin() > tuning::TILT_GATE {
        tuning::TILT_DEGREES
    } else {
        0.0
    };
    (sway + jitter + tilt) as f32
}
