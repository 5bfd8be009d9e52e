// NEWSREEL Animation Modules
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL

pub mod amplitude;
pub mod character;
pub mod frame_library;
pub mod state;
pub mod text;

pub use amplitude::{AmplitudeAnalyzer, AmplitudeSource, AmplitudeTrack};
pub use character::{Accessory, CharacterRig};
pub use frame_library::{FrameKey, FrameLibrary, LibraryStats, RotationLattice};
pub use state::{AnimationState, CharacterStateMachine, EyeState, MouthState};
