//! Speech synthesis system
//!
//! The engine never talks to a synthesizer directly: every utterance
//! goes through the [`queue::SpeechQueue`], which serializes playback so
//! audio never overlaps and order matches call order.

pub mod backends;
pub mod queue;
pub mod synth;

pub use queue::{Priority, SpeechQueue, Utterance, UtteranceHandle, UtteranceState};
pub use synth::{create_synth, Synth};
