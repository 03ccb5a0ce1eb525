//! Speech synthesizer abstraction
//!
//! A thin capability interface over an external text-to-speech engine.
//! The queue worker owns one `Synth` and is the only caller; any backend
//! satisfying this contract is interchangeable.

use crate::Result;
use log::info;

/// Speech synthesizer capability
///
/// Playback is asynchronous: `speak` begins an utterance and returns
/// immediately, the caller polls `is_speaking` for completion, and
/// `stop` cancels whatever plays right now.
pub trait Synth: Send {
    /// Begin speaking text; returns once playback has started
    fn speak(&mut self, text: &str) -> Result<()>;

    /// Whether the last `speak` is still playing
    fn is_speaking(&mut self) -> bool;

    /// Stop the current utterance immediately; idempotent
    fn stop(&mut self);
}

/// Create the best available speech synthesizer
///
/// Tries backends in order:
/// 1. Piper (natural voice, preferred for children)
/// 2. espeak-ng (widely available fallback)
/// 3. Silent backend (visual-only operation, never fails)
///
/// The silent fallback means synthesizer absence degrades the app to
/// visual-only exercises instead of preventing startup.
pub fn create_synth(voice: &str, rate: u8, volume: u8) -> Box<dyn Synth> {
    use super::backends::espeak::EspeakSynth;
    use super::backends::null::NullSynth;

    match EspeakSynth::new(voice, rate, volume) {
        Ok(synth) => {
            info!("Speech backend ready: {}", synth.engine_name());
            Box::new(synth)
        }
        Err(e) => {
            info!("No speech engine available ({}), running silent", e);
            Box::new(NullSynth::instant())
        }
    }
}
