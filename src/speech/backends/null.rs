//! Silent backend
//!
//! Used when no TTS engine is installed (visual-only operation) and in
//! tests. A configurable playback duration lets tests exercise the
//! queue's in-flight states without real audio.

use crate::speech::Synth;
use crate::Result;
use log::debug;
use std::time::{Duration, Instant};

/// Synthesizer that plays silence
pub struct NullSynth {
    /// Simulated playback time per utterance
    duration: Duration,

    /// When the current utterance finishes, if one is "playing"
    playing_until: Option<Instant>,
}

impl NullSynth {
    /// Silent backend whose utterances complete immediately
    pub fn instant() -> Self {
        Self::with_duration(Duration::ZERO)
    }

    /// Silent backend that "plays" each utterance for a fixed duration
    pub fn with_duration(duration: Duration) -> Self {
        Self {
            duration,
            playing_until: None,
        }
    }
}

impl Synth for NullSynth {
    fn speak(&mut self, text: &str) -> Result<()> {
        debug!("NullSynth speaking: {}", text);
        if !self.duration.is_zero() {
            self.playing_until = Some(Instant::now() + self.duration);
        }
        Ok(())
    }

    fn is_speaking(&mut self) -> bool {
        match self.playing_until {
            Some(until) if Instant::now() < until => true,
            _ => {
                self.playing_until = None;
                false
            }
        }
    }

    fn stop(&mut self) {
        self.playing_until = None;
    }
}
