//! Subprocess backend using Piper or espeak-ng
//!
//! Piper is preferred: its neural voices are much easier for young
//! children to parse. espeak-ng is the fallback when no Piper voice is
//! installed. Every pipeline stage is spawned as a direct child, with
//! the stages connected by a Rust-managed pipe, so polling doubles as
//! playback-completion detection and stop can kill the whole pipeline.
//!
//! Dependencies:
//! - piper + aplay, with a voice model under ~/.local/share/piper-voices
//! - or espeak-ng (install with: sudo apt install espeak-ng)

use crate::speech::Synth;
use crate::{EngineError, Result};
use log::{debug, error, info};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

/// Which external engine this backend drives
#[derive(Debug, Clone, PartialEq)]
enum TtsEngine {
    /// Piper with a voice model path
    Piper(PathBuf),
    /// espeak-ng
    Espeak,
}

/// One in-flight playback, owning every stage of its pipeline
///
/// Stopping must kill all stages: killing only the first would leave
/// the audio stage draining its buffer while the queue moves on.
struct Playback {
    /// Synthesis stage feeding the audio stage, if separate
    synth: Option<Child>,

    /// Process whose exit marks the end of playback
    audio: Child,
}

impl Playback {
    fn single(audio: Child) -> Self {
        Self { synth: None, audio }
    }

    fn pipeline(synth: Child, audio: Child) -> Self {
        Self {
            synth: Some(synth),
            audio,
        }
    }

    /// Whether the audio stage is still running; reaps stages on exit
    fn running(&mut self) -> bool {
        match self.audio.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) => {
                self.reap_synth();
                false
            }
            Err(e) => {
                debug!("try_wait failed: {}", e);
                self.reap_synth();
                false
            }
        }
    }

    /// Kill every stage and reap both
    fn kill(&mut self) {
        self.reap_synth();
        let _ = self.audio.kill();
        let _ = self.audio.wait();
    }

    fn reap_synth(&mut self) {
        if let Some(mut synth) = self.synth.take() {
            let _ = synth.kill();
            let _ = synth.wait();
        }
    }
}

/// Subprocess speech backend
pub struct EspeakSynth {
    engine: TtsEngine,

    /// Currently running playback pipeline
    current: Option<Playback>,

    /// Rate setting (0-100, 50 is normal)
    rate: u8,

    /// Volume setting (0-100)
    volume: u8,

    /// Voice/language code, e.g. "sv"
    voice: String,
}

impl EspeakSynth {
    /// Probe for an available engine
    ///
    /// Piper first, espeak-ng second; `Synthesis` error if neither runs.
    pub fn new(voice: &str, rate: u8, volume: u8) -> Result<Self> {
        let engine = Self::detect_engine(voice)?;
        info!("Detected TTS engine: {:?}", engine);

        Ok(Self {
            engine,
            current: None,
            rate,
            volume,
            voice: voice.to_string(),
        })
    }

    fn detect_engine(voice: &str) -> Result<TtsEngine> {
        if let Some(model) = Self::piper_model(voice) {
            if Self::binary_runs("piper", "--help") && Self::binary_runs("aplay", "--version") {
                return Ok(TtsEngine::Piper(model));
            }
        }

        if Self::binary_runs("espeak-ng", "--version") {
            return Ok(TtsEngine::Espeak);
        }

        Err(EngineError::Synthesis(
            "no TTS engine found (tried piper, espeak-ng)".to_string(),
        ))
    }

    /// Installed Piper voice model for a language, if any
    fn piper_model(voice: &str) -> Option<PathBuf> {
        let dir = dirs::data_dir()?.join("piper-voices");
        let candidates = match voice {
            "sv" => vec!["sv_SE-nst-medium.onnx", "sv_SE-nst-high.onnx"],
            other => vec![match other {
                "en" => "en_US-lessac-medium.onnx",
                _ => return None,
            }],
        };
        candidates
            .into_iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    fn binary_runs(bin: &str, arg: &str) -> bool {
        Command::new(bin)
            .arg(arg)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Human-readable engine name for logs
    pub fn engine_name(&self) -> &'static str {
        match self.engine {
            TtsEngine::Piper(_) => "piper",
            TtsEngine::Espeak => "espeak-ng",
        }
    }

    /// Convert rate (0-100) to espeak speed (80-450 wpm)
    fn rate_to_espeak_speed(rate: u8) -> u16 {
        80 + ((rate as u16) * 370 / 100)
    }

    /// Convert volume (0-100) to espeak amplitude (0-200)
    fn volume_to_espeak_amplitude(volume: u8) -> u8 {
        ((volume as u16 * 200) / 100) as u8
    }

    /// Convert rate (0-100) to a piper length scale (slower = larger)
    ///
    /// Normal rate maps to 1.5, the deliberately slow pace used for
    /// children with verbal dyspraxia.
    fn rate_to_length_scale(rate: u8) -> f32 {
        // 0 -> 2.5 (slowest), 50 -> 1.5, 100 -> 0.5
        2.5 - (rate as f32) * 0.02
    }

    fn kill_current(&mut self) {
        if let Some(mut playback) = self.current.take() {
            debug!("Killing {} pipeline", self.engine_name());
            playback.kill();
        }
    }

    fn spawn_piper(&self, model: &PathBuf, text: &str) -> Result<Playback> {
        let scale = Self::rate_to_length_scale(self.rate);

        let mut piper = Command::new("piper")
            .arg("--model")
            .arg(model)
            .arg("--output-raw")
            .arg("--length-scale")
            .arg(scale.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EngineError::Synthesis(format!("failed to start piper: {}", e)))?;

        // Hand the text to piper's stdin, then close it so synthesis starts
        if let Some(mut stdin) = piper.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                let _ = piper.kill();
                let _ = piper.wait();
                return Err(EngineError::Synthesis(format!("failed to feed piper: {}", e)));
            }
        }

        let Some(raw_audio) = piper.stdout.take() else {
            let _ = piper.kill();
            let _ = piper.wait();
            return Err(EngineError::Synthesis("piper stdout not captured".to_string()));
        };

        match Command::new("aplay")
            .args(["-r", "22050", "-f", "S16_LE", "-c", "1", "-q"])
            .stdin(Stdio::from(raw_audio))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(aplay) => Ok(Playback::pipeline(piper, aplay)),
            Err(e) => {
                let _ = piper.kill();
                let _ = piper.wait();
                Err(EngineError::Synthesis(format!("failed to start aplay: {}", e)))
            }
        }
    }

    fn spawn_espeak(&self, text: &str) -> Result<Playback> {
        let speed = Self::rate_to_espeak_speed(self.rate);
        let amplitude = Self::volume_to_espeak_amplitude(self.volume);

        Command::new("espeak-ng")
            .arg("-v")
            .arg(&self.voice)
            .arg("-s")
            .arg(speed.to_string())
            .arg("-a")
            .arg(amplitude.to_string())
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(Playback::single)
            .map_err(|e| EngineError::Synthesis(format!("failed to start espeak-ng: {}", e)))
    }
}

impl Synth for EspeakSynth {
    fn speak(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        // One playback at a time
        self.kill_current();

        debug!("Speaking via {}: {}", self.engine_name(), text);
        let spawned = match &self.engine {
            TtsEngine::Piper(model) => self.spawn_piper(model, text),
            TtsEngine::Espeak => self.spawn_espeak(text),
        };

        match spawned {
            Ok(playback) => {
                self.current = Some(playback);
                Ok(())
            }
            Err(e) => {
                error!("Speech synthesis failed: {}", e);
                Err(e)
            }
        }
    }

    fn is_speaking(&mut self) -> bool {
        match self.current.as_mut() {
            Some(playback) => {
                if playback.running() {
                    true
                } else {
                    self.current = None;
                    false
                }
            }
            None => false,
        }
    }

    fn stop(&mut self) {
        self.kill_current();
    }
}

impl Drop for EspeakSynth {
    fn drop(&mut self) {
        debug!("Shutting down {} backend", self.engine_name());
        self.kill_current();
    }
}
