//! # piper-tts
//!
//! A Rust library for text-to-speech synthesis with Piper voices.
//!
//! ## Pipeline
//!
//! 1. **Phonemization**: espeak-ng turns text into IPA phoneme symbols.
//! 2. **Encoding**: symbols are mapped to model ids, with a pad after every
//!    symbol and an end-of-sequence marker ([`encode`](encode::encode)).
//! 3. **Assembly**: ids, scales and speaker become the model's input tensors
//!    ([`InferenceRequest`]).
//! 4. **Inference**: the ONNX model returns a float waveform.
//! 5. **Rendering**: the waveform is peak-normalised to 16-bit PCM and framed
//!    as a mono WAV file ([`PcmAudio`]).
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! piper-tts = { version = "2026.2", features = ["piper"] }
//! ```
//!
//! ```ignore
//! use std::path::PathBuf;
//! use piper_tts::{engines::piper::PiperEngine, SynthesisEngine};
//!
//! let mut engine = PiperEngine::new();
//! engine.load_model(&PathBuf::from("voices/en_US-amy-low.onnx"))?;
//!
//! let audio = engine.synthesize("Hello, world!", None)?;
//! audio.write_to_file(&PathBuf::from("output.wav"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod encode;
pub mod engines;
pub mod phonemize;
pub mod request;
pub mod synth;
pub mod voice;
pub mod wav;

use std::path::Path;

pub use config::{ConfigError, PhonemeType, VoiceConfig};
pub use phonemize::{EspeakPhonemizer, PhonemizeError, TextPhonemizer, VoicePhonemizer};
pub use request::{InferenceRequest, InferenceScales};
pub use synth::{
    InferenceBackend, Phonemizer, Stage, SynthesisError, SynthesisParams,
    SynthesisParamsBuilder, Synthesizer,
};
pub use voice::{VoiceFiles, VoiceName};
pub use wav::{to_pcm_wav, PcmAudio, DEFAULT_PEAK_FLOOR};

/// Common interface for text-to-speech synthesis engines.
///
/// This trait defines the standard operations that all synthesis engines must support.
/// Each engine may have different parameter types for model loading and inference configuration.
pub trait SynthesisEngine {
    /// Parameters for configuring inference behavior (scales, speaker, etc.)
    type SynthesisParams;
    /// Parameters for configuring model loading (threads, etc.)
    type ModelParams: Default;

    /// Load a model from the specified path using default parameters.
    fn load_model(&mut self, model_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.load_model_with_params(model_path, Self::ModelParams::default())
    }

    /// Load a model from the specified path with custom parameters.
    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Unload the currently loaded model and free associated resources.
    fn unload_model(&mut self);

    /// Synthesize speech from the given text into an in-memory WAV file.
    fn synthesize(
        &mut self,
        text: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<PcmAudio, Box<dyn std::error::Error>>;

    /// Synthesize speech from the given text and write to a WAV file.
    ///
    /// Default implementation calls `synthesize()` then `PcmAudio::write_to_file()`.
    fn synthesize_to_file(
        &mut self,
        text: &str,
        wav_path: &Path,
        params: Option<Self::SynthesisParams>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.synthesize(text, params)?.write_to_file(wav_path)?;
        Ok(())
    }

    /// Read UTF-8 text from `text_path` and write its speech to `wav_path`.
    fn synthesize_text_file(
        &mut self,
        text_path: &Path,
        wav_path: &Path,
        params: Option<Self::SynthesisParams>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(text_path)?;
        self.synthesize_to_file(&text, wav_path, params)
    }
}
