//! Piper text-to-speech engine implementation.
//!
//! Runs Piper VITS voices exported to ONNX through ONNX Runtime. Text is
//! phonemized with espeak-ng (or used as-is for `text` voices).
//!
//! # System Requirements
//!
//! **espeak-ng** must be installed for espeak voices:
//! - **Linux**: `sudo apt-get install espeak-ng`
//! - **macOS**: `brew install espeak-ng`
//! - **Windows**: Download installer from <https://espeak-ng.org/download>
//!
//! # Voice Files
//!
//! ```text
//! voices/
//! ├── en_US-amy-low.onnx        # VITS model
//! └── en_US-amy-low.onnx.json   # Voice config (sample rate, phoneme ids, scales)
//! ```
//!
//! Voices are published at <https://huggingface.co/rhasspy/piper-voices>.
//!
//! # Examples
//!
//! ```rust,no_run
//! use piper_tts::{SynthesisEngine, SynthesisParamsBuilder, engines::piper::PiperEngine};
//! use std::path::PathBuf;
//!
//! let mut engine = PiperEngine::new();
//! engine.load_model(&PathBuf::from("voices/en_US-amy-low.onnx"))?;
//!
//! let params = SynthesisParamsBuilder::default().length_scale(1.2).build()?;
//! engine.synthesize_to_file("Hello, world!", &PathBuf::from("out.wav"), Some(params))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engine;
pub mod model;

pub use engine::{PiperEngine, PiperModelParams};
pub use model::{ModelError, PiperModel};
