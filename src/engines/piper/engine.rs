use std::path::{Path, PathBuf};

use crate::config::VoiceConfig;
use crate::phonemize::{EspeakPhonemizer, VoicePhonemizer};
use crate::synth::{SynthesisError, SynthesisParams, Synthesizer};
use crate::voice::VoiceFiles;
use crate::wav::PcmAudio;
use crate::SynthesisEngine;

use super::model::PiperModel;

/// Parameters for configuring Piper model loading.
#[derive(Debug, Clone, Default)]
pub struct PiperModelParams {
    /// Number of CPU threads to use for inference.
    /// `None` uses the ORT default (typically all available cores).
    pub num_threads: Option<usize>,
    /// Voice config path. `None` uses `<model>.json`.
    pub config_path: Option<PathBuf>,
}

/// Piper text-to-speech engine.
///
/// ```rust,no_run
/// use piper_tts::{SynthesisEngine, engines::piper::PiperEngine};
/// use std::path::PathBuf;
///
/// // Uses system espeak-ng from PATH
/// let mut engine = PiperEngine::new();
/// engine.load_model(&PathBuf::from("voices/en_US-amy-low.onnx"))?;
/// let audio = engine.synthesize("Hello, world!", None)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PiperEngine {
    synthesizer: Option<Synthesizer<VoicePhonemizer, PiperModel>>,
    model_path: Option<PathBuf>,
    espeak: EspeakPhonemizer,
}

impl Default for PiperEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PiperEngine {
    /// Create a new engine that uses `espeak-ng` from PATH.
    pub fn new() -> Self {
        Self::with_espeak(None, None)
    }

    /// Create a new engine with explicit espeak-ng binary and data paths.
    ///
    /// Use this when bundling espeak-ng with your application. Either path
    /// can be `None` to fall back to the system default.
    pub fn with_espeak(bin_path: Option<PathBuf>, data_path: Option<PathBuf>) -> Self {
        Self {
            synthesizer: None,
            model_path: None,
            espeak: EspeakPhonemizer {
                bin_path,
                data_path,
            },
        }
    }

    /// Configuration of the loaded voice.
    pub fn config(&self) -> Option<&VoiceConfig> {
        self.synthesizer.as_ref().map(Synthesizer::config)
    }

    /// Path of the loaded model.
    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    /// Speaker names of the loaded voice, ordered by speaker id.
    pub fn list_speakers(&self) -> Vec<&str> {
        self.config().map(VoiceConfig::speakers).unwrap_or_default()
    }
}

impl Drop for PiperEngine {
    fn drop(&mut self) {
        self.unload_model();
    }
}

impl SynthesisEngine for PiperEngine {
    type SynthesisParams = SynthesisParams;
    type ModelParams = PiperModelParams;

    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = params
            .config_path
            .unwrap_or_else(|| VoiceFiles::for_model(model_path).config);
        let config = VoiceConfig::load(&config_path)?;

        let model = PiperModel::load(model_path, params.num_threads)?;
        if config.num_speakers() > 1 && !model.has_speaker_input() {
            log::warn!(
                "Config declares {} speakers but the model has no speaker input",
                config.num_speakers()
            );
        }

        let phonemizer = VoicePhonemizer::for_config(&config, self.espeak.clone());
        self.synthesizer = Some(Synthesizer::new(config, phonemizer, model));
        self.model_path = Some(model_path.to_path_buf());
        Ok(())
    }

    fn unload_model(&mut self) {
        self.synthesizer = None;
        self.model_path = None;
    }

    fn synthesize(
        &mut self,
        text: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<PcmAudio, Box<dyn std::error::Error>> {
        let synthesizer = self
            .synthesizer
            .as_ref()
            .ok_or(SynthesisError::ModelNotLoaded)?;

        let params = params.unwrap_or_default();
        Ok(synthesizer.synthesize(text, &params)?)
    }
}
