//! Text to WAV synthesis pipeline.
//!
//! A call runs linearly through phonemization, id encoding, request assembly,
//! inference and PCM rendering. Any collaborator failure aborts the call; no
//! partial audio is produced.

use std::fmt;

use derive_builder::Builder;

use crate::config::VoiceConfig;
use crate::encode::{encode, BOS};
use crate::request::{InferenceRequest, InferenceScales};
use crate::wav::{encode_wav, quantize, PcmAudio, DEFAULT_PEAK_FLOOR};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Turns text into phoneme symbols.
pub trait Phonemizer {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Phonemize `text` with the phonemizer voice `voice` (e.g. `"en-us"`).
    fn phonemize(&self, text: &str, voice: &str) -> Result<Vec<String>, Self::Error>;
}

/// Runs the acoustic model.
pub trait InferenceBackend {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run one request and return the raw waveform.
    fn run(&self, request: InferenceRequest) -> Result<Vec<f32>, Self::Error>;
}

/// External collaborator that failed during a synthesis call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Phonemize,
    Inference,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Phonemize => f.write_str("phonemizer"),
            Stage::Inference => f.write_str("inference"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SynthesisError {
    #[error("No phoneme ids to synthesize")]
    EmptyInput,
    #[error("{stage} failed: {source}")]
    UpstreamFailure {
        stage: Stage,
        #[source]
        source: BoxError,
    },
    #[error("WAV encoding failed: {0}")]
    Encode(#[from] hound::Error),
    #[error("Model not loaded. Call load_model() first.")]
    ModelNotLoaded,
}

impl SynthesisError {
    pub fn upstream(stage: Stage, source: impl Into<BoxError>) -> Self {
        Self::UpstreamFailure {
            stage,
            source: source.into(),
        }
    }

    /// Stage tag of an upstream failure.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::UpstreamFailure { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Per-call overrides. Unset values fall back to the voice's defaults.
///
/// ```
/// use piper_tts::SynthesisParamsBuilder;
///
/// let params = SynthesisParamsBuilder::default()
///     .length_scale(1.2)
///     .speaker_id(3)
///     .build()
///     .unwrap();
/// assert_eq!(params.noise_scale, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Builder)]
#[builder(default, setter(strip_option))]
pub struct SynthesisParams {
    pub noise_scale: Option<f32>,
    pub length_scale: Option<f32>,
    pub noise_w: Option<f32>,
    pub speaker_id: Option<i64>,
}

impl SynthesisParams {
    /// Apply the overrides on top of `defaults`.
    pub fn scales(&self, defaults: InferenceScales) -> InferenceScales {
        InferenceScales {
            noise_scale: self.noise_scale.unwrap_or(defaults.noise_scale),
            length_scale: self.length_scale.unwrap_or(defaults.length_scale),
            noise_w: self.noise_w.unwrap_or(defaults.noise_w),
        }
    }
}

/// A loaded voice wired to its phonemizer and inference backend.
///
/// `synthesize` takes `&self` and keeps all per-call state local, so one
/// synthesizer can serve several threads as long as the backend allows it.
pub struct Synthesizer<P, B> {
    config: VoiceConfig,
    phonemizer: P,
    backend: B,
    peak_floor: f32,
}

impl<P: Phonemizer, B: InferenceBackend> Synthesizer<P, B> {
    pub fn new(config: VoiceConfig, phonemizer: P, backend: B) -> Self {
        Self {
            config,
            phonemizer,
            backend,
            peak_floor: DEFAULT_PEAK_FLOOR,
        }
    }

    /// Override the normalisation peak floor. Must be positive and finite.
    pub fn with_peak_floor(mut self, peak_floor: f32) -> Self {
        if peak_floor.is_finite() && peak_floor > 0.0 {
            self.peak_floor = peak_floor;
        } else {
            log::warn!("Ignoring invalid peak floor {peak_floor}, keeping {}", self.peak_floor);
        }
        self
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    pub fn phonemizer(&self) -> &P {
        &self.phonemizer
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Phoneme sequence for `text`, starting with the BOS symbol.
    pub fn phonemes(&self, text: &str) -> Result<Vec<String>, SynthesisError> {
        let symbols = self
            .phonemizer
            .phonemize(text, self.config.phonemizer_voice())
            .map_err(|e| SynthesisError::upstream(Stage::Phonemize, e))?;

        let mut phonemes = Vec::with_capacity(symbols.len() + 1);
        phonemes.push(BOS.to_string());
        phonemes.extend(symbols);
        Ok(phonemes)
    }

    /// Build the inference request for `text` without running the model.
    pub fn request(
        &self,
        text: &str,
        params: &SynthesisParams,
    ) -> Result<InferenceRequest, SynthesisError> {
        let phonemes = self.phonemes(text)?;
        log::debug!("Phonemized {} chars into {} symbols", text.len(), phonemes.len());

        let ids = encode(&phonemes, &self.config);
        log::debug!("Encoded {} phoneme ids", ids.len());

        let scales = params.scales(self.config.inference());
        let request = InferenceRequest::assemble(
            ids,
            self.config.num_speakers(),
            params.speaker_id,
            scales,
        )?;
        log::debug!(
            "Assembled request: length={}, scales={:?}, speaker={:?}",
            request.length,
            request.scales,
            request.speaker_id
        );
        Ok(request)
    }

    /// Synthesize `text` into a mono 16-bit WAV at the voice's sample rate.
    pub fn synthesize(
        &self,
        text: &str,
        params: &SynthesisParams,
    ) -> Result<PcmAudio, SynthesisError> {
        let request = self.request(text, params)?;

        let waveform = self
            .backend
            .run(request)
            .map_err(|e| SynthesisError::upstream(Stage::Inference, e))?;
        log::debug!("Inferred {} samples", waveform.len());

        let samples = quantize(&waveform, self.peak_floor);
        let audio = encode_wav(&samples, self.config.sample_rate())?;
        log::debug!(
            "Rendered {:.2}s of audio ({} bytes)",
            audio.duration_secs(),
            audio.as_bytes().len()
        );
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::MINIMAL;
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    struct CharPhonemizer;

    impl Phonemizer for CharPhonemizer {
        type Error = Boom;

        fn phonemize(&self, text: &str, _voice: &str) -> Result<Vec<String>, Boom> {
            if text == "fail" {
                return Err(Boom);
            }
            Ok(text.chars().map(String::from).collect())
        }
    }

    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<InferenceRequest>>,
    }

    impl InferenceBackend for Recorder {
        type Error = Boom;

        fn run(&self, request: InferenceRequest) -> Result<Vec<f32>, Boom> {
            let samples = request.ids.iter().map(|&id| id as f32 / 10.0).collect();
            self.requests.lock().unwrap().push(request);
            Ok(samples)
        }
    }

    fn synthesizer() -> Synthesizer<CharPhonemizer, Recorder> {
        let config = VoiceConfig::from_json(MINIMAL).unwrap();
        Synthesizer::new(config, CharPhonemizer, Recorder::default())
    }

    #[test]
    fn phonemes_start_with_bos() {
        let synth = synthesizer();
        assert_eq!(synth.phonemes("ab").unwrap(), vec!["^", "a", "b"]);
        assert_eq!(synth.phonemes("").unwrap(), vec!["^"]);
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let synth = synthesizer();
        let request = synth.request("a", &SynthesisParams::default()).unwrap();
        assert_eq!(request.ids, vec![1, 0, 5, 0, 2]);
        assert_eq!(request.scales, [0.667, 1.0, 0.8]);
        assert_eq!(request.speaker_id, None);
    }

    #[test]
    fn single_override_keeps_other_defaults() {
        let synth = synthesizer();
        let params = SynthesisParamsBuilder::default()
            .noise_scale(0.3)
            .build()
            .unwrap();
        let request = synth.request("a", &params).unwrap();
        assert_eq!(request.scales, [0.3, 1.0, 0.8]);
    }

    #[test]
    fn synthesize_renders_backend_output() {
        let synth = synthesizer();
        let audio = synth.synthesize("a", &SynthesisParams::default()).unwrap();
        assert_eq!(audio.sample_rate(), 16000);
        // ids [1, 0, 5, 0, 2] -> peak 0.5
        assert_eq!(
            audio.decode_samples().unwrap(),
            vec![6553, 0, 32767, 0, 13106]
        );
        assert_eq!(synth.backend().requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn phonemizer_failure_is_tagged() {
        let synth = synthesizer();
        let err = synth
            .synthesize("fail", &SynthesisParams::default())
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Phonemize));
        assert_eq!(err.to_string(), "phonemizer failed: boom");
        assert!(synth.backend().requests.lock().unwrap().is_empty());
    }

    #[test]
    fn invalid_peak_floor_is_ignored() {
        let synth = synthesizer().with_peak_floor(0.0).with_peak_floor(f32::NAN);
        assert_eq!(synth.peak_floor, DEFAULT_PEAK_FLOOR);
        let synth = synthesizer().with_peak_floor(1.0);
        assert_eq!(synth.peak_floor, 1.0);
    }
}
