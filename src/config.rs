//! Piper voice configuration (`<voice>.onnx.json`).
//!
//! The document is deserialised into typed structs and then validated field
//! by field, so a broken voice is rejected at load time instead of failing
//! halfway through a synthesis call.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::encode::{BOS, EOS, PAD};
use crate::request::InferenceScales;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid voice config: {0}")]
    Malformed(String),
    #[error("Reserved symbol {0:?} missing from phoneme_id_map")]
    MissingReservedSymbol(String),
}

/// How the text of a voice is turned into phoneme symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhonemeType {
    /// IPA phonemes produced by espeak-ng.
    #[default]
    Espeak,
    /// The text's own characters are the phonemes.
    Text,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    #[serde(default)]
    pub quality: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EspeakConfig {
    /// espeak-ng voice, e.g. `"en-us"`.
    pub voice: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageConfig {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub name_native: Option<String>,
    #[serde(default)]
    pub name_english: Option<String>,
    #[serde(default)]
    pub country_english: Option<String>,
}

/// Raw document shape. Unknown keys are ignored by serde.
#[derive(Debug, Deserialize)]
struct RawVoiceConfig {
    audio: AudioConfig,
    espeak: EspeakConfig,
    inference: InferenceScales,
    phoneme_id_map: HashMap<String, Vec<i64>>,
    #[serde(default)]
    phoneme_type: PhonemeType,
    #[serde(default)]
    phoneme_map: HashMap<String, Vec<String>>,
    #[serde(default)]
    num_symbols: Option<u32>,
    #[serde(default = "default_num_speakers")]
    num_speakers: u32,
    #[serde(default)]
    speaker_id_map: HashMap<String, i64>,
    #[serde(default)]
    piper_version: Option<String>,
    #[serde(default)]
    language: Option<LanguageConfig>,
    #[serde(default)]
    dataset: Option<String>,
}

fn default_num_speakers() -> u32 {
    1
}

/// Validated, immutable description of a voice.
///
/// Only [`VoiceConfig::load`] and [`VoiceConfig::from_json`] produce one, so
/// the reserved symbols are always present in the id map.
///
/// ```compile_fail
/// # use piper_tts::VoiceConfig;
/// # fn clear(mut config: VoiceConfig) {
/// config.phoneme_id_map.clear();
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    audio: AudioConfig,
    espeak: EspeakConfig,
    inference: InferenceScales,
    phoneme_type: PhonemeType,
    phoneme_id_map: HashMap<String, Vec<i64>>,
    phoneme_map: HashMap<String, Vec<String>>,
    num_symbols: Option<u32>,
    num_speakers: u32,
    speaker_id_map: HashMap<String, i64>,
    piper_version: Option<String>,
    language: Option<LanguageConfig>,
    dataset: Option<String>,
}

impl VoiceConfig {
    /// Load and validate a voice configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        log::info!(
            "Loaded voice config from {} ({} Hz, {} phonemes, {} speaker(s))",
            path.display(),
            config.sample_rate(),
            config.phoneme_id_map.len(),
            config.num_speakers
        );
        Ok(config)
    }

    /// Parse and validate a voice configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let raw: RawVoiceConfig = serde_json::from_str(content)
            .map_err(|e| ConfigError::Malformed(format!("Failed to parse JSON: {e}")))?;
        Self::validate(raw)
    }

    fn validate(raw: RawVoiceConfig) -> Result<Self, ConfigError> {
        if raw.audio.sample_rate == 0 {
            return Err(ConfigError::Malformed(
                "audio.sample_rate must be positive".to_string(),
            ));
        }

        let scales = [
            ("noise_scale", raw.inference.noise_scale),
            ("length_scale", raw.inference.length_scale),
            ("noise_w", raw.inference.noise_w),
        ];
        for (name, value) in scales {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Malformed(format!(
                    "inference.{name} must be a positive number, got {value}"
                )));
            }
        }

        for (symbol, ids) in &raw.phoneme_id_map {
            if ids.is_empty() {
                return Err(ConfigError::Malformed(format!(
                    "phoneme_id_map entry {symbol:?} has no ids"
                )));
            }
            if let Some(id) = ids.iter().find(|&&id| id < 0) {
                return Err(ConfigError::Malformed(format!(
                    "phoneme_id_map entry {symbol:?} has negative id {id}"
                )));
            }
        }

        for reserved in [BOS, EOS, PAD] {
            if !raw.phoneme_id_map.contains_key(reserved) {
                return Err(ConfigError::MissingReservedSymbol(reserved.to_string()));
            }
        }

        if let Some((name, id)) = raw.speaker_id_map.iter().find(|(_, &id)| id < 0) {
            return Err(ConfigError::Malformed(format!(
                "speaker_id_map entry {name:?} has negative id {id}"
            )));
        }

        Ok(Self {
            audio: raw.audio,
            espeak: raw.espeak,
            inference: raw.inference,
            phoneme_type: raw.phoneme_type,
            phoneme_id_map: raw.phoneme_id_map,
            phoneme_map: raw.phoneme_map,
            num_symbols: raw.num_symbols,
            num_speakers: raw.num_speakers,
            speaker_id_map: raw.speaker_id_map,
            piper_version: raw.piper_version,
            language: raw.language,
            dataset: raw.dataset,
        })
    }

    pub fn audio(&self) -> &AudioConfig {
        &self.audio
    }

    pub fn sample_rate(&self) -> u32 {
        self.audio.sample_rate
    }

    /// Voice name handed to the phonemizer.
    pub fn phonemizer_voice(&self) -> &str {
        &self.espeak.voice
    }

    /// Default inference scales used when a call does not override them.
    pub fn inference(&self) -> InferenceScales {
        self.inference
    }

    pub fn phoneme_type(&self) -> PhonemeType {
        self.phoneme_type
    }

    pub fn phoneme_id_map(&self) -> &HashMap<String, Vec<i64>> {
        &self.phoneme_id_map
    }

    /// Ids of a single phoneme symbol.
    pub fn phoneme_ids(&self, symbol: &str) -> Option<&[i64]> {
        self.phoneme_id_map.get(symbol).map(Vec::as_slice)
    }

    pub fn phoneme_map(&self) -> &HashMap<String, Vec<String>> {
        &self.phoneme_map
    }

    pub fn num_symbols(&self) -> Option<u32> {
        self.num_symbols
    }

    pub fn num_speakers(&self) -> u32 {
        self.num_speakers
    }

    pub fn speaker_id_map(&self) -> &HashMap<String, i64> {
        &self.speaker_id_map
    }

    pub fn piper_version(&self) -> Option<&str> {
        self.piper_version.as_deref()
    }

    pub fn language(&self) -> Option<&LanguageConfig> {
        self.language.as_ref()
    }

    pub fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref()
    }

    /// Look up a speaker index by name.
    pub fn speaker_id(&self, name: &str) -> Option<i64> {
        self.speaker_id_map.get(name).copied()
    }

    /// Speaker names sorted by their index.
    pub fn speakers(&self) -> Vec<&str> {
        let mut entries: Vec<(&str, i64)> = self
            .speaker_id_map
            .iter()
            .map(|(name, &id)| (name.as_str(), id))
            .collect();
        entries.sort_unstable_by_key(|&(name, id)| (id, name));
        entries.into_iter().map(|(name, _)| name).collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) const MINIMAL: &str = r#"{
        "audio": {"sample_rate": 16000},
        "espeak": {"voice": "en-us"},
        "inference": {"noise_scale": 0.667, "length_scale": 1.0, "noise_w": 0.8},
        "phoneme_id_map": {"^": [1], "a": [5], "_": [0], "$": [2]}
    }"#;

    #[test]
    fn loads_minimal_config_with_defaults() {
        let config = VoiceConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.sample_rate(), 16000);
        assert_eq!(config.phonemizer_voice(), "en-us");
        assert_eq!(config.inference().noise_scale, 0.667);
        assert_eq!(config.inference().length_scale, 1.0);
        assert_eq!(config.inference().noise_w, 0.8);
        assert_eq!(config.num_speakers(), 1);
        assert!(config.speaker_id_map().is_empty());
        assert_eq!(config.phoneme_type(), PhonemeType::Espeak);
        assert_eq!(config.phoneme_ids("a"), Some(&[5][..]));
        assert_eq!(config.phoneme_ids("z"), None);
    }

    #[test]
    fn loads_full_piper_document() {
        let json = r#"{
            "audio": {"sample_rate": 22050, "quality": "medium"},
            "espeak": {"voice": "en-gb"},
            "inference": {"noise_scale": 0.333, "length_scale": 1.1, "noise_w": 0.5},
            "phoneme_type": "espeak",
            "phoneme_map": {},
            "phoneme_id_map": {"^": [1], "$": [2], "_": [0], " ": [3], "a": [14, 15]},
            "num_symbols": 256,
            "num_speakers": 3,
            "speaker_id_map": {"carol": 2, "alice": 0, "bob": 1},
            "piper_version": "1.0.0",
            "language": {"code": "en_GB", "family": "en", "region": "GB"},
            "dataset": "vctk",
            "some_future_key": {"nested": true}
        }"#;
        let config = VoiceConfig::from_json(json).unwrap();
        assert_eq!(config.audio().quality.as_deref(), Some("medium"));
        assert_eq!(config.num_symbols(), Some(256));
        assert_eq!(config.num_speakers(), 3);
        assert_eq!(config.speaker_id("bob"), Some(1));
        assert_eq!(config.speaker_id("dave"), None);
        assert_eq!(config.speakers(), vec!["alice", "bob", "carol"]);
        assert_eq!(config.dataset(), Some("vctk"));
        assert_eq!(config.piper_version(), Some("1.0.0"));
        assert_eq!(config.phoneme_id_map().len(), 5);
        assert_eq!(
            config.language().and_then(|l| l.code.as_deref()),
            Some("en_GB")
        );
    }

    #[test]
    fn reserved_symbols_always_resolve() {
        let config = VoiceConfig::from_json(MINIMAL).unwrap();
        for symbol in [BOS, EOS, PAD] {
            assert!(config.phoneme_ids(symbol).is_some(), "{symbol}");
        }
        let copy = config.clone();
        assert_eq!(copy.phoneme_ids(PAD), Some(&[0][..]));
    }

    #[test]
    fn reads_text_phoneme_type() {
        let json = MINIMAL.replacen('{', r#"{"phoneme_type": "text","#, 1);
        let config = VoiceConfig::from_json(&json).unwrap();
        assert_eq!(config.phoneme_type(), PhonemeType::Text);
    }

    #[test]
    fn missing_section_is_malformed() {
        let json = r#"{
            "audio": {"sample_rate": 16000},
            "inference": {"noise_scale": 0.667, "length_scale": 1.0, "noise_w": 0.8},
            "phoneme_id_map": {"^": [1], "_": [0], "$": [2]}
        }"#;
        let err = VoiceConfig::from_json(json).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)), "{err}");
        assert!(err.to_string().contains("espeak"), "{err}");
    }

    #[test]
    fn mistyped_field_is_malformed() {
        let json = MINIMAL.replace("16000", "\"fast\"");
        assert!(matches!(
            VoiceConfig::from_json(&json),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_invalid_values() {
        for (from, to) in [
            ("16000", "0"),
            ("0.667", "0.0"),
            ("\"noise_w\": 0.8", "\"noise_w\": -1.0"),
            ("\"a\": [5]", "\"a\": []"),
            ("\"a\": [5]", "\"a\": [-5]"),
        ] {
            let json = MINIMAL.replace(from, to);
            assert!(
                matches!(VoiceConfig::from_json(&json), Err(ConfigError::Malformed(_))),
                "{from} -> {to} should be rejected"
            );
        }
    }

    #[test]
    fn each_reserved_symbol_is_required() {
        for (entry, symbol) in [("\"^\": [1], ", "^"), ("\"_\": [0], ", "_"), (", \"$\": [2]", "$")] {
            let json = MINIMAL.replace(entry, "");
            match VoiceConfig::from_json(&json) {
                Err(ConfigError::MissingReservedSymbol(s)) => assert_eq!(s, symbol),
                other => panic!("expected missing {symbol}, got {other:?}"),
            }
        }
    }

    #[test]
    fn load_reads_file_and_reports_missing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = VoiceConfig::load(file.path()).unwrap();
        assert_eq!(config.sample_rate(), 16000);

        let missing = file.path().with_extension("does-not-exist");
        assert!(matches!(
            VoiceConfig::load(&missing),
            Err(ConfigError::Io(_))
        ));
    }
}
