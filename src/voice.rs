//! Piper voice names and on-disk layout.
//!
//! Voices are named `<lang>_<REGION>-<name>-<quality>`, e.g. `en_US-amy-low`.
//! Each voice is an ONNX model plus a JSON config next to it:
//!
//! ```text
//! voices/
//! ├── en_US-amy-low.onnx
//! └── en_US-amy-low.onnx.json
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Hugging Face repository hosting the published Piper voices.
pub const VOICES_REPO: &str = "rhasspy/piper-voices";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Invalid voice name {name:?}: {reason}")]
pub struct VoiceNameError {
    pub name: String,
    pub reason: &'static str,
}

/// A parsed voice name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoiceName {
    /// Locale such as `en_US`.
    pub locale: String,
    /// Speaker or dataset name such as `amy`.
    pub name: String,
    /// Quality tier such as `low` or `medium`.
    pub quality: String,
}

impl VoiceName {
    pub fn parse(voice: &str) -> Result<Self, VoiceNameError> {
        let error = |reason| VoiceNameError {
            name: voice.to_string(),
            reason,
        };

        let fields: Vec<&str> = voice.split('-').collect();
        let [locale, name, quality] = fields.as_slice() else {
            return Err(error("expected <locale>-<name>-<quality>"));
        };
        if locale.is_empty() || name.is_empty() || quality.is_empty() {
            return Err(error("empty component"));
        }
        match locale.split_once('_') {
            Some((lang, region)) if !lang.is_empty() && !region.is_empty() => {}
            _ => return Err(error("locale must look like en_US")),
        }

        Ok(Self {
            locale: locale.to_string(),
            name: name.to_string(),
            quality: quality.to_string(),
        })
    }

    /// Language family, e.g. `en` for `en_US`.
    pub fn language(&self) -> &str {
        self.locale
            .split_once('_')
            .map(|(lang, _)| lang)
            .unwrap_or(&self.locale)
    }

    pub fn model_file_name(&self) -> String {
        format!("{self}.onnx")
    }

    pub fn config_file_name(&self) -> String {
        format!("{self}.onnx.json")
    }

    /// Path of `file_name` inside the voices repository.
    pub fn repo_path(&self, file_name: &str) -> String {
        format!(
            "{}/{}/{}/{}/{file_name}",
            self.language(),
            self.locale,
            self.name,
            self.quality
        )
    }

    /// Download URL of `file_name` on the Hugging Face hub.
    pub fn hub_url(&self, file_name: &str) -> String {
        format!(
            "https://huggingface.co/{VOICES_REPO}/resolve/main/{}",
            self.repo_path(file_name)
        )
    }
}

impl fmt::Display for VoiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.locale, self.name, self.quality)
    }
}

impl FromStr for VoiceName {
    type Err = VoiceNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Model and config paths of a voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceFiles {
    pub model: PathBuf,
    pub config: PathBuf,
}

impl VoiceFiles {
    /// Files of `voice` inside `dir`.
    pub fn in_dir(dir: &Path, voice: &VoiceName) -> Self {
        Self {
            model: dir.join(voice.model_file_name()),
            config: dir.join(voice.config_file_name()),
        }
    }

    /// Files for a model path, with the config at `<model>.json`.
    pub fn for_model(model: &Path) -> Self {
        let mut config = model.as_os_str().to_owned();
        config.push(".json");
        Self {
            model: model.to_path_buf(),
            config: PathBuf::from(config),
        }
    }

    pub fn exists(&self) -> bool {
        self.model.is_file() && self.config.is_file()
    }
}
