use std::borrow::Cow;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::config::{PhonemeType, VoiceConfig};
use crate::synth::Phonemizer;

#[derive(thiserror::Error, Debug)]
pub enum PhonemizeError {
    #[error(
        "espeak-ng not found. Install: Linux: `sudo apt-get install espeak-ng`, \
         macOS: `brew install espeak-ng`, Windows: https://espeak-ng.org/download"
    )]
    EspeakNotFound,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Phonemization failed: {0}")]
    Failed(String),
}

/// Phonemizer backed by the `espeak-ng` command line tool.
///
/// Clause punctuation is kept as phoneme symbols and words are separated by
/// a space symbol, which is what Piper voices are trained on.
#[derive(Debug, Clone, Default)]
pub struct EspeakPhonemizer {
    /// espeak-ng binary. `None` runs `espeak-ng` from PATH.
    pub bin_path: Option<PathBuf>,
    /// Directory containing `espeak-ng-data`. `None` uses the built-in default.
    pub data_path: Option<PathBuf>,
}

impl Phonemizer for EspeakPhonemizer {
    type Error = PhonemizeError;

    fn phonemize(&self, text: &str, voice: &str) -> Result<Vec<String>, PhonemizeError> {
        let parts = split_text_parts(text);
        if parts.is_empty() {
            return Ok(Vec::new());
        }

        let text_segments: Vec<&str> = parts
            .iter()
            .filter_map(|part| match part {
                TextPart::Text(segment) => Some(segment.as_str()),
                TextPart::Punct(_) => None,
            })
            .collect();

        let segment_ipa = if text_segments.is_empty() {
            Vec::new()
        } else {
            self.phonemize_segments_batch(&text_segments, voice)?
        };

        let mut phonemes = Vec::new();
        let mut segment_index = 0usize;
        let mut after_punct = false;
        for part in parts {
            match part {
                TextPart::Text(_) => {
                    if let Some(ipa) = segment_ipa.get(segment_index) {
                        if after_punct && !ipa.is_empty() {
                            phonemes.push(" ".to_string());
                        }
                        phonemes.extend(ipa.chars().map(String::from));
                    }
                    segment_index += 1;
                    after_punct = false;
                }
                TextPart::Punct(ch) => {
                    phonemes.push(ch.to_string());
                    after_punct = true;
                }
            }
        }

        Ok(phonemes)
    }
}

impl EspeakPhonemizer {
    fn phonemize_segments_batch(
        &self,
        segments: &[&str],
        voice: &str,
    ) -> Result<Vec<String>, PhonemizeError> {
        let batched_input = segments.join("\n");
        let output = self.run_espeak(&batched_input, voice)?;
        let lines: Vec<&str> = output.lines().collect();

        // espeak-ng should emit one line per input line for stdin mode.
        // If this assumption breaks, fall back to per-segment invocation.
        if lines.len() != segments.len() {
            log::debug!(
                "espeak-ng returned {} lines for {} segments, phonemizing one by one",
                lines.len(),
                segments.len()
            );
            return segments
                .iter()
                .map(|segment| Ok(normalize_ipa(&self.run_espeak(segment, voice)?)))
                .collect();
        }

        Ok(lines.iter().map(|line| normalize_ipa(line)).collect())
    }

    fn run_espeak(&self, input: &str, voice: &str) -> Result<String, PhonemizeError> {
        let bin: &std::path::Path = self
            .bin_path
            .as_deref()
            .unwrap_or_else(|| std::path::Path::new("espeak-ng"));

        let mut command = Command::new(bin);
        command.args(["--ipa", "--stdin", "-q", "-v", voice]);
        if let Some(data_path) = &self.data_path {
            command.arg(format!("--path={}", data_path.display()));
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PhonemizeError::EspeakNotFound
                } else {
                    PhonemizeError::Io(e)
                }
            })?;

        // Without a final newline espeak-ng can drop the last token.
        let payload = canonicalize_espeak_stdin_payload(input);
        let stdin = child.stdin.take();

        // espeak-ng writes IPA while it is still reading, so stdin is fed from
        // its own thread while this one drains stdout and stderr.
        let (output, written) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || -> std::io::Result<()> {
                if let Some(mut stdin) = stdin {
                    stdin.write_all(payload.as_bytes())?;
                }
                Ok(())
            });
            let output = child.wait_with_output();
            let written = writer.join().map_err(|_| {
                PhonemizeError::Failed("espeak-ng stdin writer panicked".to_string())
            });
            (output, written)
        });
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PhonemizeError::Failed(format!(
                "espeak-ng exited with code {:?}: {stderr}",
                output.status.code()
            )));
        }
        written??;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Phonemizer for voices whose phonemes are the characters of the text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPhonemizer;

impl Phonemizer for TextPhonemizer {
    type Error = PhonemizeError;

    fn phonemize(&self, text: &str, _voice: &str) -> Result<Vec<String>, PhonemizeError> {
        Ok(text.chars().map(String::from).collect())
    }
}

/// The phonemizer a voice asks for through its `phoneme_type`.
#[derive(Debug, Clone)]
pub enum VoicePhonemizer {
    Espeak(EspeakPhonemizer),
    Text(TextPhonemizer),
}

impl VoicePhonemizer {
    pub fn for_config(config: &VoiceConfig, espeak: EspeakPhonemizer) -> Self {
        match config.phoneme_type() {
            PhonemeType::Espeak => Self::Espeak(espeak),
            PhonemeType::Text => Self::Text(TextPhonemizer),
        }
    }
}

impl Phonemizer for VoicePhonemizer {
    type Error = PhonemizeError;

    fn phonemize(&self, text: &str, voice: &str) -> Result<Vec<String>, PhonemizeError> {
        match self {
            Self::Espeak(p) => p.phonemize(text, voice),
            Self::Text(p) => p.phonemize(text, voice),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TextPart {
    Text(String),
    Punct(char),
}

fn split_text_parts(text: &str) -> Vec<TextPart> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for (idx, ch) in text.char_indices() {
        let ch_len = ch.len_utf8();
        if let Some(punct) = map_clause_breaker(ch) {
            if !is_numeric_connector_between_digits(text, idx, ch_len, ch) {
                flush_text_part(&mut parts, &mut current);
                parts.push(TextPart::Punct(punct));
                continue;
            }
        }

        if ch.is_whitespace() {
            if !current.is_empty() && !current.ends_with(' ') {
                current.push(' ');
            }
            continue;
        }

        current.push(ch);
    }

    flush_text_part(&mut parts, &mut current);
    parts
}

fn flush_text_part(parts: &mut Vec<TextPart>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        parts.push(TextPart::Text(trimmed.to_string()));
    }
    current.clear();
}

fn map_clause_breaker(ch: char) -> Option<char> {
    match ch {
        '.' | '!' | '?' | ',' | ';' | ':' => Some(ch),
        '\n' | '\r' => Some('.'),
        _ => None,
    }
}

fn is_numeric_connector_between_digits(text: &str, idx: usize, ch_len: usize, ch: char) -> bool {
    if !matches!(ch, '.' | ',') {
        return false;
    }

    let prev = text[..idx].chars().next_back();
    let next = text[idx + ch_len..].chars().next();

    matches!(
        (prev, next),
        (Some(left), Some(right)) if left.is_ascii_digit() && right.is_ascii_digit()
    )
}

fn canonicalize_espeak_stdin_payload(input: &str) -> Cow<'_, str> {
    if input.ends_with('\n') {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!("{input}\n"))
    }
}

/// Join espeak-ng output lines into one IPA string with single spaces.
fn normalize_ipa(ipa: &str) -> String {
    ipa.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::MINIMAL;

    fn espeak_available() -> bool {
        Command::new("espeak-ng").arg("--version").output().is_ok()
    }

    #[test]
    fn splits_text_and_clause_breakers() {
        let parts = split_text_parts("Hello, world. Testing!");
        assert_eq!(
            parts,
            vec![
                TextPart::Text("Hello".to_string()),
                TextPart::Punct(','),
                TextPart::Text("world".to_string()),
                TextPart::Punct('.'),
                TextPart::Text("Testing".to_string()),
                TextPart::Punct('!'),
            ]
        );
    }

    #[test]
    fn keeps_decimal_and_thousands_separators_inside_text() {
        let parts = split_text_parts("Version 2.0 reached 1,000 users.");
        assert_eq!(
            parts,
            vec![
                TextPart::Text("Version 2.0 reached 1,000 users".to_string()),
                TextPart::Punct('.'),
            ]
        );
    }

    #[test]
    fn newlines_end_clauses() {
        let parts = split_text_parts("one\ntwo");
        assert_eq!(
            parts,
            vec![
                TextPart::Text("one".to_string()),
                TextPart::Punct('.'),
                TextPart::Text("two".to_string()),
            ]
        );
    }

    #[test]
    fn blank_text_has_no_parts() {
        assert!(split_text_parts("  \t ").is_empty());
    }

    #[test]
    fn appends_trailing_newline_for_espeak_stdin() {
        assert_eq!(canonicalize_espeak_stdin_payload("America"), "America\n");
        assert_eq!(canonicalize_espeak_stdin_payload("America\n"), "America\n");
    }

    #[test]
    fn normalizes_espeak_whitespace() {
        assert_eq!(normalize_ipa(" həlˈoʊ  wˈɜːld \n"), "həlˈoʊ wˈɜːld");
    }

    #[test]
    fn text_phonemizer_yields_characters() {
        let phonemes = TextPhonemizer.phonemize("añb", "ignored").unwrap();
        assert_eq!(phonemes, vec!["a", "ñ", "b"]);
    }

    #[test]
    fn voice_phonemizer_follows_phoneme_type() {
        let espeak = VoiceConfig::from_json(MINIMAL).unwrap();
        assert!(matches!(
            VoicePhonemizer::for_config(&espeak, EspeakPhonemizer::default()),
            VoicePhonemizer::Espeak(_)
        ));

        let json = MINIMAL.replacen('{', r#"{"phoneme_type": "text","#, 1);
        let text = VoiceConfig::from_json(&json).unwrap();
        let phonemizer = VoicePhonemizer::for_config(&text, EspeakPhonemizer::default());
        assert_eq!(phonemizer.phonemize("ab", "en-us").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn missing_binary_is_reported() {
        let phonemizer = EspeakPhonemizer {
            bin_path: Some(PathBuf::from("/nonexistent/espeak-ng")),
            data_path: None,
        };
        assert!(matches!(
            phonemizer.phonemize("hello", "en-us"),
            Err(PhonemizeError::EspeakNotFound)
        ));
    }

    #[test]
    fn empty_text_does_not_run_espeak() {
        let phonemizer = EspeakPhonemizer {
            bin_path: Some(PathBuf::from("/nonexistent/espeak-ng")),
            data_path: None,
        };
        assert!(phonemizer.phonemize("", "en-us").unwrap().is_empty());
        assert_eq!(phonemizer.phonemize("?!", "en-us").unwrap(), vec!["?", "!"]);
    }

    #[test]
    fn espeak_keeps_clause_breakers_between_words() {
        if !espeak_available() {
            return;
        }

        let phonemes = EspeakPhonemizer::default()
            .phonemize("Hello, world!", "en-us")
            .expect("espeak should succeed");
        let joined: String = phonemes.concat();
        assert!(joined.contains(", "), "{joined}");
        assert!(joined.ends_with('!'), "{joined}");
        assert!(phonemes.iter().all(|p| p.chars().count() == 1));
    }

    /// Stand-in espeak-ng binary running `body` as a shell script.
    #[cfg(unix)]
    fn fake_espeak(dir: &std::path::Path, body: &str) -> EspeakPhonemizer {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("espeak-ng");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        EspeakPhonemizer {
            bin_path: Some(path),
            data_path: None,
        }
    }

    #[cfg(unix)]
    #[test]
    fn clause_breakers_are_merged_with_a_space_after() {
        let dir = tempfile::tempdir().unwrap();
        let phonemizer = fake_espeak(dir.path(), "exec cat");

        let phonemes = phonemizer.phonemize("Hello, world!", "en-us").unwrap();
        let expected: Vec<String> = "Hello, world!".chars().map(String::from).collect();
        assert_eq!(phonemes, expected);
        assert_eq!(phonemes[5], ",");
        assert_eq!(phonemes[6], " ");
    }

    #[cfg(unix)]
    #[test]
    fn long_input_does_not_block_on_full_pipes() {
        let dir = tempfile::tempdir().unwrap();
        let phonemizer = fake_espeak(dir.path(), "exec cat");
        let text = "word ".repeat(80_000);

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(phonemizer.phonemize(&text, "en-us"));
        });
        let phonemes = rx
            .recv_timeout(std::time::Duration::from_secs(30))
            .expect("phonemize blocked on a full pipe")
            .unwrap();

        assert_eq!(phonemes.concat(), "word ".repeat(80_000).trim_end());
    }

    #[cfg(unix)]
    #[test]
    fn early_exit_reports_espeak_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let phonemizer = fake_espeak(dir.path(), "echo 'unknown voice' >&2\nexit 1");
        let text = "word ".repeat(80_000);

        match phonemizer.phonemize(&text, "xx") {
            Err(PhonemizeError::Failed(message)) => {
                assert!(message.contains("unknown voice"), "{message}")
            }
            other => panic!("expected espeak-ng failure, got {other:?}"),
        }
    }
}
