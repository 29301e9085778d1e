use crate::config::VoiceConfig;

/// Begin-of-sequence symbol.
pub const BOS: &str = "^";
/// End-of-sequence symbol.
pub const EOS: &str = "$";
/// Padding symbol inserted after every mapped phoneme.
pub const PAD: &str = "_";

/// Map phoneme symbols to model token ids.
///
/// Every mapped symbol (BOS included) is followed by the PAD ids, and the EOS
/// ids close the sequence with no trailing pad. The acoustic model was trained
/// on exactly this interleaving. Symbols missing from the map contribute no ids
/// and are only reported through the log.
pub fn encode<S: AsRef<str>>(phonemes: &[S], config: &VoiceConfig) -> Vec<i64> {
    // present in every validated config
    let pad = config.phoneme_ids(PAD).unwrap_or_default();
    let eos = config.phoneme_ids(EOS).unwrap_or_default();

    let mut ids = Vec::with_capacity(phonemes.len() * 2 + eos.len());
    for phoneme in phonemes {
        let phoneme = phoneme.as_ref();
        match config.phoneme_ids(phoneme) {
            Some(mapped) => {
                ids.extend_from_slice(mapped);
                ids.extend_from_slice(pad);
            }
            None => log::warn!("No id found for phoneme {phoneme:?}, skipping"),
        }
    }
    ids.extend_from_slice(eos);
    ids
}
