//! Float waveform to 16-bit PCM WAV conversion.

use std::io::Cursor;
use std::path::Path;

/// Lower bound for the normalisation peak, keeps near-silent input finite.
pub const DEFAULT_PEAK_FLOOR: f32 = 0.01;

/// Largest magnitude a normalised sample may take.
const PCM_PEAK: f32 = i16::MAX as f32;

/// A mono 16-bit PCM WAV file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmAudio {
    bytes: Vec<u8>,
    sample_rate: u32,
    num_samples: usize,
}

impl PcmAudio {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.num_samples as f64 / self.sample_rate as f64
    }

    /// Write the WAV bytes to `path`.
    pub fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, &self.bytes)
    }

    /// Decode the PCM samples back out of the container.
    pub fn decode_samples(&self) -> Result<Vec<i16>, hound::Error> {
        let reader = hound::WavReader::new(Cursor::new(self.bytes.as_slice()))?;
        reader.into_samples::<i16>().collect()
    }
}

/// Peak-normalise `raw` and quantise it to 16-bit samples.
///
/// The peak is at least `peak_floor`, so silence maps to zeros instead of NaN.
/// Samples are clipped to `[-32767, 32767]` and truncated toward zero.
pub fn quantize(raw: &[f32], peak_floor: f32) -> Vec<i16> {
    let peak = raw.iter().fold(peak_floor, |peak, s| peak.max(s.abs()));
    let gain = PCM_PEAK / peak;
    raw.iter()
        .map(|&s| (s * gain).clamp(-PCM_PEAK, PCM_PEAK) as i16)
        .collect()
}

/// Frame 16-bit samples as a mono PCM WAV container.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<PcmAudio, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    Ok(PcmAudio {
        bytes: cursor.into_inner(),
        sample_rate,
        num_samples: samples.len(),
    })
}

/// Convert a raw model waveform into a WAV file with the default peak floor.
///
/// Sample conversion cannot fail; framing only fails if the data outgrows
/// the 4 GiB RIFF size limit.
pub fn to_pcm_wav(raw: &[f32], sample_rate: u32) -> Result<PcmAudio, hound::Error> {
    encode_wav(&quantize(raw, DEFAULT_PEAK_FLOOR), sample_rate)
}
