use serde::{Deserialize, Serialize};

use crate::synth::SynthesisError;

/// Model-specific controls for speech variability, rate and duration noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceScales {
    pub noise_scale: f32,
    pub length_scale: f32,
    pub noise_w: f32,
}

impl InferenceScales {
    /// Values in the order of the `scales` tensor.
    pub fn to_array(self) -> [f32; 3] {
        [self.noise_scale, self.length_scale, self.noise_w]
    }
}

/// Inputs for one run of the acoustic model.
///
/// | Name            | Shape    | dtype   |
/// |-----------------|----------|---------|
/// | `input`         | `[1, N]` | int64   |
/// | `input_lengths` | `[1]`    | int64   |
/// | `scales`        | `[3]`    | float32 |
/// | `sid`           | `[1]`    | int64, only for multi-speaker voices |
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub ids: Vec<i64>,
    pub length: i64,
    pub scales: [f32; 3],
    pub speaker_id: Option<i64>,
}

impl InferenceRequest {
    /// Package encoded ids, scales and speaker into a request.
    ///
    /// Multi-speaker voices default to speaker 0. Single-speaker voices never
    /// carry a speaker id, since their models have no speaker embedding.
    pub fn assemble(
        ids: Vec<i64>,
        num_speakers: u32,
        speaker_id: Option<i64>,
        scales: InferenceScales,
    ) -> Result<Self, SynthesisError> {
        if ids.is_empty() {
            return Err(SynthesisError::EmptyInput);
        }

        let speaker_id = if num_speakers > 1 {
            Some(speaker_id.unwrap_or(0))
        } else {
            if let Some(id) = speaker_id {
                log::warn!("Voice has a single speaker, ignoring speaker id {id}");
            }
            None
        };

        Ok(Self {
            length: ids.len() as i64,
            ids,
            scales: scales.to_array(),
            speaker_id,
        })
    }

    /// Shape of the `input` tensor.
    pub fn ids_shape(&self) -> [usize; 2] {
        [1, self.ids.len()]
    }
}
