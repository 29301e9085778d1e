use std::path::Path;
use std::sync::Mutex;

use ndarray::Array2;
use ort::execution_providers::CPUExecutionProvider;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use crate::config::ConfigError;
use crate::request::InferenceRequest;
use crate::synth::InferenceBackend;

#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("ONNX session lock poisoned by an earlier panic")]
    SessionPoisoned,
    #[error("No output from model")]
    NoOutput,
}

/// ONNX Runtime session for a Piper VITS model.
///
/// `Session::run` needs exclusive access, so concurrent requests against one
/// model are serialised through a mutex.
pub struct PiperModel {
    session: Mutex<Session>,
    has_speaker_input: bool,
}

impl PiperModel {
    /// Load a Piper `.onnx` model.
    pub fn load(onnx_path: &Path, num_threads: Option<usize>) -> Result<Self, ModelError> {
        if !onnx_path.is_file() {
            return Err(ModelError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("No model file at {}", onnx_path.display()),
            )));
        }
        log::info!("Loading Piper model from {}", onnx_path.display());

        let session = init_session(onnx_path, num_threads)?;
        let has_speaker_input = detect_speaker_input(&session);
        log::info!("Detected: has_speaker_input={has_speaker_input}");

        Ok(Self {
            session: Mutex::new(session),
            has_speaker_input,
        })
    }

    /// Whether the graph takes a `sid` input.
    pub fn has_speaker_input(&self) -> bool {
        self.has_speaker_input
    }
}

impl InferenceBackend for PiperModel {
    type Error = ModelError;

    fn run(&self, request: InferenceRequest) -> Result<Vec<f32>, ModelError> {
        let [batch, seq_len] = request.ids_shape();
        let ids = Array2::from_shape_vec((batch, seq_len), request.ids)?;
        let lengths = ndarray::arr1(&[request.length]);
        let scales = ndarray::arr1(&request.scales);

        let speaker_id = match request.speaker_id {
            Some(sid) if !self.has_speaker_input => {
                log::warn!("Model has no speaker input, ignoring speaker id {sid}");
                None
            }
            other => other,
        };

        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::SessionPoisoned)?;

        let outputs = if let Some(sid) = speaker_id {
            let sid_arr = ndarray::arr1(&[sid]);
            let inputs = inputs![
                "input" => TensorRef::from_array_view(ids.view())?,
                "input_lengths" => TensorRef::from_array_view(lengths.view())?,
                "scales" => TensorRef::from_array_view(scales.view())?,
                "sid" => TensorRef::from_array_view(sid_arr.view())?,
            ];
            session.run(inputs)?
        } else {
            let inputs = inputs![
                "input" => TensorRef::from_array_view(ids.view())?,
                "input_lengths" => TensorRef::from_array_view(lengths.view())?,
                "scales" => TensorRef::from_array_view(scales.view())?,
            ];
            session.run(inputs)?
        };

        // Output 0 is the waveform, shaped [1, 1, T].
        let first_output = outputs.iter().next().ok_or(ModelError::NoOutput)?;
        let waveform = first_output.1.try_extract_array::<f32>()?;

        Ok(waveform.iter().copied().collect())
    }
}

fn init_session(onnx_path: &Path, num_threads: Option<usize>) -> Result<Session, ModelError> {
    let providers = vec![CPUExecutionProvider::default().build()];

    let mut builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_execution_providers(providers)?;

    if let Some(threads) = num_threads {
        builder = builder
            .with_intra_threads(threads)?
            .with_inter_threads(threads)?;
    }

    Ok(builder.commit_from_file(onnx_path)?)
}

fn detect_speaker_input(session: &Session) -> bool {
    session.inputs().iter().any(|input| input.name() == "sid")
}
