//! Inference capability boundary.
//!
//! The pipeline never touches an inference engine directly. A runtime turns
//! model bytes into sessions, and a session runs one named-tensor call at a
//! time. The ONNX Runtime implementation lives in [`super::onnx`].

use ndarray::{ArrayD, IxDyn};
use serde::Serialize;

use super::model::{BackendError, CoreError, ModelStage};

/// Element data of a tensor crossing the inference boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    Int64(ArrayD<i64>),
    Float32(ArrayD<f32>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedTensor {
    pub name: String,
    pub data: TensorData,
}

impl NamedTensor {
    pub fn int64(name: &str, shape: &[usize], values: Vec<i64>) -> Result<Self, CoreError> {
        Ok(Self {
            name: name.to_string(),
            data: TensorData::Int64(ArrayD::from_shape_vec(IxDyn(shape), values)?),
        })
    }

    pub fn float32(name: &str, shape: &[usize], values: Vec<f32>) -> Result<Self, CoreError> {
        Ok(Self {
            name: name.to_string(),
            data: TensorData::Float32(ArrayD::from_shape_vec(IxDyn(shape), values)?),
        })
    }

    pub fn shape(&self) -> &[usize] {
        match &self.data {
            TensorData::Int64(a) => a.shape(),
            TensorData::Float32(a) => a.shape(),
        }
    }

    pub fn as_f32(&self) -> Option<&ArrayD<f32>> {
        match &self.data {
            TensorData::Float32(a) => Some(a),
            TensorData::Int64(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<&ArrayD<i64>> {
        match &self.data {
            TensorData::Int64(a) => Some(a),
            TensorData::Float32(_) => None,
        }
    }
}

/// Backend a session executes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionDevice {
    #[default]
    Cpu,
    Cuda,
    DirectMl,
}

impl ExecutionDevice {
    /// The accelerator this build targets when a GPU is requested.
    pub fn preferred_gpu() -> Self {
        if cfg!(feature = "directml") {
            ExecutionDevice::DirectMl
        } else {
            ExecutionDevice::Cuda
        }
    }

    pub fn is_gpu(self) -> bool {
        self != ExecutionDevice::Cpu
    }
}

/// Execution backends available in the current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupportedDevices {
    pub cpu: bool,
    pub cuda: bool,
    pub dml: bool,
}

impl Default for SupportedDevices {
    fn default() -> Self {
        Self {
            cpu: true,
            cuda: false,
            dml: false,
        }
    }
}

impl SupportedDevices {
    pub fn supports(&self, device: ExecutionDevice) -> bool {
        match device {
            ExecutionDevice::Cpu => self.cpu,
            ExecutionDevice::Cuda => self.cuda,
            ExecutionDevice::DirectMl => self.dml,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Per-session configuration fixed at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub device: ExecutionDevice,
    /// Intra/inter-op thread count; `0` keeps the runtime default.
    pub cpu_num_threads: usize,
}

/// A loaded model that accepts named tensors and returns named tensors.
pub trait InferenceSession: Send {
    fn run(&mut self, inputs: Vec<NamedTensor>) -> Result<Vec<NamedTensor>, BackendError>;
}

/// Creates sessions from raw model bytes and reports device capabilities.
pub trait InferenceRuntime: Send + Sync {
    fn supported_devices(&self) -> SupportedDevices;

    /// Fails when `model` is not a loadable model or the device cannot host it.
    fn load_session(
        &self,
        stage: ModelStage,
        model: &[u8],
        options: &SessionOptions,
    ) -> Result<Box<dyn InferenceSession>, BackendError>;
}

/// Run `session` and pick the output called `name`.
pub(crate) fn run_for_output(
    session: &mut dyn InferenceSession,
    stage: ModelStage,
    inputs: Vec<NamedTensor>,
    name: &str,
) -> Result<ArrayD<f32>, CoreError> {
    let outputs = session
        .run(inputs)
        .map_err(|e| CoreError::inference(stage, e))?;
    let output = outputs
        .into_iter()
        .find(|t| t.name == name)
        .ok_or_else(|| CoreError::inference(stage, format!("missing output tensor '{name}'")))?;
    match output.data {
        TensorData::Float32(array) => Ok(array),
        TensorData::Int64(_) => Err(CoreError::inference(
            stage,
            format!("output tensor '{name}' is not float32"),
        )),
    }
}
