//! ONNX Runtime backend.

use std::borrow::Cow;

use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, DirectMLExecutionProvider, ExecutionProvider,
};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{Session, SessionInputValue};
use ort::value::TensorRef;

use super::model::{BackendError, ModelStage};
use super::runtime::{
    ExecutionDevice, InferenceRuntime, InferenceSession, NamedTensor, SessionOptions,
    SupportedDevices, TensorData,
};

/// [`InferenceRuntime`] backed by ONNX Runtime sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct OnnxRuntime;

impl InferenceRuntime for OnnxRuntime {
    fn supported_devices(&self) -> SupportedDevices {
        SupportedDevices {
            cpu: true,
            cuda: CUDAExecutionProvider::default()
                .is_available()
                .unwrap_or(false),
            dml: DirectMLExecutionProvider::default()
                .is_available()
                .unwrap_or(false),
        }
    }

    fn load_session(
        &self,
        stage: ModelStage,
        model: &[u8],
        options: &SessionOptions,
    ) -> Result<Box<dyn InferenceSession>, BackendError> {
        log::debug!(
            "Creating {stage} session ({:.1} MB) on {:?}",
            model.len() as f64 / 1_048_576.0,
            options.device
        );
        let session = init_session(model, options)?;
        Ok(Box::new(OnnxSession { session }))
    }
}

fn init_session(model: &[u8], options: &SessionOptions) -> Result<Session, BackendError> {
    let mut builder = Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;

    builder = match options.device {
        ExecutionDevice::Cpu => {
            builder.with_execution_providers([CPUExecutionProvider::default().build()])?
        }
        ExecutionDevice::Cuda => builder.with_execution_providers([
            CUDAExecutionProvider::default().build().error_on_failure(),
            CPUExecutionProvider::default().build(),
        ])?,
        // DirectML cannot run with memory patterns or parallel execution.
        ExecutionDevice::DirectMl => builder
            .with_memory_pattern(false)?
            .with_parallel_execution(false)?
            .with_execution_providers([
                DirectMLExecutionProvider::default().build().error_on_failure(),
                CPUExecutionProvider::default().build(),
            ])?,
    };

    if options.cpu_num_threads > 0 {
        builder = builder
            .with_intra_threads(options.cpu_num_threads)?
            .with_inter_threads(options.cpu_num_threads)?;
    }

    Ok(builder.commit_from_memory(model)?)
}

struct OnnxSession {
    session: Session,
}

impl InferenceSession for OnnxSession {
    fn run(&mut self, inputs: Vec<NamedTensor>) -> Result<Vec<NamedTensor>, BackendError> {
        let mut values: Vec<(Cow<'_, str>, SessionInputValue<'_>)> =
            Vec::with_capacity(inputs.len());
        for input in &inputs {
            let value: SessionInputValue<'_> = match &input.data {
                TensorData::Int64(array) => TensorRef::from_array_view(array.view())?.into(),
                TensorData::Float32(array) => TensorRef::from_array_view(array.view())?.into(),
            };
            values.push((Cow::Borrowed(input.name.as_str()), value));
        }

        let outputs = self.session.run(values)?;

        let mut result = Vec::new();
        for (name, value) in outputs.iter() {
            let array = value.try_extract_array::<f32>()?.to_owned();
            result.push(NamedTensor {
                name: name.to_string(),
                data: TensorData::Float32(array),
            });
        }
        Ok(result)
    }
}
