//! In-memory runtime and on-disk library layouts for unit tests.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use super::metas::{MANIFEST_FILE, METAS_FILE};
use super::model::{BackendError, ModelStage, HIDDEN_SIZE, UPSAMPLE_FACTOR};
use super::registry::LoadedSessions;
use super::runtime::{
    ExecutionDevice, InferenceRuntime, InferenceSession, NamedTensor, SessionOptions,
    SupportedDevices,
};

/// Leading bytes the fake runtime accepts as a model file.
pub const MODEL_MARKER: &[u8] = b"fake-onnx";

/// Sample value of every waveform sample the fake decoder produces.
pub const FAKE_WAVE_SAMPLE: f32 = 0.25;

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn stage_index(stage: ModelStage) -> usize {
    match stage {
        ModelStage::Variance => 0,
        ModelStage::Embedder => 1,
        ModelStage::Decoder => 2,
    }
}

fn input_len(inputs: &[NamedTensor], name: &str, axis: usize) -> Result<usize, BackendError> {
    inputs
        .iter()
        .find(|t| t.name == name)
        .and_then(|t| t.shape().get(axis).copied())
        .ok_or_else(|| format!("missing input '{name}'").into())
}

enum Behaviour {
    Stage(ModelStage),
    Fail(String),
}

/// Session that answers with deterministic tensors of the right shapes.
pub struct FakeSession {
    behaviour: Behaviour,
    calls: Arc<AtomicUsize>,
}

impl FakeSession {
    pub fn new(stage: ModelStage) -> Self {
        Self {
            behaviour: Behaviour::Stage(stage),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A session whose every call fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            behaviour: Behaviour::Fail(message.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn counted(mut self, calls: Arc<AtomicUsize>) -> Self {
        self.calls = calls;
        self
    }
}

impl InferenceSession for FakeSession {
    fn run(&mut self, inputs: Vec<NamedTensor>) -> Result<Vec<NamedTensor>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let stage = match &self.behaviour {
            Behaviour::Fail(message) => return Err(message.clone().into()),
            Behaviour::Stage(stage) => *stage,
        };

        match stage {
            ModelStage::Variance => {
                let n = input_len(&inputs, "phonemes", 1)?;
                let pitches = (0..n).map(|i| 5.0 + (i % 4) as f32 * 0.1).collect();
                Ok(vec![
                    NamedTensor::float32("pitches", &[1, n, 1], pitches)?,
                    NamedTensor::float32("durations", &[1, n, 1], vec![0.1; n])?,
                ])
            }
            ModelStage::Embedder => {
                let n = input_len(&inputs, "phonemes", 1)?;
                let rows = (0..n * HIDDEN_SIZE)
                    .map(|i| (i / HIDDEN_SIZE) as f32)
                    .collect();
                Ok(vec![NamedTensor::float32(
                    "feature_embedded",
                    &[1, n, HIDDEN_SIZE],
                    rows,
                )?])
            }
            ModelStage::Decoder => {
                let m = input_len(&inputs, "feature_embedded", 1)?;
                let samples = m * UPSAMPLE_FACTOR;
                Ok(vec![NamedTensor::float32(
                    "wave",
                    &[1, samples],
                    vec![FAKE_WAVE_SAMPLE; samples],
                )?])
            }
        }
    }
}

/// A freshly loaded library with working fake sessions.
pub(crate) fn fake_sessions() -> LoadedSessions {
    LoadedSessions {
        variance: Box::new(FakeSession::new(ModelStage::Variance)),
        embedder: Box::new(FakeSession::new(ModelStage::Embedder)),
        decoder: Box::new(FakeSession::new(ModelStage::Decoder)),
    }
}

/// Runtime that records every session it creates and every call made on them.
pub struct FakeRuntime {
    devices: SupportedDevices,
    placements: Mutex<Vec<(ModelStage, ExecutionDevice, usize)>>,
    calls: [Arc<AtomicUsize>; 3],
    failing: Mutex<Vec<ModelStage>>,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Self::with_devices(SupportedDevices::default())
    }

    pub fn with_devices(devices: SupportedDevices) -> Arc<Self> {
        Arc::new(Self {
            devices,
            placements: Mutex::new(Vec::new()),
            calls: Default::default(),
            failing: Mutex::new(Vec::new()),
        })
    }

    /// Sessions created for `stage` from now on fail every call.
    pub fn fail_stage(&self, stage: ModelStage) {
        self.failing.lock().push(stage);
    }

    pub fn sessions_created(&self) -> usize {
        self.placements.lock().len()
    }

    /// `(stage, device, threads)` of every session created, in order.
    pub fn placements(&self) -> Vec<(ModelStage, ExecutionDevice, usize)> {
        self.placements.lock().clone()
    }

    /// Calls made on all sessions of `stage`.
    pub fn calls(&self, stage: ModelStage) -> usize {
        self.calls[stage_index(stage)].load(Ordering::SeqCst)
    }
}

impl InferenceRuntime for FakeRuntime {
    fn supported_devices(&self) -> SupportedDevices {
        self.devices
    }

    fn load_session(
        &self,
        stage: ModelStage,
        model: &[u8],
        options: &SessionOptions,
    ) -> Result<Box<dyn InferenceSession>, BackendError> {
        if !model.starts_with(MODEL_MARKER) {
            return Err("not a model file".into());
        }
        if !self.devices.supports(options.device) {
            return Err(format!("{:?} is not available", options.device).into());
        }
        self.placements
            .lock()
            .push((stage, options.device, options.cpu_num_threads));

        let calls = self.calls[stage_index(stage)].clone();
        let session = if self.failing.lock().contains(&stage) {
            FakeSession::failing(&format!("{stage} session failure"))
        } else {
            FakeSession::new(stage)
        };
        Ok(Box::new(session.counted(calls)))
    }
}

/// A temporary root directory holding a manifest and library folders.
pub struct LibraryLayout {
    dir: TempDir,
    manifest: serde_json::Map<String, serde_json::Value>,
}

impl LibraryLayout {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let layout = Self {
            dir,
            manifest: serde_json::Map::new(),
        };
        layout.write_manifest();
        layout
    }

    /// Add a library declaring one speaker with the given style ids.
    pub fn library(mut self, id: &str, usable: bool, style_ids: &[i64]) -> Self {
        let lib_dir = self.dir.path().join(id);
        std::fs::create_dir_all(&lib_dir).expect("create library dir");

        let styles: Vec<serde_json::Value> = style_ids
            .iter()
            .map(|&style| serde_json::json!({ "name": format!("style-{style}"), "id": style }))
            .collect();
        let metas = serde_json::json!([{
            "name": format!("speaker-{id}"),
            "styles": styles,
            "speaker_uuid": format!("uuid-{id}"),
            "version": "0.1.0",
        }]);
        std::fs::write(lib_dir.join(METAS_FILE), metas.to_string()).expect("write metas");

        for stage in ModelStage::ALL {
            let mut bytes = MODEL_MARKER.to_vec();
            bytes.extend_from_slice(stage.file_name().as_bytes());
            std::fs::write(lib_dir.join(stage.file_name()), bytes).expect("write model");
        }

        self.manifest
            .insert(id.to_string(), serde_json::Value::Bool(usable));
        self.write_manifest();
        self
    }

    fn write_manifest(&self) {
        let manifest = serde_json::Value::Object(self.manifest.clone());
        std::fs::write(self.dir.path().join(MANIFEST_FILE), manifest.to_string())
            .expect("write manifest");
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}
