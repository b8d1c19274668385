//! Library bundles and the speaker → library mapping.
//!
//! Each usable library is read from disk once at initialization. Its model
//! bytes are either turned into sessions right away or kept until the first
//! load request, after which the bytes are dropped. A bundle's mutex is both
//! the load guard and the borrow point for inference: a session is only
//! reachable while that lock is held for a single call.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::metas::{self, SpeakerMeta};
use super::model::{CoreError, ModelStage};
use super::runtime::{
    ExecutionDevice, InferenceRuntime, InferenceSession, SessionOptions, SupportedDevices,
};
use super::stages;

const GPU_NOT_SUPPORTED: &str = "This library is CPU version. GPU is not supported.";

/// Registry-wide settings fixed at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryOptions {
    pub use_gpu: bool,
    /// `0` keeps the runtime default thread count.
    pub cpu_num_threads: usize,
    pub load_all_models: bool,
}

/// Raw model bytes of one library.
struct ModelBlobs {
    variance: Vec<u8>,
    embedder: Vec<u8>,
    decoder: Vec<u8>,
}

impl ModelBlobs {
    fn read(dir: &Path) -> Result<Self, CoreError> {
        let read = |stage: ModelStage| {
            let path = dir.join(stage.file_name());
            std::fs::read(&path).map_err(|e| {
                CoreError::Manifest(format!("Unable to open model file {}: {e}", path.display()))
            })
        };
        Ok(Self {
            variance: read(ModelStage::Variance)?,
            embedder: read(ModelStage::Embedder)?,
            decoder: read(ModelStage::Decoder)?,
        })
    }
}

/// Active sessions of a loaded library.
pub(crate) struct LoadedSessions {
    pub(crate) variance: Box<dyn InferenceSession>,
    pub(crate) embedder: Box<dyn InferenceSession>,
    pub(crate) decoder: Box<dyn InferenceSession>,
}

enum BundleState {
    Unloaded(ModelBlobs),
    Loaded(LoadedSessions),
}

/// The variance/embedder/decoder triad of one speaker-style group.
pub struct LibraryBundle {
    id: String,
    dir: PathBuf,
    metas: Vec<SpeakerMeta>,
    state: Mutex<BundleState>,
}

impl LibraryBundle {
    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.lock(), BundleState::Loaded(_))
    }
}

/// Owns every library bundle and resolves speakers to them.
pub struct ModelRegistry {
    runtime: Arc<dyn InferenceRuntime>,
    libraries: BTreeMap<String, LibraryBundle>,
    speakers: HashMap<i64, String>,
    decoder_device: ExecutionDevice,
    cpu_num_threads: usize,
}

impl ModelRegistry {
    /// Read the manifest under `root` and every usable library it lists.
    pub fn initialize(
        runtime: Arc<dyn InferenceRuntime>,
        root: &Path,
        options: RegistryOptions,
    ) -> Result<Self, CoreError> {
        let decoder_device = resolve_decoder_device(&runtime.supported_devices(), options.use_gpu)?;
        log::info!("Decoder stage will run on {decoder_device:?}");

        let manifest = metas::load_manifest(root)?;
        let mut libraries = BTreeMap::new();
        let mut speakers = HashMap::new();

        for id in metas::usable_libraries(&manifest) {
            let dir = root.join(id);
            let library_metas = metas::load_metas(&dir)?;
            let blobs = ModelBlobs::read(&dir)?;

            for style_id in metas::style_ids(&library_metas) {
                if let Some(previous) = speakers.insert(style_id, id.to_string()) {
                    if previous != id {
                        log::warn!(
                            "Style ID {style_id} declared by both {previous} and {id}; using {id}"
                        );
                    }
                }
            }

            log::info!(
                "Found library {id} with {} speaker(s)",
                library_metas.len()
            );
            libraries.insert(
                id.to_string(),
                LibraryBundle {
                    id: id.to_string(),
                    dir,
                    metas: library_metas,
                    state: Mutex::new(BundleState::Unloaded(blobs)),
                },
            );
        }

        let registry = Self {
            runtime,
            libraries,
            speakers,
            decoder_device,
            cpu_num_threads: options.cpu_num_threads,
        };

        if options.load_all_models {
            for bundle in registry.libraries.values() {
                registry.load_bundle(bundle)?;
            }
        }

        Ok(registry)
    }

    pub fn decoder_device(&self) -> ExecutionDevice {
        self.decoder_device
    }

    pub fn libraries(&self) -> impl Iterator<Item = &LibraryBundle> {
        self.libraries.values()
    }

    /// Library identifier serving `speaker_id`.
    pub fn library_id(&self, speaker_id: i64) -> Option<&str> {
        self.speakers.get(&speaker_id).map(String::as_str)
    }

    fn bundle(&self, speaker_id: i64) -> Result<&LibraryBundle, CoreError> {
        self.library_id(speaker_id)
            .and_then(|id| self.libraries.get(id))
            .ok_or(CoreError::UnknownSpeaker(speaker_id))
    }

    /// Load the library serving `speaker_id`. Loading twice is a no-op.
    pub fn load_model(&self, speaker_id: i64) -> Result<(), CoreError> {
        let bundle = self.bundle(speaker_id)?;
        self.load_bundle(bundle)
    }

    /// Whether `speaker_id` is served by a loaded library; false when unknown.
    pub fn is_model_loaded(&self, speaker_id: i64) -> bool {
        self.bundle(speaker_id)
            .map(LibraryBundle::is_loaded)
            .unwrap_or(false)
    }

    fn load_bundle(&self, bundle: &LibraryBundle) -> Result<(), CoreError> {
        let mut state = bundle.state.lock();
        let blobs = match &*state {
            BundleState::Loaded(_) => return Ok(()),
            BundleState::Unloaded(blobs) => blobs,
        };

        log::info!("Loading library {}", bundle.id);
        let cpu = SessionOptions {
            device: ExecutionDevice::Cpu,
            cpu_num_threads: self.cpu_num_threads,
        };
        let decoder = SessionOptions {
            device: self.decoder_device,
            ..cpu
        };

        let mut sessions = LoadedSessions {
            variance: self.create_session(bundle, ModelStage::Variance, &blobs.variance, &cpu)?,
            embedder: self.create_session(bundle, ModelStage::Embedder, &blobs.embedder, &cpu)?,
            decoder: self.create_session(bundle, ModelStage::Decoder, &blobs.decoder, &decoder)?,
        };

        if self.decoder_device.is_gpu() {
            if let Err(e) = stages::warm_up_decoder(sessions.decoder.as_mut()) {
                log::warn!("Decoder warm-up for {} failed: {e}", bundle.id);
            }
        }

        *state = BundleState::Loaded(sessions);
        Ok(())
    }

    fn create_session(
        &self,
        bundle: &LibraryBundle,
        stage: ModelStage,
        model: &[u8],
        options: &SessionOptions,
    ) -> Result<Box<dyn InferenceSession>, CoreError> {
        self.runtime
            .load_session(stage, model, options)
            .map_err(|e| CoreError::ModelFormat {
                path: bundle.dir.join(stage.file_name()),
                reason: e.to_string(),
            })
    }

    /// Run `f` against the loaded sessions serving `speaker_id`.
    pub(crate) fn with_sessions<R>(
        &self,
        speaker_id: i64,
        f: impl FnOnce(&mut LoadedSessions) -> Result<R, CoreError>,
    ) -> Result<R, CoreError> {
        let bundle = self.bundle(speaker_id)?;
        let mut state = bundle.state.lock();
        match &mut *state {
            BundleState::Loaded(sessions) => f(sessions),
            BundleState::Unloaded(_) => Err(CoreError::ModelNotLoaded(speaker_id)),
        }
    }

    /// Metadata of every usable library as one JSON array.
    pub fn metas_json(&self) -> String {
        let all: Vec<&SpeakerMeta> = self
            .libraries
            .values()
            .flat_map(|bundle| bundle.metas.iter())
            .collect();
        serde_json::to_string(&all).unwrap_or_else(|_| String::from("[]"))
    }
}

fn resolve_decoder_device(
    supported: &SupportedDevices,
    use_gpu: bool,
) -> Result<ExecutionDevice, CoreError> {
    if !use_gpu {
        return Ok(ExecutionDevice::Cpu);
    }
    let device = ExecutionDevice::preferred_gpu();
    if supported.supports(device) {
        Ok(device)
    } else {
        Err(CoreError::Device(GPU_NOT_SUPPORTED.to_string()))
    }
}
