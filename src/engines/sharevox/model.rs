use std::fmt;
use std::path::PathBuf;

/// Sample rate of the raw waveform produced by the decoder stage.
pub const DEFAULT_SAMPLING_RATE: u32 = 48000;

/// Width of one embedded phoneme feature row.
pub const HIDDEN_SIZE: usize = 256;

/// Waveform samples produced by the decoder per regulated feature frame.
pub const UPSAMPLE_FACTOR: usize = 256;

/// Feature frames per second of speech (`48000 / 256`).
pub const FRAME_RATE: f32 = DEFAULT_SAMPLING_RATE as f32 / UPSAMPLE_FACTOR as f32;

/// Boxed error raised by an inference backend during a tensor call.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// One of the three sub-models that make up a library bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelStage {
    Variance,
    Embedder,
    Decoder,
}

impl ModelStage {
    pub const ALL: [ModelStage; 3] = [
        ModelStage::Variance,
        ModelStage::Embedder,
        ModelStage::Decoder,
    ];

    /// File name of the stage's model inside a library directory.
    pub fn file_name(self) -> &'static str {
        match self {
            ModelStage::Variance => "variance_model.onnx",
            ModelStage::Embedder => "embedder_model.onnx",
            ModelStage::Decoder => "decoder_model.onnx",
        }
    }
}

impl fmt::Display for ModelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelStage::Variance => "variance",
            ModelStage::Embedder => "embedder",
            ModelStage::Decoder => "decoder",
        };
        f.write_str(name)
    }
}

/// Which symbol dictionary a lookup failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Phoneme,
    Accent,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Phoneme => f.write_str("phoneme"),
            SymbolKind::Accent => f.write_str("accent"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("Call initialize() first.")]
    NotInitialized,
    #[error("Unable to read library manifest or metas: {0}")]
    Manifest(String),
    #[error("Invalid model file {}: {reason}", path.display())]
    ModelFormat { path: PathBuf, reason: String },
    #[error("{0}")]
    Device(String),
    #[error("Unknown style ID: {0}")]
    UnknownSpeaker(i64),
    #[error("Model for style ID {0} is not loaded. Call load_model() first.")]
    ModelNotLoaded(i64),
    #[error("ONNX raise exception in {stage} stage: {source}")]
    Inference {
        stage: ModelStage,
        #[source]
        source: BackendError,
    },
    #[error("Unknown {kind} symbol: {symbol:?}")]
    UnknownSymbol { kind: SymbolKind, symbol: String },
    #[error("Invalid kana {text:?}: {reason}")]
    KanaParse { text: String, reason: String },
    #[error("{what} {value} is out of range")]
    OutOfRange { what: &'static str, value: f32 },
    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl CoreError {
    pub(crate) fn inference(stage: ModelStage, source: impl Into<BackendError>) -> Self {
        CoreError::Inference {
            stage,
            source: source.into(),
        }
    }
}
