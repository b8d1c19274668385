//! Multi-library text-to-speech over variance, embedder and decoder models.
//!
//! Each library bundles three ONNX models serving a group of speaker
//! styles. A request flows through:
//!
//! 1. [`flatten`]: accent phrases to phoneme and accent-context id streams.
//! 2. [`prosody`]: variance model for durations, then pitches.
//! 3. [`intonation`]: pitch shift, intonation spread and interrogative upspeak.
//! 4. [`stages`]: embedder, [`length_regulator`], then decoder.
//! 5. [`wav`]: volume, clipping and RIFF/WAVE serialization.
//!
//! # Model Directory Layout
//!
//! ```text
//! model/
//! ├── libraries.json              # {"<library-uuid>": true, ...}
//! ├── symbols.json                # optional phoneme/accent tables
//! └── <library-uuid>/
//!     ├── metas.json              # speakers and their style ids
//!     ├── variance_model.onnx
//!     ├── embedder_model.onnx
//!     └── decoder_model.onnx
//! ```
//!
//! # Examples
//!
//! ```ignore
//! use mora_tts::engines::sharevox::{SharevoxEngine, SharevoxModelParamsBuilder};
//! use std::path::Path;
//!
//! let mut engine = SharevoxEngine::new();
//! let params = SharevoxModelParamsBuilder::default()
//!     .cpu_num_threads(4usize)
//!     .build()?;
//! engine.initialize(Path::new("model"), params)?;
//!
//! let phrases = mora_tts::engines::sharevox::parse_kana("コンニチワ'")?;
//! let phrases = engine.replace_mora_data(&phrases, 0)?;
//! let mut query = engine.create_audio_query(phrases);
//! query.speed_scale = 1.2;
//! let wav = engine.synthesis_wave_format(&query, 0, true)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod analyzer;
pub mod engine;
pub mod flatten;
pub mod intonation;
pub mod kana;
pub mod length_regulator;
pub mod metas;
pub mod model;
pub mod mora_list;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod prosody;
pub mod query;
pub mod registry;
pub mod runtime;
pub mod stages;
pub mod vocab;
pub mod wav;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use analyzer::{TextAnalyzer, Utterance};
pub use engine::{
    SharevoxEngine, SharevoxInferenceParams, SharevoxModelParams, SharevoxModelParamsBuilder,
};
pub use kana::{create_kana, parse_kana};
pub use model::CoreError;
#[cfg(feature = "onnx")]
pub use onnx::OnnxRuntime;
pub use query::{AccentPhrase, AudioQuery, Mora};
pub use runtime::{InferenceRuntime, InferenceSession, SupportedDevices};
