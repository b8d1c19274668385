//! Speech synthesis engines.
//!
//! # Available Engines
//!
//! - `sharevox` - variance/embedder/decoder libraries selected by style id.
//!   The pipeline always builds; enable the `onnx` feature (or `cuda` /
//!   `directml`) for the ONNX Runtime backend.

pub mod sharevox;
