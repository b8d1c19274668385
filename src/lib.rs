//! # mora-tts
//!
//! A Rust library for Japanese text-to-speech with multi-library
//! variance/embedder/decoder ONNX models.
//!
//! ## Features
//!
//! - **Two-pass prosody**: durations, then pitches, from a variance model
//! - **Lazy model loading**: libraries are loaded on first use per style id
//! - **Kana notation**: synthesize straight from AquesTalk-style kana
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! mora-tts = { version = "2026.10", features = ["onnx"] }
//! ```
//!
//! ```ignore
//! use std::path::PathBuf;
//! use mora_tts::{engines::sharevox::SharevoxEngine, SynthesisEngine};
//!
//! let mut engine = SharevoxEngine::new();
//! engine.load_model(&PathBuf::from("model"))?;
//!
//! let result = engine.synthesize("コンニチワ'", None)?;
//! result.write_wav(&PathBuf::from("output.wav"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engines;

use std::path::Path;

use engines::sharevox::wav::quantize;

/// The result of a synthesis (text-to-speech) operation.
///
/// Contains raw f32 mono samples and their sample rate.
#[derive(Debug)]
pub struct SynthesisResult {
    /// Raw audio samples as f32 values
    pub samples: Vec<f32>,
    /// Sample rate of the audio (48000 for sharevox)
    pub sample_rate: u32,
}

impl SynthesisResult {
    /// Write the audio to a 16-bit PCM WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(quantize(sample, 1.0))?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Common interface for text-to-speech synthesis engines.
///
/// Each engine may have different parameter types for model loading and inference configuration.
pub trait SynthesisEngine {
    /// Parameters for configuring inference behavior (speaker, upspeak, etc.)
    type SynthesisParams;
    /// Parameters for configuring model loading (threads, device, etc.)
    type ModelParams: Default;

    /// Load models from the specified path using default parameters.
    fn load_model(&mut self, model_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.load_model_with_params(model_path, Self::ModelParams::default())
    }

    /// Load models from the specified path with custom parameters.
    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Unload every model and free associated resources.
    fn unload_model(&mut self);

    /// Synthesize speech from the given text.
    fn synthesize(
        &mut self,
        text: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>>;

    /// Synthesize speech from the given text and write to a WAV file.
    fn synthesize_to_file(
        &mut self,
        text: &str,
        wav_path: &Path,
        params: Option<Self::SynthesisParams>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.synthesize(text, params)?.write_wav(wav_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_wav_round_trips_through_hound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let result = SynthesisResult {
            samples: vec![0.0, 0.5, -1.5],
            sample_rate: 48000,
        };
        result.write_wav(&path).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 48000);
        assert_eq!(reader.spec().bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 16384, -32767]);
        assert!((result.duration_secs() - 3.0 / 48000.0).abs() < 1e-12);
    }
}
