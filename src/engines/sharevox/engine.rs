use std::path::Path;
use std::sync::Arc;

use derive_builder::Builder;

use crate::{SynthesisEngine, SynthesisResult};

use super::analyzer::{utterance_to_accent_phrases, TextAnalyzer};
use super::flatten;
use super::intonation::{adjust_interrogative_accent_phrases, decoder_inputs, ScaleParams};
use super::kana::{create_kana, parse_kana};
use super::model::{CoreError, DEFAULT_SAMPLING_RATE};
use super::prosody::ProsodyPredictor;
use super::query::{AccentPhrase, AudioQuery};
use super::registry::{ModelRegistry, RegistryOptions};
use super::runtime::{InferenceRuntime, SupportedDevices};
use super::stages::{self, VarianceOutput};
use super::vocab::SymbolTable;
use super::wav;

/// Parameters for initializing the model registry.
#[derive(Debug, Clone, Default, Builder)]
#[builder(default)]
pub struct SharevoxModelParams {
    /// Place the decoder stage on the build's GPU backend.
    pub use_gpu: bool,
    /// Intra/inter-op threads per session. `0` uses the runtime default.
    pub cpu_num_threads: usize,
    /// Load every usable library during initialization instead of on first use.
    pub load_all_models: bool,
}

/// Parameters for a synthesis request through [`SynthesisEngine`].
#[derive(Debug, Clone)]
pub struct SharevoxInferenceParams {
    /// Style id to synthesize with.
    pub speaker_id: i64,
    /// Append a rising mora to voiced interrogative phrases.
    pub enable_interrogative_upspeak: bool,
}

impl Default for SharevoxInferenceParams {
    fn default() -> Self {
        Self {
            speaker_id: 0,
            enable_interrogative_upspeak: true,
        }
    }
}

struct Synthesizer {
    registry: ModelRegistry,
    symbols: SymbolTable,
}

impl Synthesizer {
    fn prosody(&self) -> ProsodyPredictor<'_> {
        ProsodyPredictor::new(&self.registry, &self.symbols)
    }
}

/// Multi-library variance/embedder/decoder text-to-speech engine.
///
/// ```ignore
/// use mora_tts::engines::sharevox::{SharevoxEngine, SharevoxModelParams};
/// use std::path::Path;
///
/// let mut engine = SharevoxEngine::new();
/// engine.initialize(Path::new("model"), SharevoxModelParams::default())?;
/// let wav = engine.tts_from_kana("コンニチワ'", 0)?;
/// std::fs::write("out.wav", wav)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct SharevoxEngine {
    runtime: Arc<dyn InferenceRuntime>,
    core: Option<Synthesizer>,
}

#[cfg(feature = "onnx")]
impl Default for SharevoxEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SharevoxEngine {
    /// Engine backed by ONNX Runtime.
    #[cfg(feature = "onnx")]
    pub fn new() -> Self {
        Self::with_runtime(Arc::new(super::onnx::OnnxRuntime))
    }

    pub fn with_runtime(runtime: Arc<dyn InferenceRuntime>) -> Self {
        Self {
            runtime,
            core: None,
        }
    }

    /// Read the libraries under `root_dir`. Replaces any previous state;
    /// on failure the engine is left uninitialized.
    pub fn initialize(
        &mut self,
        root_dir: &Path,
        params: SharevoxModelParams,
    ) -> Result<(), CoreError> {
        self.finalize();
        let symbols = SymbolTable::load_or_default(root_dir)?;
        let registry = ModelRegistry::initialize(
            self.runtime.clone(),
            root_dir,
            RegistryOptions {
                use_gpu: params.use_gpu,
                cpu_num_threads: params.cpu_num_threads,
                load_all_models: params.load_all_models,
            },
        )?;
        log::info!(
            "Initialized {} library(ies) from {}",
            registry.libraries().count(),
            root_dir.display()
        );
        self.core = Some(Synthesizer { registry, symbols });
        Ok(())
    }

    /// Drop every session and return to the uninitialized state.
    pub fn finalize(&mut self) {
        if self.core.take().is_some() {
            log::info!("Finalized synthesis engine");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.core.is_some()
    }

    fn core(&self) -> Result<&Synthesizer, CoreError> {
        self.core.as_ref().ok_or(CoreError::NotInitialized)
    }

    pub fn load_model(&self, speaker_id: i64) -> Result<(), CoreError> {
        self.core()?.registry.load_model(speaker_id)
    }

    /// False when uninitialized or the speaker is unknown.
    pub fn is_model_loaded(&self, speaker_id: i64) -> bool {
        self.core
            .as_ref()
            .is_some_and(|core| core.registry.is_model_loaded(speaker_id))
    }

    /// Speaker metadata of every usable library as a JSON array.
    pub fn metas(&self) -> Result<String, CoreError> {
        Ok(self.core()?.registry.metas_json())
    }

    pub fn supported_devices(&self) -> SupportedDevices {
        self.runtime.supported_devices()
    }

    /// Raw variance call. The speaker's library must already be loaded.
    pub fn variance_forward(
        &self,
        phonemes: &[i64],
        accents: &[i64],
        speaker_id: i64,
    ) -> Result<VarianceOutput, CoreError> {
        self.core()?.registry.with_sessions(speaker_id, |sessions| {
            stages::variance(sessions, phonemes, accents, speaker_id)
        })
    }

    /// Raw embed/regulate/decode call. The speaker's library must already be loaded.
    pub fn decode_forward(
        &self,
        phonemes: &[i64],
        pitches: &[f32],
        durations: &[f32],
        speaker_id: i64,
    ) -> Result<Vec<f32>, CoreError> {
        self.core()?.registry.with_sessions(speaker_id, |sessions| {
            stages::decode_forward(sessions, phonemes, pitches, durations, speaker_id)
        })
    }

    fn loaded_core(&self, speaker_id: i64) -> Result<&Synthesizer, CoreError> {
        let core = self.core()?;
        core.registry.load_model(speaker_id)?;
        Ok(core)
    }

    /// Analyze `text` and predict prosody for the resulting phrases.
    pub fn create_accent_phrases(
        &self,
        text: &str,
        speaker_id: i64,
        analyzer: &dyn TextAnalyzer,
    ) -> Result<Vec<AccentPhrase>, CoreError> {
        self.core()?;
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let utterance = analyzer.analyze(text)?;
        let phrases = utterance_to_accent_phrases(&utterance);
        if phrases.is_empty() {
            return Ok(phrases);
        }
        self.replace_mora_data(&phrases, speaker_id)
    }

    /// Fill durations, then pitches, from one variance pass.
    pub fn replace_mora_data(
        &self,
        phrases: &[AccentPhrase],
        speaker_id: i64,
    ) -> Result<Vec<AccentPhrase>, CoreError> {
        self.loaded_core(speaker_id)?
            .prosody()
            .replace_mora_data(phrases, speaker_id)
    }

    /// Fill consonant and vowel lengths only.
    pub fn replace_phoneme_length(
        &self,
        phrases: &[AccentPhrase],
        speaker_id: i64,
    ) -> Result<Vec<AccentPhrase>, CoreError> {
        let (phrases, _) = self
            .loaded_core(speaker_id)?
            .prosody()
            .predict_durations(phrases, speaker_id)?;
        Ok(phrases)
    }

    /// Fill mora pitches only, keeping the given lengths.
    pub fn replace_mora_pitch(
        &self,
        phrases: &[AccentPhrase],
        speaker_id: i64,
    ) -> Result<Vec<AccentPhrase>, CoreError> {
        self.loaded_core(speaker_id)?
            .prosody()
            .predict_pitches(phrases, speaker_id, None)
    }

    /// Query over `phrases` with default parameters and matching kana.
    pub fn create_audio_query(&self, phrases: Vec<AccentPhrase>) -> AudioQuery {
        let kana = create_kana(&phrases);
        AudioQuery {
            kana,
            ..AudioQuery::new(phrases)
        }
    }

    /// Decoder waveform for `query` at the internal rate, silence included.
    pub fn synthesis(
        &self,
        query: &AudioQuery,
        speaker_id: i64,
        enable_interrogative_upspeak: bool,
    ) -> Result<Vec<f32>, CoreError> {
        let core = self.loaded_core(speaker_id)?;

        let phrases = if enable_interrogative_upspeak {
            adjust_interrogative_accent_phrases(&query.accent_phrases)
        } else {
            query.accent_phrases.clone()
        };
        let encoded = flatten::encode(&phrases, &core.symbols)?;
        let inputs = decoder_inputs(&encoded.moras, ScaleParams::from(query));

        let wave = core.registry.with_sessions(speaker_id, |sessions| {
            stages::decode_forward(
                sessions,
                &encoded.phoneme_ids,
                &inputs.pitches,
                &inputs.durations,
                speaker_id,
            )
        })?;
        log::debug!(
            "Synthesized {} phonemes into {} samples",
            encoded.phoneme_ids.len(),
            wave.len()
        );
        wav::pad_silence(
            &wave,
            query.pre_phoneme_length,
            query.post_phoneme_length,
        )
    }

    /// [`Self::synthesis`] serialized as a RIFF/WAVE buffer.
    pub fn synthesis_wave_format(
        &self,
        query: &AudioQuery,
        speaker_id: i64,
        enable_interrogative_upspeak: bool,
    ) -> Result<Vec<u8>, CoreError> {
        let wave = self.synthesis(query, speaker_id, enable_interrogative_upspeak)?;
        wav::encode_wav(
            &wave,
            query.volume_scale,
            query.output_sampling_rate,
            query.output_stereo,
        )
    }

    /// WAV bytes for kana notation, using default query parameters.
    pub fn tts_from_kana(&self, kana: &str, speaker_id: i64) -> Result<Vec<u8>, CoreError> {
        self.core()?;
        let phrases = parse_kana(kana)?;
        let phrases = self.replace_mora_data(&phrases, speaker_id)?;
        let query = self.create_audio_query(phrases);
        self.synthesis_wave_format(&query, speaker_id, true)
    }

    /// WAV bytes for text, analyzed by `analyzer`.
    pub fn tts(
        &self,
        text: &str,
        speaker_id: i64,
        analyzer: &dyn TextAnalyzer,
    ) -> Result<Vec<u8>, CoreError> {
        let phrases = self.create_accent_phrases(text, speaker_id, analyzer)?;
        let query = self.create_audio_query(phrases);
        self.synthesis_wave_format(&query, speaker_id, true)
    }
}

impl Drop for SharevoxEngine {
    fn drop(&mut self) {
        self.finalize();
    }
}

impl SynthesisEngine for SharevoxEngine {
    type SynthesisParams = SharevoxInferenceParams;
    type ModelParams = SharevoxModelParams;

    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.initialize(model_path, params)?;
        Ok(())
    }

    fn unload_model(&mut self) {
        self.finalize();
    }

    /// `text` is kana notation.
    fn synthesize(
        &mut self,
        text: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>> {
        let p = params.unwrap_or_default();
        let phrases = parse_kana(text)?;
        let phrases = self.replace_mora_data(&phrases, p.speaker_id)?;
        let query = self.create_audio_query(phrases);
        let samples = self.synthesis(&query, p.speaker_id, p.enable_interrogative_upspeak)?;

        Ok(SynthesisResult {
            samples,
            sample_rate: DEFAULT_SAMPLING_RATE,
        })
    }
}
