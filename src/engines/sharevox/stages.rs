//! Named-tensor calls for the variance, embedder and decoder stages.
//!
//! | Stage    | Inputs                                                   | Output                         |
//! |----------|----------------------------------------------------------|--------------------------------|
//! | variance | `phonemes` i64 `[1,N]`, `accents` i64 `[1,N]`, `speaker` i64 `[1]` | `pitches`, `durations` f32 `[1,N,1]` |
//! | embedder | `phonemes` i64 `[1,N]`, `pitches` f32 `[1,N]`, `speaker` i64 `[1]` | `feature_embedded` f32 `[1,N,H]` |
//! | decoder  | `feature_embedded` f32 `[1,M,H]`                          | `wave` f32 `[1,M*256]`         |

use ndarray::{Array2, ArrayD, Axis};

use super::length_regulator::length_regulate;
use super::model::{CoreError, ModelStage, HIDDEN_SIZE};
use super::registry::LoadedSessions;
use super::runtime::{run_for_output, InferenceSession, NamedTensor, TensorData};

/// Frames pushed through the decoder once after loading it on an accelerator.
const WARM_UP_FRAMES: usize = 500;

/// Per-phoneme-position output of the variance stage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VarianceOutput {
    pub pitches: Vec<f32>,
    pub durations: Vec<f32>,
}

fn speaker_tensor(speaker_id: i64) -> Result<NamedTensor, CoreError> {
    NamedTensor::int64("speaker", &[1], vec![speaker_id])
}

fn per_phoneme(
    stage: ModelStage,
    name: &str,
    array: ArrayD<f32>,
    n: usize,
) -> Result<Vec<f32>, CoreError> {
    if array.len() != n {
        return Err(CoreError::inference(
            stage,
            format!("output '{name}' has {} values, expected {n}", array.len()),
        ));
    }
    Ok(array.iter().copied().collect())
}

pub(crate) fn variance(
    sessions: &mut LoadedSessions,
    phonemes: &[i64],
    accents: &[i64],
    speaker_id: i64,
) -> Result<VarianceOutput, CoreError> {
    let n = phonemes.len();
    if n != accents.len() {
        return Err(CoreError::inference(
            ModelStage::Variance,
            format!("{n} phonemes but {} accents", accents.len()),
        ));
    }
    if n == 0 {
        return Ok(VarianceOutput::default());
    }

    let inputs = vec![
        NamedTensor::int64("phonemes", &[1, n], phonemes.to_vec())?,
        NamedTensor::int64("accents", &[1, n], accents.to_vec())?,
        speaker_tensor(speaker_id)?,
    ];
    let outputs = sessions
        .variance
        .run(inputs)
        .map_err(|e| CoreError::inference(ModelStage::Variance, e))?;

    let mut pitches = None;
    let mut durations = None;
    for output in outputs {
        let Some(array) = output.as_f32().cloned() else {
            continue;
        };
        match output.name.as_str() {
            "pitches" => pitches = Some(per_phoneme(ModelStage::Variance, "pitches", array, n)?),
            "durations" => {
                durations = Some(per_phoneme(ModelStage::Variance, "durations", array, n)?)
            }
            _ => {}
        }
    }

    match (pitches, durations) {
        (Some(pitches), Some(durations)) => {
            log::debug!("variance: {n} phonemes for speaker {speaker_id}");
            Ok(VarianceOutput { pitches, durations })
        }
        _ => Err(CoreError::inference(
            ModelStage::Variance,
            "missing 'pitches' or 'durations' output",
        )),
    }
}

/// Per-phoneme feature rows, shape `(N, H)`.
pub(crate) fn embed(
    session: &mut dyn InferenceSession,
    phonemes: &[i64],
    pitches: &[f32],
    speaker_id: i64,
) -> Result<Array2<f32>, CoreError> {
    let n = phonemes.len();
    let inputs = vec![
        NamedTensor::int64("phonemes", &[1, n], phonemes.to_vec())?,
        NamedTensor::float32("pitches", &[1, n], pitches.to_vec())?,
        speaker_tensor(speaker_id)?,
    ];
    let embedded = run_for_output(session, ModelStage::Embedder, inputs, "feature_embedded")?;

    let hidden = embedded.shape().last().copied().unwrap_or(0);
    if hidden == 0 || embedded.len() != n * hidden {
        return Err(CoreError::inference(
            ModelStage::Embedder,
            format!(
                "feature_embedded has shape {:?}, expected [1, {n}, H]",
                embedded.shape()
            ),
        ));
    }
    let flat: Vec<f32> = embedded.iter().copied().collect();
    Ok(Array2::from_shape_vec((n, hidden), flat)?)
}

/// Waveform samples for per-frame feature rows of shape `(M, H)`.
pub(crate) fn decode(
    session: &mut dyn InferenceSession,
    frames: Array2<f32>,
) -> Result<Vec<f32>, CoreError> {
    let (m, hidden) = frames.dim();
    if m == 0 {
        return Ok(Vec::new());
    }
    let input = NamedTensor {
        name: "feature_embedded".to_string(),
        data: TensorData::Float32(frames.insert_axis(Axis(0)).into_dyn()),
    };
    let wave = run_for_output(session, ModelStage::Decoder, vec![input], "wave")?;
    log::debug!("decoder: {m} frames x {hidden} -> {} samples", wave.len());
    Ok(wave.iter().copied().collect())
}

/// Embed, length-regulate and decode one phoneme sequence.
pub(crate) fn decode_forward(
    sessions: &mut LoadedSessions,
    phonemes: &[i64],
    pitches: &[f32],
    durations: &[f32],
    speaker_id: i64,
) -> Result<Vec<f32>, CoreError> {
    let n = phonemes.len();
    if pitches.len() != n || durations.len() != n {
        return Err(CoreError::inference(
            ModelStage::Embedder,
            format!(
                "{n} phonemes but {} pitches and {} durations",
                pitches.len(),
                durations.len()
            ),
        ));
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    let embedded = embed(sessions.embedder.as_mut(), phonemes, pitches, speaker_id)?;
    let regulated = length_regulate(embedded.view(), durations)?;
    decode(sessions.decoder.as_mut(), regulated)
}

/// Run the decoder once on silence so an accelerator reserves its memory.
pub(crate) fn warm_up_decoder(session: &mut dyn InferenceSession) -> Result<(), CoreError> {
    let frames = Array2::<f32>::zeros((WARM_UP_FRAMES, HIDDEN_SIZE));
    decode(session, frames).map(|_| ())
}
