//! Query-level pitch and timing transforms applied before decoding.

use super::mora_list::mora_to_text;
use super::query::{AccentPhrase, AudioQuery, Mora};

/// Vowel length of a synthesized upspeak mora, in seconds.
const UPSPEAK_LENGTH: f32 = 0.15;
/// Pitch added on top of the last mora for an upspeak mora.
const UPSPEAK_PITCH_DELTA: f32 = 0.3;
/// Highest pitch an upspeak mora may reach.
const UPSPEAK_MAX_PITCH: f32 = 6.5;

/// Global scales from an [`AudioQuery`] that shape the decoder inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleParams {
    pub pitch_scale: f32,
    pub intonation_scale: f32,
    pub speed_scale: f32,
}

impl Default for ScaleParams {
    fn default() -> Self {
        Self {
            pitch_scale: 0.0,
            intonation_scale: 1.0,
            speed_scale: 1.0,
        }
    }
}

impl From<&AudioQuery> for ScaleParams {
    fn from(query: &AudioQuery) -> Self {
        Self {
            pitch_scale: query.pitch_scale,
            intonation_scale: query.intonation_scale,
            speed_scale: query.speed_scale,
        }
    }
}

/// Per-phoneme pitch and duration arrays fed to the embedder and decoder.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecoderInputs {
    pub pitches: Vec<f32>,
    pub durations: Vec<f32>,
}

/// The rising mora appended after `last` in an interrogative phrase.
pub fn make_interrogative_mora(last: &Mora) -> Mora {
    Mora {
        text: mora_to_text(&last.vowel),
        consonant: None,
        consonant_length: None,
        vowel: last.vowel.clone(),
        vowel_length: UPSPEAK_LENGTH,
        pitch: (last.pitch + UPSPEAK_PITCH_DELTA).min(UPSPEAK_MAX_PITCH),
    }
}

/// Append an upspeak mora to every interrogative phrase whose last mora is voiced.
pub fn adjust_interrogative_accent_phrases(phrases: &[AccentPhrase]) -> Vec<AccentPhrase> {
    phrases
        .iter()
        .map(|phrase| {
            let mut phrase = phrase.clone();
            if phrase.is_interrogative {
                if let Some(last) = phrase.moras.last() {
                    if last.pitch != 0.0 {
                        let upspeak = make_interrogative_mora(last);
                        phrase.moras.push(upspeak);
                    }
                }
            }
            phrase
        })
        .collect()
}

/// Expand flattened morae into per-phoneme pitches and durations.
///
/// A consonant shares its mora's pitch. Pitches are shifted by
/// `2^pitch_scale`, then voiced entries are spread around their mean by
/// `intonation_scale`. With no voiced entry the spread step is skipped.
/// Durations are divided by `speed_scale`; a non-positive speed is ignored.
pub fn decoder_inputs(moras: &[Mora], params: ScaleParams) -> DecoderInputs {
    let shift = 2f32.powf(params.pitch_scale);
    let speed = if params.speed_scale > 0.0 {
        params.speed_scale
    } else {
        log::warn!(
            "Ignoring non-positive speed scale {}",
            params.speed_scale
        );
        1.0
    };

    let mut inputs = DecoderInputs::default();
    for mora in moras {
        let pitch = mora.pitch * shift;
        if mora.consonant.is_some() {
            inputs.pitches.push(pitch);
            inputs
                .durations
                .push(mora.consonant_length.unwrap_or(0.0) / speed);
        }
        inputs.pitches.push(pitch);
        inputs.durations.push(mora.vowel_length / speed);
    }

    let (sum, count) = inputs
        .pitches
        .iter()
        .filter(|&&p| p > 0.0)
        .fold((0.0f32, 0usize), |(sum, count), &p| (sum + p, count + 1));
    let mean = sum / count as f32;
    // exact identity at the default scale
    if !mean.is_nan() && params.intonation_scale != 1.0 {
        for pitch in inputs.pitches.iter_mut().filter(|p| **p > 0.0) {
            *pitch = (*pitch - mean) * params.intonation_scale + mean;
        }
    }
    inputs
}
