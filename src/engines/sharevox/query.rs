use serde::{Deserialize, Serialize};

use super::model::DEFAULT_SAMPLING_RATE;

/// A single mora with its phonemes and predicted prosody.
///
/// `consonant` and `consonant_length` are present together or absent together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mora {
    pub text: String,
    pub consonant: Option<String>,
    pub consonant_length: Option<f32>,
    pub vowel: String,
    pub vowel_length: f32,
    pub pitch: f32,
}

impl Mora {
    /// A mora with the given phonemes and zeroed prosody.
    pub fn new(text: impl Into<String>, consonant: Option<&str>, vowel: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            consonant: consonant.map(str::to_string),
            consonant_length: consonant.map(|_| 0.0),
            vowel: vowel.into(),
            vowel_length: 0.0,
            pitch: 0.0,
        }
    }

    /// The silent mora inserted between breath groups.
    pub fn pause() -> Self {
        Self::new("、", None, "pau")
    }

    /// Number of phoneme positions this mora occupies.
    pub fn phoneme_count(&self) -> usize {
        if self.consonant.is_some() {
            2
        } else {
            1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccentPhrase {
    pub moras: Vec<Mora>,
    /// 1-indexed mora at which the pitch falls.
    pub accent: usize,
    pub pause_mora: Option<Mora>,
    #[serde(default)]
    pub is_interrogative: bool,
}

impl AccentPhrase {
    pub fn new(moras: Vec<Mora>, accent: usize) -> Self {
        Self {
            moras,
            accent,
            pause_mora: None,
            is_interrogative: false,
        }
    }
}

/// Output container format. Only WAV is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Wav,
}

/// Accent phrases plus the global synthesis parameters.
///
/// Synthesis never mutates a query; each transform returns new phrases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioQuery {
    #[serde(rename = "accent_phrases")]
    pub accent_phrases: Vec<AccentPhrase>,
    pub speed_scale: f32,
    pub pitch_scale: f32,
    pub intonation_scale: f32,
    pub volume_scale: f32,
    pub pre_phoneme_length: f32,
    pub post_phoneme_length: f32,
    pub output_sampling_rate: u32,
    pub output_stereo: bool,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub kana: String,
}

impl AudioQuery {
    /// A query over `accent_phrases` with default synthesis parameters.
    pub fn new(accent_phrases: Vec<AccentPhrase>) -> Self {
        Self {
            accent_phrases,
            speed_scale: 1.0,
            pitch_scale: 0.0,
            intonation_scale: 1.0,
            volume_scale: 1.0,
            pre_phoneme_length: 0.1,
            post_phoneme_length: 0.1,
            output_sampling_rate: DEFAULT_SAMPLING_RATE,
            output_stereo: false,
            output_format: OutputFormat::Wav,
            kana: String::new(),
        }
    }
}
