//! Two-pass prosody prediction over the variance stage.
//!
//! The duration pass fills every mora's consonant and vowel lengths. The
//! pitch pass then fills mora pitches, either from a fresh variance call or
//! from pitches the caller already has (the duration pass returns its own).

use super::flatten::{self, EncodedPhrases};
use super::model::{CoreError, ModelStage};
use super::mora_list::is_unvoiced;
use super::query::AccentPhrase;
use super::registry::ModelRegistry;
use super::stages::{self, VarianceOutput};
use super::vocab::SymbolTable;

fn phoneme_total(phrases: &[AccentPhrase]) -> usize {
    phrases
        .iter()
        .map(|phrase| {
            phrase.moras.iter().map(|m| m.phoneme_count()).sum::<usize>()
                + phrase.pause_mora.as_ref().map_or(0, |m| m.phoneme_count())
        })
        .sum()
}

fn check_aligned(phrases: &[AccentPhrase], values: &[f32], what: &str) -> Result<(), CoreError> {
    let expected = phoneme_total(phrases);
    if values.len() != expected {
        return Err(CoreError::inference(
            ModelStage::Variance,
            format!("{} {what} for {expected} phonemes", values.len()),
        ));
    }
    Ok(())
}

/// Copy per-phoneme durations into the consonant and vowel lengths.
pub fn apply_phoneme_lengths(
    phrases: &[AccentPhrase],
    durations: &[f32],
) -> Result<Vec<AccentPhrase>, CoreError> {
    check_aligned(phrases, durations, "durations")?;
    let mut index = 0;
    let mut result = phrases.to_vec();
    for phrase in &mut result {
        for mora in &mut phrase.moras {
            if mora.consonant.is_some() {
                mora.consonant_length = Some(durations[index]);
                index += 1;
            }
            mora.vowel_length = durations[index];
            index += 1;
        }
        if let Some(pause) = &mut phrase.pause_mora {
            pause.vowel_length = durations[index];
            index += 1;
        }
    }
    Ok(result)
}

/// Copy the pitch at each mora's vowel position into the mora.
///
/// Unvoiced vowels and pause morae always get exactly `0.0`.
pub fn apply_mora_pitches(
    phrases: &[AccentPhrase],
    pitches: &[f32],
) -> Result<Vec<AccentPhrase>, CoreError> {
    check_aligned(phrases, pitches, "pitches")?;
    let mut index = 0;
    let mut result = phrases.to_vec();
    for phrase in &mut result {
        for mora in &mut phrase.moras {
            if mora.consonant.is_some() {
                index += 1;
            }
            mora.pitch = if is_unvoiced(&mora.vowel) {
                0.0
            } else {
                pitches[index]
            };
            index += 1;
        }
        if let Some(pause) = &mut phrase.pause_mora {
            pause.pitch = 0.0;
            index += 1;
        }
    }
    Ok(result)
}

/// Runs both prosody passes against one registry and symbol table.
pub struct ProsodyPredictor<'a> {
    registry: &'a ModelRegistry,
    symbols: &'a SymbolTable,
}

impl<'a> ProsodyPredictor<'a> {
    pub fn new(registry: &'a ModelRegistry, symbols: &'a SymbolTable) -> Self {
        Self { registry, symbols }
    }

    fn run_variance(
        &self,
        encoded: &EncodedPhrases,
        speaker_id: i64,
    ) -> Result<VarianceOutput, CoreError> {
        self.registry.with_sessions(speaker_id, |sessions| {
            stages::variance(
                sessions,
                &encoded.phoneme_ids,
                &encoded.accent_ids,
                speaker_id,
            )
        })
    }

    /// Duration pass. Returns the updated phrases and the pass's pitches.
    pub fn predict_durations(
        &self,
        phrases: &[AccentPhrase],
        speaker_id: i64,
    ) -> Result<(Vec<AccentPhrase>, Vec<f32>), CoreError> {
        let encoded = flatten::encode(phrases, self.symbols)?;
        let output = self.run_variance(&encoded, speaker_id)?;
        let phrases = apply_phoneme_lengths(phrases, &output.durations)?;
        Ok((phrases, output.pitches))
    }

    /// Pitch pass. Uses `before_pitches` when given instead of calling the model.
    pub fn predict_pitches(
        &self,
        phrases: &[AccentPhrase],
        speaker_id: i64,
        before_pitches: Option<&[f32]>,
    ) -> Result<Vec<AccentPhrase>, CoreError> {
        match before_pitches {
            Some(pitches) => apply_mora_pitches(phrases, pitches),
            None => {
                let encoded = flatten::encode(phrases, self.symbols)?;
                let output = self.run_variance(&encoded, speaker_id)?;
                apply_mora_pitches(phrases, &output.pitches)
            }
        }
    }

    /// Duration pass followed by a pitch pass that reuses its pitches.
    pub fn replace_mora_data(
        &self,
        phrases: &[AccentPhrase],
        speaker_id: i64,
    ) -> Result<Vec<AccentPhrase>, CoreError> {
        let (phrases, pitches) = self.predict_durations(phrases, speaker_id)?;
        self.predict_pitches(&phrases, speaker_id, Some(&pitches))
    }
}
