//! Flattening accent phrases into the phoneme and accent-context streams
//! consumed by the variance and embedder stages.
//!
//! Every mora contributes one phoneme position per phoneme (consonant, then
//! vowel) and a pause mora contributes one more. The accent stream is built
//! with exactly the same number of positions so the two id sequences, and
//! the pitch/duration arrays the variance stage returns, stay index-aligned.

use super::model::CoreError;
use super::query::{AccentPhrase, Mora};
use super::vocab::SymbolTable;

const ACCENT_HOLD: &str = "_";
const ACCENT_OPEN: &str = "[";
const ACCENT_CLOSE: &str = "]";
const PHRASE_END: &str = "#";
const INTERROGATIVE_END: &str = "?";

/// Flattened morae with their id streams.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedPhrases {
    pub moras: Vec<Mora>,
    pub phoneme_ids: Vec<i64>,
    pub accent_ids: Vec<i64>,
}

/// All morae in phrase order, each phrase followed by its pause mora.
pub fn to_flatten_moras(accent_phrases: &[AccentPhrase]) -> Vec<Mora> {
    accent_phrases
        .iter()
        .flat_map(|phrase| phrase.moras.iter().chain(phrase.pause_mora.iter()))
        .cloned()
        .collect()
}

/// Consonant (when present) then vowel for every mora.
pub fn phoneme_symbols(moras: &[Mora]) -> Vec<&str> {
    let mut symbols = Vec::with_capacity(moras.len() * 2);
    for mora in moras {
        if let Some(consonant) = &mora.consonant {
            symbols.push(consonant.as_str());
        }
        symbols.push(mora.vowel.as_str());
    }
    symbols
}

/// Accent-context symbols, one per phoneme position.
pub fn accent_symbols(accent_phrases: &[AccentPhrase]) -> Vec<&'static str> {
    let mut symbols = Vec::new();
    for phrase in accent_phrases {
        let start = symbols.len();
        let mora_count = phrase.moras.len();
        for (i, mora) in phrase.moras.iter().enumerate() {
            if mora.consonant.is_some() {
                symbols.push(ACCENT_HOLD);
            }
            let boundary = if i + 1 == phrase.accent && mora_count != phrase.accent {
                ACCENT_CLOSE
            } else if i == 0 {
                ACCENT_OPEN
            } else {
                ACCENT_HOLD
            };
            symbols.push(boundary);
        }
        if phrase.pause_mora.is_some() {
            symbols.push(ACCENT_HOLD);
        }
        // An empty phrase without a pause contributes nothing to mark.
        if symbols.len() > start {
            if let Some(last) = symbols.last_mut() {
                *last = if phrase.is_interrogative {
                    INTERROGATIVE_END
                } else {
                    PHRASE_END
                };
            }
        }
    }
    symbols
}

/// Flatten `accent_phrases` and map both symbol streams to model ids.
pub fn encode(
    accent_phrases: &[AccentPhrase],
    symbols: &SymbolTable,
) -> Result<EncodedPhrases, CoreError> {
    let moras = to_flatten_moras(accent_phrases);
    let phoneme_ids = symbols.phoneme_ids(&phoneme_symbols(&moras))?;
    let accent_ids = symbols.accent_ids(&accent_symbols(accent_phrases))?;
    debug_assert_eq!(phoneme_ids.len(), accent_ids.len());
    Ok(EncodedPhrases {
        moras,
        phoneme_ids,
        accent_ids,
    })
}
