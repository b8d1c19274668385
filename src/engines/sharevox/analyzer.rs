//! Boundary to the linguistic front-end.
//!
//! A [`TextAnalyzer`] turns raw text into an [`Utterance`]: breath groups of
//! accent phrases of morae, with phoneme symbols but no prosody. The
//! analyzer itself (dictionary, label extraction) lives outside this crate.

use super::model::CoreError;
use super::mora_list::mora_to_text;
use super::query::{AccentPhrase, Mora};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtteranceMora {
    pub consonant: Option<String>,
    pub vowel: String,
}

impl UtteranceMora {
    pub fn new(consonant: Option<&str>, vowel: &str) -> Self {
        Self {
            consonant: consonant.map(str::to_string),
            vowel: vowel.to_string(),
        }
    }

    /// Kana for this mora's phonemes.
    fn text(&self) -> String {
        let mut phonemes = self.consonant.clone().unwrap_or_default();
        phonemes.push_str(&self.vowel);
        let phonemes = phonemes.to_lowercase();
        if phonemes == "n" {
            mora_to_text("N")
        } else {
            mora_to_text(&phonemes)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtterancePhrase {
    pub moras: Vec<UtteranceMora>,
    pub accent: usize,
    pub is_interrogative: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BreathGroup {
    pub accent_phrases: Vec<UtterancePhrase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Utterance {
    pub breath_groups: Vec<BreathGroup>,
}

/// Front-end producing an [`Utterance`] from text.
pub trait TextAnalyzer {
    fn analyze(&self, text: &str) -> Result<Utterance, CoreError>;
}

/// Accent phrases with zeroed prosody for `utterance`.
///
/// The last phrase of every breath group except the final one gets a pause
/// mora.
pub fn utterance_to_accent_phrases(utterance: &Utterance) -> Vec<AccentPhrase> {
    let group_count = utterance.breath_groups.len();
    let mut phrases = Vec::new();

    for (i, group) in utterance.breath_groups.iter().enumerate() {
        let phrase_count = group.accent_phrases.len();
        for (j, phrase) in group.accent_phrases.iter().enumerate() {
            let moras = phrase
                .moras
                .iter()
                .map(|mora| Mora::new(mora.text(), mora.consonant.as_deref(), mora.vowel.as_str()))
                .collect();

            let mut accent_phrase = AccentPhrase::new(moras, phrase.accent);
            accent_phrase.is_interrogative = phrase.is_interrogative;
            if i + 1 != group_count && j + 1 == phrase_count {
                accent_phrase.pause_mora = Some(Mora::pause());
            }
            phrases.push(accent_phrase);
        }
    }
    phrases
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phrase(moras: &[(Option<&str>, &str)], accent: usize) -> UtterancePhrase {
        UtterancePhrase {
            moras: moras
                .iter()
                .map(|&(consonant, vowel)| UtteranceMora::new(consonant, vowel))
                .collect(),
            accent,
            is_interrogative: false,
        }
    }

    #[test]
    fn pause_only_between_breath_groups() {
        let utterance = Utterance {
            breath_groups: vec![
                BreathGroup {
                    accent_phrases: vec![
                        phrase(&[(Some("k"), "o"), (None, "N")], 1),
                        phrase(&[(Some("n"), "i")], 1),
                    ],
                },
                BreathGroup {
                    accent_phrases: vec![phrase(&[(Some("sh"), "I"), (Some("t"), "a")], 2)],
                },
            ],
        };

        let phrases = utterance_to_accent_phrases(&utterance);
        assert_eq!(phrases.len(), 3);
        assert!(phrases[0].pause_mora.is_none());
        assert_eq!(phrases[1].pause_mora, Some(Mora::pause()));
        assert!(phrases[2].pause_mora.is_none());

        assert_eq!(phrases[0].moras[0].text, "コ");
        assert_eq!(phrases[0].moras[1].text, "ン");
        assert_eq!(phrases[0].moras[1].vowel, "N");
        assert_eq!(phrases[2].moras[0].text, "シ");
        assert_eq!(phrases[2].moras[0].vowel, "I");
        assert_eq!(phrases[2].moras[0].consonant_length, Some(0.0));
        assert_eq!(phrases[2].accent, 2);
    }

    #[test]
    fn empty_utterance_has_no_phrases() {
        assert!(utterance_to_accent_phrases(&Utterance::default()).is_empty());
    }
}
