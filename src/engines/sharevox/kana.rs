//! AquesTalk-style kana notation.
//!
//! ```text
//! コンニチワ'/_シ'タ、キョ'ウワ？
//! ```
//!
//! `'` follows the accented mora, `_` makes the next mora's vowel unvoiced,
//! `/` joins two phrases and `、` joins them with a pause. A trailing `？`
//! marks the phrase interrogative. Every phrase needs exactly one accent.

use super::model::CoreError;
use super::mora_list::match_kana_prefix;
use super::query::{AccentPhrase, Mora};

const ACCENT_MARK: char = '\'';
const UNVOICE_MARK: char = '_';
const PHRASE_DELIMITER: char = '/';
const PAUSE_DELIMITER: char = '、';
const INTERROGATIVE_MARK: char = '？';

const VOICED_VOWELS: &[&str] = &["a", "i", "u", "e", "o"];
const UNVOICED_VOWELS: &[&str] = &["A", "I", "U", "E", "O"];

fn parse_phrase(segment: &str) -> Result<AccentPhrase, String> {
    let (body, is_interrogative) = match segment.strip_suffix(INTERROGATIVE_MARK) {
        Some(body) => (body, true),
        None => (segment, false),
    };

    let mut moras: Vec<Mora> = Vec::new();
    let mut accent = None;
    let mut rest = body;
    while let Some(c) = rest.chars().next() {
        if c == ACCENT_MARK {
            if moras.is_empty() {
                return Err("accent mark before the first mora".to_string());
            }
            if accent.is_some() {
                return Err("more than one accent mark in a phrase".to_string());
            }
            accent = Some(moras.len());
            rest = &rest[c.len_utf8()..];
            continue;
        }

        let unvoiced = c == UNVOICE_MARK;
        if unvoiced {
            rest = &rest[c.len_utf8()..];
        }
        let (kana, consonant, vowel, len) =
            match_kana_prefix(rest).ok_or_else(|| format!("unknown mora at {rest:?}"))?;
        let vowel = if unvoiced {
            if !VOICED_VOWELS.contains(&vowel) {
                return Err(format!("{kana} cannot be unvoiced"));
            }
            vowel.to_uppercase()
        } else {
            vowel.to_string()
        };
        moras.push(Mora::new(kana, consonant, vowel));
        rest = &rest[len..];
    }

    if moras.is_empty() {
        return Err("empty accent phrase".to_string());
    }
    let accent = accent.ok_or_else(|| "accent mark missing".to_string())?;
    let mut phrase = AccentPhrase::new(moras, accent);
    phrase.is_interrogative = is_interrogative;
    Ok(phrase)
}

/// Parse kana notation into accent phrases with zeroed prosody.
///
/// Empty input yields no phrases.
pub fn parse_kana(text: &str) -> Result<Vec<AccentPhrase>, CoreError> {
    let mut phrases = Vec::new();
    if text.is_empty() {
        return Ok(phrases);
    }

    let mut rest = text;
    loop {
        let delimiter = rest
            .char_indices()
            .find(|&(_, c)| c == PHRASE_DELIMITER || c == PAUSE_DELIMITER);
        let segment = delimiter.map_or(rest, |(i, _)| &rest[..i]);

        let mut phrase = parse_phrase(segment).map_err(|reason| CoreError::KanaParse {
            text: text.to_string(),
            reason,
        })?;

        match delimiter {
            Some((i, c)) => {
                if c == PAUSE_DELIMITER {
                    phrase.pause_mora = Some(Mora::pause());
                }
                phrases.push(phrase);
                rest = &rest[i + c.len_utf8()..];
            }
            None => {
                phrases.push(phrase);
                break;
            }
        }
    }
    Ok(phrases)
}

/// Render accent phrases back to kana notation.
pub fn create_kana(phrases: &[AccentPhrase]) -> String {
    let mut text = String::new();
    for (index, phrase) in phrases.iter().enumerate() {
        for (i, mora) in phrase.moras.iter().enumerate() {
            if UNVOICED_VOWELS.contains(&mora.vowel.as_str()) {
                text.push(UNVOICE_MARK);
            }
            text.push_str(&mora.text);
            if i + 1 == phrase.accent {
                text.push(ACCENT_MARK);
            }
        }
        if phrase.is_interrogative {
            text.push(INTERROGATIVE_MARK);
        }
        if index + 1 < phrases.len() {
            text.push(if phrase.pause_mora.is_some() {
                PAUSE_DELIMITER
            } else {
                PHRASE_DELIMITER
            });
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_phrases_accents_and_pauses() {
        let phrases = parse_kana("コンニチワ'/_シ'タ、キョ'ウワ？").unwrap();
        assert_eq!(phrases.len(), 3);

        assert_eq!(phrases[0].moras.len(), 5);
        assert_eq!(phrases[0].accent, 5);
        assert!(phrases[0].pause_mora.is_none());
        assert_eq!(phrases[0].moras[1].vowel, "N");
        assert_eq!(phrases[0].moras[3].consonant.as_deref(), Some("ch"));

        let shita = &phrases[1];
        assert_eq!(shita.accent, 1);
        assert_eq!(shita.moras[0].vowel, "I");
        assert_eq!(shita.moras[0].consonant_length, Some(0.0));
        assert_eq!(shita.pause_mora, Some(Mora::pause()));

        let kyou = &phrases[2];
        assert!(kyou.is_interrogative);
        assert_eq!(kyou.moras[0].text, "キョ");
        assert_eq!(kyou.moras[0].consonant.as_deref(), Some("ky"));
        assert_eq!(kyou.accent, 1);
    }

    #[test]
    fn renders_what_it_parses() {
        for kana in ["コンニチワ'/_シ'タ、キョ'ウワ？", "ア'", "テ'_スト、デ'ス"] {
            assert_eq!(create_kana(&parse_kana(kana).unwrap()), kana);
        }
    }

    #[test]
    fn empty_input_has_no_phrases() {
        assert!(parse_kana("").unwrap().is_empty());
    }

    #[test]
    fn malformed_notation_is_rejected() {
        for bad in [
            "アイウ",
            "'アイ",
            "ア'イ'",
            "ア'/",
            "ア'//イ'",
            "_ン'",
            "アabc'",
            "？",
        ] {
            match parse_kana(bad) {
                Err(CoreError::KanaParse { text, .. }) => assert_eq!(text, bad),
                other => panic!("{bad:?} parsed as {other:?}"),
            }
        }
    }
}
