//! Kana mora table and phoneme classes.

/// Vowel phonemes that never carry pitch.
pub const UNVOICED_MORA_PHONEMES: &[&str] = &["A", "I", "U", "E", "O", "cl", "pau"];

/// `(kana, consonant, vowel)` for every mora the kana notation accepts.
/// Longer kana come first so a greedy prefix match picks `キャ` over `キ`.
pub const MORA_LIST: &[(&str, &str, &str)] = &[
    ("ヴォ", "v", "o"),
    ("ヴェ", "v", "e"),
    ("ヴィ", "v", "i"),
    ("ヴァ", "v", "a"),
    ("リョ", "ry", "o"),
    ("リュ", "ry", "u"),
    ("リャ", "ry", "a"),
    ("リェ", "ry", "e"),
    ("ミョ", "my", "o"),
    ("ミュ", "my", "u"),
    ("ミャ", "my", "a"),
    ("ミェ", "my", "e"),
    ("フォ", "f", "o"),
    ("フェ", "f", "e"),
    ("フィ", "f", "i"),
    ("ファ", "f", "a"),
    ("ピョ", "py", "o"),
    ("ピュ", "py", "u"),
    ("ピャ", "py", "a"),
    ("ピェ", "py", "e"),
    ("ビョ", "by", "o"),
    ("ビュ", "by", "u"),
    ("ビャ", "by", "a"),
    ("ビェ", "by", "e"),
    ("ヒョ", "hy", "o"),
    ("ヒュ", "hy", "u"),
    ("ヒャ", "hy", "a"),
    ("ヒェ", "hy", "e"),
    ("ニョ", "ny", "o"),
    ("ニュ", "ny", "u"),
    ("ニャ", "ny", "a"),
    ("ニェ", "ny", "e"),
    ("ドゥ", "d", "u"),
    ("トゥ", "t", "u"),
    ("デョ", "dy", "o"),
    ("デュ", "dy", "u"),
    ("デャ", "dy", "a"),
    ("ディ", "d", "i"),
    ("テョ", "ty", "o"),
    ("テュ", "ty", "u"),
    ("テャ", "ty", "a"),
    ("ティ", "t", "i"),
    ("ツォ", "ts", "o"),
    ("ツェ", "ts", "e"),
    ("ツィ", "ts", "i"),
    ("ツァ", "ts", "a"),
    ("チョ", "ch", "o"),
    ("チュ", "ch", "u"),
    ("チャ", "ch", "a"),
    ("チェ", "ch", "e"),
    ("ズィ", "z", "i"),
    ("スィ", "s", "i"),
    ("ジョ", "j", "o"),
    ("ジュ", "j", "u"),
    ("ジャ", "j", "a"),
    ("ジェ", "j", "e"),
    ("ショ", "sh", "o"),
    ("シュ", "sh", "u"),
    ("シャ", "sh", "a"),
    ("シェ", "sh", "e"),
    ("グヮ", "gw", "a"),
    ("クヮ", "kw", "a"),
    ("ギョ", "gy", "o"),
    ("ギュ", "gy", "u"),
    ("ギャ", "gy", "a"),
    ("ギェ", "gy", "e"),
    ("キョ", "ky", "o"),
    ("キュ", "ky", "u"),
    ("キャ", "ky", "a"),
    ("キェ", "ky", "e"),
    ("ウォ", "w", "o"),
    ("ウェ", "w", "e"),
    ("ウィ", "w", "i"),
    ("イェ", "y", "e"),
    ("ヴ", "v", "u"),
    ("ン", "", "N"),
    ("ワ", "w", "a"),
    ("ロ", "r", "o"),
    ("レ", "r", "e"),
    ("ル", "r", "u"),
    ("リ", "r", "i"),
    ("ラ", "r", "a"),
    ("ヨ", "y", "o"),
    ("ユ", "y", "u"),
    ("ヤ", "y", "a"),
    ("モ", "m", "o"),
    ("メ", "m", "e"),
    ("ム", "m", "u"),
    ("ミ", "m", "i"),
    ("マ", "m", "a"),
    ("ポ", "p", "o"),
    ("ボ", "b", "o"),
    ("ホ", "h", "o"),
    ("ペ", "p", "e"),
    ("ベ", "b", "e"),
    ("ヘ", "h", "e"),
    ("プ", "p", "u"),
    ("ブ", "b", "u"),
    ("フ", "f", "u"),
    ("ピ", "p", "i"),
    ("ビ", "b", "i"),
    ("ヒ", "h", "i"),
    ("パ", "p", "a"),
    ("バ", "b", "a"),
    ("ハ", "h", "a"),
    ("ノ", "n", "o"),
    ("ネ", "n", "e"),
    ("ヌ", "n", "u"),
    ("ニ", "n", "i"),
    ("ナ", "n", "a"),
    ("ド", "d", "o"),
    ("ト", "t", "o"),
    ("デ", "d", "e"),
    ("テ", "t", "e"),
    ("ツ", "ts", "u"),
    ("ッ", "", "cl"),
    ("チ", "ch", "i"),
    ("ダ", "d", "a"),
    ("タ", "t", "a"),
    ("ゾ", "z", "o"),
    ("ソ", "s", "o"),
    ("ゼ", "z", "e"),
    ("セ", "s", "e"),
    ("ズ", "z", "u"),
    ("ス", "s", "u"),
    ("ジ", "j", "i"),
    ("シ", "sh", "i"),
    ("ザ", "z", "a"),
    ("サ", "s", "a"),
    ("ゴ", "g", "o"),
    ("コ", "k", "o"),
    ("ゲ", "g", "e"),
    ("ケ", "k", "e"),
    ("グ", "g", "u"),
    ("ク", "k", "u"),
    ("ギ", "g", "i"),
    ("キ", "k", "i"),
    ("ガ", "g", "a"),
    ("カ", "k", "a"),
    ("オ", "", "o"),
    ("エ", "", "e"),
    ("ウ", "", "u"),
    ("イ", "", "i"),
    ("ア", "", "a"),
];

pub fn is_unvoiced(vowel: &str) -> bool {
    UNVOICED_MORA_PHONEMES.contains(&vowel)
}

/// Kana for a phoneme string such as `"kya"` or `"N"`.
///
/// Unvoiced vowels are matched by their voiced counterpart. Unknown
/// strings are returned unchanged.
pub fn mora_to_text(phonemes: &str) -> String {
    let normalized = if phonemes == "N" || phonemes == "cl" {
        phonemes.to_string()
    } else {
        phonemes.to_lowercase()
    };
    MORA_LIST
        .iter()
        .find(|(_, consonant, vowel)| {
            normalized.len() == consonant.len() + vowel.len()
                && normalized.starts_with(consonant)
                && normalized.ends_with(vowel)
        })
        .map(|(kana, _, _)| kana.to_string())
        .unwrap_or(normalized)
}

/// Longest kana mora at the start of `text`, with its byte length.
pub fn match_kana_prefix(
    text: &str,
) -> Option<(&'static str, Option<&'static str>, &'static str, usize)> {
    MORA_LIST
        .iter()
        .find(|(kana, _, _)| text.starts_with(kana))
        .map(|&(kana, consonant, vowel)| {
            let consonant = (!consonant.is_empty()).then_some(consonant);
            (kana, consonant, vowel, kana.len())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_phonemes_to_kana() {
        assert_eq!(mora_to_text("ka"), "カ");
        assert_eq!(mora_to_text("kya"), "キャ");
        assert_eq!(mora_to_text("N"), "ン");
        assert_eq!(mora_to_text("cl"), "ッ");
        assert_eq!(mora_to_text("a"), "ア");
        assert_eq!(mora_to_text("A"), "ア");
        assert_eq!(mora_to_text("shI"), "シ");
    }

    #[test]
    fn unknown_phonemes_fall_back_to_input() {
        assert_eq!(mora_to_text("xq"), "xq");
    }

    #[test]
    fn greedy_prefix_prefers_two_character_kana() {
        let (kana, consonant, vowel, len) = match_kana_prefix("キャク").unwrap();
        assert_eq!((kana, consonant, vowel), ("キャ", Some("ky"), "a"));
        assert_eq!(len, "キャ".len());

        let (kana, consonant, vowel, _) = match_kana_prefix("アイ").unwrap();
        assert_eq!((kana, consonant, vowel), ("ア", None, "a"));
        assert!(match_kana_prefix("'").is_none());
    }

    #[test]
    fn unvoiced_set_includes_pause_and_closure() {
        for v in ["A", "I", "U", "E", "O", "cl", "pau"] {
            assert!(is_unvoiced(v));
        }
        assert!(!is_unvoiced("a"));
        assert!(!is_unvoiced("N"));
    }
}
