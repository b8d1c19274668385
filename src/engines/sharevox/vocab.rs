use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::model::{CoreError, SymbolKind};

/// Phoneme symbols in model id order.
const PHONEME_SYMBOLS: &[&str] = &[
    "pau", "A", "E", "I", "N", "O", "U", "a", "b", "by", "ch", "cl", "d", "dy", "e", "f", "g",
    "gw", "gy", "h", "hy", "i", "j", "k", "kw", "ky", "m", "my", "n", "ny", "o", "p", "py", "r",
    "ry", "s", "sh", "t", "ts", "ty", "u", "v", "w", "y", "z",
];

/// Accent-context symbols in model id order.
const ACCENT_SYMBOLS: &[&str] = &["_", "[", "]", "?", "#"];

#[derive(Debug, Deserialize)]
struct SymbolsFile {
    phonemes: Vec<String>,
    accents: Vec<String>,
}

/// Maps phoneme and accent symbols to the integer ids the models consume.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    phonemes: HashMap<String, i64>,
    accents: HashMap<String, i64>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::hardcoded()
    }
}

impl SymbolTable {
    /// Built-in tables; a symbol's id is its position in the list.
    pub fn hardcoded() -> Self {
        Self::from_lists(
            PHONEME_SYMBOLS.iter().map(|s| s.to_string()),
            ACCENT_SYMBOLS.iter().map(|s| s.to_string()),
        )
    }

    /// Load the tables from a `symbols.json` file.
    ///
    /// The file must contain `"phonemes"` and `"accents"` arrays of strings.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        let file: SymbolsFile = serde_json::from_str(&content)
            .map_err(|e| CoreError::Manifest(format!("{}: {e}", path.display())))?;
        if file.phonemes.is_empty() || file.accents.is_empty() {
            return Err(CoreError::Manifest(format!(
                "{}: symbol lists must not be empty",
                path.display()
            )));
        }
        Ok(Self::from_lists(file.phonemes, file.accents))
    }

    /// `symbols.json` under `root` when present, the built-in tables otherwise.
    pub fn load_or_default(root: &Path) -> Result<Self, CoreError> {
        let path = root.join("symbols.json");
        if path.exists() {
            log::info!("Loading symbol tables from {}", path.display());
            Self::load(&path)
        } else {
            log::debug!("symbols.json not found, using built-in symbol tables");
            Ok(Self::hardcoded())
        }
    }

    fn from_lists(
        phonemes: impl IntoIterator<Item = String>,
        accents: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            phonemes: index_symbols(phonemes),
            accents: index_symbols(accents),
        }
    }

    pub fn phoneme_id(&self, symbol: &str) -> Result<i64, CoreError> {
        self.phonemes
            .get(symbol)
            .copied()
            .ok_or_else(|| CoreError::UnknownSymbol {
                kind: SymbolKind::Phoneme,
                symbol: symbol.to_string(),
            })
    }

    pub fn accent_id(&self, symbol: &str) -> Result<i64, CoreError> {
        self.accents
            .get(symbol)
            .copied()
            .ok_or_else(|| CoreError::UnknownSymbol {
                kind: SymbolKind::Accent,
                symbol: symbol.to_string(),
            })
    }

    pub fn phoneme_ids<S: AsRef<str>>(&self, symbols: &[S]) -> Result<Vec<i64>, CoreError> {
        symbols.iter().map(|s| self.phoneme_id(s.as_ref())).collect()
    }

    pub fn accent_ids<S: AsRef<str>>(&self, symbols: &[S]) -> Result<Vec<i64>, CoreError> {
        symbols.iter().map(|s| self.accent_id(s.as_ref())).collect()
    }
}

fn index_symbols(symbols: impl IntoIterator<Item = String>) -> HashMap<String, i64> {
    symbols
        .into_iter()
        .enumerate()
        .map(|(i, s)| (s, i as i64))
        .collect()
}
