use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::model::CoreError;

/// File name of the library manifest under the root directory.
pub const MANIFEST_FILE: &str = "libraries.json";

/// File name of a library's speaker metadata.
pub const METAS_FILE: &str = "metas.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleMeta {
    pub name: String,
    pub id: i64,
}

/// One speaker entry of `metas.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerMeta {
    pub name: String,
    pub styles: Vec<StyleMeta>,
    pub speaker_uuid: String,
    pub version: String,
}

/// Library identifiers mapped to their "usable" flag.
///
/// Keys are kept sorted so libraries are visited in a stable order.
pub type Manifest = BTreeMap<String, bool>;

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CoreError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CoreError::Manifest(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| CoreError::Manifest(format!("{}: {e}", path.display())))
}

/// Read `libraries.json` under `root`.
pub fn load_manifest(root: &Path) -> Result<Manifest, CoreError> {
    read_json(&root.join(MANIFEST_FILE))
}

/// Identifiers of the libraries flagged usable, sorted.
pub fn usable_libraries(manifest: &Manifest) -> Vec<&str> {
    manifest
        .iter()
        .filter(|(_, &usable)| usable)
        .map(|(id, _)| id.as_str())
        .collect()
}

/// Read `metas.json` from a library directory.
pub fn load_metas(library_dir: &Path) -> Result<Vec<SpeakerMeta>, CoreError> {
    read_json(&library_dir.join(METAS_FILE))
}

/// Every style id declared in `metas`.
pub fn style_ids(metas: &[SpeakerMeta]) -> impl Iterator<Item = i64> + '_ {
    metas
        .iter()
        .flat_map(|speaker| speaker.styles.iter().map(|style| style.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_usable_libraries_are_listed() {
        let manifest: Manifest =
            serde_json::from_str(r#"{"b-lib": true, "a-lib": true, "off": false}"#).unwrap();
        assert_eq!(usable_libraries(&manifest), vec!["a-lib", "b-lib"]);
    }

    #[test]
    fn parses_metas_schema() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(METAS_FILE),
            r#"[{"name": "Alice", "styles": [{"name": "normal", "id": 0}, {"name": "sweet", "id": 3}],
                "speaker_uuid": "7ffcb7ce", "version": "0.1.0"}]"#,
        )
        .unwrap();

        let metas = load_metas(dir.path()).unwrap();
        assert_eq!(metas[0].name, "Alice");
        assert_eq!(style_ids(&metas).collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn missing_manifest_is_manifest_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_manifest(dir.path()).unwrap_err();
        assert!(matches!(err, CoreError::Manifest(msg) if msg.contains(MANIFEST_FILE)));
    }

    #[test]
    fn malformed_metas_is_manifest_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(METAS_FILE), r#"[{"name": 1}]"#).unwrap();
        assert!(matches!(load_metas(dir.path()), Err(CoreError::Manifest(_))));
    }
}
