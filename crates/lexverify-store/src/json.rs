//! Directory of JSON provision files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use lexverify_core::{Claim, PrecedentRecord, Provision, provision_sort_key};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::StoreError;

/// A file holds either one provision or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Provision>),
    One(Box<Provision>),
}

/// Provision records stored as `*.json` files in one directory.
///
/// Files are read in name order and provisions are returned in document
/// order (articles before regulations, then by number), so the engine sees
/// the same sequence whatever the file layout.
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        if !dir.is_dir() {
            return Err(StoreError::NotFound(dir.to_path_buf()));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every provision in the directory, sorted by provision sort key.
    ///
    /// The same identifier in two places is an error.
    pub fn load_provisions(&self) -> Result<Vec<Provision>, StoreError> {
        let io_error = |source: std::io::Error| StoreError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();

        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        let mut provisions = Vec::new();
        for path in &files {
            let batch = match read_json::<OneOrMany>(path)? {
                OneOrMany::Many(v) => v,
                OneOrMany::One(p) => vec![*p],
            };
            debug!(file = %path.display(), provisions = batch.len(), "read provision file");
            for p in batch {
                if seen.insert(p.id.clone(), path.clone()).is_some() {
                    return Err(StoreError::DuplicateProvision {
                        id: p.id,
                        path: path.clone(),
                    });
                }
                provisions.push(p);
            }
        }

        provisions.sort_by_cached_key(|p| provision_sort_key(&p.id));
        info!(
            dir = %self.dir.display(),
            files = files.len(),
            provisions = provisions.len(),
            "loaded provisions"
        );
        Ok(provisions)
    }

    /// Look up one provision by exact identifier.
    pub fn get(&self, id: &str) -> Result<Provision, StoreError> {
        self.load_provisions()?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::UnknownProvision(id.to_string()))
    }

    pub fn load_claim(path: &Path) -> Result<Claim, StoreError> {
        read_json(path)
    }

    pub fn load_precedents(path: &Path) -> Result<Vec<PrecedentRecord>, StoreError> {
        let records: Vec<PrecedentRecord> = read_json(path)?;
        info!(file = %path.display(), records = records.len(), "loaded precedents");
        Ok(records)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    fn article(id: &str) -> String {
        format!(
            r#"{{"id": "{id}", "kind": "article", "text": "x", "subsections": {{"1": "x"}}}}"#
        )
    }

    fn sample_data_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("data")
    }

    #[test]
    fn missing_directory_errors() {
        let result = JsonStore::open(Path::new("/nonexistent/provisions"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn loads_objects_and_arrays_in_document_order() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.json", &format!("[{}, {}]", article("Article 4"), article("Article 3A")));
        write(
            tmp.path(),
            "b.json",
            r#"{"id": "Regulation 1", "kind": "regulation", "text": "y", "subsections": {"a": "y"}}"#,
        );
        write(tmp.path(), "c.json", &article("Article 3"));
        write(tmp.path(), "notes.txt", "ignored");

        let store = JsonStore::open(tmp.path()).unwrap();
        let ids: Vec<String> = store
            .load_provisions()
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, ["Article 3", "Article 3A", "Article 4", "Regulation 1"]);
    }

    #[test]
    fn duplicate_identifier_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.json", &article("Article 3"));
        write(tmp.path(), "b.json", &article("Article 3"));
        let err = JsonStore::open(tmp.path()).unwrap().load_provisions().unwrap_err();
        match err {
            StoreError::DuplicateProvision { id, path } => {
                assert_eq!(id, "Article 3");
                assert!(path.ends_with("b.json"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_json_names_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "bad.json", "{ not json");
        let err = JsonStore::open(tmp.path()).unwrap().load_provisions().unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn missing_structural_field_still_loads() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.json", r#"{"id": "Article 9", "kind": "article"}"#);
        let p = JsonStore::open(tmp.path()).unwrap().get("Article 9").unwrap();
        assert!(p.text.is_none());
        assert!(p.subsections.is_none());
    }

    #[test]
    fn unreadable_directory_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("provisions");
        fs::create_dir(&dir).unwrap();
        let store = JsonStore::open(&dir).unwrap();
        fs::remove_dir(&dir).unwrap();
        match store.load_provisions() {
            Err(StoreError::Io { path, .. }) => assert_eq!(path, dir),
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn get_unknown_id() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.json", &article("Article 3"));
        let result = JsonStore::open(tmp.path()).unwrap().get("Article 4");
        assert!(matches!(result, Err(StoreError::UnknownProvision(_))));
    }

    #[test]
    fn claim_and_precedents_load() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "claim.json",
            r#"{"subject": "Article 58", "obligation": "declare first dividend"}"#,
        );
        write(
            tmp.path(),
            "precedents.json",
            r#"[{"citation": "Re A", "supports": true}, {"citation": "Re B", "supports": false, "weight": 2.5}]"#,
        );
        let claim = JsonStore::load_claim(&tmp.path().join("claim.json")).unwrap();
        assert!(claim.conditions.is_empty());
        let records = JsonStore::load_precedents(&tmp.path().join("precedents.json")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].weight, 1.0);
        assert_eq!(records[1].weight, 2.5);
    }

    #[test]
    fn missing_claim_file_errors() {
        let result = JsonStore::load_claim(Path::new("/nonexistent/claim.json"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn sample_corpus_loads() {
        let store = JsonStore::open(&sample_data_dir().join("provisions")).unwrap();
        let provisions = store.load_provisions().unwrap();
        assert_eq!(provisions.first().map(|p| p.id.as_str()), Some("Article 16"));
        assert_eq!(provisions.last().map(|p| p.id.as_str()), Some("Regulation 143"));
        assert!(provisions.iter().all(|p| p.text.is_some() && p.subsections.is_some()));
    }
}
