//! `ToolPolicy` persistence (§4.7).
//!
//! A single writer (the `/allowed_tools` POST handler) mutates the policy
//! under a mutex; readers (the executor adapter call site, the VLM system
//! prompt builder) take a cheap snapshot. Mutations are persisted with
//! write-temp-then-rename so a crash mid-write can never leave a torn
//! `allowed_tools.json` behind.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use va_domain::{Error, ToolPolicy};

use crate::store::atomic_write_json;

pub struct PolicyStore {
    path: PathBuf,
    current: RwLock<ToolPolicy>,
}

impl PolicyStore {
    /// Load `path` if it exists, otherwise seed it with `default_tools`
    /// and persist that seed immediately so the file always exists once a
    /// run directory has been bootstrapped.
    pub fn load_or_seed(path: impl Into<PathBuf>, default_tools: Vec<String>) -> Result<Self, Error> {
        let path = path.into();
        let policy = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(Error::Json)?
        } else {
            let seed = ToolPolicy::new(default_tools);
            atomic_write_json(&path, &seed)?;
            seed
        };
        Ok(Self {
            path,
            current: RwLock::new(policy),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A by-value snapshot, safe to pass into a concurrent executor
    /// invocation without racing a later write (§4.7).
    pub fn snapshot(&self) -> ToolPolicy {
        self.current.read().clone()
    }

    /// Atomic replace: `POST /allowed_tools`. Two identical posts produce
    /// byte-identical files (§8 invariant 6) because serialization is
    /// deterministic for a given `Vec<String>`.
    pub fn replace(&self, tools: Vec<String>) -> Result<(), Error> {
        let policy = ToolPolicy::new(tools);
        atomic_write_json(&self.path, &policy)?;
        *self.current.write() = policy;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_file_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allowed_tools.json");
        let store = PolicyStore::load_or_seed(&path, vec!["click".into()]).unwrap();
        assert!(path.exists());
        assert_eq!(store.snapshot().tools, vec!["click".to_string()]);
    }

    #[test]
    fn loads_existing_file_without_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allowed_tools.json");
        std::fs::write(&path, r#"["write"]"#).unwrap();
        let store = PolicyStore::load_or_seed(&path, vec!["click".into()]).unwrap();
        assert_eq!(store.snapshot().tools, vec!["write".to_string()]);
    }

    #[test]
    fn replace_persists_atomically_and_updates_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allowed_tools.json");
        let store = PolicyStore::load_or_seed(&path, vec!["click".into()]).unwrap();
        store.replace(vec!["write".into(), "key".into()]).unwrap();
        assert_eq!(
            store.snapshot().tools,
            vec!["write".to_string(), "key".to_string()]
        );
        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: ToolPolicy = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, store.snapshot());
    }

    #[test]
    fn idempotent_replace_yields_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allowed_tools.json");
        let store = PolicyStore::load_or_seed(&path, vec![]).unwrap();
        store.replace(vec!["click".into(), "write".into()]).unwrap();
        let first = std::fs::read(&path).unwrap();
        store.replace(vec!["click".into(), "write".into()]).unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);
    }
}
