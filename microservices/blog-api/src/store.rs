//! Flat-file record store
//!
//! Each store owns one JSON file holding an array of records. Every
//! read-modify-write cycle holds the store's lock, and writes land in a
//! sibling temp file that is renamed over the target.

use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt record file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode records: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A JSON array of `T` persisted in a single file
pub struct JsonArrayStore<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _records: PhantomData<fn() -> T>,
}

impl<T> JsonArrayStore<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            _records: PhantomData,
        }
    }

    /// All records in file order. A missing file is an empty store.
    pub async fn load_all(&self) -> Result<Vec<T>> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// Append a record, keeping at most `cap` of the newest records
    pub async fn append(&self, record: T, cap: Option<usize>) -> Result<()> {
        self.modify(|records| {
            records.push(record);
            if let Some(cap) = cap {
                let excess = records.len().saturating_sub(cap);
                records.drain(..excess);
            }
            ((), true)
        })
        .await
    }

    /// Append `record` unless an existing record satisfies `conflict`.
    /// Returns whether the record was written.
    pub async fn append_unless<F>(&self, record: T, conflict: F) -> Result<bool>
    where
        F: Fn(&T) -> bool,
    {
        self.modify(|records| {
            if records.iter().any(conflict) {
                return (false, false);
            }
            records.push(record);
            (true, true)
        })
        .await
    }

    /// Apply `update` to every record matching `predicate`; returns the
    /// number of records touched.
    pub async fn update_where<P, U>(&self, predicate: P, mut update: U) -> Result<usize>
    where
        P: Fn(&T) -> bool,
        U: FnMut(&mut T),
    {
        self.modify(|records| {
            let mut touched = 0;
            for record in records.iter_mut().filter(|r| predicate(r)) {
                update(record);
                touched += 1;
            }
            (touched, touched > 0)
        })
        .await
    }

    /// Run `f` over the records under the store lock. `f` returns its
    /// result and whether the records changed; unchanged records are not
    /// written back.
    pub async fn modify<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<T>) -> (R, bool),
    {
        let _guard = self.lock.lock().await;
        let mut records = self.read().await?;
        let (result, changed) = f(&mut records);
        if changed {
            self.write(&records).await?;
        }
        Ok(result)
    }

    async fn read(&self) -> Result<Vec<T>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error(source)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn write(&self, records: &[T]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let bytes = serde_json::to_vec_pretty(records)?;
        let staging = self.staging_path();
        fs::write(&staging, bytes)
            .await
            .map_err(|source| self.io_error(source))?;
        fs::rename(&staging, &self.path)
            .await
            .map_err(|source| self.io_error(source))?;

        tracing::debug!(path = %self.path.display(), records = records.len(), "Record file written");
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        n: u32,
        tag: String,
    }

    fn entry(n: u32) -> Entry {
        Entry {
            n,
            tag: "new".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonArrayStore<Entry> = JsonArrayStore::new(dir.path().join("none.json"));
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("entries.json");
        let store = JsonArrayStore::new(&path);

        store.append(entry(1), None).await.unwrap();
        store.append(entry(2), None).await.unwrap();

        assert!(path.exists());
        assert!(!store.staging_path().exists());
        assert_eq!(store.load_all().await.unwrap(), vec![entry(1), entry(2)]);
    }

    #[tokio::test]
    async fn test_append_cap_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonArrayStore::new(dir.path().join("capped.json"));

        for n in 0..5 {
            store.append(entry(n), Some(3)).await.unwrap();
        }

        let kept: Vec<u32> = store.load_all().await.unwrap().iter().map(|e| e.n).collect();
        assert_eq!(kept, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "[{\"n\": 1,").unwrap();

        let store: JsonArrayStore<Entry> = JsonArrayStore::new(&path);
        assert!(matches!(
            store.load_all().await,
            Err(StoreError::Corrupt { .. })
        ));
        assert!(store.append(entry(1), None).await.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{\"n\": 1,");
    }

    #[tokio::test]
    async fn test_update_where_counts_matches() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonArrayStore::new(dir.path().join("entries.json"));
        for n in [1, 2, 1] {
            store.append(entry(n), None).await.unwrap();
        }

        let touched = store
            .update_where(|e| e.n == 1, |e| e.tag = "seen".to_string())
            .await
            .unwrap();
        assert_eq!(touched, 2);

        let tags: Vec<String> = store.load_all().await.unwrap().into_iter().map(|e| e.tag).collect();
        assert_eq!(tags, vec!["seen", "new", "seen"]);

        assert_eq!(store.update_where(|e| e.n == 9, |_| {}).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_append_unless_is_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonArrayStore::new(dir.path().join("unique.json")));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append_unless(entry(7), |e| e.n == 7).await.unwrap()
            }));
        }

        let mut written = 0;
        for handle in handles {
            if handle.await.unwrap() {
                written += 1;
            }
        }

        assert_eq!(written, 1);
        assert_eq!(store.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonArrayStore::new(dir.path().join("many.json")));

        let mut handles = Vec::new();
        for n in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append(entry(n), None).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.load_all().await.unwrap().len(), 20);
    }
}
