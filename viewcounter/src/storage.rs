use crate::error::Result;
use crate::schema::ViewsResponse;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

/// Backing store for the page-view counter.
pub trait ViewStorage: Send + Sync {
    fn initialize_view_count(&self) -> Result<()>;
    fn views(&self) -> Result<u64>;
    fn increment_views(&self) -> Result<u64>;
}

/// Counter kept in process memory; starts at zero and is lost on restart.
#[derive(Debug, Default)]
pub struct MemStorage {
    views: AtomicU64,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ViewStorage for MemStorage {
    fn initialize_view_count(&self) -> Result<()> {
        // already zero from construction
        Ok(())
    }

    fn views(&self) -> Result<u64> {
        Ok(self.views.load(Ordering::SeqCst))
    }

    fn increment_views(&self) -> Result<u64> {
        Ok(self.views.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Counter persisted as a small JSON document (`{"views": n}`).
///
/// The value is cached behind a mutex; every increment rewrites the file
/// through a temp file + rename before the cached value moves.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    views: Mutex<u64>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            views: Mutex::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, u64> {
        // a poisoned lock still holds a valid count
        self.views.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ViewStorage for FileStorage {
    fn initialize_view_count(&self) -> Result<()> {
        let loaded = load_views(&self.path);
        *self.lock() = loaded;
        if !self.path.exists() {
            if let Some(dir) = self.path.parent() {
                fs::create_dir_all(dir)?;
            }
            save_atomic(&self.path, loaded)?;
        }
        log::info!("file store {:?} starts at {} views", self.path, loaded);
        Ok(())
    }

    fn views(&self) -> Result<u64> {
        Ok(*self.lock())
    }

    fn increment_views(&self) -> Result<u64> {
        let mut views = self.lock();
        let next = *views + 1;
        save_atomic(&self.path, next)?;
        *views = next;
        Ok(next)
    }
}

fn load_views(path: &Path) -> u64 {
    let Ok(s) = fs::read_to_string(path) else {
        return 0;
    };
    match serde_json::from_str::<ViewsResponse>(&s) {
        Ok(doc) => doc.views,
        Err(e) => {
            log::warn!("invalid counter file {:?}: {}, starting from 0", path, e);
            0
        }
    }
}

fn save_atomic(path: &Path, views: u64) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(&ViewsResponse { views })?;
    fs::write(&tmp, data)?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

fn atomic_rename(from: &Path, to: &Path) -> Result<()> {
    // rename-over-existing is not atomic on Windows
    if cfg!(windows) && to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "viewcounter-{}-{}",
            std::process::id(),
            name
        ));
        let _ = fs::remove_dir_all(&dir);
        dir.join("views.json")
    }

    #[test]
    fn memory_counter_starts_at_zero_and_counts_each_increment() {
        let store = MemStorage::new();
        store.initialize_view_count().unwrap();
        assert_eq!(store.views().unwrap(), 0);
        assert_eq!(store.increment_views().unwrap(), 1);
        assert_eq!(store.increment_views().unwrap(), 2);
        assert_eq!(store.views().unwrap(), 2);
    }

    #[test]
    fn memory_counter_is_shared_across_threads() {
        let store = std::sync::Arc::new(MemStorage::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        s.increment_views().unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.views().unwrap(), 800);
    }

    #[test]
    fn file_counter_survives_reopen() {
        let path = scratch_file("reopen");
        let store = FileStorage::new(&path);
        store.initialize_view_count().unwrap();
        assert_eq!(store.views().unwrap(), 0);
        assert!(path.exists());
        store.increment_views().unwrap();
        store.increment_views().unwrap();

        let reopened = FileStorage::new(&path);
        reopened.initialize_view_count().unwrap();
        assert_eq!(reopened.views().unwrap(), 2);
        assert_eq!(reopened.increment_views().unwrap(), 3);
    }

    #[test]
    fn corrupt_counter_file_restarts_from_zero() {
        let path = scratch_file("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not json").unwrap();

        let store = FileStorage::new(&path);
        store.initialize_view_count().unwrap();
        assert_eq!(store.views().unwrap(), 0);
        assert_eq!(store.increment_views().unwrap(), 1);

        let doc: ViewsResponse = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc.views, 1);
    }
}
