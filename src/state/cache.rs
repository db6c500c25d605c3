use cricket_api::MergedView;
use log::{debug, warn};
use std::io::{self, ErrorKind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::{env, fs};

/// Bumped whenever the cached payload shape changes; older keys are simply never read.
pub const CACHE_VERSION: &str = "v2";

/// Every key this crate writes starts with this; `FileStore::clear` touches nothing else.
pub const KEY_PREFIX: &str = "crictui-matches-";

pub fn cache_key() -> String {
    format!("{KEY_PREFIX}{CACHE_VERSION}")
}

/// Minimal string key-value persistence.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    /// Drop every key this store owns, including older cache versions.
    fn clear(&self) -> io::Result<()>;
}

/// One `<key>.json` file per key under `dir`. The directory may be shared, so
/// `clear` only removes `crictui-matches-*.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$XDG_CACHE_HOME/crictui`, else `~/.cache/crictui`, else a relative `.crictui-cache`.
    pub fn default_dir() -> PathBuf {
        if let Some(xdg) = env::var_os("XDG_CACHE_HOME").filter(|v| !v.is_empty()) {
            return PathBuf::from(xdg).join("crictui");
        }
        if let Some(home) = env::var_os("HOME").filter(|v| !v.is_empty()) {
            return PathBuf::from(home).join(".cache").join("crictui");
        }
        PathBuf::from(".crictui-cache")
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)
    }

    fn clear(&self) -> io::Result<()> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let owned = name
                .to_str()
                .is_some_and(|n| n.starts_with(KEY_PREFIX) && n.ends_with(".json"));
            if owned {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        (**self).set(key, value)
    }

    fn clear(&self) -> io::Result<()> {
        (**self).clear()
    }
}

fn is_quota_error(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::StorageFull | ErrorKind::QuotaExceeded)
}

/// A serialized view waiting to be written. Generations only go up, so a write
/// that lost the race to a newer one is skipped.
#[derive(Debug)]
pub struct PendingWrite {
    generation: u64,
    payload: String,
}

/// The merged view, persisted under a single versioned key.
pub struct ViewCache {
    store: Box<dyn KeyValueStore>,
    key: String,
    next_generation: AtomicU64,
    written: Mutex<u64>,
}

impl ViewCache {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            key: cache_key(),
            next_generation: AtomicU64::new(1),
            written: Mutex::new(0),
        }
    }

    /// Missing, unreadable, or unparseable payloads all load as an empty view.
    pub fn load(&self) -> MergedView {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return MergedView::default(),
            Err(e) => {
                warn!("cache read failed: {e}");
                return MergedView::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(view) => view,
            Err(e) => {
                warn!("discarding unreadable cache entry: {e}");
                MergedView::default()
            }
        }
    }

    pub fn save(&self, view: &MergedView) {
        if let Some(pending) = self.stage(view) {
            self.commit(pending);
        }
    }

    /// Serialize `view` and stamp it with the next generation. Call this while the
    /// view is still consistent with the buckets, then `commit` without holding locks.
    pub fn stage(&self, view: &MergedView) -> Option<PendingWrite> {
        match serde_json::to_string(view) {
            Ok(payload) => Some(PendingWrite {
                generation: self.next_generation.fetch_add(1, Ordering::SeqCst),
                payload,
            }),
            Err(e) => {
                warn!("failed to serialize view for cache: {e}");
                None
            }
        }
    }

    pub fn commit(&self, pending: PendingWrite) {
        let mut written = match self.written.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if pending.generation <= *written {
            debug!("skipping cache write {}, {} already on disk", pending.generation, *written);
            return;
        }
        *written = pending.generation;
        self.write(&pending.payload);
    }

    fn write(&self, payload: &str) {
        match self.store.set(&self.key, payload) {
            Ok(()) => {}
            Err(e) if is_quota_error(&e) => {
                debug!("cache quota hit, clearing and retrying once");
                if let Err(e) = self.store.clear() {
                    warn!("failed to clear cache: {e}");
                    return;
                }
                if let Err(e) = self.store.set(&self.key, payload) {
                    debug!("cache write still failing after clear: {e}");
                }
            }
            Err(e) => warn!("cache write failed: {e}"),
        }
    }
}
