//! # Result Cache
//!
//! A content-addressed, time-bounded store for decoded device responses and
//! AI answers. Browsing a few thousand library albums or searching the
//! streaming service takes dozens of requests; caching them makes repeated
//! searches instant and keeps the AI provider from being asked the same
//! question twice.
//!
//! ## Storage
//!
//! Every entry is one JSON file named after its [`Fingerprint`] inside the
//! cache directory (`~/.cache/blue/` on Linux):
//!
//! ```text
//! {"fingerprint": "3f9a…", "created_ms": 1760000000000, "value": …}
//! ```
//!
//! Entries are written to a temporary file in the same directory and renamed
//! into place, so concurrent `blue` processes never observe a half-written
//! entry. Two processes racing on the same miss may both query the device;
//! the last rename wins.
//!
//! ## Expiry
//!
//! An entry is live while `now - created < ttl`. Expired entries are ignored
//! on read and overwritten by the next successful computation. There is no
//! background sweeper; [`ResultCache::clear`] drops everything at once.

use anyhow::{Context, Result};
use log::{debug, trace, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default lifetime of a cached result.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Deterministic cache key derived from the shape of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a device query.
    ///
    /// The path is normalized (leading `/` removed) and the parameters are
    /// sorted, so `?b=2&a=1` and `?a=1&b=2` share one entry.
    #[must_use]
    pub fn of_query(path: &str, params: &[(&str, &str)], expr: &str) -> Self {
        let mut sorted: Vec<(&str, &str)> = params.to_vec();
        sorted.sort_unstable();

        let mut hasher = Sha256::new();
        feed(&mut hasher, "query");
        feed(&mut hasher, path.trim_start_matches('/'));
        for (key, value) in sorted {
            feed(&mut hasher, key);
            feed(&mut hasher, value);
        }
        feed(&mut hasher, expr);
        Self(hex::encode(hasher.finalize()))
    }

    /// Fingerprint free text, such as an AI prompt. `kind` keeps different
    /// uses of the same text apart.
    #[must_use]
    pub fn of_text(kind: &str, text: &str) -> Self {
        let mut hasher = Sha256::new();
        feed(&mut hasher, "text");
        feed(&mut hasher, kind);
        feed(&mut hasher, text);
        Self(hex::encode(hasher.finalize()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Length-prefix every field so ("ab", "c") and ("a", "bc") hash differently.
fn feed(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

/// Source of "now" for expiry decisions.
pub trait Clock {
    fn now(&self) -> SystemTime;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock that only moves when told to. Handy for replaying expiry.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        self.now.lock().map_or(UNIX_EPOCH, |now| *now)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> SystemTime {
        (**self).now()
    }
}

/// One stored result.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    fingerprint: String,
    created_ms: u64,
    value: serde_json::Value,
}

/// Directory-backed result cache.
pub struct ResultCache {
    dir: PathBuf,
    clock: Box<dyn Clock>,
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache").field("dir", &self.dir).finish()
    }
}

impl ResultCache {
    /// Open (and create if needed) a cache rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_clock(dir, Box::new(SystemClock))
    }

    /// Same as [`ResultCache::open`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be created.
    pub fn with_clock(dir: impl Into<PathBuf>, clock: Box<dyn Clock>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| {
            format!(
                "Failed to create cache directory at {}. Please check file permissions.",
                dir.display()
            )
        })?;
        Ok(Self { dir, clock })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Return the live value for `fingerprint`, or run `compute` once and
    /// store its result.
    ///
    /// A failing `compute` stores nothing; the error goes straight back to
    /// the caller. A zero `ttl` always computes and never stores.
    ///
    /// # Errors
    ///
    /// Only errors raised by `compute`. Cache I/O problems are logged and
    /// treated as misses.
    pub fn get_or_compute<T, E, F>(&self, fingerprint: &Fingerprint, ttl: Duration, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
    {
        if ttl.is_zero() {
            trace!("cache bypass (zero ttl) for {fingerprint}");
            return compute();
        }

        if let Some(value) = self.lookup(fingerprint, ttl) {
            debug!("cache hit {fingerprint}");
            return Ok(value);
        }

        debug!("cache miss {fingerprint}");
        let value = compute()?;
        if let Err(e) = self.store(fingerprint, &value) {
            warn!("Failed to store cache entry {fingerprint}: {e:#}");
        }
        Ok(value)
    }

    /// Read a live entry, if any.
    pub fn lookup<T: DeserializeOwned>(&self, fingerprint: &Fingerprint, ttl: Duration) -> Option<T> {
        let path = self.entry_path(fingerprint);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(_) => return None,
        };

        let entry: CacheEntry = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {e}", path.display());
                return None;
            }
        };

        if entry.fingerprint != fingerprint.as_str() {
            warn!("Ignoring cache entry {} stored under another key", path.display());
            return None;
        }

        let created = UNIX_EPOCH + Duration::from_millis(entry.created_ms);
        let age = self
            .clock
            .now()
            .duration_since(created)
            .unwrap_or(Duration::ZERO);
        if age >= ttl {
            trace!("cache entry {fingerprint} expired ({}s old)", age.as_secs());
            return None;
        }

        match serde_json::from_value(entry.value) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring cache entry {fingerprint} with unexpected shape: {e}");
                None
            }
        }
    }

    /// Store `value` under `fingerprint`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Fails when the value cannot be serialized or the file cannot be
    /// written and renamed into place.
    pub fn store<T: Serialize>(&self, fingerprint: &Fingerprint, value: &T) -> Result<()> {
        let created_ms = self
            .clock
            .now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));

        let entry = CacheEntry {
            fingerprint: fingerprint.as_str().to_string(),
            created_ms,
            value: serde_json::to_value(value).context("Failed to serialize cache value")?,
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("Failed to create temporary file in {}", self.dir.display()))?;
        serde_json::to_writer(&mut tmp, &entry).context("Failed to write cache entry")?;
        tmp.flush().context("Failed to flush cache entry")?;
        tmp.persist(self.entry_path(fingerprint))
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to move cache entry {fingerprint} into place"))?;
        Ok(())
    }

    /// Drop every entry. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be listed or an entry cannot be removed.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for path in self.entry_files()? {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove cache entry {}", path.display()))?;
            removed += 1;
        }
        debug!("cleared {removed} cache entries from {}", self.dir.display());
        Ok(removed)
    }

    /// Number of entries on disk, live or not.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be listed.
    pub fn len(&self) -> Result<usize> {
        Ok(self.entry_files()?.len())
    }

    /// # Errors
    ///
    /// Fails when the directory cannot be listed.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{fingerprint}.json"))
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>> {
        let listing = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list cache directory {}", self.dir.display()))?;

        let mut files = Vec::new();
        for item in listing {
            let path = item?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }
}
