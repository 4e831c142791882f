//! Persisted signaling cache file (spec.md §6), one line per entry:
//! `channelName,role,region,channelArn,httpsEndpoint,wssEndpoint,creationEpochSeconds`.
//! Grounded on
//! `original_source/src/source/Signaling/FileCache.c`'s
//! `deserializeSignalingCacheEntries`/`signalingCacheSaveToFile`, with
//! the load path rewritten to use `str::split(',')` instead of the
//! original's manual pointer walk.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const MAX_CACHE_ENTRIES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Master,
    Viewer,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::Master => "MASTER",
            Role::Viewer => "VIEWER",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "MASTER" => Some(Role::Master),
            "VIEWER" => Some(Role::Viewer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub channel_name: String,
    pub role: Role,
    pub region: String,
    pub channel_arn: String,
    pub https_endpoint: String,
    pub wss_endpoint: String,
    pub creation_epoch_seconds: u64,
}

impl CacheEntry {
    fn to_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.channel_name,
            self.role.as_str(),
            self.region,
            self.channel_arn,
            self.https_endpoint,
            self.wss_endpoint,
            self.creation_epoch_seconds
        )
    }

    fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.splitn(7, ',');
        let channel_name = fields.next()?.to_string();
        let role = Role::parse(fields.next()?)?;
        let region = fields.next()?.to_string();
        let channel_arn = fields.next()?.to_string();
        let https_endpoint = fields.next()?.to_string();
        let wss_endpoint = fields.next()?.to_string();
        let creation_epoch_seconds: u64 = fields.next()?.trim().parse().ok()?;
        if channel_name.is_empty() || region.is_empty() || channel_arn.is_empty() || https_endpoint.is_empty() || wss_endpoint.is_empty() {
            return None;
        }
        Some(Self {
            channel_name,
            role,
            region,
            channel_arn,
            https_endpoint,
            wss_endpoint,
            creation_epoch_seconds,
        })
    }

    fn age(&self, now: SystemTime) -> Duration {
        let now_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        Duration::from_secs(now_epoch.saturating_sub(self.creation_epoch_seconds))
    }
}

/// Reads and rewrites the comma-separated cache file, enforcing
/// [`MAX_CACHE_ENTRIES`] and a caching period past which entries are
/// treated as expired.
pub struct FileCache {
    path: PathBuf,
    caching_period: Duration,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>, caching_period: Duration) -> Self {
        Self { path: path.into(), caching_period }
    }

    /// Loads every still-fresh entry. A malformed file is truncated
    /// (spec.md: "malformed files are truncated and re-created") and
    /// an empty list is returned rather than a partial one, so a
    /// corrupt cache never masks good entries sitting after the
    /// corruption.
    pub fn load(&self, now: SystemTime) -> Result<Vec<CacheEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| Error::Cache(e.to_string()))?;
        let mut entries = Vec::new();
        for line in contents.lines().filter(|l| !l.is_empty()) {
            match CacheEntry::parse_line(line) {
                Some(entry) => entries.push(entry),
                None => {
                    self.truncate()?;
                    return Ok(Vec::new());
                }
            }
            if entries.len() == MAX_CACHE_ENTRIES {
                break;
            }
        }
        entries.retain(|e| e.age(now) <= self.caching_period);
        Ok(entries)
    }

    pub fn find<'a>(&self, entries: &'a [CacheEntry], channel_name: &str, region: &str, role: Role) -> Option<&'a CacheEntry> {
        entries.iter().find(|e| e.channel_name == channel_name && e.region == region && e.role == role)
    }

    /// Rewrites the file from scratch with at most [`MAX_CACHE_ENTRIES`] entries.
    pub fn save(&self, entries: &[CacheEntry]) -> Result<()> {
        let mut body = String::new();
        for entry in entries.iter().take(MAX_CACHE_ENTRIES) {
            body.push_str(&entry.to_line());
            body.push('\n');
        }
        fs::write(&self.path, body).map_err(|e| Error::Cache(e.to_string()))
    }

    fn truncate(&self) -> Result<()> {
        fs::write(&self.path, "").map_err(|e| Error::Cache(e.to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn tmp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("edgertc-signaling-test-{name}-{:?}", std::thread::current().id()));
        path
    }

    #[test]
    fn round_trips_entries_through_save_and_load() {
        let path = tmp_path("roundtrip");
        let cache = FileCache::new(&path, StdDuration::from_secs(3600));
        let now = UNIX_EPOCH + StdDuration::from_secs(1_700_000_000);
        let entry = CacheEntry {
            channel_name: "my-channel".to_string(),
            role: Role::Master,
            region: "us-west-2".to_string(),
            channel_arn: "arn:aws:kinesisvideo:...".to_string(),
            https_endpoint: "https://example".to_string(),
            wss_endpoint: "wss://example".to_string(),
            creation_epoch_seconds: now.duration_since(UNIX_EPOCH).unwrap().as_secs(),
        };
        cache.save(std::slice::from_ref(&entry)).unwrap();
        let loaded = cache.load(now).unwrap();
        assert_eq!(loaded, vec![entry]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn expired_entries_are_dropped_on_load() {
        let path = tmp_path("expired");
        let cache = FileCache::new(&path, StdDuration::from_secs(60));
        let created = UNIX_EPOCH + StdDuration::from_secs(1_700_000_000);
        let entry = CacheEntry {
            channel_name: "old-channel".to_string(),
            role: Role::Viewer,
            region: "us-east-1".to_string(),
            channel_arn: "arn".to_string(),
            https_endpoint: "https://e".to_string(),
            wss_endpoint: "wss://e".to_string(),
            creation_epoch_seconds: created.duration_since(UNIX_EPOCH).unwrap().as_secs(),
        };
        cache.save(&[entry]).unwrap();
        let much_later = created + StdDuration::from_secs(120);
        assert!(cache.load(much_later).unwrap().is_empty());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn malformed_file_is_truncated_on_load() {
        let path = tmp_path("malformed");
        fs::write(&path, "not,a,valid,cache,line\n").unwrap();
        let cache = FileCache::new(&path, StdDuration::from_secs(3600));
        let loaded = cache.load(SystemTime::now()).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
        let _ = fs::remove_file(&path);
    }
}
