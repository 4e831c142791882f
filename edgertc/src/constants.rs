//! Workspace-wide tuning constants that don't belong to any single
//! sans-I/O crate. Grounded on `rtc/src/constants.rs`.

/// Equal to UDP MTU minus the usual IP/UDP header allowance.
pub const RECEIVE_MTU: usize = 1460;

/// Default signaling cache filename (spec.md §6 "Persisted signaling
/// cache file"), relative to whatever directory the embedder points
/// `signaling::FileCache` at.
pub const DEFAULT_SIGNALING_CACHE_FILE: &str = "edgertc_signaling_cache.csv";
