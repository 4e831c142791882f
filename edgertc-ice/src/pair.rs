//! Candidate pair state and priority (spec.md §4.3 "Connectivity
//! checking"). Grounded on `rtc-ice/src/candidate/candidate_pair.rs`.

use std::fmt;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
    Waiting,
    InProgress,
    Failed,
    Succeeded,
    Frozen,
}

#[derive(Debug, Clone)]
pub struct CandidatePair {
    pub local_index: usize,
    pub remote_index: usize,
    pub local_priority: u32,
    pub remote_priority: u32,
    pub state: PairState,
    pub nominated: bool,
    pub binding_request_count: u16,
    pub last_check_sent: Option<Instant>,
    pub transaction_id: Option<[u8; 12]>,
}

impl fmt::Display for CandidatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <-> {} (prio {}, {:?})",
            self.local_index,
            self.remote_index,
            self.priority(true),
            self.state
        )
    }
}

impl CandidatePair {
    pub fn new(local_index: usize, remote_index: usize, local_priority: u32, remote_priority: u32) -> Self {
        Self {
            local_index,
            remote_index,
            local_priority,
            remote_priority,
            state: PairState::Waiting,
            nominated: false,
            binding_request_count: 0,
            last_check_sent: None,
            transaction_id: None,
        }
    }

    /// RFC 5245 §5.7.2: `2^32*MIN(G,D) + 2*MAX(G,D) + (G>D?1:0)`, where G
    /// is the controlling agent's candidate priority and D the
    /// controlled agent's.
    pub fn priority(&self, ice_role_controlling: bool) -> u64 {
        let (g, d) = if ice_role_controlling {
            (self.local_priority, self.remote_priority)
        } else {
            (self.remote_priority, self.local_priority)
        };
        (1u64 << 32) * u64::from(g.min(d)) + 2 * u64::from(g.max(d)) + u64::from(g > d)
    }
}

/// Sorts `pairs` by descending priority, matching the ordering the
/// connectivity-check scan consumes (spec.md property 7).
pub fn sort_by_priority(pairs: &mut [CandidatePair], ice_role_controlling: bool) {
    pairs.sort_by(|a, b| b.priority(ice_role_controlling).cmp(&a.priority(ice_role_controlling)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_matches_rfc5245_formula() {
        let pair = CandidatePair::new(0, 0, 100, 200);
        let controlling = pair.priority(true);
        let (g, d) = (100u64, 200u64);
        let expected = (1u64 << 32) * g.min(d) + 2 * g.max(d) + u64::from(g > d);
        assert_eq!(controlling, expected);
    }

    #[test]
    fn sort_is_descending_and_stable_under_the_formula() {
        let mut pairs = vec![
            CandidatePair::new(0, 0, 10, 10),
            CandidatePair::new(1, 0, 50, 50),
            CandidatePair::new(2, 0, 30, 30),
        ];
        sort_by_priority(&mut pairs, true);
        for w in pairs.windows(2) {
            assert!(w[0].priority(true) >= w[1].priority(true));
        }
    }
}
