//! Per-state retry budget and timeout (spec.md §4.8 "Each state has a
//! retry budget and a state-specific timeout; exhaustion promotes the
//! call result to the state's mapped failure status").

use crate::error::Error;
use crate::state::State;
use std::time::Duration;

/// Timeout and retry budget for one state, and the error it maps to
/// once the budget is exhausted.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub timeout: Duration,
    pub exhausted: Error,
}

impl RetryPolicy {
    const fn new(max_attempts: u32, timeout: Duration, exhausted: Error) -> Self {
        Self { max_attempts, timeout, exhausted }
    }
}

/// Looks up the retry policy for a state. States with no associated
/// control-plane call (`Ready`, `Connected`, `Disconnected`, `Deleted`)
/// get a generous budget since they aren't retried in the same sense.
pub fn policy_for(state: State) -> RetryPolicy {
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
    match state {
        State::New | State::Ready | State::Connected | State::Disconnected | State::Deleted => {
            RetryPolicy::new(u32::MAX, Duration::from_secs(60), Error::OperationTimedOut)
        }
        State::GetCredentials => RetryPolicy::new(3, DEFAULT_TIMEOUT, Error::GetTokenCallFailed),
        State::Describe => RetryPolicy::new(3, DEFAULT_TIMEOUT, Error::DescribeCallFailed),
        State::Create => RetryPolicy::new(3, DEFAULT_TIMEOUT, Error::CreateCallFailed),
        State::GetEndpoint => RetryPolicy::new(3, DEFAULT_TIMEOUT, Error::GetEndpointCallFailed),
        State::GetIceConfig => RetryPolicy::new(3, DEFAULT_TIMEOUT, Error::GetIceConfigCallFailed),
        State::Connect => RetryPolicy::new(3, DEFAULT_TIMEOUT, Error::ConnectCallFailed),
        State::Delete => RetryPolicy::new(3, DEFAULT_TIMEOUT, Error::DeleteCallFailed),
    }
}

/// Tracks attempts spent in the current state.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryBudget {
    attempts: u32,
}

impl RetryBudget {
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Records one attempt; returns `Err` with the state's mapped
    /// failure status once the budget for `state` is exhausted.
    pub fn record_attempt(&mut self, state: State) -> Result<(), Error> {
        self.attempts += 1;
        let policy = policy_for(state);
        if self.attempts > policy.max_attempts {
            Err(policy.exhausted)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_fails_after_max_attempts() {
        let mut budget = RetryBudget::default();
        for _ in 0..3 {
            assert!(budget.record_attempt(State::Describe).is_ok());
        }
        assert_eq!(budget.record_attempt(State::Describe), Err(Error::DescribeCallFailed));
    }

    #[test]
    fn reset_clears_attempt_count() {
        let mut budget = RetryBudget::default();
        budget.record_attempt(State::Connect).unwrap();
        budget.record_attempt(State::Connect).unwrap();
        budget.reset();
        assert!(budget.record_attempt(State::Connect).is_ok());
    }
}
