//! Signaling client (spec.md §4.8, "Signaling client" type in §3).
//! Sans-I/O: the caller performs each control-plane call (describe,
//! create, get-endpoint, get-ice-config, connect, delete — spec.md §6
//! keeps the HTTP transport external) and feeds the outcome back
//! through [`SignalingClient::handle_result`]; [`poll_action`] tells
//! the caller which call to make next, the same shape
//! `edgertc-ice`'s agent uses for `poll_transmit`/`handle_read`.

use crate::error::Error;
use crate::retry::{policy_for, RetryBudget};
use crate::state::{next_state, CallResult, State};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Channel identity and endpoints the client has discovered so far
/// (spec.md §3's "channel info").
#[derive(Debug, Clone, Default)]
pub struct ChannelInfo {
    pub name: String,
    pub arn: String,
    pub region: String,
    pub https_endpoint: String,
    pub wss_endpoint: String,
    pub tags: Vec<(String, String)>,
    pub ttl: Option<Duration>,
}

/// AWS credentials with an expiration the client watches so it can
/// preemptively return to `GetCredentials` (spec.md §4.8 "token
/// expired").
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub expiration: Instant,
}

impl Credentials {
    pub fn expired(&self, now: Instant) -> bool {
        now >= self.expiration
    }
}

/// The call the caller should make next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    GetCredentials,
    Describe,
    Create,
    GetEndpoint,
    GetIceConfig,
    Connect,
    Delete,
}

impl Action {
    fn for_state(state: State) -> Option<Self> {
        match state {
            State::GetCredentials => Some(Action::GetCredentials),
            State::Describe => Some(Action::Describe),
            State::Create => Some(Action::Create),
            State::GetEndpoint => Some(Action::GetEndpoint),
            State::GetIceConfig => Some(Action::GetIceConfig),
            State::Connect => Some(Action::Connect),
            State::Delete => Some(Action::Delete),
            State::New | State::Ready | State::Connected | State::Disconnected | State::Deleted => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    StateChange(State),
    Failed(Error),
}

/// Standing flags spec.md §3 lists alongside the signaling client's
/// state: `shutdown`, `connected`, `client-ready`, `deleting`,
/// `refresh-ice-config`.
#[derive(Debug, Clone, Copy, Default)]
struct Flags {
    shutdown: bool,
    client_ready: bool,
    deleting: bool,
    refresh_ice_config: bool,
}

pub struct SignalingClient {
    state: State,
    flags: Flags,
    budget: RetryBudget,
    state_deadline: Option<Instant>,
    step_until: Option<Instant>,
    pending_action: Option<Action>,
    events: VecDeque<Event>,
}

impl SignalingClient {
    pub fn new() -> Self {
        let mut client = Self {
            state: State::New,
            flags: Flags::default(),
            budget: RetryBudget::default(),
            state_deadline: None,
            step_until: None,
            pending_action: None,
            events: VecDeque::new(),
        };
        client.enter_state(State::New, None);
        // `New` has no associated call (spec.md's `fromNewSignalingState`
        // equivalent always advances immediately); fast-forward so the
        // caller's first `poll_action` sees `GetCredentials`.
        let first = next_state(State::New, CallResult::Ok, false, false);
        client.enter_state(first, None);
        client
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, State::Deleted)
    }

    /// Bounds the state machine's total runtime (spec.md §5
    /// "Cancellation": "a `stepUntil` deadline to bound the state
    /// machine's total runtime").
    pub fn set_step_until(&mut self, deadline: Instant) {
        self.step_until = Some(deadline);
    }

    pub fn shutdown(&mut self) {
        self.flags.shutdown = true;
    }

    pub fn is_shutdown(&self) -> bool {
        self.flags.shutdown
    }

    pub fn request_delete(&mut self) {
        self.flags.deleting = true;
    }

    pub fn request_ice_config_refresh(&mut self) {
        self.flags.refresh_ice_config = true;
    }

    pub fn is_connected(&self) -> bool {
        self.state == State::Connected
    }

    /// The call to make next, if any (states like `Ready`/`Connected`
    /// have no associated call and return `None`).
    pub fn poll_action(&mut self) -> Option<Action> {
        if self.flags.shutdown {
            return None;
        }
        self.pending_action.take()
    }

    pub fn poll_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn poll_timeout(&self) -> Option<Instant> {
        if self.flags.shutdown {
            return None;
        }
        match (self.state_deadline, self.step_until) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }

    /// Promotes a state-local timeout or an overall `stepUntil`
    /// deadline expiry into a failure event.
    pub fn handle_timeout(&mut self, now: Instant) {
        if self.flags.shutdown {
            return;
        }
        if let Some(deadline) = self.step_until {
            if now >= deadline {
                self.events.push_back(Event::Failed(Error::OperationTimedOut));
                self.flags.shutdown = true;
                return;
            }
        }
        if let Some(deadline) = self.state_deadline {
            if now >= deadline {
                self.handle_result(CallResult::NetworkTimeout, now);
            }
        }
    }

    /// Feeds back the outcome of the action [`poll_action`] most
    /// recently returned.
    pub fn handle_result(&mut self, result: CallResult, now: Instant) {
        if self.flags.shutdown {
            return;
        }
        if let Err(failure) = self.budget.record_attempt(self.state) {
            self.events.push_back(Event::Failed(failure));
            self.flags.shutdown = true;
            return;
        }
        if result == CallResult::Ok && self.state == State::GetCredentials {
            self.flags.client_ready = true;
        }
        let next = next_state(self.state, result, self.flags.deleting, self.flags.refresh_ice_config);
        if result == CallResult::Ok {
            self.flags.refresh_ice_config = false;
        }
        self.enter_state(next, Some(now));
    }

    fn enter_state(&mut self, state: State, now: Option<Instant>) {
        let changed = state != self.state;
        self.state = state;
        self.budget.reset();
        self.pending_action = Action::for_state(state);
        let policy = policy_for(state);
        self.state_deadline = now.map(|now| now + policy.timeout);
        if changed {
            self.events.push_back(Event::StateChange(state));
        }
    }
}

impl Default for SignalingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drives_describe_create_get_endpoint_sequence() {
        let mut client = SignalingClient::new();
        let now = Instant::now();
        assert_eq!(client.poll_action(), Some(Action::GetCredentials));
        client.handle_result(CallResult::Ok, now);
        assert_eq!(client.state(), State::Describe);

        assert_eq!(client.poll_action(), Some(Action::Describe));
        client.handle_result(CallResult::ResourceNotFound, now);
        assert_eq!(client.state(), State::Create);

        assert_eq!(client.poll_action(), Some(Action::Create));
        client.handle_result(CallResult::Ok, now);
        assert_eq!(client.state(), State::Describe);

        assert_eq!(client.poll_action(), Some(Action::Describe));
        client.handle_result(CallResult::Ok, now);
        assert_eq!(client.state(), State::GetEndpoint);
    }

    #[test]
    fn s6_reconnect_emits_every_state_change_once_in_order() {
        let mut client = SignalingClient::new();
        let now = Instant::now();
        // Drive to Connected first.
        for result in [CallResult::Ok; 6] {
            client.handle_result(result, now);
        }
        assert_eq!(client.state(), State::Connected);
        while client.poll_event().is_some() {}

        client.handle_result(CallResult::SignalingGoAway, now);
        let mut observed = Vec::new();
        while let Some(Event::StateChange(s)) = client.poll_event() {
            observed.push(s);
        }
        assert_eq!(observed, vec![State::Describe]);

        for (result, expected) in [
            (CallResult::Ok, State::GetEndpoint),
            (CallResult::Ok, State::GetIceConfig),
            (CallResult::Ok, State::Ready),
            (CallResult::Ok, State::Connect),
            (CallResult::Ok, State::Connected),
        ] {
            client.handle_result(result, now);
            assert_eq!(client.state(), expected);
        }
    }

    #[test]
    fn retry_budget_exhaustion_fails_and_shuts_down() {
        let mut client = SignalingClient::new();
        let now = Instant::now();
        client.handle_result(CallResult::Ok, now); // -> Describe
        for _ in 0..4 {
            client.handle_result(CallResult::NetworkTimeout, now);
        }
        let mut failed = false;
        while let Some(event) = client.poll_event() {
            if matches!(event, Event::Failed(Error::DescribeCallFailed)) {
                failed = true;
            }
        }
        assert!(failed);
        assert!(client.is_shutdown());
    }

    #[test]
    fn deleting_flag_routes_through_delete_to_terminal_state() {
        let mut client = SignalingClient::new();
        let now = Instant::now();
        client.request_delete();
        client.handle_result(CallResult::Ok, now); // GetCredentials -> Delete (deleting overrides)
        assert_eq!(client.state(), State::Delete);
        client.handle_result(CallResult::Ok, now);
        assert_eq!(client.state(), State::Deleted);
        assert!(client.is_terminal());
    }
}
