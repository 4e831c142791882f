//! State set and transition policy (spec.md §4.8), expressed as a pure
//! function over (state, call result, flags) rather than the table of
//! `fromXState`/`executeXState` function pointers
//! `original_source/src/source/Signaling/StateMachine.c` uses — the
//! caller performs each call itself (sans-I/O) and feeds the outcome
//! back through [`next_state`].

/// One signaling client state (spec.md §4.8's state list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    New,
    GetCredentials,
    Describe,
    Create,
    GetEndpoint,
    GetIceConfig,
    Ready,
    Connect,
    Connected,
    Disconnected,
    Delete,
    Deleted,
}

/// Normalized outcome of a control-plane call, the input that drives
/// [`next_state`] (spec.md §4.8 "Transition policy").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallResult {
    Ok,
    ResourceNotFound,
    Forbidden,
    NotAuthorized,
    TokenExpired,
    ReconnectIce,
    SignalingGoAway,
    NetworkTimeout,
    BadRequest,
}

/// Computes the next state from the current state, the last call's
/// result, and the two standing flags spec.md §4.8 calls out
/// (`deleting`, `refreshIceConfig`). `refresh_ice_config` overrides the
/// computed next state only when the call itself succeeded, matching
/// the original's "only checked on an `OK` advance" placement.
pub fn next_state(current: State, result: CallResult, deleting: bool, refresh_ice_config: bool) -> State {
    use CallResult::*;
    use State::*;

    if matches!(result, Forbidden | NotAuthorized | TokenExpired) {
        return GetCredentials;
    }

    let advanced = match (current, result) {
        (_, Ok) => {
            if deleting && current != Delete && current != Deleted {
                Delete
            } else {
                match current {
                    New => GetCredentials,
                    GetCredentials => Describe,
                    Describe => GetEndpoint,
                    Create => Describe,
                    GetEndpoint => GetIceConfig,
                    GetIceConfig => Ready,
                    Ready => Connect,
                    Connect => Connected,
                    Connected => Connected,
                    Disconnected => Connect,
                    Delete => Deleted,
                    Deleted => Deleted,
                }
            }
        }
        (Describe, ResourceNotFound) => Create,
        (Connect, ResourceNotFound) => Describe,
        (_, ReconnectIce) => GetIceConfig,
        (Connected, SignalingGoAway) => Describe,
        (Connect, NetworkTimeout) => GetEndpoint,
        (Delete, BadRequest) => Describe,
        (state, _) => state,
    };

    if matches!(result, Ok) && refresh_ice_config && advanced != Delete && advanced != Deleted {
        GetIceConfig
    } else {
        advanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_advances_through_every_state_in_order() {
        let mut state = State::New;
        let order = [
            State::GetCredentials,
            State::Describe,
            State::GetEndpoint,
            State::GetIceConfig,
            State::Ready,
            State::Connect,
            State::Connected,
        ];
        for expected in order {
            state = next_state(state, CallResult::Ok, false, false);
            assert_eq!(state, expected);
        }
    }

    #[test]
    fn s6_signaling_reconnect() {
        let mut state = State::Connected;
        state = next_state(state, CallResult::SignalingGoAway, false, false);
        assert_eq!(state, State::Describe);
        state = next_state(state, CallResult::Ok, false, false);
        assert_eq!(state, State::GetEndpoint);
        state = next_state(state, CallResult::Ok, false, false);
        assert_eq!(state, State::GetIceConfig);
        state = next_state(state, CallResult::Ok, false, false);
        assert_eq!(state, State::Ready);
        state = next_state(state, CallResult::Ok, false, false);
        assert_eq!(state, State::Connect);
        state = next_state(state, CallResult::Ok, false, false);
        assert_eq!(state, State::Connected);
    }

    #[test]
    fn describe_resource_not_found_creates_channel_then_redescribes() {
        let mut state = next_state(State::Describe, CallResult::ResourceNotFound, false, false);
        assert_eq!(state, State::Create);
        state = next_state(state, CallResult::Ok, false, false);
        assert_eq!(state, State::Describe);
    }

    #[test]
    fn forbidden_always_returns_to_get_credentials() {
        assert_eq!(next_state(State::Connected, CallResult::Forbidden, false, false), State::GetCredentials);
        assert_eq!(next_state(State::Ready, CallResult::NotAuthorized, false, false), State::GetCredentials);
    }

    #[test]
    fn deleting_flag_diverts_every_ok_transition_to_delete() {
        let state = next_state(State::Describe, CallResult::Ok, true, false);
        assert_eq!(state, State::Delete);
    }

    #[test]
    fn refresh_ice_config_overrides_the_computed_next_state() {
        let state = next_state(State::Ready, CallResult::Ok, false, true);
        assert_eq!(state, State::GetIceConfig);
    }

    #[test]
    fn delete_bad_request_redescribes_to_refresh_update_version() {
        assert_eq!(next_state(State::Delete, CallResult::BadRequest, true, false), State::Describe);
    }
}
