//! ICE agent state machine (spec.md §4.3 "M3"). Grounded on
//! `rtc-ice/src/agent/mod.rs` (`Agent`, `handle_inbound`,
//! `contact`/ticker loop) and `agent_selector.rs` (nomination,
//! keepalive), collapsed into a sans-I/O struct the caller drives with
//! `handle_read`/`poll_transmit`/`poll_timeout`/`handle_timeout`
//! instead of the teacher's background tokio tasks.

use crate::candidate::{Candidate, CandidateType};
use crate::error::{Error, Result};
use crate::pair::{CandidatePair, PairState};
use rand::RngCore;
use shared::addr::SocketAddress;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use stun::message::{Class, Message, METHOD_BINDING};
use stun::Attribute;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);
const DEFAULT_DISCONNECT_GRACE: Duration = Duration::from_secs(5);
const DEFAULT_FAILED_GRACE: Duration = Duration::from_secs(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Controlling,
    Controlled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    New,
    CheckConnection,
    Connected,
    Nominating,
    Ready,
    Disconnected,
    Failed,
}

#[derive(Debug)]
pub enum Event {
    LocalCandidate(usize, Candidate),
    StateChange(AgentState),
    PairSucceeded(usize, usize),
    Nominated(usize, usize),
    PeerReflexiveLocalCandidate(usize, Candidate),
}

pub struct AgentConfig {
    pub local_ufrag: String,
    pub local_pwd: String,
    pub remote_ufrag: String,
    pub remote_pwd: String,
    pub role: Role,
    pub disconnect_grace: Duration,
    pub failed_grace: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            local_ufrag: String::new(),
            local_pwd: String::new(),
            remote_ufrag: String::new(),
            remote_pwd: String::new(),
            role: Role::Controlling,
            disconnect_grace: DEFAULT_DISCONNECT_GRACE,
            failed_grace: DEFAULT_FAILED_GRACE,
        }
    }
}

struct Outbound {
    local_index: usize,
    to: SocketAddress,
    data: Vec<u8>,
}

pub struct Agent {
    config: AgentConfig,
    tie_breaker: u64,
    state: AgentState,
    state_before_disconnect: AgentState,

    local_candidates: Vec<Candidate>,
    remote_candidates: Vec<Candidate>,
    pairs: Vec<CandidatePair>,
    triggered: VecDeque<usize>,
    next_ordinary_check: usize,

    last_data_received: Instant,
    disconnected_at: Option<Instant>,
    last_keepalive: Vec<Option<Instant>>,

    transmits: VecDeque<Outbound>,
    events: VecDeque<Event>,
}

impl Agent {
    pub fn new(config: AgentConfig, now: Instant) -> Self {
        let mut id = [0u8; 8];
        rand::rng().fill_bytes(&mut id);
        Self {
            config,
            tie_breaker: u64::from_be_bytes(id),
            state: AgentState::New,
            state_before_disconnect: AgentState::New,
            local_candidates: Vec::new(),
            remote_candidates: Vec::new(),
            pairs: Vec::new(),
            triggered: VecDeque::new(),
            next_ordinary_check: 0,
            last_data_received: now,
            disconnected_at: None,
            last_keepalive: Vec::new(),
            transmits: VecDeque::new(),
            events: VecDeque::new(),
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn local_candidates(&self) -> &[Candidate] {
        &self.local_candidates
    }

    pub fn pairs(&self) -> &[CandidatePair] {
        &self.pairs
    }

    pub fn remote_candidate(&self, index: usize) -> Option<&Candidate> {
        self.remote_candidates.get(index)
    }

    /// Records a freshly gathered local candidate and forms pairs with
    /// every known remote candidate (spec.md "Gathering").
    pub fn add_local_candidate(&mut self, candidate: Candidate) -> usize {
        let index = self.local_candidates.len();
        self.local_candidates.push(candidate.clone());
        self.events.push_back(Event::LocalCandidate(index, candidate));
        for remote_index in 0..self.remote_candidates.len() {
            self.form_pair(index, remote_index);
        }
        if self.state == AgentState::New {
            self.state = AgentState::CheckConnection;
            self.events.push_back(Event::StateChange(self.state));
        }
        index
    }

    /// Parses an SDP `a=candidate` line body (spec.md "Remote candidate
    /// parsing"): space-tokenized, TCP rejected, duplicates (same
    /// family/address/port) ignored.
    pub fn add_remote_candidate_line(&mut self, line: &str) -> Result<Option<usize>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 6 {
            return Err(Error::InvalidCandidateLine(line.to_string()));
        }
        let transport = tokens[2];
        if transport.eq_ignore_ascii_case("tcp") {
            return Err(Error::TcpCandidateRejected);
        }
        let address = tokens[4];
        let port: u16 = tokens[5]
            .parse()
            .map_err(|_| Error::InvalidCandidateLine(line.to_string()))?;
        let ip: std::net::IpAddr = address
            .parse()
            .map_err(|_| Error::InvalidCandidateLine(line.to_string()))?;
        let candidate_type = tokens
            .iter()
            .position(|t| *t == "typ")
            .and_then(|i| tokens.get(i + 1))
            .map(|t| match *t {
                "host" => CandidateType::Host,
                "srflx" => CandidateType::ServerReflexive,
                "prflx" => CandidateType::PeerReflexive,
                _ => CandidateType::Relay,
            })
            .unwrap_or(CandidateType::Host);

        let addr = SocketAddress::new(ip, port);
        if self
            .remote_candidates
            .iter()
            .any(|c| c.address.ip() == addr.ip() && c.address.port() == addr.port())
        {
            return Ok(None);
        }

        let candidate = Candidate {
            candidate_type,
            component: crate::candidate::COMPONENT_RTP,
            address: addr,
            related_address: None,
            network_id: String::new(),
        };
        let index = self.remote_candidates.len();
        self.remote_candidates.push(candidate);
        for local_index in 0..self.local_candidates.len() {
            self.form_pair(local_index, index);
        }
        Ok(Some(index))
    }

    fn form_pair(&mut self, local_index: usize, remote_index: usize) {
        let local_priority = self.local_candidates[local_index].priority();
        let remote_priority = self.remote_candidates[remote_index].priority();
        self.pairs
            .push(CandidatePair::new(local_index, remote_index, local_priority, remote_priority));
        self.last_keepalive.push(None);
    }

    fn ice_role_controlling(&self) -> bool {
        self.config.role == Role::Controlling
    }

    fn ordered_pair_indices(&self) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.pairs.len()).collect();
        idx.sort_by(|&a, &b| {
            self.pairs[b]
                .priority(self.ice_role_controlling())
                .cmp(&self.pairs[a].priority(self.ice_role_controlling()))
        });
        idx
    }

    pub fn poll_transmit(&mut self) -> Option<(usize, SocketAddress, Vec<u8>)> {
        self.transmits.pop_front().map(|o| (o.local_index, o.to, o.data))
    }

    pub fn poll_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn poll_timeout(&self) -> Option<Instant> {
        None
    }

    /// Drives the connectivity-check scan and periodic housekeeping;
    /// intended to be called on a fixed tick (the teacher's agent uses
    /// a similar periodic-timer pattern, see `client/periodic_timer.rs`).
    pub fn handle_timeout(&mut self, now: Instant) {
        if matches!(self.state, AgentState::Failed) {
            return;
        }

        if let Some(pair_index) = self.triggered.pop_front() {
            self.send_check(pair_index, now);
        } else if let Some(pair_index) = self.next_waiting_pair() {
            self.send_check(pair_index, now);
        }

        for pair_index in 0..self.pairs.len() {
            if self.pairs[pair_index].state == PairState::Succeeded {
                let due = self.last_keepalive[pair_index]
                    .map(|t| now.duration_since(t) >= KEEPALIVE_INTERVAL)
                    .unwrap_or(true);
                if due {
                    self.send_keepalive(pair_index, now);
                }
            }
        }

        if self.ice_role_controlling() && self.state != AgentState::Ready {
            self.try_nominate(now);
        }

        self.check_disconnection(now);
    }

    fn next_waiting_pair(&self) -> Option<usize> {
        self.ordered_pair_indices()
            .into_iter()
            .find(|&i| self.pairs[i].state == PairState::Waiting)
    }

    fn send_check(&mut self, pair_index: usize, now: Instant) {
        let mut id = [0u8; 12];
        rand::rng().fill_bytes(&mut id);
        let pair = &mut self.pairs[pair_index];
        pair.state = PairState::InProgress;
        pair.binding_request_count += 1;
        pair.transaction_id = Some(id);
        pair.last_check_sent = Some(now);
        let local_priority = pair.local_priority;
        let nominate = pair.nominated;
        let local_index = pair.local_index;
        let remote_index = pair.remote_index;

        let username = format!("{}:{}", self.config.remote_ufrag, self.config.local_ufrag);
        let mut msg = Message::new(METHOD_BINDING, Class::Request, id)
            .with_attribute(Attribute::Username(username))
            .with_attribute(Attribute::Priority(local_priority));
        msg = if self.ice_role_controlling() {
            msg.with_attribute(Attribute::IceControlling(self.tie_breaker))
        } else {
            msg.with_attribute(Attribute::IceControlled(self.tie_breaker))
        };
        if nominate {
            msg = msg.with_attribute(Attribute::UseCandidate);
        }
        let key = stun::integrity::short_term_key(&self.config.remote_pwd);
        if let Ok(encoded) = msg.encode(Some(&key), true) {
            let to = self.remote_candidates[remote_index].address;
            self.transmits.push_back(Outbound {
                local_index,
                to,
                data: encoded,
            });
        }
    }

    fn send_keepalive(&mut self, pair_index: usize, now: Instant) {
        let mut id = [0u8; 12];
        rand::rng().fill_bytes(&mut id);
        let msg = Message::new(METHOD_BINDING, Class::Indication, id);
        if let Ok(encoded) = msg.encode(None, true) {
            let pair = &self.pairs[pair_index];
            self.transmits.push_back(Outbound {
                local_index: pair.local_index,
                to: self.remote_candidates[pair.remote_index].address,
                data: encoded,
            });
        }
        self.last_keepalive[pair_index] = Some(now);
    }

    fn try_nominate(&mut self, now: Instant) {
        let best = self
            .ordered_pair_indices()
            .into_iter()
            .find(|&i| self.pairs[i].state == PairState::Succeeded && !self.pairs[i].nominated);
        if let Some(pair_index) = best {
            self.pairs[pair_index].nominated = true;
            self.state = AgentState::Nominating;
            self.events.push_back(Event::StateChange(self.state));
            for i in 0..self.pairs.len() {
                if i != pair_index && self.pairs[i].state != PairState::Succeeded {
                    self.pairs[i].state = PairState::Frozen;
                }
            }
            self.send_check(pair_index, now);
        }
    }

    /// Handles an inbound STUN datagram arriving on local candidate
    /// `local_index` from `from`.
    pub fn handle_read(&mut self, local_index: usize, from: SocketAddress, data: &[u8], now: Instant) -> Result<()> {
        self.last_data_received = now;
        if matches!(self.state, AgentState::Disconnected) {
            self.state = self.state_before_disconnect;
            self.disconnected_at = None;
            self.events.push_back(Event::StateChange(self.state));
        }

        let peek = Message::decode(data, None)?;
        let message = if peek.class == Class::Request {
            Message::decode(data, Some(self.config.local_pwd.as_bytes()))?
        } else {
            peek
        };

        match message.class {
            Class::Request => self.handle_request(local_index, from, message, now),
            Class::Indication => Ok(()),
            Class::SuccessResponse | Class::ErrorResponse => {
                self.handle_response(local_index, from, message, now)
            }
        }
    }

    fn pair_for(&self, local_index: usize, from: &SocketAddress) -> Option<usize> {
        self.pairs.iter().position(|p| {
            p.local_index == local_index
                && self.remote_candidates[p.remote_index].address.ip() == from.ip()
                && self.remote_candidates[p.remote_index].address.port() == from.port()
        })
    }

    fn handle_request(&mut self, local_index: usize, from: SocketAddress, message: Message, now: Instant) -> Result<()> {
        let use_candidate = message.attributes.iter().any(|a| matches!(a, Attribute::UseCandidate));
        let pair_index = match self.pair_for(local_index, &from) {
            Some(i) => i,
            None => {
                let peer_reflexive = Candidate::peer_reflexive(from);
                let remote_index = self.remote_candidates.len();
                self.remote_candidates.push(peer_reflexive.clone());
                self.form_pair(local_index, remote_index);
                self.events
                    .push_back(Event::PeerReflexiveLocalCandidate(remote_index, peer_reflexive));
                self.pairs.len() - 1
            }
        };

        let reply = Message::new(METHOD_BINDING, Class::SuccessResponse, message.transaction_id)
            .with_attribute(Attribute::XorMappedAddress(from));
        let key = stun::integrity::short_term_key(&self.config.local_pwd);
        if let Ok(encoded) = reply.encode(Some(&key), true) {
            self.transmits.push_back(Outbound {
                local_index,
                to: from,
                data: encoded,
            });
        }

        self.triggered.push_back(pair_index);
        if use_candidate {
            self.pairs[pair_index].nominated = true;
        }
        if self.pairs[pair_index].state != PairState::Succeeded {
            self.pairs[pair_index].state = PairState::Waiting;
        }
        let _ = now;
        Ok(())
    }

    fn handle_response(&mut self, local_index: usize, _from: SocketAddress, message: Message, now: Instant) -> Result<()> {
        let Some(pair_index) = self
            .pairs
            .iter()
            .position(|p| p.local_index == local_index && p.transaction_id == Some(message.transaction_id))
        else {
            return Err(Error::UnknownTransaction);
        };

        if message.class != Class::SuccessResponse {
            self.pairs[pair_index].state = PairState::Failed;
            if self.all_pairs_failed() {
                self.state = AgentState::Failed;
                self.events.push_back(Event::StateChange(self.state));
            }
            return Ok(());
        }

        let expected = self.local_candidates[self.pairs[pair_index].local_index].address;
        let observed = message.attributes.iter().find_map(|a| match a {
            Attribute::XorMappedAddress(addr) => Some(*addr),
            _ => None,
        });
        if let Some(observed) = observed {
            if observed.ip() != expected.ip() || observed.port() != expected.port() {
                let prflx = Candidate::peer_reflexive(observed);
                let index = self.local_candidates.len();
                self.local_candidates.push(prflx.clone());
                self.events.push_back(Event::PeerReflexiveLocalCandidate(index, prflx));
            }
        }

        self.pairs[pair_index].state = PairState::Succeeded;
        self.events.push_back(Event::PairSucceeded(
            self.pairs[pair_index].local_index,
            self.pairs[pair_index].remote_index,
        ));
        if self.state == AgentState::CheckConnection {
            self.state = AgentState::Connected;
            self.events.push_back(Event::StateChange(self.state));
        }
        if self.pairs[pair_index].nominated {
            self.state = AgentState::Ready;
            self.events.push_back(Event::StateChange(self.state));
            self.events.push_back(Event::Nominated(
                self.pairs[pair_index].local_index,
                self.pairs[pair_index].remote_index,
            ));
        }
        let _ = now;
        Ok(())
    }

    fn all_pairs_failed(&self) -> bool {
        !self.pairs.is_empty() && self.pairs.iter().all(|p| p.state == PairState::Failed)
    }

    /// spec.md "Disconnection": falls to `disconnected` once the grace
    /// period lapses since the last inbound packet, promotes to
    /// `failed` if recovery doesn't happen before the failed grace.
    fn check_disconnection(&mut self, now: Instant) {
        if matches!(self.state, AgentState::New | AgentState::Failed) {
            return;
        }
        let idle = now.duration_since(self.last_data_received);
        if self.state != AgentState::Disconnected {
            if idle >= self.config.disconnect_grace {
                self.state_before_disconnect = self.state;
                self.state = AgentState::Disconnected;
                self.disconnected_at = Some(now);
                self.events.push_back(Event::StateChange(self.state));
            }
        } else if let Some(since) = self.disconnected_at {
            if now.duration_since(since) >= self.config.failed_grace {
                self.state = AgentState::Failed;
                self.events.push_back(Event::StateChange(self.state));
            }
        }
    }
}
