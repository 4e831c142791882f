//! TURN client state machine (spec.md §4.2 "M2").
//!
//! Driven the same way `rtc-turn::client::Client` is: `handle_read` for
//! inbound datagrams, `poll_transmit`/`poll_event`/`poll_timeout` and
//! `handle_timeout` for everything outbound, timed, or observable. The
//! caller owns the socket (`edgertc-net`) and the event loop.

use crate::error::{Error, Result};
use crate::transaction::{TransactionKind, TransactionMap};
use bytes::{Bytes, BytesMut};
use rand::RngCore;
use shared::{TaggedBytesMut, TransportContext, TransportProtocol};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use stun::message::{
    Class, Message, METHOD_ALLOCATE, METHOD_CHANNEL_BIND, METHOD_CREATE_PERMISSION, METHOD_DATA,
    METHOD_REFRESH,
};
use stun::{integrity, Attribute};

const PROTO_UDP: u8 = 17;
const DEFAULT_ALLOCATION_LIFETIME: Duration = Duration::from_secs(600);
const ALLOCATION_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const PERMISSION_LIFETIME: Duration = Duration::from_secs(300);
const PERMISSION_REFRESH_MARGIN: Duration = Duration::from_secs(30);
const FIRST_CHANNEL_NUMBER: u16 = 0x4000;
const LAST_CHANNEL_NUMBER: u16 = 0x7fff;

/// Client-level state, named to match spec.md's state diagram exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    New,
    CheckSocket,
    GetCredentials,
    Allocation,
    CreatePermission,
    BindChannel,
    Ready,
    CleanUp,
    Failed,
}

#[derive(Debug)]
pub enum Event {
    Allocated(SocketAddr),
    AllocateFailed(Error),
    PermissionCreated(SocketAddr),
    PermissionFailed(SocketAddr, Error),
    ChannelBound(SocketAddr, u16),
    ChannelBindFailed(SocketAddr, Error),
    Data(SocketAddr, Bytes),
    /// The named state's deadline expired without progress (spec.md
    /// "Failure semantics"); fires exactly once per failure.
    StateFailed(State, Error),
}

struct PeerState {
    has_permission: bool,
    permission_refresh_at: Option<Instant>,
    channel_number: Option<u16>,
}

pub struct TurnClientConfig {
    pub server_addr: SocketAddr,
    pub local_addr: SocketAddr,
    pub username: String,
    pub password: String,
}

pub struct Client {
    server_addr: SocketAddr,
    local_addr: SocketAddr,
    username: String,
    password: String,
    realm: String,
    nonce: String,
    integrity_key: Option<Vec<u8>>,

    state: State,
    relayed_addr: Option<SocketAddr>,
    allocation_refresh_at: Option<Instant>,

    peers: HashMap<SocketAddr, PeerState>,
    pending_peers: VecDeque<SocketAddr>,
    next_channel_number: u16,

    transactions: TransactionMap,
    events: VecDeque<Event>,
    outbound: VecDeque<TaggedBytesMut>,
}

impl Client {
    pub fn new(config: TurnClientConfig) -> Self {
        Self {
            server_addr: config.server_addr,
            local_addr: config.local_addr,
            username: config.username,
            password: config.password,
            realm: String::new(),
            nonce: String::new(),
            integrity_key: None,
            state: State::New,
            relayed_addr: None,
            allocation_refresh_at: None,
            peers: HashMap::new(),
            pending_peers: VecDeque::new(),
            next_channel_number: FIRST_CHANNEL_NUMBER,
            transactions: TransactionMap::new(),
            events: VecDeque::new(),
            outbound: VecDeque::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn relayed_addr(&self) -> Option<SocketAddr> {
        self.relayed_addr
    }

    /// Starts the allocation handshake. `check-socket` has no meaningful
    /// I/O in a sans-I/O client (the caller already owns a bound
    /// socket via `edgertc-net`), so it's folded into this call.
    pub fn start(&mut self, now: Instant) {
        if self.state != State::New {
            return;
        }
        self.state = State::CheckSocket;
        self.state = State::GetCredentials;
        self.send_allocate(TransactionKind::AllocateAttempt, &[], now);
    }

    /// Requests a relayed path to `peer_addr`. Queued until the
    /// allocation succeeds if called early.
    pub fn add_peer(&mut self, peer_addr: SocketAddr, now: Instant) -> Result<()> {
        if let Some(relayed) = self.relayed_addr {
            if relayed.is_ipv4() != peer_addr.is_ipv4() {
                return Err(shared::Error::InvalidArgument(
                    "peer address family must match the allocation's".to_string(),
                )
                .into());
            }
        }
        if self.peers.contains_key(&peer_addr) {
            return Ok(());
        }
        self.peers.insert(
            peer_addr,
            PeerState {
                has_permission: false,
                permission_refresh_at: None,
                channel_number: None,
            },
        );
        if self.relayed_addr.is_some() {
            self.send_create_permission(peer_addr, now);
        } else {
            self.pending_peers.push_back(peer_addr);
        }
        Ok(())
    }

    /// Sends `data` to `peer_addr`, framed as TURN ChannelData. Requires
    /// a channel already bound via the create-permission/bind-channel
    /// handshake started by [`Client::add_peer`].
    pub fn send_to(&mut self, peer_addr: SocketAddr, data: &[u8], now: Instant) -> Result<()> {
        let channel = self
            .peers
            .get(&peer_addr)
            .and_then(|p| p.channel_number)
            .ok_or(Error::NoPermission(peer_addr))?;
        let mut framed = BytesMut::with_capacity(4 + data.len());
        framed.extend_from_slice(&channel.to_be_bytes());
        framed.extend_from_slice(&(data.len() as u16).to_be_bytes());
        framed.extend_from_slice(data);
        self.outbound.push_back(TaggedBytesMut {
            now,
            transport: TransportContext {
                local_addr: self.local_addr,
                peer_addr: self.server_addr,
                transport_protocol: TransportProtocol::Udp,
                ecn: None,
            },
            message: framed,
        });
        Ok(())
    }

    pub fn close(&mut self, now: Instant) {
        if matches!(self.state, State::Failed | State::CleanUp) {
            return;
        }
        self.state = State::CleanUp;
        if self.relayed_addr.is_some() {
            let attrs = vec![Attribute::Lifetime(0)];
            self.send_authenticated(METHOD_REFRESH, TransactionKind::Refresh, attrs, now);
        } else {
            self.state = State::Failed;
        }
    }

    pub fn poll_transmit(&mut self) -> Option<TaggedBytesMut> {
        if let Some(t) = self.outbound.pop_front() {
            return Some(t);
        }
        self.transactions.poll_transmit().map(|t| TaggedBytesMut {
            now: t.now,
            transport: t.transport,
            message: t.message,
        })
    }

    pub fn poll_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn poll_timeout(&self) -> Option<Instant> {
        let mut eto = self.transactions.poll_timeout();
        if let Some(t) = self.allocation_refresh_at {
            eto = Some(eto.map_or(t, |e| e.min(t)));
        }
        for peer in self.peers.values() {
            if let Some(t) = peer.permission_refresh_at {
                eto = Some(eto.map_or(t, |e| e.min(t)));
            }
        }
        eto
    }

    pub fn handle_timeout(&mut self, now: Instant) {
        self.transactions.handle_timeout(now);
        while let Some((_, kind)) = self.transactions.poll_timed_out() {
            self.on_transaction_timed_out(kind);
        }

        if let Some(refresh_at) = self.allocation_refresh_at {
            if now >= refresh_at {
                self.allocation_refresh_at = None;
                let attrs = vec![Attribute::Lifetime(DEFAULT_ALLOCATION_LIFETIME.as_secs() as u32)];
                self.send_authenticated(METHOD_REFRESH, TransactionKind::Refresh, attrs, now);
            }
        }

        let due: Vec<SocketAddr> = self
            .peers
            .iter()
            .filter(|(_, p)| p.permission_refresh_at.is_some_and(|t| now >= t))
            .map(|(addr, _)| *addr)
            .collect();
        for peer_addr in due {
            self.send_create_permission(peer_addr, now);
        }
    }

    pub fn handle_read(&mut self, msg: TaggedBytesMut, now: Instant) -> Result<()> {
        let data = &msg.message[..];
        if data.len() >= 4 {
            let candidate_channel = u16::from_be_bytes([data[0], data[1]]);
            if (FIRST_CHANNEL_NUMBER..=LAST_CHANNEL_NUMBER).contains(&candidate_channel) {
                return self.handle_channel_data(candidate_channel, data);
            }
        }

        let message = Message::decode(data, self.integrity_key.as_deref())?;
        match message.class {
            Class::Indication => self.handle_indication(message),
            Class::Request => Ok(()),
            Class::SuccessResponse | Class::ErrorResponse => {
                self.handle_transactional(message, now)
            }
        }
    }

    fn handle_channel_data(&mut self, channel: u16, data: &[u8]) -> Result<()> {
        let length = u16::from_be_bytes([data[2], data[3]]) as usize;
        if data.len() < 4 + length {
            return Ok(());
        }
        let peer_addr = self
            .peers
            .iter()
            .find(|(_, p)| p.channel_number == Some(channel))
            .map(|(addr, _)| *addr);
        if let Some(peer_addr) = peer_addr {
            self.events
                .push_back(Event::Data(peer_addr, Bytes::copy_from_slice(&data[4..4 + length])));
        }
        Ok(())
    }

    fn handle_indication(&mut self, message: Message) -> Result<()> {
        if message.method != METHOD_DATA {
            return Ok(());
        }
        let mut peer_addr = None;
        let mut payload = None;
        for attr in &message.attributes {
            match attr {
                Attribute::XorPeerAddress(addr) => peer_addr = Some((*addr).into()),
                Attribute::Data(d) => payload = Some(Bytes::copy_from_slice(d)),
                _ => {}
            }
        }
        if let (Some(addr), Some(data)) = (peer_addr, payload) {
            self.events.push_back(Event::Data(addr, data));
        }
        Ok(())
    }

    fn handle_transactional(&mut self, message: Message, now: Instant) -> Result<()> {
        let Some(kind) = self.transactions.remove(&message.transaction_id) else {
            return Ok(());
        };
        match kind {
            TransactionKind::AllocateAttempt => self.on_allocate_attempt_response(message, now),
            TransactionKind::AllocateRequest => self.on_allocate_request_response(message),
            TransactionKind::CreatePermission(peer) => {
                self.on_create_permission_response(peer, message, now)
            }
            TransactionKind::Refresh => self.on_refresh_response(message, now),
            TransactionKind::ChannelBind(peer, channel) => {
                self.on_channel_bind_response(peer, channel, message)
            }
        }
        Ok(())
    }

    fn on_allocate_attempt_response(&mut self, message: Message, now: Instant) {
        if message.class == Class::SuccessResponse {
            self.apply_allocation_success(message);
            return;
        }
        let (realm, nonce) = extract_realm_nonce(&message);
        match (realm, nonce) {
            (Some(realm), Some(nonce)) => {
                self.realm = realm.clone();
                self.nonce = nonce.clone();
                self.integrity_key =
                    Some(integrity::long_term_key(&self.username, &realm, &self.password));
                let attrs = vec![Attribute::Lifetime(DEFAULT_ALLOCATION_LIFETIME.as_secs() as u32)];
                self.send_authenticated(METHOD_ALLOCATE, TransactionKind::AllocateRequest, attrs, now);
            }
            _ => {
                self.fail_allocation(Error::AllocationFailed(
                    "401 response missing REALM/NONCE".to_string(),
                ));
            }
        }
    }

    fn on_allocate_request_response(&mut self, message: Message) {
        if message.class == Class::SuccessResponse {
            self.apply_allocation_success(message);
        } else {
            self.fail_allocation(Error::AllocationFailed(error_reason(&message)));
        }
    }

    fn apply_allocation_success(&mut self, message: Message) {
        let mut relayed = None;
        let mut lifetime_secs = DEFAULT_ALLOCATION_LIFETIME.as_secs() as u32;
        for attr in &message.attributes {
            match attr {
                Attribute::XorRelayedAddress(addr) => relayed = Some((*addr).into()),
                Attribute::Lifetime(l) => lifetime_secs = *l,
                _ => {}
            }
        }
        let Some(relayed_addr) = relayed else {
            self.fail_allocation(Error::AllocationFailed(
                "success response missing XOR-RELAYED-ADDRESS".to_string(),
            ));
            return;
        };
        self.relayed_addr = Some(relayed_addr);
        self.allocation_refresh_at = Some(
            Instant::now()
                + Duration::from_secs(lifetime_secs as u64).saturating_sub(ALLOCATION_REFRESH_MARGIN),
        );
        self.events.push_back(Event::Allocated(relayed_addr));
        self.state = if self.pending_peers.is_empty() {
            State::Allocation
        } else {
            State::CreatePermission
        };
        let pending: Vec<SocketAddr> = self.pending_peers.drain(..).collect();
        for peer_addr in pending {
            self.send_create_permission(peer_addr, Instant::now());
        }
    }

    fn fail_allocation(&mut self, err: Error) {
        self.events.push_back(Event::AllocateFailed(err.clone()));
        self.events.push_back(Event::StateFailed(self.state, err));
        self.state = State::Failed;
    }

    fn send_create_permission(&mut self, peer_addr: SocketAddr, now: Instant) {
        self.state = State::CreatePermission;
        let attrs = vec![Attribute::XorPeerAddress(peer_addr.into())];
        self.send_authenticated(
            METHOD_CREATE_PERMISSION,
            TransactionKind::CreatePermission(peer_addr),
            attrs,
            now,
        );
    }

    fn on_create_permission_response(&mut self, peer_addr: SocketAddr, message: Message, now: Instant) {
        if message.class != Class::SuccessResponse {
            let err = Error::CreatePermissionFailed(peer_addr);
            self.peers.remove(&peer_addr);
            self.events.push_back(Event::PermissionFailed(peer_addr, err));
            return;
        }
        if let Some(peer) = self.peers.get_mut(&peer_addr) {
            peer.has_permission = true;
            peer.permission_refresh_at = Some(now + PERMISSION_LIFETIME - PERMISSION_REFRESH_MARGIN);
        }
        self.events.push_back(Event::PermissionCreated(peer_addr));
        self.send_channel_bind(peer_addr, now);
    }

    fn send_channel_bind(&mut self, peer_addr: SocketAddr, now: Instant) {
        self.state = State::BindChannel;
        let channel = self.next_channel_number;
        self.next_channel_number = if self.next_channel_number >= LAST_CHANNEL_NUMBER {
            FIRST_CHANNEL_NUMBER
        } else {
            self.next_channel_number + 1
        };
        let attrs = vec![
            Attribute::ChannelNumber(channel),
            Attribute::XorPeerAddress(peer_addr.into()),
        ];
        self.send_authenticated(
            METHOD_CHANNEL_BIND,
            TransactionKind::ChannelBind(peer_addr, channel),
            attrs,
            now,
        );
    }

    fn on_channel_bind_response(&mut self, peer_addr: SocketAddr, channel: u16, message: Message) {
        if message.class != Class::SuccessResponse {
            self.events.push_back(Event::ChannelBindFailed(
                peer_addr,
                Error::ChannelBindFailed(peer_addr),
            ));
            return;
        }
        if let Some(peer) = self.peers.get_mut(&peer_addr) {
            peer.channel_number = Some(channel);
        }
        self.events.push_back(Event::ChannelBound(peer_addr, channel));
        self.state = State::Ready;
    }

    fn on_refresh_response(&mut self, message: Message, now: Instant) {
        if self.state == State::CleanUp {
            self.state = State::Failed;
            return;
        }
        if message.class != Class::SuccessResponse {
            let err = Error::RefreshFailed(error_reason(&message));
            self.events.push_back(Event::StateFailed(self.state, err));
            self.state = State::Failed;
            return;
        }
        let lifetime_secs = message
            .attributes
            .iter()
            .find_map(|a| match a {
                Attribute::Lifetime(l) => Some(*l),
                _ => None,
            })
            .unwrap_or(DEFAULT_ALLOCATION_LIFETIME.as_secs() as u32);
        self.allocation_refresh_at =
            Some(now + Duration::from_secs(lifetime_secs as u64).saturating_sub(ALLOCATION_REFRESH_MARGIN));
    }

    fn on_transaction_timed_out(&mut self, kind: TransactionKind) {
        match kind {
            TransactionKind::AllocateAttempt | TransactionKind::AllocateRequest => {
                self.fail_allocation(Error::AllocationFailed("no response from TURN server".to_string()));
            }
            TransactionKind::CreatePermission(peer) => {
                let err = Error::CreatePermissionFailed(peer);
                self.peers.remove(&peer);
                self.events.push_back(Event::PermissionFailed(peer, err));
            }
            TransactionKind::ChannelBind(peer, _) => {
                self.events
                    .push_back(Event::ChannelBindFailed(peer, Error::ChannelBindFailed(peer)));
            }
            TransactionKind::Refresh => {
                let err = Error::RefreshFailed("no response from TURN server".to_string());
                self.events.push_back(Event::StateFailed(self.state, err));
                self.state = State::Failed;
            }
        }
    }

    fn send_allocate(&mut self, kind: TransactionKind, attrs: &[Attribute], now: Instant) {
        let mut all_attrs = vec![Attribute::RequestedTransport(PROTO_UDP)];
        all_attrs.extend_from_slice(attrs);
        self.build_and_send(METHOD_ALLOCATE, kind, all_attrs, None, now);
    }

    fn send_authenticated(&mut self, method: u16, kind: TransactionKind, mut attrs: Vec<Attribute>, now: Instant) {
        if !self.username.is_empty() {
            attrs.push(Attribute::Username(self.username.clone()));
        }
        if !self.realm.is_empty() {
            attrs.push(Attribute::Realm(self.realm.clone()));
        }
        if !self.nonce.is_empty() {
            attrs.push(Attribute::Nonce(self.nonce.clone()));
        }
        let key = self.integrity_key.clone();
        self.build_and_send(method, kind, attrs, key, now);
    }

    fn build_and_send(
        &mut self,
        method: u16,
        kind: TransactionKind,
        attrs: Vec<Attribute>,
        key: Option<Vec<u8>>,
        now: Instant,
    ) {
        let transaction_id = new_transaction_id();
        let mut message = Message::new(method, Class::Request, transaction_id);
        for attr in attrs {
            message = message.with_attribute(attr);
        }
        let encoded = match message.encode(key.as_deref(), true) {
            Ok(bytes) => bytes,
            Err(_) => return,
        };
        self.transactions.insert(
            transaction_id,
            kind,
            BytesMut::from(&encoded[..]),
            self.local_addr,
            self.server_addr,
            now,
        );
    }
}

fn new_transaction_id() -> [u8; 12] {
    let mut id = [0u8; 12];
    rand::rng().fill_bytes(&mut id);
    id
}

fn extract_realm_nonce(message: &Message) -> (Option<String>, Option<String>) {
    let mut realm = None;
    let mut nonce = None;
    for attr in &message.attributes {
        match attr {
            Attribute::Realm(r) => realm = Some(r.clone()),
            Attribute::Nonce(n) => nonce = Some(n.clone()),
            _ => {}
        }
    }
    (realm, nonce)
}

fn error_reason(message: &Message) -> String {
    message
        .attributes
        .iter()
        .find_map(|a| match a {
            Attribute::ErrorCode { code, reason } => Some(format!("{code} {reason}")),
            _ => None,
        })
        .unwrap_or_else(|| "unknown error".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stun::message::METHOD_ALLOCATE as ALLOCATE;

    fn config() -> TurnClientConfig {
        TurnClientConfig {
            server_addr: "203.0.113.1:3478".parse().unwrap(),
            local_addr: "198.51.100.1:52000".parse().unwrap(),
            username: "user".to_string(),
            password: "pass".to_string(),
        }
    }

    fn as_server_reply(client_request: &TaggedBytesMut, reply: Message, key: Option<&[u8]>) -> TaggedBytesMut {
        TaggedBytesMut {
            now: client_request.now,
            transport: TransportContext {
                local_addr: client_request.transport.local_addr,
                peer_addr: client_request.transport.peer_addr,
                transport_protocol: TransportProtocol::Udp,
                ecn: None,
            },
            message: BytesMut::from(&reply.encode(key, false).unwrap()[..]),
        }
    }

    /// Scenario S5: unauthenticated allocate -> 401 with REALM/NONCE ->
    /// long-term-key authenticated retry -> success, then the client
    /// immediately pursues create-permission for a queued peer.
    #[test]
    fn s5_turn_long_term_key_flow() {
        let mut client = Client::new(config());
        let now = Instant::now();
        let peer_addr: SocketAddr = "192.0.2.9:4000".parse().unwrap();
        client.add_peer(peer_addr, now).unwrap();

        client.start(now);
        let first_request = client.poll_transmit().expect("initial ALLOCATE sent");
        let first_decoded = Message::decode(&first_request.message, None).unwrap();
        assert_eq!(first_decoded.method, ALLOCATE);
        assert!(client.integrity_key.is_none());

        let unauthorized = Message::new(ALLOCATE, Class::ErrorResponse, first_decoded.transaction_id)
            .with_attribute(Attribute::ErrorCode {
                code: 401,
                reason: "Unauthorized".to_string(),
            })
            .with_attribute(Attribute::Realm("example.com".to_string()))
            .with_attribute(Attribute::Nonce("abc".to_string()));
        client
            .handle_read(as_server_reply(&first_request, unauthorized, None), now)
            .unwrap();

        let expected_key = integrity::long_term_key("user", "example.com", "pass");
        assert_eq!(client.integrity_key.as_deref(), Some(expected_key.as_slice()));

        let second_request = client.poll_transmit().expect("authenticated ALLOCATE sent");
        let second_decoded =
            Message::decode(&second_request.message, Some(&expected_key)).expect("integrity verifies");
        assert!(second_decoded
            .attributes
            .iter()
            .any(|a| matches!(a, Attribute::Username(u) if u == "user")));

        let relayed_addr: SocketAddr = "203.0.113.1:50000".parse().unwrap();
        let success = Message::new(ALLOCATE, Class::SuccessResponse, second_decoded.transaction_id)
            .with_attribute(Attribute::XorRelayedAddress(relayed_addr.into()))
            .with_attribute(Attribute::Lifetime(600));
        client
            .handle_read(
                as_server_reply(&second_request, success, Some(&expected_key)),
                now,
            )
            .unwrap();

        assert_eq!(client.relayed_addr(), Some(relayed_addr));
        assert!(matches!(client.poll_event(), Some(Event::Allocated(addr)) if addr == relayed_addr));
        assert_eq!(client.state(), State::CreatePermission);

        let permission_request = client
            .poll_transmit()
            .expect("CreatePermission sent for the queued peer");
        let permission_decoded =
            Message::decode(&permission_request.message, Some(&expected_key)).unwrap();
        assert_eq!(permission_decoded.method, stun::message::METHOD_CREATE_PERMISSION);
        assert!(permission_decoded
            .attributes
            .iter()
            .any(|a| matches!(a, Attribute::XorPeerAddress(addr) if SocketAddr::from(*addr) == peer_addr)));
    }

    #[test]
    fn allocate_timeout_emits_failure_and_no_further_transmits() {
        let mut client = Client::new(config());
        let mut now = Instant::now();
        client.start(now);
        assert!(client.poll_transmit().is_some());

        for _ in 0..8 {
            now += Duration::from_secs(2);
            client.handle_timeout(now);
            while client.poll_transmit().is_some() {}
        }

        assert_eq!(client.state(), State::Failed);
        let events: Vec<_> = std::iter::from_fn(|| client.poll_event()).collect();
        assert!(events.iter().any(|e| matches!(e, Event::AllocateFailed(_))));
    }

    #[test]
    fn send_to_without_channel_errors() {
        let mut client = Client::new(config());
        let now = Instant::now();
        let peer_addr: SocketAddr = "192.0.2.9:4000".parse().unwrap();
        assert!(matches!(
            client.send_to(peer_addr, b"hi", now),
            Err(Error::NoPermission(_))
        ));
    }
}
