//! Peer connection (spec.md §4.7 "H2"): wires the ICE agent, DTLS
//! session, SRTP context, transceivers, and data-channel table into
//! one sans-I/O object. Grounded on
//! `original_source/src/source/PeerConnection/PeerConnection.c`'s
//! `onIceConnectionStateChange`/`onInboundPacket` wiring, collapsed
//! into the `handle_read`/`poll_transmit`/`poll_event`/`poll_timeout`/
//! `handle_timeout` shape the rest of this workspace uses.

use crate::codec::{CodecTable, RtxTable};
use crate::connection::{ConnectionLifecycle, ConnectionState};
use crate::data_channel::DataChannelTable;
use crate::error::{Error, Result};
use crate::transceiver::Transceiver;
use bytes::Bytes;
use ice::{Agent, AgentConfig, AgentState, Candidate};
use rand::RngCore;
use rtcp::Packet as RtcpPacket;
use shared::addr::SocketAddress;
use std::collections::VecDeque;
use std::time::Instant;
use transport::{DemuxClass, Demuxed, HandshakeStatus, Role as DtlsRole, SrtpContext, SrtpKeyingMaterial, TlsSession};

const JSON_SAFE_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz+/";
const UFRAG_LEN: usize = 4;
const PWD_LEN: usize = 24;
const CNAME_LEN: usize = 16;

fn random_json_safe_string(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| JSON_SAFE_CHARS[(*b as usize) % JSON_SAFE_CHARS.len()] as char).collect()
}

#[derive(Debug, Clone)]
pub enum Event {
    StateChange(ConnectionState),
    LocalCandidate(Candidate),
    /// A datagram that arrived before a DTLS session was installed
    /// (spec.md §4.7 inbound-packet callback). Once a DTLS session is
    /// installed every datagram instead goes through the STUN/DTLS/
    /// SRTP demux.
    InboundPacket(Bytes),
    FrameReady { transceiver: usize, payload: Bytes, timestamp: u32 },
    KeyFrameRequested { transceiver: usize },
    BitrateEstimate { transceiver: usize, bps: u64 },
    DtlsFailure(String),
}

pub struct PeerConnection {
    ice: Agent,
    tls: Option<Box<dyn TlsSession>>,
    srtp: Option<SrtpContext>,
    dtls_role: DtlsRole,
    remote_fingerprint: Option<String>,

    local_ice_ufrag: String,
    local_ice_pwd: String,
    local_cname: String,

    transceivers: Vec<Transceiver>,
    codecs: CodecTable,
    rtx: RtxTable,
    data_channels: DataChannelTable,

    lifecycle: ConnectionLifecycle,
    active_remote: Option<(usize, SocketAddress)>,

    events: VecDeque<Event>,
    transmits: VecDeque<(usize, SocketAddress, Vec<u8>)>,

    /// Counts internal recoverable faults (decrypt failure, unrouted
    /// SSRC, undefined demux byte) swallowed rather than surfaced
    /// (spec.md §4.4, line 214: "logged and swallowed").
    discarded_packets: u64,
}

impl PeerConnection {
    pub fn new(ice_role: ice::Role, dtls_role: DtlsRole, now: Instant) -> Self {
        let local_ice_ufrag = random_json_safe_string(UFRAG_LEN);
        let local_ice_pwd = random_json_safe_string(PWD_LEN);
        let local_cname = random_json_safe_string(CNAME_LEN);

        let config = AgentConfig {
            local_ufrag: local_ice_ufrag.clone(),
            local_pwd: local_ice_pwd.clone(),
            role: ice_role,
            ..AgentConfig::default()
        };

        Self {
            ice: Agent::new(config, now),
            tls: None,
            srtp: None,
            dtls_role,
            remote_fingerprint: None,
            local_ice_ufrag,
            local_ice_pwd,
            local_cname,
            transceivers: Vec::new(),
            codecs: CodecTable::with_defaults(),
            rtx: RtxTable::default(),
            data_channels: DataChannelTable::new(dtls_role),
            lifecycle: ConnectionLifecycle::new(),
            active_remote: None,
            events: VecDeque::new(),
            transmits: VecDeque::new(),
            discarded_packets: 0,
        }
    }

    /// Internal recoverable faults swallowed since construction
    /// (spec.md §4.4's decrypt-failure/unknown-SSRC discard counter).
    pub fn discarded_packets(&self) -> u64 {
        self.discarded_packets
    }

    pub fn local_ice_ufrag(&self) -> &str {
        &self.local_ice_ufrag
    }

    pub fn local_ice_pwd(&self) -> &str {
        &self.local_ice_pwd
    }

    pub fn local_cname(&self) -> &str {
        &self.local_cname
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    pub fn codecs(&self) -> &CodecTable {
        &self.codecs
    }

    pub fn codecs_mut(&mut self) -> &mut CodecTable {
        &mut self.codecs
    }

    pub fn rtx_table_mut(&mut self) -> &mut RtxTable {
        &mut self.rtx
    }

    pub fn data_channels_mut(&mut self) -> &mut DataChannelTable {
        &mut self.data_channels
    }

    pub fn transceivers(&self) -> &[Transceiver] {
        &self.transceivers
    }

    pub fn add_transceiver(&mut self, transceiver: Transceiver) -> usize {
        self.transceivers.push(transceiver);
        self.transceivers.len() - 1
    }

    pub fn add_local_candidate(&mut self, candidate: Candidate) -> usize {
        self.ice.add_local_candidate(candidate)
    }

    pub fn add_remote_candidate_line(&mut self, line: &str) -> Result<Option<usize>> {
        Ok(self.ice.add_remote_candidate_line(line)?)
    }

    /// Installs the embedder-supplied DTLS session once ICE nominates a
    /// pair; the expected fingerprint is the remote's SDP announcement.
    pub fn install_tls_session(&mut self, session: Box<dyn TlsSession>, remote_fingerprint: String) {
        self.tls = Some(session);
        self.remote_fingerprint = Some(remote_fingerprint);
    }

    pub fn poll_event(&mut self) -> Option<Event> {
        self.pump_ice_events();
        self.events.pop_front()
    }

    pub fn poll_transmit(&mut self) -> Option<(usize, SocketAddress, Vec<u8>)> {
        if let Some(t) = self.transmits.pop_front() {
            return Some(t);
        }
        self.ice.poll_transmit()
    }

    pub fn poll_timeout(&self) -> Option<Instant> {
        self.ice.poll_timeout()
    }

    pub fn handle_timeout(&mut self, now: Instant) {
        self.ice.handle_timeout(now);
        self.pump_ice_events();
        self.drain_tls_flights();
    }

    /// Routes one inbound datagram (spec.md §4.7 "Inbound routing").
    /// Before a DTLS session is installed there is nothing to hand
    /// non-STUN bytes to, so they surface raw as `InboundPacket`;
    /// afterward every datagram goes through the STUN/DTLS/SRTP demux.
    pub fn handle_datagram(&mut self, local_candidate_index: usize, from: SocketAddress, data: &[u8], now: Instant) -> Result<()> {
        let first_outside_stun = data.first().is_some_and(|b| !matches!(b, 0 | 1));
        if data.len() >= 8 && first_outside_stun && self.tls.is_none() {
            self.events.push_back(Event::InboundPacket(Bytes::copy_from_slice(data)));
            return Ok(());
        }

        match transport::classify(data)? {
            DemuxClass::Stun => {
                self.ice.handle_read(local_candidate_index, from, data, now)?;
                self.pump_ice_events();
            }
            DemuxClass::Dtls => self.handle_dtls(from, data)?,
            DemuxClass::Srtp | DemuxClass::Srtcp => self.handle_protected(data, now),
            DemuxClass::Unknown => {
                log::debug!("dropping datagram with undefined demux byte {:#04x}", data[0]);
                self.discarded_packets += 1;
            }
        }
        Ok(())
    }

    fn handle_dtls(&mut self, from: SocketAddress, data: &[u8]) -> Result<()> {
        let Some(tls) = self.tls.as_mut() else {
            return Ok(());
        };
        let flight = tls.handle_read(data).map_err(|_| Error::NotEstablished)?;
        if !flight.is_empty() {
            if let Some((idx, _)) = self.active_remote {
                self.transmits.push_back((idx, from, flight));
            }
        }
        if tls.status() == HandshakeStatus::Complete && self.srtp.is_none() {
            self.establish_srtp()?;
        }
        Ok(())
    }

    fn establish_srtp(&mut self) -> Result<()> {
        let Some(tls) = self.tls.as_ref() else {
            return Ok(());
        };
        if let Some(cert) = tls.peer_certificate() {
            if let Some(expected) = self.remote_fingerprint.as_deref() {
                transport::fingerprint::verify(&cert, expected)?;
            }
        }
        let exported = tls
            .export_keying_material("EXTRACTOR-dtls_srtp", transport::srtp::KEYING_MATERIAL_LEN)
            .map_err(|_| Error::NotEstablished)?;
        let keying = SrtpKeyingMaterial::derive(&exported)?;
        self.srtp = Some(SrtpContext::new(&keying, self.dtls_role));
        Ok(())
    }

    /// Unprotects and routes one SRTP/SRTCP datagram. A decrypt failure
    /// or an SSRC with no routed transceiver is an internal recoverable
    /// fault (spec.md §4.4 line 214): it is logged, counted, and
    /// swallowed rather than surfaced to the caller.
    fn handle_protected(&mut self, data: &[u8], now: Instant) {
        let Some(srtp) = self.srtp.as_mut() else {
            return;
        };
        let demuxed = match transport::demux_and_unprotect(srtp, data) {
            Ok(demuxed) => demuxed,
            Err(err) => {
                log::debug!("dropping unprotectable SRTP/SRTCP datagram: {err}");
                self.discarded_packets += 1;
                return;
            }
        };
        match demuxed {
            Demuxed::Rtp(packet) => {
                let ssrc = packet.header.ssrc;
                let Some(index) = self.transceivers.iter().position(|t| t.matches_inbound_ssrc(ssrc)) else {
                    log::debug!("dropping RTP packet for unrouted SSRC {ssrc:#010x}");
                    self.discarded_packets += 1;
                    return;
                };
                let transceiver = &mut self.transceivers[index];
                transceiver.packets_received += 1;
                let start = transceiver.receiver.next_is_frame_start;
                transceiver.receiver.next_is_frame_start = packet.header.marker;
                let events = transceiver.receiver.jitter.push(packet.header.sequence_number, packet.header.timestamp, start, packet.payload);
                for event in events {
                    if let rtp::jitter::Event::FrameReady { payload, timestamp } = event {
                        self.events.push_back(Event::FrameReady { transceiver: index, payload, timestamp });
                    }
                }
            }
            Demuxed::Rtcp(packets) => {
                for packet in packets {
                    self.handle_rtcp(packet, now);
                }
            }
            Demuxed::Stun(_) | Demuxed::Dtls(_) => {}
        }
    }

    fn handle_rtcp(&mut self, packet: RtcpPacket, now: Instant) {
        match packet {
            RtcpPacket::Pli(pli) => {
                if let Some(index) = self.transceivers.iter().position(|t| t.local_ssrc == pli.media_ssrc) {
                    self.events.push_back(Event::KeyFrameRequested { transceiver: index });
                }
            }
            RtcpPacket::Remb(remb) => {
                if let Some(ssrc) = remb.ssrcs.first() {
                    if let Some(index) = self.transceivers.iter().position(|t| t.local_ssrc == *ssrc) {
                        self.events.push_back(Event::BitrateEstimate { transceiver: index, bps: remb.bitrate });
                    }
                }
            }
            RtcpPacket::Nack(nack) => {
                if let Some(index) = self.transceivers.iter().position(|t| t.local_ssrc == nack.media_ssrc) {
                    let transceiver = &mut self.transceivers[index];
                    for pair in &nack.nacks {
                        let _retransmissions = transceiver.sender.rolling.resolve_nack(
                            pair.packet_id,
                            pair.lost_packets,
                            transceiver.sender.rtx,
                            &mut transceiver.sender.retransmit_limiter,
                            now,
                        );
                    }
                }
            }
            RtcpPacket::SenderReport(_) | RtcpPacket::ReceiverReport(_) | RtcpPacket::Twcc(_) => {}
        }
    }

    fn drain_tls_flights(&mut self) {
        let Some(tls) = self.tls.as_mut() else {
            return;
        };
        let Some((idx, addr)) = self.active_remote else {
            return;
        };
        while let Some(flight) = tls.poll_transmit() {
            self.transmits.push_back((idx, addr, flight));
        }
    }

    fn pump_ice_events(&mut self) {
        while let Some(event) = self.ice.poll_event() {
            match event {
                ice::Event::StateChange(state) => {
                    let mapped = match state {
                        AgentState::New => ConnectionState::New,
                        AgentState::CheckConnection | AgentState::Nominating => ConnectionState::Connecting,
                        AgentState::Connected | AgentState::Ready => ConnectionState::Connected,
                        AgentState::Disconnected => ConnectionState::Disconnected,
                        AgentState::Failed => ConnectionState::Failed,
                    };
                    if self.lifecycle.transition(mapped).is_ok() {
                        self.events.push_back(Event::StateChange(mapped));
                    }
                }
                ice::Event::LocalCandidate(_, candidate) | ice::Event::PeerReflexiveLocalCandidate(_, candidate) => {
                    self.events.push_back(Event::LocalCandidate(candidate));
                }
                ice::Event::Nominated(local_index, pair_index) => {
                    if let Some(pair) = self.ice.pairs().get(pair_index) {
                        if let Some(remote) = self.ice.remote_candidate(pair.remote_index) {
                            self.active_remote = Some((local_index, remote.address));
                        }
                    }
                }
                ice::Event::PairSucceeded(_, _) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_credentials_are_fixed_length_and_json_safe() {
        let pc = PeerConnection::new(ice::Role::Controlling, DtlsRole::Client, Instant::now());
        assert_eq!(pc.local_ice_ufrag().len(), UFRAG_LEN);
        assert_eq!(pc.local_ice_pwd().len(), PWD_LEN);
        assert_eq!(pc.local_cname().len(), CNAME_LEN);
        for c in pc.local_ice_ufrag().chars().chain(pc.local_ice_pwd().chars()).chain(pc.local_cname().chars()) {
            assert!(JSON_SAFE_CHARS.contains(&(c as u8)));
        }
    }

    #[test]
    fn datagram_before_tls_session_surfaces_raw() {
        let mut pc = PeerConnection::new(ice::Role::Controlling, DtlsRole::Client, Instant::now());
        let dtls_like = vec![20u8; 16];
        pc.handle_datagram(0, SocketAddress::new([127, 0, 0, 1].into(), 5000), &dtls_like, Instant::now()).unwrap();
        assert!(matches!(pc.poll_event(), Some(Event::InboundPacket(_))));
    }

    #[test]
    fn unrouted_ssrc_is_dropped_and_counted() {
        let mut pc = PeerConnection::new(ice::Role::Controlling, DtlsRole::Client, Instant::now());
        let keying = SrtpKeyingMaterial::derive(&[0u8; transport::srtp::KEYING_MATERIAL_LEN]).unwrap();
        pc.srtp = Some(SrtpContext::new(&keying, DtlsRole::Client));

        let mut srtp = SrtpContext::new(&keying, DtlsRole::Server);
        let header = [0x80, 0x60, 0, 1, 0, 0, 0x01, 0x00, 0, 0, 0x04, 0x00];
        let protected = srtp.protect(0x0100, 1, &header, b"payload").unwrap();

        assert_eq!(pc.discarded_packets(), 0);
        pc.handle_protected(&protected, Instant::now());
        assert_eq!(pc.discarded_packets(), 1);
        assert!(pc.poll_event().is_none());
    }
}
