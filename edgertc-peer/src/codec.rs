//! Codec and RTX payload-type tables (spec.md §3 "Peer connection":
//! `pCodecTable`, `pRtxTable`). Grounded on
//! `original_source/src/source/PeerConnection/PeerConnection.c`'s
//! `pCodecTable`/`pRtxTable` hash tables, expressed as plain
//! `HashMap`s since this workspace has no bucketed-hash-table budget
//! item to reuse.

use std::collections::HashMap;

/// Default offer payload types (spec.md §6 "Supported payload types
/// for offer defaulting").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    Opus,
    Vp8,
    H264,
    Pcmu,
    Pcma,
}

impl Codec {
    pub fn default_payload_type(self) -> u8 {
        match self {
            Codec::Opus => 111,
            Codec::Vp8 => 96,
            Codec::H264 => 125,
            Codec::Pcmu => 0,
            Codec::Pcma => 8,
        }
    }

    pub fn clock_rate(self) -> u32 {
        match self {
            Codec::Opus => 48000,
            Codec::Vp8 | Codec::H264 => 90000,
            Codec::Pcmu | Codec::Pcma => 8000,
        }
    }

    pub fn encoding_name(self) -> &'static str {
        match self {
            Codec::Opus => "opus",
            Codec::Vp8 => "VP8",
            Codec::H264 => "H264",
            Codec::Pcmu => "PCMU",
            Codec::Pcma => "PCMA",
        }
    }
}

/// `codec -> payload type` negotiated for this connection.
#[derive(Debug, Clone, Default)]
pub struct CodecTable {
    payload_types: HashMap<Codec, u8>,
}

impl CodecTable {
    pub fn with_defaults() -> Self {
        let mut table = Self::default();
        for codec in [Codec::Opus, Codec::Vp8, Codec::H264, Codec::Pcmu, Codec::Pcma] {
            table.set(codec, codec.default_payload_type());
        }
        table
    }

    pub fn set(&mut self, codec: Codec, payload_type: u8) {
        self.payload_types.insert(codec, payload_type);
    }

    pub fn payload_type(&self, codec: Codec) -> Option<u8> {
        self.payload_types.get(&codec).copied()
    }

    pub fn codec_for(&self, payload_type: u8) -> Option<Codec> {
        self.payload_types.iter().find(|(_, pt)| **pt == payload_type).map(|(codec, _)| *codec)
    }
}

/// `payload type -> RTX payload type` (RFC 4588), spec.md's `pRtxTable`.
#[derive(Debug, Clone, Default)]
pub struct RtxTable {
    rtx_payload_types: HashMap<u8, u8>,
}

impl RtxTable {
    pub fn set(&mut self, payload_type: u8, rtx_payload_type: u8) {
        self.rtx_payload_types.insert(payload_type, rtx_payload_type);
    }

    pub fn rtx_payload_type_for(&self, payload_type: u8) -> Option<u8> {
        self.rtx_payload_types.get(&payload_type).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_payload_types() {
        let table = CodecTable::with_defaults();
        assert_eq!(table.payload_type(Codec::Opus), Some(111));
        assert_eq!(table.payload_type(Codec::Vp8), Some(96));
        assert_eq!(table.payload_type(Codec::H264), Some(125));
        assert_eq!(table.payload_type(Codec::Pcmu), Some(0));
        assert_eq!(table.payload_type(Codec::Pcma), Some(8));
        assert_eq!(table.codec_for(96), Some(Codec::Vp8));
    }

    #[test]
    fn rtx_lookup_round_trips() {
        let mut rtx = RtxTable::default();
        rtx.set(96, 97);
        assert_eq!(rtx.rtx_payload_type_for(96), Some(97));
        assert_eq!(rtx.rtx_payload_type_for(111), None);
    }
}
