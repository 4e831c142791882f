//! Rolling send buffer keyed by RTP sequence number, used to answer
//! NACK (PID + BLP) retransmission requests (spec.md §4.6).

use bytes::{BufMut, Bytes, BytesMut};
use std::time::Instant;

/// Token-bucket guard over a sender's NACK resend path. The original's
/// retransmitter additionally rate-limits resends per SSRC on top of
/// the NACK-driven retransmission spec.md §4.6 specifies; this is that
/// guard, gating `RollingBuffer::resolve_nack` instead of a separate
/// module since there's no other state to hang it on.
#[derive(Debug, Clone)]
pub struct RetransmitLimiter {
    capacity: f64,
    tokens: f64,
    refill_per_second: f64,
    last_refill: Instant,
}

impl RetransmitLimiter {
    pub fn new(capacity: u32, refill_per_second: f64, now: Instant) -> Self {
        Self {
            capacity: capacity as f64,
            tokens: capacity as f64,
            refill_per_second,
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_second).min(self.capacity);
        self.last_refill = now;
    }

    /// Takes up to `want` tokens, returning how many were granted.
    pub fn take(&mut self, now: Instant, want: u32) -> u32 {
        self.refill(now);
        let granted = (self.tokens.floor() as u32).min(want);
        self.tokens -= granted as f64;
        granted
    }
}

#[derive(Debug, Clone)]
struct Stored {
    sequence_number: u16,
    payload: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retransmission {
    pub sequence_number: u16,
    pub payload: Bytes,
}

/// When set, retransmissions are sent as RTX packets: the original
/// payload is prefixed with a 2-byte original sequence number and
/// carried under a distinct payload type / SSRC (RFC 4588).
#[derive(Debug, Clone, Copy)]
pub struct RtxConfig {
    pub payload_type: u8,
    pub ssrc: u32,
}

pub struct RollingBuffer {
    slots: Vec<Option<Stored>>,
    capacity: u16,
}

impl RollingBuffer {
    pub fn new(capacity: u16) -> Self {
        assert!(capacity > 0, "rolling buffer capacity must be non-zero");
        Self {
            slots: vec![None; capacity as usize],
            capacity,
        }
    }

    pub fn insert(&mut self, sequence_number: u16, payload: Bytes) {
        let idx = (sequence_number % self.capacity) as usize;
        self.slots[idx] = Some(Stored {
            sequence_number,
            payload,
        });
    }

    fn get(&self, sequence_number: u16) -> Option<&Bytes> {
        let idx = (sequence_number % self.capacity) as usize;
        self.slots[idx]
            .as_ref()
            .filter(|s| s.sequence_number == sequence_number)
            .map(|s| &s.payload)
    }

    /// Resolves a NACK's PID + BLP bitmask into the sequence numbers it
    /// names (PID itself, then PID+1..=PID+16 per set BLP bit) and
    /// returns the ones this buffer still holds, in ascending request
    /// order, capped by `limiter`'s available tokens.
    pub fn resolve_nack(&self, pid: u16, blp: u16, rtx: Option<RtxConfig>, limiter: &mut RetransmitLimiter, now: Instant) -> Vec<Retransmission> {
        let mut wanted = vec![pid];
        for bit in 0..16u16 {
            if blp & (1 << bit) != 0 {
                wanted.push(pid.wrapping_add(bit + 1));
            }
        }

        let resolved: Vec<Retransmission> = wanted
            .into_iter()
            .filter_map(|seq| {
                let payload = self.get(seq)?;
                let payload = match rtx {
                    Some(_) => {
                        let mut buf = BytesMut::with_capacity(2 + payload.len());
                        buf.put_u16(seq);
                        buf.put_slice(payload);
                        buf.freeze()
                    }
                    None => payload.clone(),
                };
                Some(Retransmission {
                    sequence_number: seq,
                    payload,
                })
            })
            .collect();

        let granted = limiter.take(now, resolved.len() as u32) as usize;
        resolved.into_iter().take(granted).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unlimited() -> RetransmitLimiter {
        RetransmitLimiter::new(u32::MAX, 0.0, Instant::now())
    }

    /// Scenario S4: PID=7003, BLP=0x0005 names 7003, 7004, 7006; the
    /// buffer holds all three and should return exactly that set.
    #[test]
    fn s4_nack_yields_requested_packets_in_order() {
        let mut buf = RollingBuffer::new(64);
        for seq in 7000..=7010u16 {
            buf.insert(seq, Bytes::from(format!("pkt{seq}")));
        }

        let mut limiter = unlimited();
        let got = buf.resolve_nack(7003, 0x0005, None, &mut limiter, Instant::now());
        let seqs: Vec<u16> = got.iter().map(|r| r.sequence_number).collect();
        assert_eq!(seqs, vec![7003, 7004, 7006]);
        assert_eq!(got[0].payload, Bytes::from_static(b"pkt7003"));
    }

    #[test]
    fn nack_for_evicted_packet_is_skipped() {
        let mut buf = RollingBuffer::new(4);
        buf.insert(1, Bytes::from_static(b"one"));
        buf.insert(5, Bytes::from_static(b"five")); // evicts slot of seq 1

        let mut limiter = unlimited();
        let got = buf.resolve_nack(1, 0, None, &mut limiter, Instant::now());
        assert!(got.is_empty());
    }

    #[test]
    fn rtx_config_prefixes_original_sequence_number() {
        let mut buf = RollingBuffer::new(16);
        buf.insert(42, Bytes::from_static(b"payload"));
        let mut limiter = unlimited();
        let got = buf.resolve_nack(42, 0, Some(RtxConfig { payload_type: 99, ssrc: 0xAAAA }), &mut limiter, Instant::now());
        assert_eq!(got.len(), 1);
        assert_eq!(&got[0].payload[..2], &42u16.to_be_bytes());
        assert_eq!(&got[0].payload[2..], b"payload");
    }

    #[test]
    fn limiter_caps_resends_to_available_tokens() {
        let mut buf = RollingBuffer::new(64);
        for seq in 7000..=7010u16 {
            buf.insert(seq, Bytes::from(format!("pkt{seq}")));
        }

        let now = Instant::now();
        let mut limiter = RetransmitLimiter::new(2, 0.0, now);
        let got = buf.resolve_nack(7003, 0x0005, None, &mut limiter, now);
        assert_eq!(got.len(), 2);
        assert_eq!(limiter.take(now, 1), 0);
    }
}
