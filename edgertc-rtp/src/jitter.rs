//! Jitter buffer: timestamp-ordered reassembly plus the RFC 3550 §A.8
//! interarrival jitter estimator (spec.md §4.5).

use bytes::Bytes;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct Entry {
    timestamp: u32,
    start: bool,
    payload: Bytes,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Event {
    FrameReady { payload: Bytes, timestamp: u32 },
    FrameDropped { first_sequence_number: u16 },
    PacketDiscarded { sequence_number: u16 },
}

pub struct JitterBuffer {
    max_latency_ticks: u32,
    last_push_timestamp: Option<u32>,
    last_removed_sequence_number: Option<u16>,
    last_pop_timestamp: Option<u32>,
    packets: BTreeMap<u16, Entry>,
    closed: bool,

    jitter: f64,
    prev_transit: Option<i64>,
}

impl JitterBuffer {
    pub fn new(max_latency_ticks: u32) -> Self {
        Self {
            max_latency_ticks,
            last_push_timestamp: None,
            last_removed_sequence_number: None,
            last_pop_timestamp: None,
            packets: BTreeMap::new(),
            closed: false,
            jitter: 0.0,
            prev_transit: None,
        }
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// RFC 3550 §A.8: `jitter += (|transit - prevTransit| - jitter) / 16`.
    /// `arrival_ticks` is the local receive time expressed in the same
    /// clock-rate ticks as `timestamp`.
    pub fn record_arrival(&mut self, timestamp: u32, arrival_ticks: u32) {
        let transit = i64::from(arrival_ticks) - i64::from(timestamp);
        if let Some(prev) = self.prev_transit {
            let d = (transit - prev).unsigned_abs() as f64;
            self.jitter += (d - self.jitter) / 16.0;
        }
        self.prev_transit = Some(transit);
    }

    /// Pushes a packet and returns every frame/drop/discard event the
    /// push makes ready, in emission order (spec.md "Pop / reassembly").
    pub fn push(&mut self, sequence_number: u16, timestamp: u32, start: bool, payload: Bytes) -> Vec<Event> {
        let mut events = Vec::new();

        if self.last_removed_sequence_number.is_none() {
            self.last_removed_sequence_number = Some(sequence_number.wrapping_sub(1));
            self.last_push_timestamp = Some(timestamp);
        } else {
            let last = self.last_push_timestamp.unwrap_or(timestamp);
            self.last_push_timestamp = Some(if timestamp > last { timestamp } else { last });
        }

        let last_push = self.last_push_timestamp.unwrap();
        let window_start = last_push.wrapping_sub(self.max_latency_ticks);
        let in_window = if window_start <= last_push {
            timestamp >= window_start && timestamp <= last_push
        } else {
            // max_latency_ticks exceeds last_push; every non-negative
            // timestamp up to last_push is acceptable.
            timestamp <= last_push
        };
        if !in_window {
            events.push(Event::PacketDiscarded {
                sequence_number,
            });
            return events;
        }

        self.packets.insert(
            sequence_number,
            Entry {
                timestamp,
                start,
                payload,
            },
        );

        self.drain_ready(&mut events);
        events
    }

    pub fn close(&mut self) -> Vec<Event> {
        self.closed = true;
        let mut events = Vec::new();
        self.drain_ready(&mut events);
        events
    }

    fn drain_ready(&mut self, events: &mut Vec<Event>) {
        loop {
            let Some(last_removed) = self.last_removed_sequence_number else {
                break;
            };
            let start_seq = last_removed.wrapping_add(1);
            let Some(first) = self.packets.get(&start_seq) else {
                break;
            };
            let group_ts = first.timestamp;

            let mut run = Vec::new();
            let mut seq = start_seq;
            let mut start_seen = false;
            loop {
                match self.packets.get(&seq) {
                    Some(entry) if entry.timestamp == group_ts => {
                        start_seen |= entry.start;
                        run.push(seq);
                        seq = seq.wrapping_add(1);
                    }
                    _ => break,
                }
            }

            let boundary_confirmed = self.packets.get(&seq).is_some_and(|e| e.timestamp != group_ts);
            let window_start = self.last_push_timestamp.unwrap_or(group_ts).wrapping_sub(self.max_latency_ticks);
            let aged_out = group_ts <= window_start && window_start <= self.last_push_timestamp.unwrap_or(group_ts);
            let ready = boundary_confirmed || aged_out || self.closed;
            if !ready {
                break;
            }

            if start_seen && !run.is_empty() {
                let mut payload = Vec::new();
                for s in &run {
                    if let Some(entry) = self.packets.get(s) {
                        payload.extend_from_slice(&entry.payload);
                    }
                }
                events.push(Event::FrameReady {
                    payload: Bytes::from(payload),
                    timestamp: group_ts,
                });
                self.last_pop_timestamp = Some(group_ts);
            } else {
                events.push(Event::FrameDropped {
                    first_sequence_number: start_seq,
                });
            }

            for s in &run {
                self.packets.remove(s);
            }
            if run.is_empty() {
                // The buffer was closed with a gap at start_seq; advance
                // past it so `close()` terminates instead of looping.
                self.last_removed_sequence_number = Some(start_seq);
            } else {
                self.last_removed_sequence_number = Some(*run.last().unwrap());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scenario S3: clock rate 90000, maxLatency 2s (180000 ticks).
    #[test]
    fn s3_jitter_buffer_reassembly() {
        let mut jb = JitterBuffer::new(180_000);
        assert!(jb.push(100, 9000, true, Bytes::from_static(b"a")).is_empty());
        assert!(jb.push(102, 9000, false, Bytes::from_static(b"c")).is_empty());
        assert!(jb.push(101, 9000, false, Bytes::from_static(b"b")).is_empty());

        let events = jb.push(103, 18000, true, Bytes::from_static(b"d"));
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::FrameReady { payload, timestamp } => {
                assert_eq!(*timestamp, 9000);
                assert_eq!(&payload[..], b"abc");
            }
            other => panic!("expected FrameReady, got {other:?}"),
        }

        // The second frame (seq 103, ts 18000) is queued but not yet
        // emitted: no boundary has arrived and it's still inside the
        // accept window.
        assert!(jb.packets.contains_key(&103));
    }

    #[test]
    fn closing_flushes_a_pending_frame() {
        let mut jb = JitterBuffer::new(180_000);
        jb.push(1, 1000, true, Bytes::from_static(b"x"));
        let events = jb.close();
        assert_eq!(events, vec![Event::FrameReady { payload: Bytes::from_static(b"x"), timestamp: 1000 }]);
    }

    #[test]
    fn out_of_window_packet_is_discarded() {
        let mut jb = JitterBuffer::new(100);
        jb.push(1, 10_000, true, Bytes::from_static(b"x"));
        let events = jb.push(2, 5_000, false, Bytes::from_static(b"y"));
        assert_eq!(events, vec![Event::PacketDiscarded { sequence_number: 2 }]);
    }

    #[test]
    fn jitter_estimate_follows_rfc3550_ewma() {
        let mut jb = JitterBuffer::new(180_000);
        jb.record_arrival(0, 0);
        jb.record_arrival(1000, 1050);
        assert!((jb.jitter() - 50.0 / 16.0).abs() < 1e-9);
    }
}
