//! Emits the SDP attributes spec.md's peer connection announces:
//! everything `parse` consumes plus `rtpmap`, `fmtp`, `rtcp-mux`,
//! `rtcp-rsize`, `msid`, `ssrc-group FID`, `rtcp-fb nack`, and the
//! BUNDLE group.

use crate::types::{Fingerprint, MediaKind, SetupRole};
use std::fmt::Write as _;

/// One `a=rtpmap`/`a=fmtp`/`a=rtcp-fb` codec entry for a media section.
#[derive(Debug, Clone)]
pub struct CodecEntry {
    pub payload_type: u8,
    pub encoding_name: String,
    pub clock_rate: u32,
    pub channels: Option<u16>,
    pub fmtp: Option<String>,
    pub nack: bool,
}

impl CodecEntry {
    pub fn new(payload_type: u8, encoding_name: impl Into<String>, clock_rate: u32) -> Self {
        Self {
            payload_type,
            encoding_name: encoding_name.into(),
            clock_rate,
            channels: None,
            fmtp: None,
            nack: false,
        }
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_fmtp(mut self, fmtp: impl Into<String>) -> Self {
        self.fmtp = Some(fmtp.into());
        self
    }

    pub fn with_nack(mut self) -> Self {
        self.nack = true;
        self
    }
}

/// Builds one `m=` section. Every setter consumes and returns `self`
/// so callers chain a section together in one expression.
#[derive(Debug, Clone)]
pub struct MediaSectionBuilder {
    kind: MediaKind,
    port: u16,
    mid: String,
    ice_ufrag: Option<String>,
    ice_pwd: Option<String>,
    fingerprint: Option<Fingerprint>,
    setup: Option<SetupRole>,
    ice_trickle: bool,
    rtcp_mux: bool,
    rtcp_rsize: bool,
    msid: Option<(String, String)>,
    ssrc: Option<(u32, String)>,
    rtx_ssrc: Option<u32>,
    candidates: Vec<String>,
    codecs: Vec<CodecEntry>,
}

impl MediaSectionBuilder {
    pub fn new(kind: MediaKind, port: u16, mid: impl Into<String>) -> Self {
        Self {
            kind,
            port,
            mid: mid.into(),
            ice_ufrag: None,
            ice_pwd: None,
            fingerprint: None,
            setup: None,
            ice_trickle: false,
            rtcp_mux: true,
            rtcp_rsize: false,
            msid: None,
            ssrc: None,
            rtx_ssrc: None,
            candidates: Vec::new(),
            codecs: Vec::new(),
        }
    }

    pub fn ice_credentials(mut self, ufrag: impl Into<String>, pwd: impl Into<String>) -> Self {
        self.ice_ufrag = Some(ufrag.into());
        self.ice_pwd = Some(pwd.into());
        self
    }

    pub fn fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    pub fn setup(mut self, setup: SetupRole) -> Self {
        self.setup = Some(setup);
        self
    }

    pub fn ice_trickle(mut self, trickle: bool) -> Self {
        self.ice_trickle = trickle;
        self
    }

    pub fn rtcp_rsize(mut self, enabled: bool) -> Self {
        self.rtcp_rsize = enabled;
        self
    }

    pub fn msid(mut self, stream_id: impl Into<String>, track_id: impl Into<String>) -> Self {
        self.msid = Some((stream_id.into(), track_id.into()));
        self
    }

    /// Primary SSRC plus its `cname`. A second call from `with_rtx`
    /// adds the retransmission SSRC and an `ssrc-group:FID` line.
    pub fn ssrc(mut self, ssrc: u32, cname: impl Into<String>) -> Self {
        self.ssrc = Some((ssrc, cname.into()));
        self
    }

    pub fn with_rtx(mut self, rtx_ssrc: u32) -> Self {
        self.rtx_ssrc = Some(rtx_ssrc);
        self
    }

    pub fn candidate(mut self, candidate_line_body: impl Into<String>) -> Self {
        self.candidates.push(candidate_line_body.into());
        self
    }

    pub fn codec(mut self, codec: CodecEntry) -> Self {
        self.codecs.push(codec);
        self
    }

    pub fn mid(&self) -> &str {
        &self.mid
    }

    fn write(&self, out: &mut String) {
        let payload_types: Vec<String> = self.codecs.iter().map(|c| c.payload_type.to_string()).collect();
        let _ = writeln!(out, "m={} {} UDP/TLS/RTP/SAVPF {}\r", self.kind, self.port, payload_types.join(" "));
        let _ = writeln!(out, "c=IN IP4 0.0.0.0\r");
        if self.rtcp_mux {
            let _ = writeln!(out, "a=rtcp-mux\r");
        }
        if self.rtcp_rsize {
            let _ = writeln!(out, "a=rtcp-rsize\r");
        }
        if let (Some(ufrag), Some(pwd)) = (&self.ice_ufrag, &self.ice_pwd) {
            let _ = writeln!(out, "a=ice-ufrag:{ufrag}\r");
            let _ = writeln!(out, "a=ice-pwd:{pwd}\r");
        }
        if self.ice_trickle {
            let _ = writeln!(out, "a=ice-options:trickle\r");
        }
        if let Some(fingerprint) = &self.fingerprint {
            let _ = writeln!(out, "a=fingerprint:{}\r", fingerprint.to_attribute_value());
        }
        if let Some(setup) = self.setup {
            let _ = writeln!(out, "a=setup:{}\r", setup.as_str());
        }
        let _ = writeln!(out, "a=mid:{}\r", self.mid);
        if let Some((stream_id, track_id)) = &self.msid {
            let _ = writeln!(out, "a=msid:{stream_id} {track_id}\r");
        }
        for codec in &self.codecs {
            match codec.channels {
                Some(channels) => {
                    let _ = writeln!(out, "a=rtpmap:{} {}/{}/{}\r", codec.payload_type, codec.encoding_name, codec.clock_rate, channels);
                }
                None => {
                    let _ = writeln!(out, "a=rtpmap:{} {}/{}\r", codec.payload_type, codec.encoding_name, codec.clock_rate);
                }
            }
            if let Some(fmtp) = &codec.fmtp {
                let _ = writeln!(out, "a=fmtp:{} {}\r", codec.payload_type, fmtp);
            }
            if codec.nack {
                let _ = writeln!(out, "a=rtcp-fb:{} nack\r", codec.payload_type);
            }
        }
        if let Some((ssrc, cname)) = &self.ssrc {
            let _ = writeln!(out, "a=ssrc:{ssrc} cname:{cname}\r");
            if let Some((stream_id, track_id)) = &self.msid {
                let _ = writeln!(out, "a=ssrc:{ssrc} msid:{stream_id} {track_id}\r");
            }
            if let Some(rtx_ssrc) = self.rtx_ssrc {
                let _ = writeln!(out, "a=ssrc:{rtx_ssrc} cname:{cname}\r");
                let _ = writeln!(out, "a=ssrc-group:FID {ssrc} {rtx_ssrc}\r");
            }
        }
        for candidate in &self.candidates {
            let _ = writeln!(out, "a=candidate:{candidate}\r");
        }
    }
}

/// Builds a full offer/answer body: the session-level lines plus one
/// `m=` section per call to [`add_media`](Self::add_media), closed
/// with a BUNDLE group listing every section's `mid`.
#[derive(Debug, Clone, Default)]
pub struct SessionDescriptionWriter {
    media: Vec<MediaSectionBuilder>,
}

impl SessionDescriptionWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_media(&mut self, section: MediaSectionBuilder) -> &mut Self {
        self.media.push(section);
        self
    }

    pub fn emit(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "v=0\r");
        let _ = writeln!(out, "o=- 0 0 IN IP4 127.0.0.1\r");
        let _ = writeln!(out, "s=-\r");
        let _ = writeln!(out, "t=0 0\r");
        if !self.media.is_empty() {
            let mids: Vec<&str> = self.media.iter().map(|m| m.mid()).collect();
            let _ = writeln!(out, "a=group:BUNDLE {}\r", mids.join(" "));
        }
        for section in &self.media {
            section.write(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::SessionDescription;

    #[test]
    fn emits_a_round_trippable_audio_section() {
        let mut writer = SessionDescriptionWriter::new();
        writer.add_media(
            MediaSectionBuilder::new(MediaKind::Audio, 9, "0")
                .ice_credentials("Fy7v", "x9cml3iUdS6skTsT")
                .fingerprint(Fingerprint {
                    algorithm: "sha-256".to_string(),
                    hex: "AB:CD:EF".to_string(),
                })
                .setup(SetupRole::ActPass)
                .ice_trickle(true)
                .msid("stream0", "track0")
                .ssrc(1001, "cname0")
                .codec(CodecEntry::new(111, "opus", 48000).with_channels(2).with_fmtp("minptime=10;useinbandfec=1"))
                .candidate("1 1 udp 2105458943 192.168.1.5 4000 typ host"),
        );
        let text = writer.emit();

        let parsed = SessionDescription::parse(&text).unwrap();
        assert_eq!(parsed.ice_ufrag.as_deref(), Some("Fy7v"));
        assert_eq!(parsed.setup, Some(SetupRole::ActPass));
        assert!(parsed.ice_trickle);
        let audio = &parsed.media[0];
        assert_eq!(audio.mid.as_deref(), Some("0"));
        assert_eq!(audio.ssrcs, vec![1001]);
        assert_eq!(audio.candidates.len(), 1);
        assert!(text.contains("a=rtpmap:111 opus/48000/2\r"));
        assert!(text.contains("a=fmtp:111 minptime=10;useinbandfec=1\r"));
    }

    #[test]
    fn video_section_with_rtx_emits_ssrc_group_fid() {
        let mut writer = SessionDescriptionWriter::new();
        writer.add_media(
            MediaSectionBuilder::new(MediaKind::Video, 9, "1")
                .ssrc(2001, "cname1")
                .with_rtx(2002)
                .codec(CodecEntry::new(96, "VP8", 90000).with_nack()),
        );
        let text = writer.emit();
        assert!(text.contains("a=ssrc-group:FID 2001 2002\r"));
        assert!(text.contains("a=rtcp-fb:96 nack\r"));
    }

    #[test]
    fn bundle_group_lists_every_mid() {
        let mut writer = SessionDescriptionWriter::new();
        writer.add_media(MediaSectionBuilder::new(MediaKind::Audio, 9, "0"));
        writer.add_media(MediaSectionBuilder::new(MediaKind::Video, 9, "1"));
        let text = writer.emit();
        assert!(text.contains("a=group:BUNDLE 0 1\r"));
    }
}
