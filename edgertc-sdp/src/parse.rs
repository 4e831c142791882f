//! Parses the subset of SDP fields spec.md's peer connection consumes:
//! `fingerprint`, `ice-ufrag`, `ice-pwd`, `candidate`, `setup`,
//! `ice-options: trickle`, `ssrc`, `mid`, and media names.
//!
//! Session-level `a=` attributes that appear before the first `m=`
//! line are treated as defaults every media section inherits unless it
//! carries its own value, matching how WebRTC offers/answers hoist
//! ICE credentials and the DTLS fingerprint to session level once
//! BUNDLE is in play (`original_source/src/source/PeerConnection/SessionDescription.c`).

use crate::error::{Error, Result};
use crate::line::{lines, split_attribute, split_type};
use crate::types::{Fingerprint, MediaKind, SetupRole};

#[derive(Debug, Clone, Default)]
pub struct MediaSection {
    pub kind: Option<MediaKind>,
    pub mid: Option<String>,
    pub ssrcs: Vec<u32>,
    /// Raw `a=candidate` line bodies (the text after `candidate:`),
    /// handed as-is to the ICE agent's own candidate-line parser.
    pub candidates: Vec<String>,
    pub ice_ufrag: Option<String>,
    pub ice_pwd: Option<String>,
    pub fingerprint: Option<Fingerprint>,
    pub setup: Option<SetupRole>,
    pub ice_trickle: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SessionDescription {
    pub ice_ufrag: Option<String>,
    pub ice_pwd: Option<String>,
    pub fingerprint: Option<Fingerprint>,
    pub setup: Option<SetupRole>,
    pub ice_trickle: bool,
    pub media: Vec<MediaSection>,
}

impl SessionDescription {
    pub fn parse(text: &str) -> Result<Self> {
        let mut session = SessionDescription::default();
        let mut current: Option<MediaSection> = None;

        for line in lines(text) {
            let Some((kind, rest)) = split_type(line) else {
                continue;
            };
            match kind {
                'm' => {
                    if let Some(section) = current.take() {
                        session.media.push(section);
                    }
                    let mut fields = rest.split_whitespace();
                    let media_name = fields.next().ok_or_else(|| Error::MalformedMediaLine(rest.to_string()))?;
                    let mut section = MediaSection::default();
                    section.kind = Some(MediaKind::parse(media_name)?);
                    current = Some(section);
                }
                'a' => {
                    let (name, value) = split_attribute(rest);
                    apply_attribute(&mut session, current.as_mut(), name, value)?;
                }
                _ => {}
            }
        }
        if let Some(section) = current.take() {
            session.media.push(section);
        }
        Ok(session)
    }

    /// `ice-ufrag` to use for a given media section, falling back to
    /// the session-level credential BUNDLE hoists attributes to.
    pub fn ice_ufrag_for<'a>(&'a self, media: &'a MediaSection) -> Option<&'a str> {
        media.ice_ufrag.as_deref().or(self.ice_ufrag.as_deref())
    }

    pub fn ice_pwd_for<'a>(&'a self, media: &'a MediaSection) -> Option<&'a str> {
        media.ice_pwd.as_deref().or(self.ice_pwd.as_deref())
    }

    pub fn fingerprint_for<'a>(&'a self, media: &'a MediaSection) -> Option<&'a Fingerprint> {
        media.fingerprint.as_ref().or(self.fingerprint.as_ref())
    }

    pub fn setup_for(&self, media: &MediaSection) -> Option<SetupRole> {
        media.setup.or(self.setup)
    }
}

fn apply_attribute(
    session: &mut SessionDescription,
    media: Option<&mut MediaSection>,
    name: &str,
    value: Option<&str>,
) -> Result<()> {
    match (media, name) {
        (Some(media), "mid") => media.mid = value.map(str::to_string),
        (Some(media), "candidate") => {
            if let Some(value) = value {
                media.candidates.push(value.to_string());
            }
        }
        (Some(media), "ice-ufrag") => media.ice_ufrag = value.map(str::to_string),
        (Some(media), "ice-pwd") => media.ice_pwd = value.map(str::to_string),
        (Some(media), "fingerprint") => {
            media.fingerprint = Some(Fingerprint::parse(value.unwrap_or_default())?);
        }
        (Some(media), "setup") => media.setup = Some(SetupRole::parse(value.unwrap_or_default())?),
        (Some(media), "ice-options") => {
            if value.unwrap_or_default().split_whitespace().any(|tok| tok == "trickle") {
                media.ice_trickle = true;
            }
        }
        (Some(media), "ssrc") => {
            if let Some(value) = value {
                let id_token = value.split_whitespace().next().unwrap_or_default();
                let id: u32 = id_token.parse().map_err(|_| Error::MalformedSsrc(value.to_string()))?;
                if !media.ssrcs.contains(&id) {
                    media.ssrcs.push(id);
                }
            }
        }
        (None, "ice-ufrag") => session.ice_ufrag = value.map(str::to_string),
        (None, "ice-pwd") => session.ice_pwd = value.map(str::to_string),
        (None, "fingerprint") => {
            session.fingerprint = Some(Fingerprint::parse(value.unwrap_or_default())?);
        }
        (None, "setup") => session.setup = Some(SetupRole::parse(value.unwrap_or_default())?),
        (None, "ice-options") => {
            if value.unwrap_or_default().split_whitespace().any(|tok| tok == "trickle") {
                session.ice_trickle = true;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFER: &str = "\
v=0\r
o=- 1 1 IN IP4 127.0.0.1\r
s=-\r
t=0 0\r
a=ice-ufrag:Fy7v\r
a=ice-pwd:x9cml3iUdS6skTsT\r
a=fingerprint:sha-256 AB:CD:EF\r
a=setup:actpass\r
a=ice-options:trickle\r
m=audio 9 UDP/TLS/RTP/SAVPF 111\r
a=mid:0\r
a=ssrc:1001 cname:stream0\r
a=candidate:1 1 udp 2105458943 192.168.1.5 4000 typ host\r
m=video 9 UDP/TLS/RTP/SAVPF 96\r
a=mid:1\r
a=ssrc:2001 cname:stream1\r
";

    #[test]
    fn extracts_session_and_media_fields() {
        let sdp = SessionDescription::parse(OFFER).unwrap();
        assert_eq!(sdp.ice_ufrag.as_deref(), Some("Fy7v"));
        assert_eq!(sdp.ice_pwd.as_deref(), Some("x9cml3iUdS6skTsT"));
        assert_eq!(sdp.fingerprint.as_ref().unwrap().algorithm, "sha-256");
        assert_eq!(sdp.setup, Some(SetupRole::ActPass));
        assert!(sdp.ice_trickle);
        assert_eq!(sdp.media.len(), 2);

        let audio = &sdp.media[0];
        assert_eq!(audio.kind, Some(MediaKind::Audio));
        assert_eq!(audio.mid.as_deref(), Some("0"));
        assert_eq!(audio.ssrcs, vec![1001]);
        assert_eq!(audio.candidates.len(), 1);

        let video = &sdp.media[1];
        assert_eq!(video.kind, Some(MediaKind::Video));
        assert_eq!(video.ssrcs, vec![2001]);
        assert_eq!(sdp.ice_ufrag_for(video), Some("Fy7v"));
    }

    #[test]
    fn rejects_unknown_media_kind() {
        let err = SessionDescription::parse("m=chat 9 UDP/TLS/RTP/SAVPF 0\r\n").unwrap_err();
        assert_eq!(err, Error::UnknownMediaKind("chat".to_string()));
    }

    #[test]
    fn duplicate_ssrc_lines_are_not_duplicated() {
        let sdp = SessionDescription::parse(
            "m=audio 9 UDP/TLS/RTP/SAVPF 111\r\na=ssrc:1001 cname:a\r\na=ssrc:1001 msid:b\r\n",
        )
        .unwrap();
        assert_eq!(sdp.media[0].ssrcs, vec![1001]);
    }
}
