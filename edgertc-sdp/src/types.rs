use crate::error::{Error, Result};
use std::fmt;

/// `m=` media name (spec.md's "media names (audio, video, application)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
    Application,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Application => "application",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "audio" => Ok(MediaKind::Audio),
            "video" => Ok(MediaKind::Video),
            "application" => Ok(MediaKind::Application),
            other => Err(Error::UnknownMediaKind(other.to_string())),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DTLS `a=setup` role, which decides the offerer's DTLS client/server
/// role (spec.md "SDP fields consumed ... setup (offer role)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupRole {
    Active,
    Passive,
    ActPass,
}

impl SetupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetupRole::Active => "active",
            SetupRole::Passive => "passive",
            SetupRole::ActPass => "actpass",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(SetupRole::Active),
            "passive" => Ok(SetupRole::Passive),
            "actpass" => Ok(SetupRole::ActPass),
            other => Err(Error::UnknownSetupRole(other.to_string())),
        }
    }
}

/// `a=fingerprint:<algorithm> <hex>`, e.g. `sha-256 AB:CD:...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub algorithm: String,
    pub hex: String,
}

impl Fingerprint {
    pub fn parse(value: &str) -> Result<Self> {
        let mut parts = value.splitn(2, ' ');
        let algorithm = parts.next().filter(|s| !s.is_empty());
        let hex = parts.next().filter(|s| !s.is_empty());
        match (algorithm, hex) {
            (Some(algorithm), Some(hex)) => Ok(Fingerprint {
                algorithm: algorithm.to_string(),
                hex: hex.to_string(),
            }),
            _ => Err(Error::MalformedFingerprint(value.to_string())),
        }
    }

    pub fn to_attribute_value(&self) -> String {
        format!("{} {}", self.algorithm, self.hex)
    }
}
