#![warn(rust_2018_idioms)]

pub mod build;
pub mod error;
pub mod line;
pub mod parse;
pub mod types;

pub use build::{CodecEntry, MediaSectionBuilder, SessionDescriptionWriter};
pub use error::{Error, Result};
pub use parse::{MediaSection, SessionDescription};
pub use types::{Fingerprint, MediaKind, SetupRole};
