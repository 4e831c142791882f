#![warn(rust_2018_idioms)]

pub mod error;
pub mod header;
pub mod nack;
pub mod packet;
pub mod pli;
pub mod receiver_report;
pub mod reception_report;
pub mod remb;
pub mod sender_report;
pub mod twcc;

pub use error::{Error, Result};
pub use nack::{NackPair, TransportLayerNack};
pub use packet::{split_compound, Packet};
pub use pli::PictureLossIndication;
pub use receiver_report::ReceiverReport;
pub use reception_report::ReceptionReport;
pub use remb::ReceiverEstimatedMaximumBitrate;
pub use sender_report::SenderReport;
pub use twcc::{PacketStatus, TransportLayerCc};
