#![warn(rust_2018_idioms)]

//! ICE agent (spec.md §4.3 "M3"): candidate/pair model and the
//! connectivity-check state machine, built on the STUN codec in
//! `edgertc-stun`.

pub mod agent;
pub mod candidate;
pub mod error;
pub mod nat;
pub mod pair;

pub use agent::{Agent, AgentConfig, AgentState, Event, Role};
pub use candidate::{Candidate, CandidateType};
pub use error::{Error, Result};
pub use nat::{classify_mapping_behavior, MappingBehavior};
pub use pair::{CandidatePair, PairState};
