//! Fundamental types for floodbench.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! peer and message identifiers, millisecond delays and delay ranges, and the
//! broadcast strategies under test.

pub mod error;
pub mod id;
pub mod strategy;
pub mod time;

pub use error::TypesError;
pub use id::{MessageId, NodeId};
pub use strategy::BroadcastStrategy;
pub use time::{Delay, DelayRange};
