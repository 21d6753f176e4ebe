//! covertcap core library
//!
//! This crate provides the fundamental traits, types, and error handling
//! shared by the packet, capture, channel and synthesizer crates.

pub mod channel;
pub mod context;
pub mod error;
pub mod frame;
pub mod message;
pub mod types;

// Re-export commonly used types
pub use channel::CovertChannel;
pub use context::{EncodeContext, DEFAULT_START_US};
pub use error::{Error, Result};
pub use frame::{sort_by_timestamp, Frame, FrameKind};
pub use message::{Message, MessageFields, RecoveredMessage};
pub use types::*;
