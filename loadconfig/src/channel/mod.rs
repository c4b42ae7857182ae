//! Channel layer for NETCONF message framing.
//!
//! This module turns the raw `netconf` subsystem byte stream into whole
//! XML messages using base:1.0 end-of-message framing.

mod buffer;
mod framed;

pub use buffer::{END_OF_MESSAGE, FrameBuffer};
pub use framed::FramedChannel;
