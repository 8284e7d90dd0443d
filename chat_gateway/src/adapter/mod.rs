//! Response Adapter
//!
//! Turns provider output into the outward client contract:
//! - [`streaming`]: framed text deltas, passed through as they arrive
//! - [`blocking`]: a single JSON envelope with fallback text

pub mod blocking;
pub mod streaming;

pub use blocking::{completion_text, transcription_text, NO_RESPONSE_FALLBACK};
pub use streaming::{streaming_response, FramedDeltaStream};
