//! Wire types for the customer-service chat gateway.
//!
//! Two directions live here:
//! - the client-facing contract (inbound chat messages, outward envelopes and
//!   stream framing), and
//! - the upstream provider shapes (OpenAI-compatible chat completions,
//!   streaming chunks, transcriptions and error bodies).
//!
//! Nothing in this crate performs I/O.

pub mod chat;
pub mod envelope;
pub mod provider_error;
pub mod stream;
pub mod transcription;
