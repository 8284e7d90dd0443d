//! Input Normalizer
//!
//! Converts the three client input modalities into upstream-ready requests:
//! - chat: JSON message list, system instruction prepended
//! - image: multipart `image` + optional `prompt`, re-encoded as a data URI
//! - audio: multipart `audio`, re-wrapped for the transcription endpoint
//!
//! Normalization is pure apart from reading the inbound body once.

pub mod audio;
pub mod chat;
pub mod form;
pub mod image;

pub use audio::normalize_audio;
pub use chat::normalize_chat;
pub use form::{read_multipart, FormData, FormField};
pub use image::{encode_data_uri, normalize_image};
