//! Customer-service chat gateway.
//!
//! Accepts chat, image and audio input from the browser client, forwards
//! each request to an OpenAI-compatible provider exactly once, and adapts the
//! provider output into a uniform JSON or streamed envelope.

pub mod adapter;
pub mod app_context;
pub mod config;
pub mod logging;
pub mod normalize;
pub mod provider;
pub mod routers;
pub mod server;

pub use chat_protocol as protocols;
