//! affiliate-studio library crate.
//!
//! Turns a product link into TikTok affiliate material through the Gemini
//! API: a ten-angle content analysis, edited product images, and short
//! animated videos. The binary in `main.rs` is a thin CLI over these
//! modules; they are exposed here for integration testing as well.

pub mod angles;
pub mod config;
pub mod gemini;
pub mod media;
pub mod prompt;
