//! Google Gemini API integration module.
//!
//! This module talks to the Gemini REST endpoints behind the three product
//! flows: affiliate content generation (text model), product image editing
//! (image model), and image-to-video animation (Veo long-running operations).
//! One [`GeminiClient`] carries the HTTP connection pool; per-call settings
//! travel in a [`ClientConfig`] built fresh by the caller so a key changed
//! mid-session is picked up on the next request.

mod client;
mod video;

pub use client::{
    validate_product_link, ClientConfig, GeminiClient, GeminiError, DEFAULT_EDIT_INSTRUCTION,
    EMPTY_RESPONSE_FALLBACK, GEMINI_API_BASE_URL, GEMINI_API_KEY_ENV, GENERATION_TEMPERATURE,
    IMAGE_MODEL, TEXT_MODEL,
};
pub use video::{
    CapabilityProvider, NoCapabilityCheck, PollPolicy, VideoOperation, DEFAULT_ANIMATION_PROMPT,
    DEFAULT_GENERATION_TIMEOUT, DEFAULT_POLL_INTERVAL, VIDEO_ASPECT_RATIO, VIDEO_MODEL,
    VIDEO_RESOLUTION,
};
