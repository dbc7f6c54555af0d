//! gemini-backend: Gemini generation backend for uxcrew
//!
//! Implements [`uxcrew_core::GenerationBackend`] over the Gemini
//! `generateContent` REST endpoint. Screenshots travel as base64 inline data;
//! failures map onto [`uxcrew_core::GenerationError`] so the pipeline never
//! sees HTTP details.

pub mod client;
pub mod error;
mod wire;

pub use client::{GeminiClient, GeminiConfig, API_KEY_VAR, BASE_URL_VAR, DEFAULT_BASE_URL};
pub use error::GeminiError;
