//! Generation backend
//!
//! This module owns the request to the generation backend and the streaming
//! session that delivers progressively-larger response snapshots.
//!
//! The wire contract is an OpenAI-style `/chat/completions` stream: one POST
//! with `{ messages, model }`, answered by a line-oriented event stream where
//! `data: `-prefixed lines carry JSON deltas at `choices[0].delta.content`.
//! A relay may sit between us and the real provider to keep the credential
//! server-side; from here that is transparent (same contract, different URL,
//! no bearer header).

pub mod client;
pub mod session;

pub use client::{BackendClient, ChatMessage};
pub use session::GenerationStream;
