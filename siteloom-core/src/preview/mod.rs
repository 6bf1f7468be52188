//! Preview composition
//!
//! Assembles the current asset set and enabled plugins into one sandboxed,
//! runnable document:
//!
//! - [`blobs`] mints opaque, explicitly-released resolvable locations for
//!   asset content (the moral equivalent of object URLs).
//! - [`resolver`] orders assets by what they can reference and rewrites
//!   inter-asset references to already-minted locations.
//! - [`composer`] injects the runtime shim into the entry document, mints
//!   the final location, and releases the previous composition's handles
//!   before issuing new ones.
//! - [`runtime`] generates the in-document shim: unconditional error capture
//!   plus the plugin host with its per-frame tick loop.

pub mod blobs;
pub mod composer;
pub mod resolver;
pub mod runtime;

pub use blobs::{Blob, BlobStore};
pub use composer::{Composition, PreviewComposer};
pub use resolver::{resolve_assets, ResolvedLocations};
pub use runtime::{fix_prompt, PREVIEW_ERROR_MESSAGE_TYPE};
