//! Provider adapters: payload builders, tool translation, multimodal
//! content resolution, and streaming HTTP clients for every supported
//! provider family.
//!
//! The engine crate drives one [`PayloadBuilder`] and one [`ProviderClient`]
//! per request; everything provider-shaped lives behind those two traits.

pub mod builders;
pub mod client;
pub mod payload;
pub mod registry;
pub mod resolver;
pub mod tools;
pub(crate) mod sse;
pub(crate) mod util;

// Re-exports for convenience.
pub use builders::{BuilderRegistry, PayloadBuilder};
pub use client::ProviderClient;
pub use payload::ProviderPayload;
pub use registry::ProviderRegistry;
pub use resolver::{Attachment, AttachmentStatus, AttachmentStore, ContentResolver};
