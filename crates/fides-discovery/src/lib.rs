//! Fides Identity Discovery
//!
//! Client-side resolution of agent identities:
//! - Typed client for the identity registry service
//! - Self-hosted `/.well-known/fides.json` fallback for bare domains
//! - In-memory resolution cache with a configurable TTL

pub mod client;
pub mod error;
pub mod resolver;
pub mod types;

pub use client::{RegistryClient, FETCH_TIMEOUT};
pub use error::DiscoveryError;
pub use resolver::{ResolutionSource, ResolvedIdentity, Resolver, DEFAULT_CACHE_TTL};
pub use types::{DiscoveryDocument, IdentityRecord, RegisterIdentityRequest};
