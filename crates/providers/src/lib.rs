//! Text-generation providers for Lectern.
//!
//! All providers implement `lectern_core::Provider`. The router builds them
//! from configuration and wraps fallbacks into an ordered chain.

pub mod fallback;
pub mod openai_compat;
pub mod router;

pub use fallback::{FallbackProvider, ProviderHealth};
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
