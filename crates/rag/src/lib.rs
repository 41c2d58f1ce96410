//! Content bounding for Lectern.
//!
//! Turns arbitrarily large source text into one bounded, task-relevant
//! context: token estimation, semantic chunking, lexical retrieval and the
//! assembler that ties them together with fallbacks.

pub mod assembler;
pub mod chunker;
pub mod extract;
pub mod retriever;
pub mod token;

mod slice;

pub use assembler::{
    BoundedContext, BoundingStrategy, ContextAssembler, ContextStats, max_chunks_for,
    truncate_to_tokens,
};
pub use chunker::{Chunker, find_boundaries};
pub use extract::{combine_sources, html_section, html_to_text, image_descriptions};
pub use retriever::{Retriever, combine, keywords};
pub use token::{count_words, estimate_tokens};
