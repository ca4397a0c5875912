pub mod analysis;
pub mod api;
pub mod config;
pub mod document;
pub mod index;
pub mod providers;
pub mod rag;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export commonly used items
pub use document::{Chunk, Citation, Document, Page};
pub use session::{AnalysisSession, SessionError};
