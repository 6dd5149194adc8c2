//! Recycle Lens library
//!
//! Detection, aggregation, knowledge lookup and ingestion, shared by the server
//! and the command line tools.

pub mod config;
pub mod detection;
pub mod ingestion;
pub mod knowledge;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use detection::{build_detector, Detection, Detector};
pub use knowledge::{KnowledgeStore, SqliteKnowledgeStore};
pub use server::{run_server, RequestsLoggingLevel};
