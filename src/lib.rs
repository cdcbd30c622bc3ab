//! `sindex`: the indexer, term dictionary, and postings engine at the core
//! of a full-text search index. Tokenization and storage of raw documents
//! are host concerns; this crate owns everything from accepted `(doc_id,
//! term, position, field_id)` triples through to postings lookup and query
//! evaluation over a sealed, read-only index directory.

pub mod blockstore;
pub mod collab;
pub mod common;
pub mod config;
pub mod directory;
pub mod error;
pub mod feed;
pub mod invert;
pub mod postings;
pub mod query;
pub mod run;
pub mod schema;
pub mod session;
pub mod termdict;

pub use config::Config;
pub use error::{Result, SindexError};
pub use session::{BuildSession, ReadSession};
