use std::io;
use thiserror::Error;

/// The error kinds from spec.md §7, modeled as one enum per the teacher's
/// (now-defunct `error-chain`) style of a single derive-backed error type.
#[derive(Error, Debug)]
pub enum SindexError {
    /// An on-disk structure violates an invariant: missing `SEALED`,
    /// truncated varint, a block whose declared length overruns the file,
    /// an unsorted dictionary. Fatal; the session that observed it is
    /// discarded.
    #[error("corrupt index: {0}")]
    Corrupt(String),

    /// A caller-supplied argument was invalid (bad term length, bad field
    /// id, bad wildcard pattern, out-of-order `add_term`). The session
    /// remains usable; the offending call had no effect.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Allocation failure, a run file would exceed the platform's maximum
    /// file size, or a wildcard expanded past its configured cap.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Underlying read/write/mmap failure.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A query's deadline was exceeded mid-evaluation.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A lookup found nothing. Normal control flow; callers should not log
    /// this as an error.
    #[error("not found")]
    NotFound,
}

pub type Result<T> = std::result::Result<T, SindexError>;
