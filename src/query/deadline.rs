use std::time::Instant;

use crate::error::{Result, SindexError};

/// An optional query deadline (spec.md §5): operators poll it at doc/block
/// boundaries and unwind with `DeadlineExceeded` rather than surfacing a
/// partial result.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn none() -> Deadline {
        Deadline { at: None }
    }

    pub fn at(instant: Instant) -> Deadline {
        Deadline { at: Some(instant) }
    }

    pub fn check(&self) -> Result<()> {
        match self.at {
            Some(deadline) if Instant::now() >= deadline => Err(SindexError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_no_deadline_never_fails() {
        assert!(Deadline::none().check().is_ok());
    }

    #[test]
    fn test_past_deadline_fails() {
        let deadline = Deadline::at(Instant::now() - Duration::from_secs(1));
        assert!(deadline.check().is_err());
    }

    #[test]
    fn test_future_deadline_passes() {
        let deadline = Deadline::at(Instant::now() + Duration::from_secs(60));
        assert!(deadline.check().is_ok());
    }
}
