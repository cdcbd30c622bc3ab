use crate::error::{Result, SindexError};

/// `TermKind ∈ {Regular, Stop, Frequent, Unknown}` (spec.md §9): a tagged
/// variant, not a bitfield, with a fixed on-disk byte mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TermKind {
    Unknown,
    Regular,
    Stop,
    Frequent,
}

impl TermKind {
    pub fn to_byte(self) -> u8 {
        match self {
            TermKind::Unknown => 0,
            TermKind::Regular => 1,
            TermKind::Stop => 2,
            TermKind::Frequent => 3,
        }
    }

    pub fn from_byte(byte: u8) -> Result<TermKind> {
        match byte {
            0 => Ok(TermKind::Unknown),
            1 => Ok(TermKind::Regular),
            2 => Ok(TermKind::Stop),
            3 => Ok(TermKind::Frequent),
            other => Err(SindexError::Corrupt(format!("unknown term kind byte {other}"))),
        }
    }

    /// Promotion when the same term is seen contributing from more than one
    /// run during a merge: `Stop` wins over anything but itself, matching
    /// `invert.c`'s "promote kind to Stop if any input contributed Stop".
    pub fn promote(self, other: TermKind) -> TermKind {
        use TermKind::*;
        match (self, other) {
            (Stop, _) | (_, Stop) => Stop,
            (Frequent, _) | (_, Frequent) => Frequent,
            (Regular, _) | (_, Regular) => Regular,
            (Unknown, Unknown) => Unknown,
        }
    }
}

/// A validated term byte string: UTF-8, length in `[Lmin, Lmax]`, truncated
/// on a codepoint boundary (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Term(Vec<u8>);

impl Term {
    /// Builds a `Term` from raw token text, applying the length bound from
    /// spec.md §4.1 step 1: truncate to `max_len` bytes on a codepoint
    /// boundary, then reject (`None`) if the result is shorter than
    /// `min_len`.
    pub fn bounded(raw: &str, min_len: usize, max_len: usize) -> Option<Term> {
        let truncated = if raw.len() <= max_len {
            raw
        } else {
            let mut boundary = max_len;
            while boundary > 0 && !raw.is_char_boundary(boundary) {
                boundary -= 1;
            }
            &raw[..boundary]
        };
        if truncated.len() < min_len {
            None
        } else {
            Some(Term(truncated.as_bytes().to_vec()))
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Term {
        Term(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_on_codepoint_boundary() {
        // 'é' is 2 bytes in UTF-8 (U+00E9), so a max_len landing inside it
        // must back off by one byte, never splitting the codepoint.
        let raw = "caf\u{e9}"; // c a f é -> 5 bytes
        let term = Term::bounded(raw, 2, 4).unwrap();
        // max_len=4 lands exactly mid-'é' (byte 4 splits the 2-byte char at offset 3-4)
        assert!(std::str::from_utf8(term.as_bytes()).is_ok());
        assert!(term.as_bytes().len() <= 4);
    }

    #[test]
    fn test_below_min_len_is_dropped() {
        assert!(Term::bounded("a", 2, 1024).is_none());
        assert!(Term::bounded("ab", 2, 1024).is_some());
    }

    #[test]
    fn test_kind_promotion_prefers_stop() {
        assert_eq!(TermKind::Regular.promote(TermKind::Stop), TermKind::Stop);
        assert_eq!(TermKind::Stop.promote(TermKind::Regular), TermKind::Stop);
        assert_eq!(TermKind::Unknown.promote(TermKind::Regular), TermKind::Regular);
    }

    #[test]
    fn test_kind_byte_round_trip() {
        for kind in [TermKind::Unknown, TermKind::Regular, TermKind::Stop, TermKind::Frequent] {
            assert_eq!(TermKind::from_byte(kind.to_byte()).unwrap(), kind);
        }
    }
}
