use crate::error::{Result, SindexError};

/// `?` matches exactly one byte, `*` matches any number of bytes (spec.md
/// §4.4). A bare `*` is rejected by the caller before a range scan would be
/// attempted over the entire dictionary.
pub fn longest_literal_prefix(pattern: &[u8]) -> &[u8] {
    let end = pattern
        .iter()
        .position(|&b| b == b'?' || b == b'*')
        .unwrap_or(pattern.len());
    &pattern[..end]
}

/// The exclusive upper bound of the byte-wise range scan implied by a
/// literal prefix: the smallest byte string greater than every string
/// starting with `prefix`. `None` if the prefix is empty (no sensible
/// upper bound; callers should scan the whole dictionary instead) or if
/// incrementing would overflow (a prefix of all `0xFF` bytes — then there
/// is no finite upper bound and the scan must run to the end of the
/// dictionary).
pub fn prefix_range_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(&last) = end.last() {
        if last == 0xff {
            end.pop();
        } else {
            *end.last_mut().unwrap() += 1;
            return Some(end);
        }
    }
    None
}

/// Matches `term` against `pattern`, where `?` is a single-byte wildcard
/// and `*` matches zero or more bytes. Plain bytes must match exactly.
pub fn glob_match(pattern: &[u8], term: &[u8]) -> bool {
    glob_match_rec(pattern, term)
}

fn glob_match_rec(pattern: &[u8], term: &[u8]) -> bool {
    match pattern.first() {
        None => term.is_empty(),
        Some(b'*') => {
            // Try matching the rest of the pattern at every suffix of term.
            (0..=term.len()).any(|i| glob_match_rec(&pattern[1..], &term[i..]))
        }
        Some(b'?') => !term.is_empty() && glob_match_rec(&pattern[1..], &term[1..]),
        Some(&byte) => term.first() == Some(&byte) && glob_match_rec(&pattern[1..], &term[1..]),
    }
}

/// Validates a wildcard pattern: a bare `*` is rejected (`BadWildcard`,
/// spec.md §4.4) since it would force a full dictionary scan.
pub fn validate_pattern(pattern: &[u8]) -> Result<()> {
    if pattern == b"*" {
        return Err(SindexError::InvalidArgument(
            "wildcard pattern '*' matches everything; use lookup_range instead".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_literal_prefix() {
        assert_eq!(longest_literal_prefix(b"run*"), b"run");
        assert_eq!(longest_literal_prefix(b"r?n"), b"r");
        assert_eq!(longest_literal_prefix(b"noglob"), b"noglob");
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match(b"run*", b"running"));
        assert!(glob_match(b"run*", b"run"));
        assert!(!glob_match(b"run*", b"ruse"));
        assert!(glob_match(b"r?n", b"run"));
        assert!(!glob_match(b"r?n", b"ruin"));
        assert!(glob_match(b"*", b"anything"));
    }

    #[test]
    fn test_prefix_range_end() {
        assert_eq!(prefix_range_end(b"abc"), Some(b"abd".to_vec()));
        assert_eq!(prefix_range_end(&[0xff]), None);
        assert_eq!(prefix_range_end(&[b'a', 0xff]), Some(vec![b'b']));
    }

    #[test]
    fn test_bare_star_rejected() {
        assert!(validate_pattern(b"*").is_err());
        assert!(validate_pattern(b"a*").is_ok());
    }
}
