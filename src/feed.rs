//! Tokenization feed (C1, spec.md §4.1): turns raw per-document token
//! emissions into the `(term, include_in_counts)` pairs the inversion
//! buffer consumes, applying length bounds, case-policy classification,
//! and stemming.

use crate::collab::Stemmer;
use crate::schema::{FieldOptions, Term};

/// A token's case shape, used to decide which forms get emitted (spec.md
/// §4.1 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasePolicy {
    UpperOnly,
    Mixed,
    LowerOnly,
}

fn classify_case(term: &str) -> CasePolicy {
    let mut has_upper = false;
    let mut has_lower = false;
    for c in term.chars() {
        if c.is_uppercase() {
            has_upper = true;
        } else if c.is_lowercase() {
            has_lower = true;
        }
    }
    match (has_upper, has_lower) {
        (true, true) => CasePolicy::Mixed,
        (true, false) => CasePolicy::UpperOnly,
        _ => CasePolicy::LowerOnly,
    }
}

/// A term form ready for `InversionBuffer::add_term`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub term: String,
    pub include_in_counts: bool,
}

/// Drives per-document term emission (spec.md §4.1). Generic over the
/// stemmer collaborator; tokenization itself happens upstream (the host
/// calls a `Tokenizer` to produce raw token text, then feeds each token
/// through here).
pub struct TokenFeed<'s, S: Stemmer> {
    stemmer: &'s S,
    term_len_min: usize,
    term_len_max: usize,
    aborted: bool,
}

impl<'s, S: Stemmer> TokenFeed<'s, S> {
    pub fn new(stemmer: &'s S, term_len_min: usize, term_len_max: usize) -> TokenFeed<'s, S> {
        TokenFeed {
            stemmer,
            term_len_min,
            term_len_max,
            aborted: false,
        }
    }

    /// Fail-fast cancellation hook (spec.md §4.1): once aborted, every
    /// subsequent `emit` call is a no-op.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Applies steps 1-4 of spec.md §4.1 to one raw token, returning zero,
    /// one, or two emissions (the lowercase/stemmed form plus, for
    /// Upper/Mixed tokens, the original-case form).
    pub fn emit(&mut self, lang_id: u32, raw_token: &str, field_options: FieldOptions) -> Vec<Emission> {
        if self.aborted {
            return Vec::new();
        }
        let Some(term) = Term::bounded(raw_token, self.term_len_min, self.term_len_max) else {
            return Vec::new();
        };
        let text = term.as_str().into_owned();
        let case = classify_case(&text);

        let mut primary = text.to_lowercase();
        if matches!(case, CasePolicy::Mixed | CasePolicy::LowerOnly) && field_options.stemming {
            self.stemmer.stem(&mut primary, lang_id);
        }

        let mut out = vec![Emission {
            term: primary,
            include_in_counts: true,
        }];
        if matches!(case, CasePolicy::UpperOnly | CasePolicy::Mixed) {
            out.push(Emission {
                term: text,
                include_in_counts: false,
            });
        }
        out
    }
}
