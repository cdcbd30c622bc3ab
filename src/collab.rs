//! Collaborator traits consumed by the core (spec.md §6.4). The core never
//! implements tokenization, stemming, stop-list membership, or Unicode
//! normalization itself — it is generic over them, the way the teacher is
//! generic over `Tokenizer`/`TokenStream` implementations (see
//! `analyzer::token_stream_chain` for the pattern this follows: small
//! capability traits composed by the feed, not a class hierarchy).

use std::borrow::Cow;
use std::ops::Range;

use crate::schema::{FieldId, FieldOptions};

/// A single token's byte range within the analyzed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub start: usize,
    pub end: usize,
}

/// `parse` breaks a string into tokens; `components` optionally further
/// decomposes one token into sub-token ranges (e.g. CJK segmentation).
pub trait Tokenizer {
    fn parse<'a>(&self, lang_id: u32, text: &'a str) -> Box<dyn Iterator<Item = Token> + 'a>;

    fn components(&self, _token: Token) -> Box<dyn Iterator<Item = Range<usize>>> {
        Box::new(std::iter::empty())
    }
}

/// In-place stemming of a lowercase term.
pub trait Stemmer {
    fn stem(&self, term: &mut String, lang_id: u32);
}

/// Stop-term membership test, plus sorted iteration for preloading
/// (`InversionBuffer::stop_terms_preload`, spec.md §4.2).
pub trait StopList {
    fn contains(&self, term: &str) -> bool;
    fn iter_sorted(&self) -> Box<dyn Iterator<Item = &str> + '_>;
}

/// Unicode normalization (NFC/NFD/etc); implementations may return the
/// input unchanged via `Cow::Borrowed`.
pub trait UnicodeNormalizer {
    fn normalize<'a>(&self, text: &'a str) -> Cow<'a, str>;
}

/// Per-field metadata owned by an external info store, read by the feed
/// and inversion buffer at build time.
pub trait InfoStore {
    fn field_options(&self, field_id: FieldId) -> FieldOptions;
}

/// A `StopList` with no members; used by tests and by builds that disable
/// stop-term recognition entirely.
pub struct NoStopList;

impl StopList for NoStopList {
    fn contains(&self, _term: &str) -> bool {
        false
    }
    fn iter_sorted(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(std::iter::empty())
    }
}

/// A whitespace `Tokenizer`, useful for tests and as the simplest possible
/// real implementation (the "space-splitter" the design notes call out as
/// a legitimate collaborator alongside an ICU-backed one).
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn parse<'a>(&self, _lang_id: u32, text: &'a str) -> Box<dyn Iterator<Item = Token> + 'a> {
        Box::new(whitespace_tokens(text))
    }
}

fn whitespace_tokens(text: &str) -> impl Iterator<Item = Token> + '_ {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push(Token { start: s, end: i });
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(Token { start: s, end: text.len() });
    }
    tokens.into_iter()
}
