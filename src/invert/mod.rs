//! Inversion buffer (C2, spec.md §4.2): the in-memory trie that accumulates
//! postings before they are flushed to a sorted run (C3).

mod term_block;
mod trie;

pub use term_block::TermBlock;

use std::collections::HashSet;

use crate::config::Config;
use crate::error::{Result, SindexError};
use crate::run::{RunRecord, RunWriter};
use crate::schema::{DocId, FieldId, FieldOptions, TermKind};
use trie::Trie;

/// The in-memory term trie plus the build-wide bookkeeping spec.md §4.2
/// requires: document/term counters, the stop-term preload set, and the
/// running memory estimate that triggers a flush.
pub struct InversionBuffer {
    trie: Trie,
    stop_terms: HashSet<Vec<u8>>,
    document_count: u32,
    unique_term_count: u32,
    total_term_count: u64,
    stop_term_counts: u64,
    last_doc_id_seen: DocId,
    memory_budget_bytes: usize,
    trie_and_block_bytes: usize,
    frequent_term_threshold: u32,
}

impl InversionBuffer {
    pub fn new(config: &Config) -> InversionBuffer {
        InversionBuffer {
            trie: Trie::new(),
            stop_terms: HashSet::new(),
            document_count: 0,
            unique_term_count: 0,
            total_term_count: 0,
            stop_term_counts: 0,
            last_doc_id_seen: 0,
            memory_budget_bytes: config.memory_budget_bytes(),
            trie_and_block_bytes: 0,
            frequent_term_threshold: config.frequent_term_threshold,
        }
    }

    /// Loads stop terms into the trie ahead of any `add_term` call
    /// (spec.md §4.2).
    pub fn stop_terms_preload<'a>(&mut self, terms: impl IntoIterator<Item = &'a str>) {
        for term in terms {
            self.stop_terms.insert(term.as_bytes().to_vec());
            let new_nodes = self.trie.preload_stop_term(term.as_bytes());
            self.trie_and_block_bytes += new_nodes * std::mem::size_of::<usize>() * 4;
        }
    }

    /// Appends one posting for `(doc_id, term)`.
    ///
    /// Fails with `InvalidArgument` if `position` does not strictly
    /// increase for this `(doc_id, term)` pair, or if `doc_id` regresses
    /// relative to any term already seen in this buffer instance
    /// (spec.md §5: "must not reintroduce a doc_id after a later one has
    /// been seen").
    pub fn add_term(
        &mut self,
        doc_id: DocId,
        term: &[u8],
        position: u32,
        field_id: FieldId,
        field_options: FieldOptions,
        include_in_counts: bool,
    ) -> Result<()> {
        if doc_id == 0 {
            return Err(SindexError::InvalidArgument(
                "doc_id 0 is reserved and may never be assigned".to_string(),
            ));
        }
        if doc_id < self.last_doc_id_seen {
            return Err(SindexError::InvalidArgument(format!(
                "doc_id {doc_id} regressed after {}",
                self.last_doc_id_seen
            )));
        }
        self.last_doc_id_seen = doc_id;

        let was_known_stop = self.trie.is_known_stop(term) || self.stop_terms.contains(term);
        let (block, is_new_term, bytes_added) =
            self.trie.get_or_create_block(term, include_in_counts);
        self.trie_and_block_bytes += bytes_added;
        if is_new_term {
            self.unique_term_count += 1;
            if was_known_stop {
                block.term_kind = TermKind::Stop;
            }
        } else if block.term_kind == TermKind::Unknown {
            block.term_kind = TermKind::Regular;
        }

        let cap_before = block.byte_capacity();
        block.add_posting(doc_id, position, field_id)?;
        let cap_after = block.byte_capacity();
        self.trie_and_block_bytes += cap_after.saturating_sub(cap_before);

        self.total_term_count += 1;
        if block.term_kind == TermKind::Stop {
            self.stop_term_counts += 1;
            if field_options.honor_stop_list {
                // Counts still update above for reporting; the posting
                // itself must not be appended (spec.md §4.2).
                self.pop_last_posting_from_stop_block(term);
                return Ok(());
            }
        }

        if block.term_count >= self.frequent_term_threshold && block.term_kind != TermKind::Stop {
            block.term_kind = TermKind::Frequent;
        }

        Ok(())
    }

    /// A `Stop` term whose field honors the stop list must not retain the
    /// posting just written (spec.md §4.2) even though counts already
    /// advanced; the simplest correct way to express "don't append" after
    /// already appending inside `add_posting` is to truncate the byte
    /// buffer back by exactly the entry just written. We re-derive the
    /// entry's encoded length rather than threading an extra return value
    /// through `TermBlock::add_posting`, since this path is rare (stop
    /// terms only) and keeps `add_posting`'s contract simple for the
    /// common case.
    fn pop_last_posting_from_stop_block(&mut self, term: &[u8]) {
        let (block, _, _) = self.trie.get_or_create_block(term, true);
        block.drop_last_posting();
    }

    pub fn memory_size(&self) -> usize {
        self.trie_and_block_bytes
    }

    pub fn document_count(&self) -> u32 {
        self.document_count
    }

    pub fn note_document_boundary(&mut self, doc_id: DocId) {
        if doc_id != 0 {
            self.document_count = self.document_count.max(doc_id);
        }
    }

    pub fn unique_term_count(&self) -> u32 {
        self.unique_term_count
    }

    pub fn total_term_count(&self) -> u64 {
        self.total_term_count
    }

    pub fn stop_term_counts(&self) -> u64 {
        self.stop_term_counts
    }

    /// Whether the buffer has crossed its memory budget. Checked by the
    /// host only at document boundaries, to preserve I2 (spec.md §4.2).
    pub fn over_budget(&self) -> bool {
        self.memory_size() >= self.memory_budget_bytes
    }

    /// Drains the buffer to a sorted run via `writer`, then resets all
    /// per-cycle state (spec.md §4.2's `flush_run`).
    pub fn flush_run<W: std::io::Write>(&mut self, writer: &mut RunWriter<W>, is_first_run: bool) -> Result<()> {
        for (term_bytes, block) in self.trie.iter_sorted() {
            let elide = block.term_kind == TermKind::Stop && block.bytes().is_empty() && !is_first_run;
            if elide {
                continue;
            }
            writer.write_record(&RunRecord {
                kind: block.term_kind,
                term_count: block.term_count,
                doc_count: block.document_count,
                include_in_counts: block.include_in_counts,
                term: term_bytes,
                postings: block.bytes().to_vec(),
            })?;
        }
        writer.finish_run()?;
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.trie.clear();
        self.trie_and_block_bytes = 0;
        self.unique_term_count = 0;
        self.total_term_count = 0;
        self.stop_term_counts = 0;
        // stop_terms and last_doc_id_seen persist across flushes within a
        // single build session.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunWriter;

    fn opts() -> FieldOptions {
        FieldOptions::default()
    }

    #[test]
    fn test_add_term_and_memory_growth() {
        let config = Config::default();
        let mut buffer = InversionBuffer::new(&config);
        assert_eq!(buffer.memory_size(), 0);
        buffer.add_term(1, b"cat", 0, 1, opts(), true).unwrap();
        assert!(buffer.memory_size() > 0);
        assert_eq!(buffer.unique_term_count(), 1);
        assert_eq!(buffer.total_term_count(), 1);
    }

    #[test]
    fn test_doc_id_regression_is_rejected() {
        let config = Config::default();
        let mut buffer = InversionBuffer::new(&config);
        buffer.add_term(2, b"cat", 0, 1, opts(), true).unwrap();
        assert!(buffer.add_term(1, b"dog", 0, 1, opts(), true).is_err());
    }

    #[test]
    fn test_stop_term_not_retained_when_honored() {
        let config = Config::default();
        let mut buffer = InversionBuffer::new(&config);
        buffer.stop_terms_preload(["the"]);
        let mut honoring = opts();
        honoring.honor_stop_list = true;
        buffer.add_term(1, b"the", 0, 1, honoring, true).unwrap();
        assert_eq!(buffer.stop_term_counts(), 1);

        let mut writer = RunWriter::new(Vec::new());
        buffer.flush_run(&mut writer, true).unwrap();
        let bytes = writer.into_inner();
        let records = crate::run::read_run_records(&bytes[..]).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].postings.is_empty());
    }

    #[test]
    fn test_stop_term_retained_when_not_honored() {
        let config = Config::default();
        let mut buffer = InversionBuffer::new(&config);
        buffer.stop_terms_preload(["the"]);
        let mut not_honoring = opts();
        not_honoring.honor_stop_list = false;
        buffer.add_term(1, b"the", 0, 2, not_honoring, true).unwrap();

        let mut writer = RunWriter::new(Vec::new());
        buffer.flush_run(&mut writer, true).unwrap();
        let bytes = writer.into_inner();
        let records = crate::run::read_run_records(&bytes[..]).unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].postings.is_empty());
    }
}
