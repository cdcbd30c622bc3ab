//! Build and read sessions (spec.md §3's lifecycle): the state machine that
//! owns the inversion buffer and run files during a build, and the
//! read-only handle shared by concurrent query evaluators once an index is
//! sealed.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::blockstore::{BlockStoreReader, BlockStoreWriter};
use crate::common::write_cvarint;
use crate::config::Config;
use crate::directory::Directory;
use crate::error::{Result, SindexError};
use crate::invert::InversionBuffer;
use crate::query::SearchCache;
use crate::run::{decode_absolute_postings, delta_encode, merge_runs, read_run_records, RunWriter};
use crate::schema::{DocId, FieldId, FieldOptions};
use crate::termdict::{TermDictionaryBuilder, TermDictionaryReader};

const SEALED_MARKER: &str = "SEALED";

/// Hard cap on the byte size of a single merge's combined input, so that
/// any one merge's output cannot exceed the platform's max file size
/// (spec.md §4.3). Conservative enough to hold on filesystems without
/// large-file support.
const MAX_MERGE_GROUP_BYTES: u64 = i32::MAX as u64;

fn run_byte_size(run: &[crate::run::RunRecord]) -> u64 {
    run.iter()
        .map(|record| (record.term.len() + record.postings.len() + 16) as u64)
        .sum()
}

/// Groups runs for one round of the recursive merge: at most `fanin` runs
/// per group (the open-file-descriptor bound), and a group is cut short of
/// that if adding the next run would push its cumulative byte size past
/// `MAX_MERGE_GROUP_BYTES` (spec.md §4.3's "group runs by cumulative byte
/// size, with a hard cap..."). Order is preserved; a run larger than the
/// cap on its own still gets a group of one rather than being split.
fn group_runs_for_merge(
    runs: Vec<Vec<crate::run::RunRecord>>,
    fanin: usize,
) -> Vec<Vec<Vec<crate::run::RunRecord>>> {
    let mut groups = Vec::new();
    let mut current: Vec<Vec<crate::run::RunRecord>> = Vec::new();
    let mut current_bytes: u64 = 0;
    for run in runs {
        let run_bytes = run_byte_size(&run);
        let would_exceed_cap = current_bytes + run_bytes > MAX_MERGE_GROUP_BYTES;
        if !current.is_empty() && (current.len() >= fanin || would_exceed_cap) {
            groups.push(std::mem::take(&mut current));
            current_bytes = 0;
        }
        current_bytes += run_bytes;
        current.push(run);
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Init,
    Feeding,
    Flushing,
    Merging,
    Sealing,
    Sealed,
}

/// Owns the inversion buffer, run files, and a scratch directory for one
/// build (spec.md §3: `Init → Feeding → Flushing → Merging → Sealing →
/// Sealed`). Never shared; on failure, `abort()` removes every temp
/// artifact and leaves the target directory untouched.
pub struct BuildSession {
    directory: Directory,
    scratch: tempfile::TempDir,
    config: Config,
    buffer: InversionBuffer,
    run_files: Vec<PathBuf>,
    state: BuildState,
    max_field_id: FieldId,
    doc_count: u32,
}

impl BuildSession {
    pub fn create(directory: Directory, config: Config) -> Result<BuildSession> {
        let scratch = tempfile::tempdir()?;
        Ok(BuildSession {
            buffer: InversionBuffer::new(&config),
            directory,
            scratch,
            config,
            run_files: Vec::new(),
            state: BuildState::Init,
            max_field_id: 0,
            doc_count: 0,
        })
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Loads stop terms ahead of any `add_term` call (spec.md §4.2). Only
    /// valid in `Init`.
    pub fn stop_terms_preload<'a>(&mut self, terms: impl IntoIterator<Item = &'a str>) -> Result<()> {
        if self.state != BuildState::Init {
            return Err(SindexError::InvalidArgument(
                "stop_terms_preload must run before any add_term".to_string(),
            ));
        }
        self.buffer.stop_terms_preload(terms);
        Ok(())
    }

    pub fn add_term(
        &mut self,
        doc_id: DocId,
        term: &[u8],
        position: u32,
        field_id: FieldId,
        field_options: FieldOptions,
        include_in_counts: bool,
    ) -> Result<()> {
        self.state = BuildState::Feeding;
        self.max_field_id = self.max_field_id.max(field_id);
        self.buffer
            .add_term(doc_id, term, position, field_id, field_options, include_in_counts)
    }

    /// Notifies the session that `doc_id` is complete. Memory governance
    /// only flushes at this boundary, preserving I2 (spec.md §4.2).
    pub fn note_document_boundary(&mut self, doc_id: DocId) -> Result<()> {
        self.buffer.note_document_boundary(doc_id);
        self.doc_count = self.doc_count.max(doc_id);
        if self.buffer.over_budget() {
            self.flush_buffer()?;
        }
        Ok(())
    }

    /// Forces any buffered postings out to a new run file immediately,
    /// regardless of the memory budget. Most callers never need this —
    /// `note_document_boundary` flushes on its own once the buffer is over
    /// budget — but a caller driving many small builds back-to-back, or a
    /// test pinning down the run count before `seal`, can use it to control
    /// run boundaries precisely.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_buffer()
    }

    /// Number of run files written so far (not counting whatever is still
    /// buffered in memory).
    pub fn run_count(&self) -> usize {
        self.run_files.len()
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if self.buffer.unique_term_count() == 0 {
            return Ok(());
        }
        self.state = BuildState::Flushing;
        let path = self.scratch.path().join(format!("run-{:06}", self.run_files.len()));
        let file = File::create(&path)?;
        let mut writer = RunWriter::new(std::io::BufWriter::new(file));
        let is_first_run = self.run_files.is_empty();
        self.buffer.flush_run(&mut writer, is_first_run)?;
        self.run_files.push(path);
        self.state = BuildState::Feeding;
        Ok(())
    }

    /// Cancels the build: the scratch directory (and every run file in it)
    /// is removed; the target directory is never touched before `seal`, so
    /// there is nothing else to undo.
    pub fn abort(self) {
        drop(self.scratch);
    }

    /// Runs the K-way merge to `≤ merge_fanin` runs, then the final merge
    /// into the sealed index (spec.md §4.3), writing `SEALED` last (I6).
    pub fn seal(mut self) -> Result<()> {
        self.flush_buffer()?;
        self.state = BuildState::Merging;

        let mut runs: Vec<Vec<crate::run::RunRecord>> = self
            .run_files
            .iter()
            .map(|path| -> Result<_> {
                let file = File::open(path)?;
                read_run_records(BufReader::new(file))
            })
            .collect::<Result<_>>()?;

        let fanin = self.config.merge_fanin();
        while runs.len() > fanin {
            runs = group_runs_for_merge(runs, fanin)
                .into_iter()
                .map(merge_runs)
                .collect();
        }
        let sealed_records = merge_runs(runs);

        self.state = BuildState::Sealing;
        let mut store = BlockStoreWriter::create(&self.directory)?;
        let mut dict = TermDictionaryBuilder::create(&self.directory)?;
        for record in sealed_records {
            let absolute = decode_absolute_postings(&record.postings)?;
            let (body, field_bitmap) = delta_encode(&absolute, self.max_field_id);
            let mut framed = Vec::with_capacity(body.len() + 5);
            write_cvarint(body.len() as u64, &mut framed)?;
            framed.extend_from_slice(&body);
            let object_id = store.add(&framed)?;
            dict.add_term(
                &record.term,
                record.kind,
                record.term_count,
                record.doc_count,
                object_id,
                field_bitmap,
            )?;
        }
        store.finish(&self.directory)?;
        dict.finish(self.doc_count, self.max_field_id)?;
        self.directory.touch(SEALED_MARKER)?;
        self.state = BuildState::Sealed;
        Ok(())
    }
}

/// A read-only handle onto a sealed index, shared by any number of
/// concurrent query evaluators (spec.md §3).
pub struct ReadSession {
    dict: TermDictionaryReader,
    store: BlockStoreReader,
    config: Config,
    cache: SearchCache,
    generation: u64,
}

impl ReadSession {
    /// Refuses to open without the `SEALED` sentinel present (I6).
    pub fn open(directory: &Directory, config: Config, generation: u64) -> Result<ReadSession> {
        if !directory.exists(SEALED_MARKER) {
            return Err(SindexError::Corrupt(
                "index directory is missing its SEALED marker".to_string(),
            ));
        }
        let cache_enable = config.cache_enable;
        Ok(ReadSession {
            dict: TermDictionaryReader::open(directory)?,
            store: BlockStoreReader::open(directory)?,
            config,
            cache: SearchCache::new(cache_enable),
            generation,
        })
    }

    pub fn dict(&self) -> &TermDictionaryReader {
        &self.dict
    }

    pub fn store(&self) -> &BlockStoreReader {
        &self.store
    }

    pub fn evaluator(&self) -> crate::query::Evaluator<'_> {
        crate::query::Evaluator::new(&self.dict, &self.store, &self.config, &self.cache, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Deadline, QueryNode};
    use crate::schema::FieldOptions;

    fn opts() -> FieldOptions {
        FieldOptions::default()
    }

    fn run_of(term: &str, postings_len: usize) -> Vec<crate::run::RunRecord> {
        vec![crate::run::RunRecord {
            kind: crate::schema::TermKind::Regular,
            term_count: 1,
            doc_count: 1,
            include_in_counts: true,
            term: term.as_bytes().to_vec(),
            postings: vec![0u8; postings_len],
        }]
    }

    #[test]
    fn test_group_runs_respects_fanin_count() {
        let runs = vec![run_of("a", 4), run_of("b", 4), run_of("c", 4), run_of("d", 4), run_of("e", 4)];
        let groups = group_runs_for_merge(runs, 2);
        assert_eq!(groups.iter().map(|g| g.len()).collect::<Vec<_>>(), vec![2, 2, 1]);
    }

    #[test]
    fn test_group_runs_cuts_short_on_byte_cap() {
        let big = run_of("a", (MAX_MERGE_GROUP_BYTES - 10) as usize);
        let small = run_of("b", 4);
        let groups = group_runs_for_merge(vec![big, small.clone(), small], 10);
        // the first run alone is near the cap, so the second run starts a
        // fresh group even though fanin would otherwise allow more.
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 1);
        assert_eq!(groups[1].len(), 2);
    }

    #[test]
    fn test_empty_build_seals_with_zero_terms() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Directory::open(tmp.path()).unwrap();
        let session = BuildSession::create(Directory::open(tmp.path()).unwrap(), Config::default()).unwrap();
        session.seal().unwrap();
        assert!(dir.exists(SEALED_MARKER));
        let read = ReadSession::open(&dir, Config::default(), 0).unwrap();
        assert_eq!(read.dict().len_blocks(), 0);
    }

    #[test]
    fn test_one_doc_one_term_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Directory::open(tmp.path()).unwrap();
        let mut session = BuildSession::create(Directory::open(tmp.path()).unwrap(), Config::default()).unwrap();
        session.add_term(1, b"cat", 0, 1, opts(), true).unwrap();
        session.note_document_boundary(1).unwrap();
        session.seal().unwrap();

        let read = ReadSession::open(&dir, Config::default(), 0).unwrap();
        let evaluator = read.evaluator();
        let hits = evaluator
            .evaluate(
                &QueryNode::Term { term: b"cat".to_vec(), fields: None },
                Deadline::none(),
            )
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, 1);
    }

    #[test]
    fn test_seed_scenario_one_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Directory::open(tmp.path()).unwrap();
        let mut session = BuildSession::create(Directory::open(tmp.path()).unwrap(), Config::default()).unwrap();
        for (doc, field, pos, term) in [
            (1u32, 1u32, 0u32, "cat"),
            (1, 1, 1, "sat"),
            (1, 1, 2, "mat"),
            (2, 1, 0, "cat"),
            (2, 1, 1, "dog"),
        ] {
            session.add_term(doc, term.as_bytes(), pos, field, opts(), true).unwrap();
            session.note_document_boundary(doc).unwrap();
        }
        session.seal().unwrap();

        let read = ReadSession::open(&dir, Config::default(), 0).unwrap();
        let evaluator = read.evaluator();
        let cat_entry = read.dict().lookup_exact(b"cat").unwrap().unwrap();
        assert_eq!(cat_entry.document_count, 2);
        assert_eq!(cat_entry.total_term_count, 2);

        let query = QueryNode::And(
            Box::new(QueryNode::Term { term: b"cat".to_vec(), fields: None }),
            Box::new(QueryNode::Term { term: b"dog".to_vec(), fields: None }),
        );
        let hits = evaluator.evaluate(&query, Deadline::none()).unwrap();
        let docs: Vec<_> = hits.iter().map(|p| p.doc_id).collect();
        assert_eq!(docs, vec![2, 2]);
    }

    #[test]
    fn test_merge_fanin_recursion() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Directory::open(tmp.path()).unwrap();
        let mut config = Config::default();
        config.set_merge_fanin(2).unwrap();
        let mut session = BuildSession::create(Directory::open(tmp.path()).unwrap(), config.clone()).unwrap();
        // Force three separate runs with an explicit flush() between terms;
        // seal()'s `while runs.len() > fanin` loop only recurses if there
        // really are more runs than the fan-in, which `note_document_boundary`
        // alone won't produce for three one-term documents.
        for (doc, term) in [(1u32, "a"), (2, "b"), (3, "c")] {
            session.add_term(doc, term.as_bytes(), 0, 1, opts(), true).unwrap();
            session.note_document_boundary(doc).unwrap();
            session.flush().unwrap();
        }
        assert_eq!(session.run_count(), 3);
        session.seal().unwrap();
        let read = ReadSession::open(&dir, config, 0).unwrap();
        for term in ["a", "b", "c"] {
            assert!(read.dict().lookup_exact(term.as_bytes()).unwrap().is_some());
        }
    }

    #[test]
    fn test_corrupted_block_only_affects_its_term() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Directory::open(tmp.path()).unwrap();
        let mut session = BuildSession::create(Directory::open(tmp.path()).unwrap(), Config::default()).unwrap();
        session.add_term(1, b"cat", 0, 1, opts(), true).unwrap();
        session.note_document_boundary(1).unwrap();
        session.add_term(1, b"dog", 0, 1, opts(), true).unwrap();
        session.seal().unwrap();

        let data_path = tmp.path().join("terms.data");
        let mut bytes = std::fs::read(&data_path).unwrap();
        bytes[0] ^= 0xff;
        std::fs::write(&data_path, bytes).unwrap();

        let read = ReadSession::open(&dir, Config::default(), 0).unwrap();
        let evaluator = read.evaluator();
        let cat_result = evaluator.evaluate(
            &QueryNode::Term { term: b"cat".to_vec(), fields: None },
            Deadline::none(),
        );
        let dog_result = evaluator.evaluate(
            &QueryNode::Term { term: b"dog".to_vec(), fields: None },
            Deadline::none(),
        );
        assert!(cat_result.is_err() || dog_result.is_err());
        assert!(cat_result.is_ok() || dog_result.is_ok());
    }

    #[test]
    fn test_abort_leaves_directory_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Directory::open(tmp.path()).unwrap();
        let mut session = BuildSession::create(Directory::open(tmp.path()).unwrap(), Config::default()).unwrap();
        session.add_term(1, b"cat", 0, 1, opts(), true).unwrap();
        session.abort();
        assert!(!dir.exists(SEALED_MARKER));
        assert!(!dir.exists("terms.dict"));
    }
}
