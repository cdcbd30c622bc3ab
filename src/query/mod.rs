//! Query evaluation (spec.md §4.6.4): walks a pre-parsed query tree
//! bottom-up, expanding wildcards to a dictionary range scan and pushing
//! field restrictions into the lookup, with an optional cache and deadline.

mod cache;
mod deadline;
mod node;
mod weight;

pub use cache::{fingerprint, SearchCache};
pub use deadline::Deadline;
pub use node::QueryNode;
pub use weight::idf;

use crate::blockstore::BlockStoreReader;
use crate::config::Config;
use crate::error::Result;
use crate::postings::{adj_merge, and_merge, filter, not_merge, or_merge, xor_merge, Posting};
use crate::schema::{FieldBitmap, FieldId};
use crate::termdict::TermDictionaryReader;

/// Ties the term dictionary and block store of one sealed index to a
/// config and cache, and evaluates query trees against them.
pub struct Evaluator<'a> {
    dict: &'a TermDictionaryReader,
    store: &'a BlockStoreReader,
    config: &'a Config,
    cache: &'a SearchCache,
    generation: u64,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        dict: &'a TermDictionaryReader,
        store: &'a BlockStoreReader,
        config: &'a Config,
        cache: &'a SearchCache,
        generation: u64,
    ) -> Evaluator<'a> {
        Evaluator {
            dict,
            store,
            config,
            cache,
            generation,
        }
    }

    /// The IDF-style weight `w(t)` for `term` (spec.md §4.6.5). `0.0` for a
    /// term absent from the dictionary.
    pub fn term_idf(&self, term: &[u8]) -> Result<f32> {
        match self.dict.lookup_exact(term)? {
            Some(entry) => Ok(idf(self.dict.n_docs(), entry.document_count)),
            None => Ok(0.0),
        }
    }

    pub fn evaluate(&self, node: &QueryNode, deadline: Deadline) -> Result<Vec<Posting>> {
        deadline.check()?;
        let key = fingerprint(node, self.generation);
        if let Some(cached) = self.cache.get(key) {
            return Ok(cached);
        }
        let result = self.evaluate_uncached(node, deadline)?;
        self.cache.insert(key, result.clone());
        Ok(result)
    }

    fn evaluate_uncached(&self, node: &QueryNode, deadline: Deadline) -> Result<Vec<Posting>> {
        deadline.check()?;
        match node {
            QueryNode::Term { term, fields } => self.lookup_term(term, fields.as_deref()),
            QueryNode::Wildcard { pattern, fields } => self.lookup_wildcard(pattern, fields.as_deref()),
            QueryNode::And(a, b) => {
                Ok(and_merge(self.evaluate(a, deadline)?, self.evaluate(b, deadline)?))
            }
            QueryNode::Or(a, b) => {
                Ok(or_merge(self.evaluate(a, deadline)?, self.evaluate(b, deadline)?))
            }
            QueryNode::Not(a, b) => {
                Ok(not_merge(self.evaluate(a, deadline)?, self.evaluate(b, deadline)?))
            }
            QueryNode::Xor(a, b) => {
                Ok(xor_merge(self.evaluate(a, deadline)?, self.evaluate(b, deadline)?))
            }
            QueryNode::Adj(a, b, k, mode) => Ok(adj_merge(
                self.evaluate(a, deadline)?,
                self.evaluate(b, deadline)?,
                *k,
                *mode,
            )),
            QueryNode::Filter(inner, doc_ids) => {
                let mut bitmap = crate::postings::SearchBitmap::new(self.dict.n_docs());
                for &doc_id in doc_ids {
                    bitmap.set(doc_id);
                }
                Ok(filter(self.evaluate(inner, deadline)?, &bitmap))
            }
        }
    }

    fn required_bitmap(&self, fields: Option<&[FieldId]>) -> Option<FieldBitmap> {
        fields.map(|fields| {
            let mut bitmap = FieldBitmap::new(self.dict.max_field_id());
            for &field_id in fields {
                bitmap.set(field_id);
            }
            bitmap
        })
    }

    /// A dictionary miss converts to an empty postings list here, per
    /// spec.md §7's propagation policy ("C6 converts NotFound at a leaf
    /// into an empty postings list").
    fn lookup_term(&self, term: &[u8], fields: Option<&[FieldId]>) -> Result<Vec<Posting>> {
        let Some(entry) = self.dict.lookup_exact(term)? else {
            return Ok(Vec::new());
        };
        if let Some(required) = self.required_bitmap(fields) {
            if !entry.field_bitmap.intersects(&required) {
                return Ok(Vec::new());
            }
        }
        let framed = self.store.get(entry.block_object_id)?;
        let body = crate::postings::unframe_block(framed)?;
        crate::postings::PostingsList::from_block(body, None).into_postings()
    }

    fn lookup_wildcard(&self, pattern: &[u8], fields: Option<&[FieldId]>) -> Result<Vec<Posting>> {
        let required = self.required_bitmap(fields);
        let entries =
            self.dict
                .lookup_wildcard(pattern, required.as_ref(), self.config.wildcard_max_expansion)?;
        let mut out = Vec::new();
        for entry in entries {
            let framed = self.store.get(entry.block_object_id)?;
            let body = crate::postings::unframe_block(framed)?;
            let postings = crate::postings::PostingsList::from_block(body, None).into_postings()?;
            out = or_merge(out, postings);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockstore::BlockStoreWriter;
    use crate::directory::Directory;
    use crate::postings::AdjMode;
    use crate::schema::TermKind;
    use crate::termdict::TermDictionaryBuilder;

    fn framed(body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        crate::common::write_cvarint(body.len() as u64, &mut out).unwrap();
        out.extend_from_slice(body);
        out
    }

    fn build_index() -> (tempfile::TempDir, Directory) {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Directory::open(tmp.path()).unwrap();

        let mut store = BlockStoreWriter::create(&dir).unwrap();
        let (cat_body, cat_bitmap) =
            crate::run::delta_encode(&[(1, 0, 1), (2, 0, 1)], 1);
        let cat_id = store.add(&framed(&cat_body)).unwrap();
        let (dog_body, dog_bitmap) = crate::run::delta_encode(&[(2, 1, 1)], 1);
        let dog_id = store.add(&framed(&dog_body)).unwrap();
        store.finish(&dir).unwrap();

        let mut dict = TermDictionaryBuilder::create(&dir).unwrap();
        dict.add_term(b"cat", TermKind::Regular, 2, 2, cat_id, cat_bitmap)
            .unwrap();
        dict.add_term(b"dog", TermKind::Regular, 1, 1, dog_id, dog_bitmap)
            .unwrap();
        dict.finish(2, 1).unwrap();

        (tmp, dir)
    }

    #[test]
    fn test_and_query_matches_seed_scenario_one() {
        let (_tmp, dir) = build_index();
        let dict = TermDictionaryReader::open(&dir).unwrap();
        let store = BlockStoreReader::open(&dir).unwrap();
        let config = Config::default();
        let cache = SearchCache::new(true);
        let evaluator = Evaluator::new(&dict, &store, &config, &cache, 0);

        let query = QueryNode::And(
            Box::new(QueryNode::Term {
                term: b"cat".to_vec(),
                fields: None,
            }),
            Box::new(QueryNode::Term {
                term: b"dog".to_vec(),
                fields: None,
            }),
        );
        let result = evaluator.evaluate(&query, Deadline::none()).unwrap();
        let docs: Vec<_> = result.iter().map(|p| p.doc_id).collect();
        assert_eq!(docs, vec![2, 2]);
    }

    #[test]
    fn test_missing_term_is_empty_not_error() {
        let (_tmp, dir) = build_index();
        let dict = TermDictionaryReader::open(&dir).unwrap();
        let store = BlockStoreReader::open(&dir).unwrap();
        let config = Config::default();
        let cache = SearchCache::new(true);
        let evaluator = Evaluator::new(&dict, &store, &config, &cache, 0);

        let query = QueryNode::Term {
            term: b"zzz".to_vec(),
            fields: None,
        };
        assert!(evaluator.evaluate(&query, Deadline::none()).unwrap().is_empty());
    }

    #[test]
    fn test_adj_phrase_through_evaluator() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Directory::open(tmp.path()).unwrap();
        let mut store = BlockStoreWriter::create(&dir).unwrap();
        let (new_body, new_bitmap) = crate::run::delta_encode(&[(10, 5, 1), (11, 5, 1)], 1);
        let new_id = store.add(&framed(&new_body)).unwrap();
        let (york_body, york_bitmap) = crate::run::delta_encode(&[(10, 6, 1), (11, 7, 1)], 1);
        let york_id = store.add(&framed(&york_body)).unwrap();
        store.finish(&dir).unwrap();

        let mut dict = TermDictionaryBuilder::create(&dir).unwrap();
        dict.add_term(b"new", TermKind::Regular, 2, 2, new_id, new_bitmap).unwrap();
        dict.add_term(b"york", TermKind::Regular, 2, 2, york_id, york_bitmap).unwrap();
        dict.finish(11, 1).unwrap();

        let dict = TermDictionaryReader::open(&dir).unwrap();
        let store = BlockStoreReader::open(&dir).unwrap();
        let config = Config::default();
        let cache = SearchCache::new(false);
        let evaluator = Evaluator::new(&dict, &store, &config, &cache, 0);

        let query = QueryNode::Adj(
            Box::new(QueryNode::Term { term: b"new".to_vec(), fields: None }),
            Box::new(QueryNode::Term { term: b"york".to_vec(), fields: None }),
            1,
            AdjMode::Strict,
        );
        let result = evaluator.evaluate(&query, Deadline::none()).unwrap();
        let docs: Vec<_> = result.iter().map(|p| p.doc_id).collect();
        assert_eq!(docs, vec![10, 10]);
    }
}
