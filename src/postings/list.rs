use super::decode::PostingCursor;
use super::posting::Posting;
use crate::error::Result;

/// A postings list, lazy over a compressed block until an operator needs
/// random access (spec.md §4.6.1). Operators that only need one streaming
/// pass (OR/AND/NOT/XOR) decode through the cursor as they go; `ADJ`
/// materializes first since it groups postings by field within a doc.
pub enum PostingsList<'a> {
    Lazy {
        bytes: &'a [u8],
        term_weight: Option<f32>,
    },
    Materialized(Vec<Posting>),
}

impl<'a> PostingsList<'a> {
    pub fn from_block(bytes: &'a [u8], term_weight: Option<f32>) -> PostingsList<'a> {
        PostingsList::Lazy { bytes, term_weight }
    }

    pub fn empty() -> PostingsList<'static> {
        PostingsList::Materialized(Vec::new())
    }

    /// Decodes every posting, returning an owned, non-aliasing vector.
    /// Idempotent on an already-materialized list (clones it).
    pub fn materialize(&self) -> Result<Vec<Posting>> {
        match self {
            PostingsList::Lazy { bytes, term_weight } => {
                let mut out = Vec::new();
                for item in PostingCursor::new(bytes) {
                    let (doc_id, position, field_id) = item?;
                    out.push(Posting {
                        doc_id,
                        position,
                        field_id,
                        term_weight: *term_weight,
                    });
                }
                Ok(out)
            }
            PostingsList::Materialized(postings) => Ok(postings.clone()),
        }
    }

    pub fn into_postings(self) -> Result<Vec<Posting>> {
        match self {
            PostingsList::Materialized(postings) => Ok(postings),
            lazy => lazy.materialize(),
        }
    }
}

impl From<Vec<Posting>> for PostingsList<'static> {
    fn from(postings: Vec<Posting>) -> PostingsList<'static> {
        PostingsList::Materialized(postings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::delta_encode;

    #[test]
    fn test_lazy_materializes_in_order() {
        let postings = vec![(1u32, 0u32, 1u32), (2, 0, 1)];
        let (body, _) = delta_encode(&postings, 1);
        let list = PostingsList::from_block(&body, Some(2.5));
        let materialized = list.materialize().unwrap();
        assert_eq!(materialized.len(), 2);
        assert_eq!(materialized[0].doc_id, 1);
        assert_eq!(materialized[0].term_weight, Some(2.5));
    }
}
