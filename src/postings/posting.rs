use crate::schema::{DocId, FieldId};

/// One decoded posting (spec.md §4.6.1). `term_weight` is attached by
/// callers (an IDF factor, a per-field boost, ...); the engine threads it
/// through merges unchanged but never computes or inspects it itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Posting {
    pub doc_id: DocId,
    pub position: u32,
    pub field_id: FieldId,
    pub term_weight: Option<f32>,
}

impl Posting {
    pub fn sort_key(&self) -> (DocId, u32) {
        (self.doc_id, self.position)
    }
}
