use crate::common::write_cvarint;
use crate::error::{Result, SindexError};
use crate::schema::{DocId, FieldId, TermKind};

/// Initial capacity of a freshly allocated `TermBlock` byte buffer
/// (spec.md §4.2: "initial capacity = 6 bytes"), matching
/// `SRCH_INVERT_INITIAL_INDEX_BLOCK_LENGTH` in `invert.c`.
const INITIAL_CAPACITY: usize = 6;

/// One term's accumulated, not-yet-delta-encoded postings, growing
/// geometrically as entries are appended (spec.md §4.2).
///
/// Pre-merge, each posting is three *absolute* compressed-varints:
/// `doc_id`, `position`, `field_id` — delta coding only happens in the
/// final merge (§4.3), so that intermediate merges stay simple
/// byte-concatenations.
pub struct TermBlock {
    bytes: Vec<u8>,
    pub term_kind: TermKind,
    pub term_count: u32,
    pub document_count: u32,
    pub include_in_counts: bool,
    last_doc_id: DocId,
    last_pos: Option<u32>,
    last_entry_start: usize,
    prev_document_count: u32,
    prev_last_doc_id: DocId,
    prev_last_pos: Option<u32>,
}

impl TermBlock {
    pub fn new(include_in_counts: bool) -> TermBlock {
        TermBlock {
            bytes: Vec::new(),
            term_kind: TermKind::Unknown,
            term_count: 0,
            document_count: 0,
            include_in_counts,
            last_doc_id: 0,
            last_pos: None,
            last_entry_start: 0,
            prev_document_count: 0,
            prev_last_doc_id: 0,
            prev_last_pos: None,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte_capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Appends one posting. Enforces I1/I2: `doc_id` must not regress, and
    /// within the same `doc_id` the position must strictly increase.
    pub fn add_posting(&mut self, doc_id: DocId, position: u32, field_id: FieldId) -> Result<()> {
        if self.term_count > 0 {
            if doc_id < self.last_doc_id {
                return Err(SindexError::InvalidArgument(format!(
                    "doc_id regressed: {doc_id} after {}",
                    self.last_doc_id
                )));
            }
            if doc_id == self.last_doc_id {
                if let Some(last_pos) = self.last_pos {
                    if position <= last_pos {
                        return Err(SindexError::InvalidArgument(format!(
                            "position did not strictly increase: {position} after {last_pos}"
                        )));
                    }
                }
            }
        }

        self.prev_document_count = self.document_count;
        self.prev_last_doc_id = self.last_doc_id;
        self.prev_last_pos = self.last_pos;
        self.last_entry_start = self.bytes.len();

        self.reserve_for_entry(doc_id, position, field_id);
        write_cvarint(doc_id as u64, &mut self.bytes).expect("writing to Vec<u8> cannot fail");
        write_cvarint(position as u64, &mut self.bytes).expect("writing to Vec<u8> cannot fail");
        write_cvarint(field_id as u64, &mut self.bytes).expect("writing to Vec<u8> cannot fail");

        self.term_count += 1;
        if self.term_count == 1 || doc_id != self.last_doc_id {
            self.document_count += 1;
        }
        self.last_doc_id = doc_id;
        self.last_pos = Some(position);
        Ok(())
    }

    /// Undoes the most recent `add_posting` call: used when a stop term's
    /// field honors the stop list, so counts still reflect the occurrence
    /// (spec.md §4.2) but the posting bytes themselves must not survive.
    /// Only valid to call immediately after `add_posting` succeeded.
    pub fn drop_last_posting(&mut self) {
        self.bytes.truncate(self.last_entry_start);
        self.term_count -= 1;
        self.document_count = self.prev_document_count;
        self.last_doc_id = self.prev_last_doc_id;
        self.last_pos = self.prev_last_pos;
    }

    /// Grows `self.bytes`'s capacity following the geometric rule from
    /// spec.md §4.2: `new = max(2*old, old+needed)`, with `INITIAL_CAPACITY`
    /// as the floor for the very first allocation. Returns the number of
    /// bytes the growth added to capacity, for the caller's memory
    /// accounting.
    fn reserve_for_entry(&mut self, doc_id: DocId, position: u32, field_id: FieldId) -> usize {
        let needed = crate::common::cvarint_len(doc_id as u64)
            + crate::common::cvarint_len(position as u64)
            + crate::common::cvarint_len(field_id as u64);
        let old_cap = self.bytes.capacity();
        let spare = old_cap - self.bytes.len();
        if spare >= needed {
            return 0;
        }
        let new_cap = if old_cap == 0 {
            needed.max(INITIAL_CAPACITY)
        } else {
            (2 * old_cap).max(old_cap + needed)
        };
        self.bytes.reserve(new_cap - old_cap);
        self.bytes.capacity() - old_cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_capacity() {
        let mut block = TermBlock::new(true);
        block.add_posting(1, 0, 1).unwrap();
        assert!(block.byte_capacity() >= INITIAL_CAPACITY);
    }

    #[test]
    fn test_doc_id_regression_rejected() {
        let mut block = TermBlock::new(true);
        block.add_posting(2, 0, 1).unwrap();
        assert!(block.add_posting(1, 0, 1).is_err());
    }

    #[test]
    fn test_position_must_strictly_increase() {
        let mut block = TermBlock::new(true);
        block.add_posting(1, 5, 1).unwrap();
        assert!(block.add_posting(1, 5, 1).is_err());
        assert!(block.add_posting(1, 4, 1).is_err());
        assert!(block.add_posting(1, 6, 1).is_ok());
    }

    #[test]
    fn test_counts() {
        let mut block = TermBlock::new(true);
        block.add_posting(1, 0, 1).unwrap();
        block.add_posting(1, 1, 1).unwrap();
        block.add_posting(2, 0, 1).unwrap();
        assert_eq!(block.term_count, 3);
        assert_eq!(block.document_count, 2);
    }
}
