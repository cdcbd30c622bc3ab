use std::collections::BinaryHeap;
use std::cmp::Reverse;

use super::writer::RunRecord;
use crate::common::{read_cvarint_from_slice, write_cvarint};
use crate::error::{Result, SindexError};
use crate::schema::{DocId, FieldBitmap, FieldId, TermKind};

/// Decodes a `TermBlock`'s absolute-form posting bytes (spec.md §4.2) into
/// `(doc_id, position, field_id)` triples.
pub fn decode_absolute_postings(bytes: &[u8]) -> Result<Vec<(DocId, u32, FieldId)>> {
    let mut out = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let (doc_id, n1) = read_cvarint_from_slice(&bytes[offset..])
            .map_err(|_| SindexError::Corrupt("truncated posting triple".to_string()))?;
        offset += n1;
        let (position, n2) = read_cvarint_from_slice(&bytes[offset..])
            .map_err(|_| SindexError::Corrupt("truncated posting triple".to_string()))?;
        offset += n2;
        let (field_id, n3) = read_cvarint_from_slice(&bytes[offset..])
            .map_err(|_| SindexError::Corrupt("truncated posting triple".to_string()))?;
        offset += n3;
        out.push((doc_id as DocId, position as u32, field_id as FieldId));
    }
    Ok(out)
}

/// The result of the final merge for one term (spec.md §4.3 "final"):
/// delta-encoded postings body (without its length prefix) plus the
/// field-occurrence bitmap built while walking the postings.
pub struct SealedTerm {
    pub kind: TermKind,
    pub term_count: u32,
    pub doc_count: u32,
    pub body: Vec<u8>,
    pub field_bitmap: FieldBitmap,
}

/// Delta-encodes absolute-form postings into the on-disk body format of
/// spec.md §6.2, and builds the per-term field bitmap while doing so (I4).
pub fn delta_encode(
    postings: &[(DocId, u32, FieldId)],
    max_field_id: FieldId,
) -> (Vec<u8>, FieldBitmap) {
    let mut body = Vec::new();
    let mut bitmap = FieldBitmap::new(max_field_id);
    let mut prev_doc: DocId = 0;
    let mut prev_pos: u32 = 0;
    for &(doc_id, position, field_id) in postings {
        let delta_doc = doc_id - prev_doc;
        let second = if delta_doc > 0 { position } else { position - prev_pos };
        write_cvarint(delta_doc as u64, &mut body).expect("Vec<u8> writes cannot fail");
        write_cvarint(second as u64, &mut body).expect("Vec<u8> writes cannot fail");
        write_cvarint(field_id as u64, &mut body).expect("Vec<u8> writes cannot fail");
        if field_id != crate::schema::FIELD_ID_NONE {
            bitmap.set(field_id);
        }
        prev_doc = doc_id;
        prev_pos = position;
    }
    (body, bitmap)
}

/// Merges any number of sorted `RunRecord` sequences into one sorted
/// sequence (spec.md §4.3's "intermediate" K-way merge): for every input
/// whose front term equals the current byte-wise-minimum term, its block is
/// concatenated into the output record, counts summed, and `kind` promoted.
///
/// This is valid only because each input's own postings are already
/// DocId-ordered, and DocId ranges across inputs never overlap (DocIds are
/// assigned monotonically within a single build) — concatenation preserves
/// sort order without a re-sort.
pub fn merge_runs(inputs: Vec<Vec<RunRecord>>) -> Vec<RunRecord> {
    let mut cursors: Vec<(Vec<RunRecord>, usize)> = inputs.into_iter().map(|v| (v, 0)).collect();
    let mut output = Vec::new();

    loop {
        let mut heap: BinaryHeap<Reverse<(Vec<u8>, usize)>> = BinaryHeap::new();
        for (i, (records, pos)) in cursors.iter().enumerate() {
            if *pos < records.len() {
                heap.push(Reverse((records[*pos].term.clone(), i)));
            }
        }
        let Some(Reverse((current_term, _))) = heap.pop() else {
            break;
        };

        let mut merged: Option<RunRecord> = None;
        for (records, pos) in cursors.iter_mut() {
            if *pos < records.len() && records[*pos].term == current_term {
                let record = &records[*pos];
                merged = Some(match merged.take() {
                    None => record.clone(),
                    Some(mut acc) => {
                        acc.postings.extend_from_slice(&record.postings);
                        acc.term_count += record.term_count;
                        acc.doc_count += record.doc_count;
                        acc.kind = acc.kind.promote(record.kind);
                        acc.include_in_counts = acc.include_in_counts || record.include_in_counts;
                        acc
                    }
                });
                *pos += 1;
            }
        }
        output.push(merged.expect("current_term was selected from at least one input"));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FIELD_ID_NONE;

    fn rec(term: &str, postings: Vec<u8>, count: u32, docs: u32, kind: TermKind) -> RunRecord {
        RunRecord {
            kind,
            term_count: count,
            doc_count: docs,
            include_in_counts: true,
            term: term.as_bytes().to_vec(),
            postings,
        }
    }

    #[test]
    fn test_merge_disjoint_terms() {
        let a = vec![rec("cat", vec![1], 1, 1, TermKind::Regular)];
        let b = vec![rec("dog", vec![2], 1, 1, TermKind::Regular)];
        let merged = merge_runs(vec![a, b]);
        let terms: Vec<_> = merged.iter().map(|r| r.term.clone()).collect();
        assert_eq!(terms, vec![b"cat".to_vec(), b"dog".to_vec()]);
    }

    #[test]
    fn test_merge_concatenates_shared_terms() {
        let a = vec![rec("cat", vec![1, 2], 1, 1, TermKind::Regular)];
        let b = vec![rec("cat", vec![3, 4], 1, 1, TermKind::Stop)];
        let merged = merge_runs(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].postings, vec![1, 2, 3, 4]);
        assert_eq!(merged[0].term_count, 2);
        assert_eq!(merged[0].doc_count, 2);
        assert_eq!(merged[0].kind, TermKind::Stop);
    }

    #[test]
    fn test_delta_encode_round_trip_via_decode() {
        let postings = vec![(1u32, 0u32, 1u32), (1, 1, 1), (2, 0, 1), (2, 1, 2)];
        let (body, bitmap) = delta_encode(&postings, 2);
        assert!(bitmap.is_set(1));
        assert!(bitmap.is_set(2));

        // decode the delta form back to absolute to confirm round-trip.
        let mut offset = 0;
        let mut prev_doc = 0u32;
        let mut prev_pos = 0u32;
        let mut decoded = Vec::new();
        while offset < body.len() {
            let (dd, consumed) = crate::common::read_cvarint_from_slice(&body[offset..]).unwrap();
            offset += consumed;
            let (second, consumed) = crate::common::read_cvarint_from_slice(&body[offset..]).unwrap();
            offset += consumed;
            let (field, consumed) = crate::common::read_cvarint_from_slice(&body[offset..]).unwrap();
            offset += consumed;
            let doc = prev_doc + dd as u32;
            let pos = if dd > 0 { second as u32 } else { prev_pos + second as u32 };
            decoded.push((doc, pos, field as u32));
            prev_doc = doc;
            prev_pos = pos;
        }
        assert_eq!(decoded, postings);
    }

    #[test]
    fn test_field_id_none_not_set_in_bitmap() {
        let postings = vec![(1u32, 0u32, FIELD_ID_NONE)];
        let (_, bitmap) = delta_encode(&postings, 4);
        for f in 1..=4 {
            assert!(!bitmap.is_set(f));
        }
    }
}
