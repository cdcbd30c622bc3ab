//! The postings algebra (spec.md §4.6.2): OR, AND, NOT, XOR, ADJ (phrase /
//! proximity), and bitmap Filter. Every operator consumes its inputs and
//! returns a new, `(doc_id, position)`-sorted list.

use std::collections::HashSet;

use super::bitmap::SearchBitmap;
use super::posting::Posting;
use crate::schema::DocId;

/// `ADJ` emission policy (spec.md §4.6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdjMode {
    /// Emit only the postings that are part of a satisfying pair.
    Strict,
    /// Emit every posting in a qualifying doc's qualifying fields, once any
    /// pair in that field satisfies the proximity window.
    Loose,
}

fn doc_ids(postings: &[Posting]) -> HashSet<DocId> {
    postings.iter().map(|p| p.doc_id).collect()
}

/// Union by `(doc_id, position)`; a posting present in both inputs with the
/// same `(doc_id, position, field_id)` is kept once.
pub fn or_merge(a: Vec<Posting>, b: Vec<Posting>) -> Vec<Posting> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].sort_key().cmp(&b[j].sort_key()) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                if a[i].field_id != b[j].field_id {
                    out.push(b[j]);
                }
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Intersection at the doc_id level: every posting from both sides for any
/// doc_id present in both, interleaved in `(doc_id, position)` order.
pub fn and_merge(a: Vec<Posting>, b: Vec<Posting>) -> Vec<Posting> {
    let common: HashSet<DocId> = doc_ids(&a).intersection(&doc_ids(&b)).copied().collect();
    let mut out: Vec<Posting> = a
        .into_iter()
        .chain(b)
        .filter(|p| common.contains(&p.doc_id))
        .collect();
    out.sort_by_key(|p| p.sort_key());
    out
}

/// `A` restricted to doc ids absent from `B`.
pub fn not_merge(a: Vec<Posting>, b: Vec<Posting>) -> Vec<Posting> {
    let excluded = doc_ids(&b);
    a.into_iter().filter(|p| !excluded.contains(&p.doc_id)).collect()
}

/// Doc ids present in exactly one of `A`, `B`, carrying their original
/// postings from that side.
pub fn xor_merge(a: Vec<Posting>, b: Vec<Posting>) -> Vec<Posting> {
    let a_docs = doc_ids(&a);
    let b_docs = doc_ids(&b);
    let mut out: Vec<Posting> = a
        .into_iter()
        .filter(|p| !b_docs.contains(&p.doc_id))
        .chain(b.into_iter().filter(|p| !a_docs.contains(&p.doc_id)))
        .collect();
    out.sort_by_key(|p| p.sort_key());
    out
}

/// Drops every posting whose doc_id bit is clear in `bitmap`.
pub fn filter(a: Vec<Posting>, bitmap: &SearchBitmap) -> Vec<Posting> {
    a.into_iter().filter(|p| bitmap.is_set(p.doc_id)).collect()
}

/// Phrase / proximity merge (spec.md §4.6.2): for every doc present in both
/// `A` and `B`, pairs `(a, b)` with `a.field_id == b.field_id` and
/// `b.position - a.position ∈ [1, k]` qualify. `Strict` emits only the
/// postings in a qualifying pair; `Loose` emits every posting of a
/// qualifying doc restricted to the fields that qualified.
pub fn adj_merge(a: Vec<Posting>, b: Vec<Posting>, k: u32, mode: AdjMode) -> Vec<Posting> {
    let common = doc_ids(&a).intersection(&doc_ids(&b)).copied().collect::<HashSet<_>>();
    let mut out = Vec::new();

    for &doc in &common {
        let a_doc: Vec<Posting> = a.iter().filter(|p| p.doc_id == doc).copied().collect();
        let b_doc: Vec<Posting> = b.iter().filter(|p| p.doc_id == doc).copied().collect();

        let mut qualifying_fields: HashSet<u32> = HashSet::new();
        let mut qualifying_postings: Vec<Posting> = Vec::new();
        for &pa in &a_doc {
            for &pb in &b_doc {
                if pa.field_id != pb.field_id {
                    continue;
                }
                let gap = pb.position as i64 - pa.position as i64;
                if gap >= 1 && gap <= k as i64 {
                    qualifying_fields.insert(pa.field_id);
                    qualifying_postings.push(pa);
                    qualifying_postings.push(pb);
                }
            }
        }
        if qualifying_fields.is_empty() {
            continue;
        }

        match mode {
            AdjMode::Strict => {
                qualifying_postings.sort_by_key(|p| p.sort_key());
                qualifying_postings.dedup();
                out.extend(qualifying_postings);
            }
            AdjMode::Loose => {
                let mut doc_postings: Vec<Posting> = a_doc
                    .iter()
                    .chain(b_doc.iter())
                    .filter(|p| qualifying_fields.contains(&p.field_id))
                    .copied()
                    .collect();
                doc_postings.sort_by_key(|p| p.sort_key());
                doc_postings.dedup();
                out.extend(doc_postings);
            }
        }
    }

    out.sort_by_key(|p| p.sort_key());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(doc_id: DocId, position: u32, field_id: u32) -> Posting {
        Posting {
            doc_id,
            position,
            field_id,
            term_weight: None,
        }
    }

    #[test]
    fn test_or_keeps_duplicates_as_one() {
        let a = vec![p(1, 0, 1), p(2, 0, 1)];
        let b = vec![p(1, 0, 1), p(3, 0, 1)];
        let merged = or_merge(a, b);
        assert_eq!(
            merged.iter().map(|p| p.doc_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_and_keeps_all_postings_for_common_docs() {
        let a = vec![p(1, 0, 1), p(1, 1, 1), p(2, 0, 1)];
        let b = vec![p(1, 2, 1), p(3, 0, 1)];
        let merged = and_merge(a, b);
        assert_eq!(merged.len(), 3);
        assert!(merged.iter().all(|p| p.doc_id == 1));
    }

    #[test]
    fn test_not_excludes_b_docs() {
        let a = vec![p(1, 0, 1), p(2, 0, 1)];
        let b = vec![p(2, 0, 1)];
        let merged = not_merge(a, b);
        assert_eq!(merged, vec![p(1, 0, 1)]);
    }

    #[test]
    fn test_xor_keeps_docs_in_exactly_one_side() {
        let a = vec![p(1, 0, 1), p(2, 0, 1)];
        let b = vec![p(2, 0, 1), p(3, 0, 1)];
        let merged = xor_merge(a, b);
        assert_eq!(
            merged.iter().map(|p| p.doc_id).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[test]
    fn test_adj_strict_phrase() {
        // "new york": new at position 0, york at position 1, same doc/field.
        let new = vec![p(1, 0, 1), p(2, 5, 1)];
        let york = vec![p(1, 1, 1), p(2, 9, 1)];
        let merged = adj_merge(new, york, 1, AdjMode::Strict);
        let docs: Vec<DocId> = merged.iter().map(|p| p.doc_id).collect();
        assert_eq!(docs, vec![1, 1]);
    }

    #[test]
    fn test_adj_respects_field_match() {
        let a = vec![p(1, 0, 1)];
        let b = vec![p(1, 1, 2)];
        assert!(adj_merge(a, b, 1, AdjMode::Strict).is_empty());
    }

    #[test]
    fn test_adj_loose_emits_whole_qualifying_doc() {
        let a = vec![p(1, 0, 1), p(1, 10, 1)];
        let b = vec![p(1, 1, 1)];
        let merged = adj_merge(a, b, 1, AdjMode::Loose);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_filter_drops_docs_outside_bitmap() {
        let mut bitmap = SearchBitmap::new(4);
        bitmap.set(2);
        let postings = vec![p(1, 0, 1), p(2, 0, 1)];
        let filtered = filter(postings, &bitmap);
        assert_eq!(filtered, vec![p(2, 0, 1)]);
    }
}
