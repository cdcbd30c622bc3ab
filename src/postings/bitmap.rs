//! Document bitmaps (spec.md §4.6.3): fixed-size `n_docs+1` bit vectors used
//! to materialize restrictive filters and to combine them with merge-type
//! AND/OR/XOR/NOT before applying them to a postings list.

use bit_vec::BitVec;

use super::posting::Posting;
use crate::schema::DocId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchBitmap {
    bits: BitVec,
}

impl SearchBitmap {
    /// A bitmap covering doc ids `0..=n_docs` (doc id `0` is reserved and
    /// always clear).
    pub fn new(n_docs: u32) -> SearchBitmap {
        SearchBitmap {
            bits: BitVec::from_elem(n_docs as usize + 1, false),
        }
    }

    pub fn set(&mut self, doc_id: DocId) {
        if (doc_id as usize) < self.bits.len() {
            self.bits.set(doc_id as usize, true);
        }
    }

    pub fn is_set(&self, doc_id: DocId) -> bool {
        self.bits.get(doc_id as usize).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.len() == 0
    }

    fn zip_merge(mut self, other: &SearchBitmap, op: impl Fn(bool, bool) -> bool) -> SearchBitmap {
        let len = self.bits.len().max(other.bits.len());
        self.bits.grow(len.saturating_sub(self.bits.len()), false);
        for i in 0..len {
            let a = self.bits.get(i).unwrap_or(false);
            let b = other.bits.get(i).unwrap_or(false);
            self.bits.set(i, op(a, b));
        }
        self
    }

    pub fn and(self, other: &SearchBitmap) -> SearchBitmap {
        self.zip_merge(other, |a, b| a && b)
    }

    pub fn or(self, other: &SearchBitmap) -> SearchBitmap {
        self.zip_merge(other, |a, b| a || b)
    }

    pub fn xor(self, other: &SearchBitmap) -> SearchBitmap {
        self.zip_merge(other, |a, b| a != b)
    }

    pub fn not(self, other: &SearchBitmap) -> SearchBitmap {
        self.zip_merge(other, |a, b| a && !b)
    }
}

/// Builds a bitmap of length `n_docs+1` with bit `d` set for every distinct
/// `doc_id == d` present in `postings` (spec.md §4.6.3).
pub fn postings_to_bitmap(postings: &[Posting], n_docs: u32) -> SearchBitmap {
    let mut bitmap = SearchBitmap::new(n_docs);
    for posting in postings {
        bitmap.set(posting.doc_id);
    }
    bitmap
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(doc_id: DocId) -> Posting {
        Posting {
            doc_id,
            position: 0,
            field_id: 1,
            term_weight: None,
        }
    }

    #[test]
    fn test_postings_to_bitmap() {
        let bitmap = postings_to_bitmap(&[p(1), p(3), p(3)], 4);
        assert!(bitmap.is_set(1));
        assert!(!bitmap.is_set(2));
        assert!(bitmap.is_set(3));
        assert!(!bitmap.is_set(4));
    }

    #[test]
    fn test_merges() {
        let a = postings_to_bitmap(&[p(1), p(2)], 4);
        let b = postings_to_bitmap(&[p(2), p(3)], 4);
        assert!(a.clone().and(&b).is_set(2));
        assert!(!a.clone().and(&b).is_set(1));
        assert!(a.clone().or(&b).is_set(1));
        assert!(a.clone().or(&b).is_set(3));
        assert!(a.clone().xor(&b).is_set(1));
        assert!(!a.clone().xor(&b).is_set(2));
        assert!(a.clone().not(&b).is_set(1));
        assert!(!a.not(&b).is_set(2));
    }
}
