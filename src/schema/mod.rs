//! The data model of spec.md §3: document and field identifiers, the `Term`
//! byte string with its length bounds, and the `TermKind` sum type.

mod term;

pub use self::term::{Term, TermKind};

/// Dense document identifier, assigned by the host in non-decreasing order
/// during a single build. `0` is reserved and never assigned.
pub type DocId = u32;

/// Field identifier in `[1, F]`. `0` means "no field / any field" and is
/// never stored in a posting.
pub type FieldId = u32;

/// `FieldId` meaning "no field / any field"; never written to a posting.
pub const FIELD_ID_NONE: FieldId = 0;

/// Per-field options read from the external info store at build time
/// (spec.md §6.4's `InfoStore::field_options`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldOptions {
    pub stemming: bool,
    pub honor_stop_list: bool,
    pub include_in_counts: bool,
    pub unfielded_default: bool,
}

impl Default for FieldOptions {
    fn default() -> FieldOptions {
        FieldOptions {
            stemming: false,
            honor_stop_list: true,
            include_in_counts: true,
            unfielded_default: true,
        }
    }
}

/// A field-occurrence bitmap: bit `i` set iff the owning term occurs in
/// field `i + 1` (spec.md §3, I4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBitmap {
    bits: bit_vec::BitVec,
}

impl FieldBitmap {
    pub fn new(max_field_id: FieldId) -> FieldBitmap {
        FieldBitmap {
            bits: bit_vec::BitVec::from_elem(max_field_id as usize, false),
        }
    }

    pub fn from_bits(bits: bit_vec::BitVec) -> FieldBitmap {
        FieldBitmap { bits }
    }

    pub fn set(&mut self, field_id: FieldId) {
        debug_assert!(field_id != FIELD_ID_NONE, "field id 0 is never stored");
        let idx = (field_id - 1) as usize;
        if idx >= self.bits.len() {
            self.bits.grow(idx + 1 - self.bits.len(), false);
        }
        self.bits.set(idx, true);
    }

    pub fn is_set(&self, field_id: FieldId) -> bool {
        if field_id == FIELD_ID_NONE {
            return true;
        }
        let idx = (field_id - 1) as usize;
        self.bits.get(idx).unwrap_or(false)
    }

    /// True iff this bitmap has at least one field in common with `required`.
    pub fn intersects(&self, required: &FieldBitmap) -> bool {
        let mut a = self.bits.clone();
        let len = a.len().max(required.bits.len());
        a.grow(len.saturating_sub(a.len()), false);
        let mut b = required.bits.clone();
        b.grow(len.saturating_sub(b.len()), false);
        a.and(&b);
        a.any()
    }

    pub fn as_bitvec(&self) -> &bit_vec::BitVec {
        &self.bits
    }
}
