//! Postings engine (C6, spec.md §4.6): decoding compressed blocks into
//! postings lists, and the operator algebra (OR/AND/NOT/XOR/ADJ/Filter)
//! over them.

mod bitmap;
mod decode;
mod list;
mod ops;
mod posting;

pub use bitmap::{postings_to_bitmap, SearchBitmap};
pub use decode::{unframe_block, PostingCursor};
pub use list::PostingsList;
pub use ops::{adj_merge, and_merge, filter, not_merge, or_merge, xor_merge, AdjMode};
pub use posting::Posting;
