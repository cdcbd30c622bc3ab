//! Term dictionary (C4, spec.md §4.4): an on-disk sorted structure mapping
//! terms to block-store pointers, supporting exact, prefix/range, and
//! wildcard lookup with optional field-bitmap filtering.
//!
//! On-disk layout is a sequence of blocks of up to `ENTRIES_PER_BLOCK`
//! sorted entries sharing one longest-common-prefix header, followed by a
//! trailer (the in-memory block index) whose start offset is written as the
//! very last 8 bytes of the file — the same "data, then an index pointing
//! back into it, then a fixed-size footer" shape the teacher's
//! `datastruct::fstmap` uses for its cascading FST blocks.

mod wildcard;

pub use wildcard::{glob_match, longest_literal_prefix, prefix_range_end, validate_pattern};

use std::io::Write;

use crate::common::{read_cvarint_from_slice, write_cvarint, BinarySerializable};
use crate::directory::{Directory, ReadOnlySource, WritePtr};
use crate::error::{Result, SindexError};
use crate::schema::{FieldBitmap, FieldId, Term, TermKind};

const ENTRIES_PER_BLOCK: usize = 128;
const DICT_FILE: &str = "terms.dict";

/// One term dictionary entry (spec.md §3).
#[derive(Debug, Clone)]
pub struct Entry {
    pub term: Term,
    pub kind: TermKind,
    pub total_term_count: u32,
    pub document_count: u32,
    pub block_object_id: u64,
    pub field_bitmap: FieldBitmap,
}

struct PendingEntry {
    term: Vec<u8>,
    kind: TermKind,
    term_count: u32,
    doc_count: u32,
    object_id: u64,
    field_bitmap: FieldBitmap,
}

/// Builds `terms.dict` during a build session. Entries must be added in
/// strictly increasing byte-wise order (I3); an out-of-order insert is
/// `InvalidArgument`.
pub struct TermDictionaryBuilder {
    writer: crate::common::CountingWriter<WritePtr>,
    pending: Vec<PendingEntry>,
    last_term: Option<Vec<u8>>,
    block_index: Vec<(Vec<u8>, u64)>,
}

impl TermDictionaryBuilder {
    pub fn create(directory: &Directory) -> Result<TermDictionaryBuilder> {
        Ok(TermDictionaryBuilder {
            writer: crate::common::CountingWriter::from(directory.open_write(DICT_FILE)?),
            pending: Vec::new(),
            last_term: None,
            block_index: Vec::new(),
        })
    }

    pub fn add_term(
        &mut self,
        term: &[u8],
        kind: TermKind,
        term_count: u32,
        doc_count: u32,
        object_id: u64,
        field_bitmap: FieldBitmap,
    ) -> Result<()> {
        if let Some(ref last) = self.last_term {
            if term <= last.as_slice() {
                return Err(SindexError::InvalidArgument(format!(
                    "terms must be added in strictly sorted order: {:?} after {:?}",
                    String::from_utf8_lossy(term),
                    String::from_utf8_lossy(last)
                )));
            }
        }
        self.last_term = Some(term.to_vec());
        self.pending.push(PendingEntry {
            term: term.to_vec(),
            kind,
            term_count,
            doc_count,
            object_id,
            field_bitmap,
        });
        if self.pending.len() >= ENTRIES_PER_BLOCK {
            self.flush_block()?;
        }
        Ok(())
    }

    fn flush_block(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let first = self.pending[0].term.clone();
        let last = self.pending[self.pending.len() - 1].term.clone();
        let shared_len = common_prefix_len(&first, &last);
        let shared_prefix = first[..shared_len].to_vec();

        let offset = self.writer.bytes_written() as u64;
        (self.pending.len() as u32).serialize(&mut self.writer)?;
        (shared_prefix.len() as u16).serialize(&mut self.writer)?;
        self.writer.write_all(&shared_prefix)?;

        for entry in &self.pending {
            let suffix = &entry.term[shared_len..];
            (suffix.len() as u16).serialize(&mut self.writer)?;
            self.writer.write_all(suffix)?;
            entry.kind.to_byte().serialize(&mut self.writer)?;
            write_cvarint(entry.term_count as u64, &mut self.writer)?;
            write_cvarint(entry.doc_count as u64, &mut self.writer)?;
            write_cvarint(entry.object_id, &mut self.writer)?;
            let bitmap_bytes = entry.field_bitmap.as_bitvec().to_bytes();
            (bitmap_bytes.len() as u16).serialize(&mut self.writer)?;
            self.writer.write_all(&bitmap_bytes)?;
        }

        self.block_index.push((first, offset));
        self.pending.clear();
        Ok(())
    }

    /// Finalizes the dictionary, writing the block index trailer and the
    /// global metadata (`n_docs`, `max_field_id`) it records.
    pub fn finish(mut self, n_docs: u32, max_field_id: FieldId) -> Result<()> {
        self.flush_block()?;
        let trailer_offset = self.writer.bytes_written() as u64;
        (self.block_index.len() as u32).serialize(&mut self.writer)?;
        for (first_term, offset) in &self.block_index {
            (first_term.len() as u16).serialize(&mut self.writer)?;
            self.writer.write_all(first_term)?;
            offset.serialize(&mut self.writer)?;
        }
        n_docs.serialize(&mut self.writer)?;
        max_field_id.serialize(&mut self.writer)?;
        trailer_offset.serialize(&mut self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// One decoded dictionary block: its shared prefix and the full terms it
/// holds, reconstructed from shared-prefix + suffix.
struct DecodedBlock {
    entries: Vec<Entry>,
}

/// Read-only access to a sealed term dictionary.
pub struct TermDictionaryReader {
    source: ReadOnlySource,
    block_index: Vec<(Vec<u8>, u64)>,
    n_docs: u32,
    max_field_id: FieldId,
}

impl TermDictionaryReader {
    pub fn open(directory: &Directory) -> Result<TermDictionaryReader> {
        let source = directory.open_read(DICT_FILE)?;
        if source.is_empty() {
            return Ok(TermDictionaryReader {
                source,
                block_index: Vec::new(),
                n_docs: 0,
                max_field_id: 0,
            });
        }
        let bytes = source.as_slice();
        if bytes.len() < 8 {
            return Err(SindexError::Corrupt("terms.dict truncated footer".to_string()));
        }
        let trailer_offset = u64::deserialize(&mut &bytes[bytes.len() - 8..])? as usize;
        if trailer_offset > bytes.len() {
            return Err(SindexError::Corrupt("terms.dict trailer offset out of range".to_string()));
        }
        let mut cursor = &bytes[trailer_offset..];
        let block_count = u32::deserialize(&mut cursor)? as usize;
        let mut block_index = Vec::with_capacity(block_count);
        for _ in 0..block_count {
            let len = u16::deserialize(&mut cursor)? as usize;
            let mut term = vec![0u8; len];
            std::io::Read::read_exact(&mut cursor, &mut term)
                .map_err(|_| SindexError::Corrupt("terms.dict trailer truncated".to_string()))?;
            let offset = u64::deserialize(&mut cursor)?;
            block_index.push((term, offset));
        }
        let n_docs = u32::deserialize(&mut cursor)?;
        let max_field_id = u32::deserialize(&mut cursor)?;
        Ok(TermDictionaryReader {
            source,
            block_index,
            n_docs,
            max_field_id,
        })
    }

    pub fn n_docs(&self) -> u32 {
        self.n_docs
    }

    pub fn max_field_id(&self) -> FieldId {
        self.max_field_id
    }

    pub fn len_blocks(&self) -> usize {
        self.block_index.len()
    }

    /// Index of the last block whose first term is `<= term`, i.e. the
    /// only block that could contain `term`.
    fn block_for(&self, term: &[u8]) -> Option<usize> {
        if self.block_index.is_empty() {
            return None;
        }
        match self
            .block_index
            .binary_search_by(|(first, _)| first.as_slice().cmp(term))
        {
            Ok(i) => Some(i),
            Err(0) => None,
            Err(i) => Some(i - 1),
        }
    }

    fn decode_block(&self, block_idx: usize) -> Result<DecodedBlock> {
        let (_, offset) = &self.block_index[block_idx];
        let bytes = self.source.as_slice();
        let mut pos = *offset as usize;
        let entry_count = read_u32(bytes, &mut pos)?;
        let shared_len = read_u16(bytes, &mut pos)? as usize;
        let shared_prefix = read_bytes(bytes, &mut pos, shared_len)?;

        let mut entries = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let suffix_len = read_u16(bytes, &mut pos)? as usize;
            let suffix = read_bytes(bytes, &mut pos, suffix_len)?;
            let mut full_term = shared_prefix.to_vec();
            full_term.extend_from_slice(suffix);

            let kind_byte = read_u8(bytes, &mut pos)?;
            let kind = TermKind::from_byte(kind_byte)?;
            let (term_count, n) = read_cvarint_from_slice(&bytes[pos..])
                .map_err(|_| SindexError::Corrupt("truncated term_count".to_string()))?;
            pos += n;
            let (doc_count, n) = read_cvarint_from_slice(&bytes[pos..])
                .map_err(|_| SindexError::Corrupt("truncated doc_count".to_string()))?;
            pos += n;
            let (object_id, n) = read_cvarint_from_slice(&bytes[pos..])
                .map_err(|_| SindexError::Corrupt("truncated object_id".to_string()))?;
            pos += n;
            let bitmap_len = read_u16(bytes, &mut pos)? as usize;
            let bitmap_bytes = read_bytes(bytes, &mut pos, bitmap_len)?;
            let bitmap = FieldBitmap::from_bits(bit_vec::BitVec::from_bytes(bitmap_bytes));

            entries.push(Entry {
                term: Term::from_bytes(full_term),
                kind,
                total_term_count: term_count as u32,
                document_count: doc_count as u32,
                block_object_id: object_id,
                field_bitmap: bitmap,
            });
        }
        Ok(DecodedBlock { entries })
    }

    pub fn lookup_exact(&self, term: &[u8]) -> Result<Option<Entry>> {
        let Some(block_idx) = self.block_for(term) else {
            return Ok(None);
        };
        let block = self.decode_block(block_idx)?;
        Ok(block.entries.into_iter().find(|e| e.term.as_bytes() == term))
    }

    /// Inclusive-low, exclusive-high range scan (`high = None` scans to the
    /// end of the dictionary), optionally restricted to entries whose field
    /// bitmap intersects `required_fields`.
    pub fn lookup_range(
        &self,
        low: &[u8],
        high_exclusive: Option<&[u8]>,
        required_fields: Option<&FieldBitmap>,
    ) -> Result<Vec<Entry>> {
        if self.block_index.is_empty() {
            return Ok(Vec::new());
        }
        let start_block = self.block_for(low).unwrap_or(0);
        let mut out = Vec::new();
        for block_idx in start_block..self.block_index.len() {
            if let Some(high) = high_exclusive {
                if self.block_index[block_idx].0.as_slice() >= high {
                    // The first block whose first term is already >= high
                    // contributes nothing unless it's the start block
                    // itself (handled by the scan loop's own comparisons).
                    if block_idx != start_block {
                        break;
                    }
                }
            }
            let block = self.decode_block(block_idx)?;
            for entry in block.entries {
                let term_bytes = entry.term.as_bytes();
                if term_bytes < low {
                    continue;
                }
                if let Some(high) = high_exclusive {
                    if term_bytes >= high {
                        return Ok(out);
                    }
                }
                if let Some(required) = required_fields {
                    if !entry.field_bitmap.intersects(required) {
                        continue;
                    }
                }
                out.push(entry);
            }
        }
        Ok(out)
    }

    /// Wildcard lookup (spec.md §4.4): longest wildcard-free prefix, then a
    /// range scan, then a glob filter over the hits.
    pub fn lookup_wildcard(
        &self,
        pattern: &[u8],
        required_fields: Option<&FieldBitmap>,
        max_expansion: usize,
    ) -> Result<Vec<Entry>> {
        validate_pattern(pattern)?;
        let prefix = longest_literal_prefix(pattern);
        let high = prefix_range_end(prefix);
        let candidates = self.lookup_range(prefix, high.as_deref(), required_fields)?;
        let mut matched = Vec::new();
        for entry in candidates {
            if glob_match(pattern, entry.term.as_bytes()) {
                if matched.len() >= max_expansion {
                    return Err(SindexError::ResourceExhausted(format!(
                        "wildcard '{}' expanded past {} entries",
                        String::from_utf8_lossy(pattern),
                        max_expansion
                    )));
                }
                matched.push(entry);
            }
        }
        Ok(matched)
    }
}

fn read_u8(bytes: &[u8], pos: &mut usize) -> Result<u8> {
    let b = *bytes
        .get(*pos)
        .ok_or_else(|| SindexError::Corrupt("terms.dict truncated".to_string()))?;
    *pos += 1;
    Ok(b)
}

fn read_u16(bytes: &[u8], pos: &mut usize) -> Result<u16> {
    let slice = bytes
        .get(*pos..*pos + 2)
        .ok_or_else(|| SindexError::Corrupt("terms.dict truncated".to_string()))?;
    *pos += 2;
    Ok(u16::from_le_bytes([slice[0], slice[1]]))
}

fn read_u32(bytes: &[u8], pos: &mut usize) -> Result<u32> {
    let slice = bytes
        .get(*pos..*pos + 4)
        .ok_or_else(|| SindexError::Corrupt("terms.dict truncated".to_string()))?;
    *pos += 4;
    Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

fn read_bytes<'a>(bytes: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    let slice = bytes
        .get(*pos..*pos + len)
        .ok_or_else(|| SindexError::Corrupt("terms.dict truncated".to_string()))?;
    *pos += len;
    Ok(slice)
}
