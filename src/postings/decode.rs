//! Streaming decoder for the bit-exact postings block format (spec.md §6.2):
//! `posting := Δdoc:cvarint Δpos_or_pos:cvarint field_id:cvarint`, where the
//! second field is an absolute position when `Δdoc > 0` and a same-doc
//! positional gap when `Δdoc == 0`.

use crate::common::read_cvarint_from_slice;
use crate::error::{Result, SindexError};
use crate::schema::{DocId, FieldId};

/// Strips the `len:cvarint` header a stored block is framed with (spec.md
/// §6.2: `block := len:cvarint body:len bytes`) and returns the body slice,
/// checked against the framed length actually present.
pub fn unframe_block(framed: &[u8]) -> Result<&[u8]> {
    let (len, consumed) = read_cvarint_from_slice(framed)
        .map_err(|_| SindexError::Corrupt("truncated block length prefix".to_string()))?;
    let body = framed
        .get(consumed..consumed + len as usize)
        .ok_or_else(|| SindexError::Corrupt("block length overruns its frame".to_string()))?;
    Ok(body)
}

/// A cursor over one term's compressed postings body. Decodes one posting
/// per `next()` call without ever materializing the rest — the "lazy" half
/// of spec.md §4.6.1's streaming/lazy `PostingsList`.
pub struct PostingCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
    prev_doc: DocId,
    prev_pos: u32,
}

impl<'a> PostingCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> PostingCursor<'a> {
        PostingCursor {
            bytes,
            offset: 0,
            prev_doc: 0,
            prev_pos: 0,
        }
    }
}

impl<'a> Iterator for PostingCursor<'a> {
    type Item = Result<(DocId, u32, FieldId)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.bytes.len() {
            return None;
        }
        let rest = &self.bytes[self.offset..];
        let decoded = (|| {
            let (delta_doc, n1) = read_cvarint_from_slice(rest)
                .map_err(|_| SindexError::Corrupt("truncated posting".to_string()))?;
            let (second, n2) = read_cvarint_from_slice(&rest[n1..])
                .map_err(|_| SindexError::Corrupt("truncated posting".to_string()))?;
            let (field_id, n3) = read_cvarint_from_slice(&rest[n1 + n2..])
                .map_err(|_| SindexError::Corrupt("truncated posting".to_string()))?;
            Ok((delta_doc, second, field_id, n1 + n2 + n3))
        })();

        match decoded {
            Ok((delta_doc, second, field_id, consumed)) => {
                self.offset += consumed;
                let doc_id = self.prev_doc + delta_doc as DocId;
                let position = if delta_doc > 0 {
                    second as u32
                } else {
                    self.prev_pos + second as u32
                };
                self.prev_doc = doc_id;
                self.prev_pos = position;
                Some(Ok((doc_id, position, field_id as FieldId)))
            }
            Err(err) => {
                self.offset = self.bytes.len();
                Some(Err(err))
            }
        }
    }
}
