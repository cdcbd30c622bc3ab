use std::io::{self, Read, Write};

use crate::common::BinarySerializable;
use crate::error::{Result, SindexError};
use crate::schema::TermKind;

/// One dictionary record inside a run file (spec.md §4.3):
///
/// ```text
/// record := u8  kind | u32 term_count | u32 doc_count | u8 include_in_counts
///         | u16 term_len | term_bytes | u32 data_len | postings_bytes
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub kind: TermKind,
    pub term_count: u32,
    pub doc_count: u32,
    pub include_in_counts: bool,
    pub term: Vec<u8>,
    /// Absolute-form (not yet delta-encoded) posting bytes, as accumulated
    /// in a `TermBlock`.
    pub postings: Vec<u8>,
}

/// Writes the sorted sequence of `RunRecord`s produced by one
/// `InversionBuffer::flush_run` call to a single run file.
pub struct RunWriter<W> {
    writer: W,
}

impl<W: Write> RunWriter<W> {
    pub fn new(writer: W) -> RunWriter<W> {
        RunWriter { writer }
    }

    pub fn write_record(&mut self, record: &RunRecord) -> Result<()> {
        if record.term.len() > u16::MAX as usize {
            return Err(SindexError::ResourceExhausted(format!(
                "term too long for run format: {} bytes",
                record.term.len()
            )));
        }
        record.kind.to_byte().serialize(&mut self.writer)?;
        record.term_count.serialize(&mut self.writer)?;
        record.doc_count.serialize(&mut self.writer)?;
        (record.include_in_counts as u8).serialize(&mut self.writer)?;
        (record.term.len() as u16).serialize(&mut self.writer)?;
        self.writer.write_all(&record.term)?;
        (record.postings.len() as u32).serialize(&mut self.writer)?;
        self.writer.write_all(&record.postings)?;
        Ok(())
    }

    pub fn finish_run(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Reads every `RunRecord` out of a complete run file.
pub fn read_run_records<R: Read>(mut reader: R) -> Result<Vec<RunRecord>> {
    let mut records = Vec::new();
    loop {
        match read_one_record(&mut reader) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => break,
            Err(err) => return Err(err),
        }
    }
    Ok(records)
}

fn read_one_record<R: Read>(reader: &mut R) -> Result<Option<RunRecord>> {
    let mut kind_byte = [0u8; 1];
    match reader.read(&mut kind_byte) {
        Ok(0) => return Ok(None),
        Ok(_) => {}
        Err(err) => return Err(SindexError::Io(err)),
    }
    let kind = TermKind::from_byte(kind_byte[0])?;
    let term_count = u32::deserialize(reader)?;
    let doc_count = u32::deserialize(reader)?;
    let include_in_counts = u8::deserialize(reader)? != 0;
    let term_len = u16::deserialize(reader)? as usize;
    let mut term = vec![0u8; term_len];
    reader.read_exact(&mut term).map_err(run_io_err)?;
    let data_len = u32::deserialize(reader)? as usize;
    let mut postings = vec![0u8; data_len];
    reader.read_exact(&mut postings).map_err(run_io_err)?;
    Ok(Some(RunRecord {
        kind,
        term_count,
        doc_count,
        include_in_counts,
        term,
        postings,
    }))
}

fn run_io_err(err: io::Error) -> SindexError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        SindexError::Corrupt("run file truncated mid-record".to_string())
    } else {
        SindexError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_round_trip() {
        let mut writer = RunWriter::new(Vec::new());
        writer
            .write_record(&RunRecord {
                kind: TermKind::Regular,
                term_count: 2,
                doc_count: 1,
                include_in_counts: true,
                term: b"cat".to_vec(),
                postings: vec![1, 2, 3],
            })
            .unwrap();
        writer
            .write_record(&RunRecord {
                kind: TermKind::Stop,
                term_count: 0,
                doc_count: 0,
                include_in_counts: false,
                term: b"the".to_vec(),
                postings: vec![],
            })
            .unwrap();
        writer.finish_run().unwrap();
        let bytes = writer.into_inner();

        let records = read_run_records(&bytes[..]).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].term, b"cat");
        assert_eq!(records[1].term, b"the");
        assert_eq!(records[1].kind, TermKind::Stop);
    }
}
