//! Minimal directory abstraction: a writable file handle (`WritePtr`) and a
//! read-only, memory-mappable byte source (`ReadOnlySource`).
//!
//! The teacher threads these two types through the store and term
//! dictionary (`directory::WritePtr`, `directory::ReadOnlySource`) without
//! ever checking in the `Directory` trait itself (it was outside the
//! retrieved slice); this module reconstructs that contract: a plain
//! filesystem directory backing a build/read session; see session.rs for
//! how it is opened against the sealed index layout in spec.md §6.1.

use memmap2::Mmap;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A writable handle into a directory-owned file. Build sessions write
/// run files, the term dictionary, and the block store through this.
pub type WritePtr = io::BufWriter<File>;

/// A read-only view over a file's bytes, either memory-mapped or (for
/// files too short to be worth mapping, and for tests) held in memory.
#[derive(Clone)]
pub enum ReadOnlySource {
    Mmap(Arc<Mmap>),
    Anonymous(Arc<Vec<u8>>),
}

impl ReadOnlySource {
    pub fn empty() -> ReadOnlySource {
        ReadOnlySource::Anonymous(Arc::new(Vec::new()))
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            ReadOnlySource::Mmap(mmap) => &mmap[..],
            ReadOnlySource::Anonymous(data) => &data[..],
        }
    }

    /// Byte range `[start, stop)`, as a fresh `ReadOnlySource` sharing the
    /// same backing storage.
    pub fn slice(&self, start: usize, stop: usize) -> ReadOnlySource {
        match self {
            ReadOnlySource::Anonymous(data) => {
                ReadOnlySource::Anonymous(Arc::new(data[start..stop].to_vec()))
            }
            ReadOnlySource::Mmap(_) => {
                ReadOnlySource::Anonymous(Arc::new(self.as_slice()[start..stop].to_vec()))
            }
        }
    }

    pub fn slice_from(&self, start: usize) -> ReadOnlySource {
        let len = self.len();
        self.slice(start, len)
    }
}

/// A directory that owns a single filesystem path. Used both for a build
/// session's target directory and for opening a sealed index for reads.
pub struct Directory {
    root: PathBuf,
}

impl Directory {
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Directory> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Directory { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn open_write(&self, name: &str) -> io::Result<WritePtr> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.root.join(name))?;
        Ok(io::BufWriter::new(file))
    }

    pub fn open_append(&self, name: &str) -> io::Result<WritePtr> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(name))?;
        Ok(io::BufWriter::new(file))
    }

    /// Opens `name` for reading, memory-mapping it when non-empty.
    ///
    /// An empty/missing file maps to `ReadOnlySource::empty()` rather than
    /// failing: `mmap` refuses to map zero-length files, and a freshly
    /// created (but not yet written) dictionary/store file is legitimate
    /// during an empty build (spec.md §8 boundary scenario).
    pub fn open_read(&self, name: &str) -> io::Result<ReadOnlySource> {
        let path = self.root.join(name);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(ReadOnlySource::empty()),
            Err(err) => return Err(err),
        };
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(ReadOnlySource::empty());
        }
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(ReadOnlySource::Mmap(Arc::new(mmap)))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.root.join(name).exists()
    }

    /// Writes a zero-byte file, used for the `SEALED` sentinel (spec.md
    /// I6). Written to a temp path and renamed into place so the marker
    /// only ever appears on disk fully formed, never mid-write.
    pub fn touch(&self, name: &str) -> io::Result<()> {
        let tmp_name = format!("{name}.tmp");
        let tmp_path = self.root.join(&tmp_name);
        {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, self.root.join(name))
    }

    pub fn remove(&self, name: &str) -> io::Result<()> {
        match fs::remove_file(self.root.join(name)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}
