//! Small shared utilities used throughout the crate: binary (de)serialization,
//! the compressed-varint codec mandated by the on-disk formats, and a
//! byte-counting `Write` adapter.

mod binary_serializable;
mod counting_writer;
mod varint;

pub use self::binary_serializable::BinarySerializable;
pub use self::counting_writer::CountingWriter;
pub use self::varint::{cvarint_len, read_cvarint, read_cvarint_from_slice, write_cvarint};
