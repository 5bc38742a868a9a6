//! Streaming CSV decoding for the bulk dumps
//!
//! This is deliberately not a general CSV library. Input is split into lines
//! first and each line is tokenized on its own, which is only correct because
//! the dumps never put a raw newline inside a quoted field. A field that did
//! would come out as two broken rows (see the reader tests).
//!
//! - [`LineBuffer`]: carry-over buffer reassembling lines across chunk boundaries
//! - [`split_fields`]: quote-aware tokenizer for one line
//! - [`RecordDecoder`] / [`RecordReader`]: header mapping and pull-based record stream

pub mod reader;
pub mod record;
pub mod tokenizer;

pub use reader::{LineBuffer, RecordDecoder, RecordReader, DEFAULT_CHUNK_SIZE};
pub use record::{Header, Record, DESCRIPTION_COLUMN};
pub use tokenizer::split_fields;
