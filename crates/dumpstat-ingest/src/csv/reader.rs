//! Chunked line reassembly and record decoding
//!
//! Bytes arrive in chunks of any size. [`LineBuffer`] keeps only the
//! unterminated tail between chunks, so resident memory is one carry-over
//! buffer plus one chunk no matter how large the file is.

use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::record::{Header, Record};
use super::tokenizer::split_fields;
use crate::error::Result;

/// Default read size for [`RecordReader`]
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Carry-over buffer that turns arbitrary chunks into complete lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    /// Start of the unconsumed region
    start: usize,
    /// Bytes after `start` already known to contain no newline
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk, dropping the consumed prefix first
    pub fn push(&mut self, chunk: &[u8]) {
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.start = 0;
        }
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete line without its `\n`, if one is buffered
    pub fn next_line(&mut self) -> Option<&[u8]> {
        let from = self.start + self.scanned;
        match self.buf[from..].iter().position(|&b| b == b'\n') {
            Some(offset) => {
                let line_start = self.start;
                let line_end = from + offset;
                self.start = line_end + 1;
                self.scanned = 0;
                Some(&self.buf[line_start..line_end])
            },
            None => {
                self.scanned = self.buf.len() - self.start;
                None
            },
        }
    }

    /// Take the unterminated tail at end of input
    pub fn take_remainder(&mut self) -> Option<Vec<u8>> {
        let tail = self.buf.split_off(self.start);
        self.buf.clear();
        self.start = 0;
        self.scanned = 0;
        (!tail.is_empty()).then_some(tail)
    }

    /// Bytes currently resident
    pub fn buffered(&self) -> usize {
        self.buf.len() - self.start
    }
}

/// Push-in, pull-out record decoder.
///
/// The first non-empty line is the header; every later line is tokenized and
/// zipped with it. Lines that tokenize to no fields are skipped.
#[derive(Debug, Default)]
pub struct RecordDecoder {
    lines: LineBuffer,
    header: Option<Arc<Header>>,
    finished: bool,
}

impl RecordDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of input
    pub fn push(&mut self, chunk: &[u8]) {
        self.lines.push(chunk);
    }

    /// Signal end of input so a final unterminated line is decoded too
    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_deref()
    }

    /// Next record decodable from the input seen so far
    pub fn next_record(&mut self) -> Option<Record> {
        loop {
            let fields = match self.lines.next_line() {
                Some(line) => decode_line(line),
                None if self.finished => {
                    let tail = self.lines.take_remainder()?;
                    decode_line(&tail)
                },
                None => return None,
            };

            if fields.is_empty() {
                continue;
            }

            match &self.header {
                Some(header) => return Some(Record::from_fields(Arc::clone(header), fields)),
                None => self.header = Some(Arc::new(header_from_fields(fields))),
            }
        }
    }
}

fn decode_line(line: &[u8]) -> Vec<String> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    split_fields(&String::from_utf8_lossy(line))
}

fn header_from_fields(mut names: Vec<String>) -> Header {
    if let Some(first) = names.first_mut() {
        if let Some(stripped) = first.strip_prefix('\u{feff}') {
            *first = stripped.to_string();
        }
    }
    Header::new(names)
}

/// Pull-based record stream over an async byte source
pub struct RecordReader<R> {
    source: R,
    decoder: RecordDecoder,
    chunk: Vec<u8>,
    eof: bool,
}

impl RecordReader<tokio::fs::File> {
    /// Stream records from a decompressed dump on disk
    pub async fn open(path: &Path) -> Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(file))
    }
}

impl<R: AsyncRead + Unpin> RecordReader<R> {
    pub fn new(source: R) -> Self {
        Self::with_chunk_size(source, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(source: R, chunk_size: usize) -> Self {
        Self {
            source,
            decoder: RecordDecoder::new(),
            chunk: vec![0; chunk_size.max(1)],
            eof: false,
        }
    }

    /// Next record, reading more chunks only when the buffered ones are drained
    pub async fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            if let Some(record) = self.decoder.next_record() {
                return Ok(Some(record));
            }
            if self.eof {
                return Ok(None);
            }

            let read = self.source.read(&mut self.chunk).await?;
            if read == 0 {
                self.eof = true;
                self.decoder.finish();
            } else {
                self.decoder.push(&self.chunk[..read]);
            }
        }
    }

    pub fn header(&self) -> Option<&Header> {
        self.decoder.header()
    }
}
