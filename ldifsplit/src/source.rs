//! Source stream assembly.
//!
//! Multiple source files are concatenated with two end-of-line sequences
//! between them so that a file ending without a trailing blank line cannot
//! run its last record together with the next file's first record.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use tracing::debug;

/// Opens the configured sources as one byte stream, decoding gzip when
/// requested. Every file is opened up front so unreadable sources fail the
/// run before any processing starts.
pub fn open_source(paths: &[PathBuf], compressed: bool) -> Result<Box<dyn Read + Send>> {
    let raw: Box<dyn Read + Send> = if paths.is_empty() {
        debug!("reading LDIF data from standard input");
        Box::new(io::stdin())
    } else {
        Box::new(AggregateReader::open(paths)?)
    };

    if compressed {
        Ok(Box::new(GzDecoder::new(raw)))
    } else {
        Ok(raw)
    }
}

/// Reads a sequence of sources back to back, with a two-EOL spacer between
/// consecutive files.
struct AggregateReader {
    sources: VecDeque<Box<dyn Read + Send>>,
}

impl AggregateReader {
    fn open(paths: &[PathBuf]) -> Result<Self> {
        let mut sources: VecDeque<Box<dyn Read + Send>> = VecDeque::new();
        for path in paths {
            if !sources.is_empty() {
                sources.push_back(Box::new(Cursor::new(&b"\n\n"[..])));
            }
            let file = File::open(path)
                .with_context(|| format!("unable to open source LDIF file '{}'", path.display()))?;
            sources.push_back(Box::new(file));
        }
        Ok(AggregateReader { sources })
    }
}

impl Read for AggregateReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while let Some(front) = self.sources.front_mut() {
            let n = front.read(buf)?;
            if n > 0 {
                return Ok(n);
            }
            self.sources.pop_front();
        }
        Ok(0)
    }
}
