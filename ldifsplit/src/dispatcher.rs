//! The single-threaded sink.
//!
//! Drains the ordered stream of translated entries, gives deferred entries
//! their second-chance routing, writes each entry to its target shard
//! files (opened lazily, gzip-wrapped when requested), synthesizes error
//! records for malformed input, and keeps the read/excluded/per-file
//! counters. Output streams and counters are owned exclusively by this
//! component; no locking is involved.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, error, warn};

use ldifsplit_router::{error_record, RouteDecision, Shard, Translator};

use crate::pipeline::StreamItem;

const PROGRESS_INTERVAL: u64 = 1000;

/// Outcome of one run: the counters and the per-file tallies, plus whether
/// the whole run is considered successful.
#[derive(Debug)]
pub struct RunSummary {
    pub entries_read: u64,
    pub entries_excluded: u64,
    /// `(file name, entries written)`, ordered by file suffix.
    pub files: Vec<(PathBuf, u64)>,
    pub success: bool,
}

pub struct Dispatcher {
    base_path: PathBuf,
    compress: bool,
    translator: Arc<Translator>,
    outputs: BTreeMap<String, ShardFile>,
    entries_read: u64,
    entries_excluded: u64,
    failed: bool,
}

impl Dispatcher {
    pub fn new(base_path: PathBuf, compress: bool, translator: Arc<Translator>) -> Self {
        Dispatcher {
            base_path,
            compress,
            translator,
            outputs: BTreeMap::new(),
            entries_read: 0,
            entries_excluded: 0,
            failed: false,
        }
    }

    /// Consumes the stream and writes the shard files. Output files are
    /// closed (and gzip trailers flushed) on every path out of here; the
    /// summary is produced even when the run aborts partway.
    pub fn run(mut self, items: impl Iterator<Item = StreamItem>) -> Result<RunSummary> {
        for item in items {
            let keep_going = match item {
                StreamItem::Entry(entry) => self.dispatch_entry(entry)?,
                StreamItem::Malformed { error, .. } => self.dispatch_malformed(error)?,
                StreamItem::ReadError { error, .. } => {
                    self.dispatch_read_error(error)?;
                    false
                }
            };
            if !keep_going {
                break;
            }
        }
        self.finish()
    }

    /// Routes and writes one entry. Returns `false` when the run must stop.
    fn dispatch_entry(
        &mut self,
        entry: ldifsplit_router::TranslatedEntry,
    ) -> Result<bool> {
        self.entries_read += 1;
        if self.entries_read % PROGRESS_INTERVAL == 0 {
            println!("Processed {} entries", self.entries_read);
        }

        // Second-chance routing: a deferred entry's parent has been
        // committed by now if it appeared earlier in the source at all.
        let decision = match entry.decision {
            RouteDecision::Route(set) => RouteDecision::Route(set),
            RouteDecision::Deferred => self.translator.reroute(&entry.entry),
        };

        let set = match decision {
            RouteDecision::Route(set) => set,
            RouteDecision::Deferred => {
                let message = format!(
                    "entry '{}' has no parent in a previously-seen shard",
                    entry.entry.dn_text
                );
                warn!(dn = %entry.entry.dn_text, "routing failed; sending entry to the errors set");
                self.failed = true;
                let mut bytes = Vec::with_capacity(entry.bytes.len() + message.len() + 8);
                bytes.extend_from_slice(b"# ");
                bytes.extend_from_slice(message.as_bytes());
                bytes.push(b'\n');
                bytes.extend_from_slice(&entry.bytes);
                return Ok(self.write_to_shard(Shard::Errors, &bytes)?);
            }
        };

        if set.is_empty() {
            self.entries_excluded += 1;
            return Ok(true);
        }

        for shard in set.iter() {
            if shard.is_errors() {
                self.failed = true;
            }
            if !self.write_to_shard(*shard, &entry.bytes)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Preserves a malformed record in the errors shard. Record-local
    /// failures do not stop the run, but they fail it.
    fn dispatch_malformed(&mut self, record: ldifsplit_core::MalformedRecord) -> Result<bool> {
        warn!(line = record.line, error = %record, "skipping malformed LDIF record");
        self.failed = true;
        let bytes = error_record(&record.message, &record.lines);
        self.write_to_shard(Shard::Errors, &bytes)
    }

    /// A failed source stream ends the run. Invalid bytes in the stream
    /// leave a trace in the errors shard; plain I/O failures only log.
    fn dispatch_read_error(&mut self, err: io::Error) -> Result<()> {
        error!(error = %err, "unable to read from the LDIF source");
        self.failed = true;
        if err.kind() == ErrorKind::InvalidData {
            let bytes = error_record(&format!("unrecoverable LDIF stream error: {err}"), &[]);
            self.write_to_shard(Shard::Errors, &bytes)?;
        }
        Ok(())
    }

    /// Lazily opens the shard file on first use and appends `bytes`.
    /// Returns `false` when a write failed and the run must stop.
    fn write_to_shard(&mut self, shard: Shard, bytes: &[u8]) -> Result<bool> {
        let suffix = shard.file_suffix();
        if !self.outputs.contains_key(&suffix) {
            let file = match ShardFile::open(&self.base_path, &suffix, self.compress) {
                Ok(file) => file,
                Err(e) => {
                    self.failed = true;
                    error!(error = %e, "unable to open output file");
                    return Ok(false);
                }
            };
            debug!(path = %file.path.display(), "opened shard output file");
            self.outputs.insert(suffix.clone(), file);
        }

        let output = self.outputs.get_mut(&suffix).expect("just inserted");
        match output.write_record(bytes) {
            Ok(()) => Ok(true),
            Err(e) => {
                self.failed = true;
                error!(path = %output.path.display(), error = %e, "unable to write to output file");
                Ok(false)
            }
        }
    }

    fn finish(mut self) -> Result<RunSummary> {
        let mut files = Vec::with_capacity(self.outputs.len());
        let mut close_failed = false;
        for (_, output) in std::mem::take(&mut self.outputs) {
            let path = output.path.clone();
            let entries = output.entries;
            if let Err(e) = output.close() {
                close_failed = true;
                error!(path = %path.display(), error = %e, "unable to close output file");
            }
            files.push((path, entries));
        }

        Ok(RunSummary {
            entries_read: self.entries_read,
            entries_excluded: self.entries_excluded,
            files,
            success: !self.failed && !close_failed,
        })
    }
}

enum ShardOutput {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

struct ShardFile {
    path: PathBuf,
    output: ShardOutput,
    entries: u64,
}

impl ShardFile {
    fn open(base_path: &std::path::Path, suffix: &str, compress: bool) -> Result<Self> {
        let mut name = base_path.as_os_str().to_os_string();
        name.push(suffix);
        let path = PathBuf::from(name);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("unable to create output directory '{}'", parent.display())
                })?;
            }
        }

        let file = File::create(&path)
            .with_context(|| format!("unable to create output file '{}'", path.display()))?;
        let writer = BufWriter::new(file);
        let output = if compress {
            ShardOutput::Gzip(GzEncoder::new(writer, Compression::default()))
        } else {
            ShardOutput::Plain(writer)
        };
        Ok(ShardFile {
            path,
            output,
            entries: 0,
        })
    }

    fn write_record(&mut self, bytes: &[u8]) -> io::Result<()> {
        match &mut self.output {
            ShardOutput::Plain(w) => w.write_all(bytes)?,
            ShardOutput::Gzip(w) => w.write_all(bytes)?,
        }
        self.entries += 1;
        Ok(())
    }

    fn close(self) -> io::Result<()> {
        match self.output {
            ShardOutput::Plain(mut w) => w.flush(),
            ShardOutput::Gzip(w) => {
                // finish() writes the gzip trailer.
                let mut inner = w.finish()?;
                inner.flush()
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod tests;
