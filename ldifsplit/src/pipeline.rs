//! The parallel parse/translate stage.
//!
//! One reader thread frames raw records off the source stream and assigns
//! sequence numbers; a pool of worker threads parses each record and runs
//! it through the translator; the consumer re-sequences the results so the
//! dispatcher drains items in source order no matter how the workers
//! interleave. Bounded channels on both hops provide back-pressure against
//! a slow sink.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io::{self, BufReader, Read};
use std::sync::Arc;

use tracing::{debug, warn};

use ldifsplit_core::ldif::reader::{parse_record, RawRecord, RecordScanner};
use ldifsplit_core::MalformedRecord;
use ldifsplit_router::{TranslatedEntry, Translator};

const CHANNEL_CAPACITY: usize = 1024;

/// One element of the ordered stream handed to the dispatcher.
#[derive(Debug)]
pub enum StreamItem {
    /// A translated entry, ready to be written.
    Entry(TranslatedEntry),
    /// A record that failed to parse. The run continues past it.
    Malformed { seq: u64, error: MalformedRecord },
    /// The source stream failed; no further items follow.
    ReadError { seq: u64, error: io::Error },
}

impl StreamItem {
    fn seq(&self) -> u64 {
        match self {
            StreamItem::Entry(entry) => entry.seq,
            StreamItem::Malformed { seq, .. } => *seq,
            StreamItem::ReadError { seq, .. } => *seq,
        }
    }
}

// Heap ordering is by sequence number only.
struct Sequenced(StreamItem);

impl PartialEq for Sequenced {
    fn eq(&self, other: &Self) -> bool {
        self.0.seq() == other.0.seq()
    }
}
impl Eq for Sequenced {}
impl PartialOrd for Sequenced {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Sequenced {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.seq().cmp(&other.0.seq())
    }
}

/// Spawns the reader and worker threads over `source` and returns the
/// ordered consumer end.
pub fn spawn(
    source: Box<dyn Read + Send>,
    translator: Arc<Translator>,
    num_threads: usize,
) -> OrderedStream {
    let (work_tx, work_rx) = flume::bounded::<(u64, RawRecord)>(CHANNEL_CAPACITY);
    let (result_tx, result_rx) = flume::bounded::<StreamItem>(CHANNEL_CAPACITY);

    let reader_result_tx = result_tx.clone();
    std::thread::spawn(move || {
        let mut scanner = RecordScanner::new(BufReader::new(source));
        let mut seq = 0u64;
        loop {
            match scanner.next_record() {
                Ok(Some(record)) => {
                    if work_tx.send((seq, record)).is_err() {
                        break;
                    }
                    seq += 1;
                }
                Ok(None) => break,
                Err(error) => {
                    warn!(%error, "LDIF source stream failed");
                    let _ = reader_result_tx.send(StreamItem::ReadError { seq, error });
                    break;
                }
            }
        }
        debug!(records = seq, "reader thread finished");
    });

    for worker_id in 0..num_threads {
        let work_rx = work_rx.clone();
        let result_tx = result_tx.clone();
        let translator = Arc::clone(&translator);
        std::thread::spawn(move || {
            for (seq, record) in work_rx.iter() {
                let item = match parse_record(&record) {
                    Ok(entry) => StreamItem::Entry(translator.translate(seq, entry)),
                    Err(error) => StreamItem::Malformed { seq, error },
                };
                if result_tx.send(item).is_err() {
                    break;
                }
            }
            debug!(worker_id, "translation worker finished");
        });
    }
    // The consumer sees end-of-stream once the reader and all workers have
    // dropped their senders. Threads are detached: when the consumer goes
    // away early, their next send fails and they exit on their own.
    drop(result_tx);

    OrderedStream {
        rx: result_rx,
        pending: BinaryHeap::new(),
        next_seq: 0,
    }
}

/// Consumer end of the pipeline: yields items in source order.
pub struct OrderedStream {
    rx: flume::Receiver<StreamItem>,
    pending: BinaryHeap<Reverse<Sequenced>>,
    next_seq: u64,
}

impl Iterator for OrderedStream {
    type Item = StreamItem;

    fn next(&mut self) -> Option<StreamItem> {
        loop {
            if let Some(Reverse(head)) = self.pending.peek() {
                if head.0.seq() == self.next_seq {
                    let Reverse(Sequenced(item)) = self.pending.pop().unwrap();
                    self.next_seq = item.seq() + 1;
                    return Some(item);
                }
            }
            match self.rx.recv() {
                Ok(item) => {
                    if item.seq() == self.next_seq {
                        self.next_seq += 1;
                        return Some(item);
                    }
                    self.pending.push(Reverse(Sequenced(item)));
                }
                Err(flume::RecvError::Disconnected) => {
                    // A sequence gap here means a worker died; emit what is
                    // left in order rather than dropping it silently.
                    let item = self.pending.pop().map(|Reverse(Sequenced(i))| i)?;
                    self.next_seq = item.seq() + 1;
                    return Some(item);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
