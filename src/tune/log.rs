//! Append-only evaluation log with a single serialized writer.
//!
//! Search workers run concurrently, but all log appends are funnelled through
//! one channel into a dedicated writer thread that owns the file handle. That
//! removes the interleaving hazard of per-worker appends while keeping the
//! workers free of file IO.

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use crate::error::{NgramError, Result};

/// One evaluated candidate: the round it belongs to, its parameter values, and
/// the perplexity it achieved.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalRow {
    /// Search round the evaluation belongs to (1-indexed).
    pub round: usize,
    /// Parameter values of the candidate (weights, or a single decay value).
    pub params: Vec<f64>,
    /// Held-out perplexity achieved by the candidate.
    pub perplexity: f64,
}

/// Cloneable handle used by search workers to record evaluations.
///
/// A disabled handle drops rows; an enabled one sends them to the writer
/// thread created by [`EvalLog::create`]. Sends never block the caller beyond
/// the channel hand-off.
#[derive(Debug, Clone)]
pub struct EvalLog {
    tx: Option<Sender<EvalRow>>,
}

impl EvalLog {
    /// Creates a handle that discards every row.
    #[must_use]
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Opens `path` for appending and spawns the writer thread.
    ///
    /// The header is written only when the file is created fresh, so repeated
    /// runs keep appending to one log. Callers must drop the returned handle
    /// (and every clone) before calling [`EvalLogWriter::finish`], otherwise
    /// the writer thread never observes the end of the row stream.
    pub fn create<P: AsRef<Path>>(path: P, header: &[&str]) -> Result<(Self, EvalLogWriter)> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|err| NgramError::io(err, Some(parent.to_path_buf())))?;
            }
        }
        let fresh = !path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| NgramError::io(err, Some(path.clone())))?;

        let header: String = header.join(",");
        let (tx, rx) = mpsc::channel::<EvalRow>();
        let handle = thread::spawn(move || -> io::Result<()> {
            let mut out = BufWriter::new(file);
            if fresh {
                writeln!(out, "{header}")?;
            }
            for row in rx {
                let params = row
                    .params
                    .iter()
                    .map(|value| format!("{value:.4}"))
                    .collect::<Vec<_>>()
                    .join(",");
                writeln!(out, "{},{},{:.4}", row.round, params, row.perplexity)?;
            }
            out.flush()
        });

        Ok((Self { tx: Some(tx) }, EvalLogWriter { handle }))
    }

    /// Records one evaluation; a no-op on disabled handles.
    ///
    /// A disconnected writer (already finished or crashed) is tolerated: the
    /// search result does not depend on the log reaching disk.
    pub fn record(&self, row: EvalRow) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(row);
        }
    }
}

/// Join handle for the writer thread behind an [`EvalLog`].
#[derive(Debug)]
pub struct EvalLogWriter {
    handle: JoinHandle<io::Result<()>>,
}

impl EvalLogWriter {
    /// Waits for the writer to drain the channel and flush the file.
    ///
    /// Every [`EvalLog`] clone must be dropped first; see [`EvalLog::create`].
    pub fn finish(self) -> Result<()> {
        match self.handle.join() {
            Ok(outcome) => outcome.map_err(|err| NgramError::io(err, None)),
            Err(_) => Err(NgramError::Internal(
                "evaluation log writer thread panicked".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn disabled_log_swallows_rows() {
        let log = EvalLog::disabled();
        log.record(EvalRow {
            round: 1,
            params: vec![0.5],
            perplexity: 10.0,
        });
    }

    #[test]
    fn rows_arrive_in_one_piece_under_concurrent_senders() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("tuning.csv");
        let (log, writer) =
            EvalLog::create(&path, &["round", "alpha", "perplexity"]).expect("create log");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = log.clone();
                thread::spawn(move || {
                    log.record(EvalRow {
                        round: 1,
                        params: vec![i as f64 / 10.0],
                        perplexity: 100.0 + i as f64,
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("sender thread");
        }
        drop(log);
        writer.finish().expect("writer finishes cleanly");

        let contents = fs::read_to_string(&path).expect("read log");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], "round,alpha,perplexity");
        for line in &lines[1..] {
            assert_eq!(line.split(',').count(), 3, "corrupt row: {line}");
        }
    }

    #[test]
    fn reopened_log_appends_without_a_second_header() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("tuning.csv");

        for _ in 0..2 {
            let (log, writer) =
                EvalLog::create(&path, &["round", "alpha", "perplexity"]).expect("create log");
            log.record(EvalRow {
                round: 1,
                params: vec![0.4],
                perplexity: 42.0,
            });
            drop(log);
            writer.finish().expect("writer finishes cleanly");
        }

        let contents = fs::read_to_string(&path).expect("read log");
        let headers = contents
            .lines()
            .filter(|line| line.starts_with("round"))
            .count();
        assert_eq!(headers, 1);
        assert_eq!(contents.lines().count(), 3);
    }
}
