/*!
 * Job discovery and the shared job queue.
 *
 * The queue is filled once from a directory scan and only drained afterwards.
 * A job handed to a worker belongs to that worker until it reaches a terminal
 * outcome; it is never pushed back.
 */

use anyhow::Result;
use log::debug;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::file_utils::FileManager;

/// One file to process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Sequence number taken from the input file name
    pub seq: u64,
    /// File to read
    pub input: PathBuf,
    /// File to write; equal to `input` for in-place tasks
    pub output: PathBuf,
}

impl Job {
    /// File name used in log lines
    pub fn name(&self) -> String {
        self.input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input.display().to_string())
    }
}

/// Inclusive sequence-number filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentRange {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl SegmentRange {
    pub fn new(start: Option<u64>, end: Option<u64>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, seq: u64) -> bool {
        self.start.is_none_or(|start| seq >= start) && self.end.is_none_or(|end| seq <= end)
    }
}

/// Result of building a queue
#[derive(Debug)]
pub struct ScanResult {
    pub queue: JobQueue,
    /// Files left out because they were done already or out of range
    pub skipped: usize,
}

/// Thread-safe FIFO of jobs
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
}

impl JobQueue {
    pub fn new(jobs: impl IntoIterator<Item = Job>) -> Self {
        Self {
            jobs: Mutex::new(jobs.into_iter().collect()),
        }
    }

    /// Queue every segment in `input_dir` whose output in `output_dir` is not done yet
    ///
    /// An output counts as done when it exists and is non-empty.
    pub fn scan(input_dir: &Path, output_dir: &Path, range: SegmentRange) -> Result<ScanResult> {
        let mut jobs = Vec::new();
        let mut skipped = 0;

        for (seq, input) in FileManager::find_segment_files(input_dir)? {
            let Some(name) = input.file_name() else {
                continue;
            };
            let output = output_dir.join(name);

            if FileManager::has_content(&output) {
                debug!("Skipping {:?}: output already present", name);
                skipped += 1;
                continue;
            }
            if !range.contains(seq) {
                skipped += 1;
                continue;
            }

            jobs.push(Job { seq, input, output });
        }

        Ok(ScanResult {
            queue: Self::new(jobs),
            skipped,
        })
    }

    /// Queue every segment in `dir` for rewriting in place
    pub fn scan_in_place(dir: &Path, range: SegmentRange) -> Result<ScanResult> {
        let mut jobs = Vec::new();
        let mut skipped = 0;

        for (seq, path) in FileManager::find_segment_files(dir)? {
            if !range.contains(seq) {
                skipped += 1;
                continue;
            }
            jobs.push(Job {
                seq,
                input: path.clone(),
                output: path,
            });
        }

        Ok(ScanResult {
            queue: Self::new(jobs),
            skipped,
        })
    }

    /// Take the next job without waiting
    pub fn pop(&self) -> Option<Job> {
        self.jobs.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}
