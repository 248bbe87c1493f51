//! Stress tests for kvbridge.
//!
//! These helpers drive the marshaling layer from many threads at once and
//! count the operations whose results were wrong.

use crate::engine::RecordingEngine;
use crate::fixtures::pattern;
use kvbridge_core::{copy, shift, BoundedFormatter, Bridge, FormatArg, PutFlags};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Operations whose result was correct.
    pub successful_ops: usize,
    /// Operations that failed or produced wrong output.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {name} ===");
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Size of copied or stored values in bytes.
    pub value_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 2_000,
            threads: 4,
            value_size: 256,
        }
    }
}

struct Tally {
    ok: AtomicUsize,
    bad: AtomicUsize,
}

impl Tally {
    fn new() -> Self {
        Self {
            ok: AtomicUsize::new(0),
            bad: AtomicUsize::new(0),
        }
    }

    fn record(&self, ok: bool) {
        let counter = if ok { &self.ok } else { &self.bad };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn finish(self, start: Instant) -> StressTestResult {
        StressTestResult::new(
            self.ok.into_inner(),
            self.bad.into_inner(),
            start.elapsed(),
        )
    }
}

/// Formats thread-specific messages concurrently.
///
/// Each operation checks that its output carries its own thread and
/// sequence numbers, so any staging shared between threads shows up as a
/// failure.
pub fn stress_concurrent_formatting(
    formatter: &BoundedFormatter,
    config: &StressConfig,
) -> StressTestResult {
    let tally = Tally::new();
    let start = Instant::now();

    thread::scope(|scope| {
        for thread_id in 0..config.threads {
            let tally = &tally;
            scope.spawn(move || {
                let mut dest = [0u8; 128];
                let tag = [b'a' + (thread_id % 26) as u8; 40];
                for seq in 0..config.operations {
                    let args = [
                        FormatArg::UInt(thread_id as u64),
                        FormatArg::UInt(seq as u64),
                        FormatArg::Str(&tag),
                    ];
                    let expected = format!(
                        "thread {thread_id} op {seq:06} {}",
                        String::from_utf8_lossy(&tag)
                    );
                    let ok = formatter
                        .format_into(&mut dest, b"thread %u op %06u %s", &args)
                        .is_ok_and(|out| &dest[..out.written] == expected.as_bytes());
                    tally.record(ok);
                }
            });
        }
    });

    tally.finish(start)
}

/// Puts thread-specific values through one bridge concurrently.
pub fn stress_concurrent_puts(
    bridge: &Bridge<RecordingEngine>,
    config: &StressConfig,
) -> StressTestResult {
    let tally = Tally::new();
    let start = Instant::now();

    thread::scope(|scope| {
        for thread_id in 0..config.threads {
            let tally = &tally;
            scope.spawn(move || {
                let first = pattern(config.value_size, thread_id as u8);
                let second = pattern(config.value_size / 2 + 1, !(thread_id as u8));
                for seq in 0..config.operations {
                    let key = format!("t{thread_id}-{seq}");
                    let ok = bridge
                        .put_multiple(
                            std::ptr::null_mut(),
                            1,
                            key.as_bytes().into(),
                            (&first).into(),
                            (&second).into(),
                            PutFlags::UPSERT,
                        )
                        .is_ok_and(|status| status.is_success());
                    tally.record(ok);
                }
            });
        }
    });

    tally.finish(start)
}

/// Copies and shifts thread-local buffers concurrently, checking every
/// result against a slice-level copy.
pub fn stress_concurrent_copies(config: &StressConfig) -> StressTestResult {
    let tally = Tally::new();
    let start = Instant::now();
    let size = config.value_size.max(2);

    thread::scope(|scope| {
        for thread_id in 0..config.threads {
            let tally = &tally;
            scope.spawn(move || {
                let source = pattern(size, thread_id as u8);
                let mut dest = vec![0u8; size];
                for seq in 0..config.operations {
                    let length = seq % size;
                    let offset = size - length;
                    let copied = copy(&source, 0, &mut dest, offset, length).is_ok()
                        && dest[offset..] == source[..length];

                    let mut buf = source.clone();
                    let shifted = shift(&mut buf, 0, 1, size - 1).is_ok()
                        && buf[1..] == source[..size - 1];
                    tally.record(copied && shifted);
                }
            });
        }
    });

    tally.finish(start)
}
