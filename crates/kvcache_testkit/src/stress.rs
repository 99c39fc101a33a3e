//! Stress tests for store adapters.
//!
//! These tests verify behavior under concurrent access, including a
//! `close` racing in-flight operations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use kvcache_core::{KvCacheError, KvCacheStore};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Operations rejected because the store was not Ready.
    pub rejected_ops: usize,
    /// Operations that failed for any other reason.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, rejected: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + rejected + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            rejected_ops: rejected,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Rejected: {}", self.rejected_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Size of each value in bytes.
    pub value_size: usize,
    /// Number of distinct keys.
    pub key_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            value_size: 256,
            key_count: 1_000,
        }
    }
}

#[derive(Default)]
struct Counters {
    successful: AtomicUsize,
    rejected: AtomicUsize,
    failed: AtomicUsize,
}

impl Counters {
    fn record<T>(&self, result: Result<T, KvCacheError>) {
        let counter = match result {
            Ok(_) => &self.successful,
            Err(KvCacheError::NotInitialized) => &self.rejected,
            Err(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn finish(&self, start: Instant) -> StressTestResult {
        StressTestResult::new(
            self.successful.load(Ordering::Relaxed),
            self.rejected.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            start.elapsed(),
        )
    }
}

fn run_mixed<S>(
    store: &Arc<S>,
    config: &StressConfig,
    counters: &Arc<Counters>,
) -> Vec<thread::JoinHandle<()>>
where
    S: KvCacheStore + ?Sized + 'static,
{
    let ops_per_thread = config.operations / config.threads.max(1);

    (0..config.threads)
        .map(|t| {
            let store = Arc::clone(store);
            let counters = Arc::clone(counters);
            let key_count = config.key_count.max(1);
            let value = vec![0xABu8; config.value_size];

            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let key = format!("key-{}", (t * ops_per_thread + i) % key_count);
                    match i % 4 {
                        0 => counters.record(store.put(&key, &[&value[..]])),
                        1 => counters.record(store.get_buffer(&key)),
                        2 => counters.record(store.is_exist(&key)),
                        _ => counters.record(store.get_size(&key)),
                    }
                }
            })
        })
        .collect()
}

/// Runs a concurrent put/get/exists/size workload.
pub fn stress_concurrent_mixed<S>(store: Arc<S>, config: &StressConfig) -> StressTestResult
where
    S: KvCacheStore + ?Sized + 'static,
{
    let counters = Arc::new(Counters::default());
    let start = Instant::now();

    for handle in run_mixed(&store, config, &counters) {
        handle.join().expect("Thread panicked");
    }

    counters.finish(start)
}

/// Runs the mixed workload and closes the store while it is in flight.
///
/// Every operation must either succeed or be rejected with
/// [`KvCacheError::NotInitialized`]; anything else counts as failed.
pub fn stress_close_under_load<S>(store: Arc<S>, config: &StressConfig) -> StressTestResult
where
    S: KvCacheStore + ?Sized + 'static,
{
    let counters = Arc::new(Counters::default());
    let start = Instant::now();

    let handles = run_mixed(&store, config, &counters);
    thread::sleep(Duration::from_millis(1));
    let code = store.close().expect("Failed to close");
    assert_eq!(code, 0, "close returned non-zero status");

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    counters.finish(start)
}
