//! Parallel row filtering with throttling, metrics and observer hooks.
//!
//! The pivot engine is sequential by default. Attaching an [`ExecutionEngine`] moves its
//! filtering stage onto a dedicated rayon pool:
//!
//! - rows are split into fixed-size chunks evaluated in parallel
//! - at most `max_in_flight_chunks` chunks run at once (counting semaphore)
//! - output keeps the input row order, so results match the sequential path exactly
//! - [`ExecutionMetrics`] and an optional [`ExecutionObserver`] report progress

mod observer;
mod semaphore;

use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use crate::filter::RowPredicate;
use crate::types::{FlatTable, Row, Value};

pub use observer::{
    ExecutionEvent, ExecutionMetrics, ExecutionMetricsSnapshot, ExecutionObserver,
    StdErrExecutionObserver,
};

use semaphore::Semaphore;

/// Configuration for the [`ExecutionEngine`].
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Number of worker threads used by the engine.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Number of rows per chunk. Zero is treated as one.
    pub chunk_size: usize,
    /// Upper bound on concurrently executing chunks, on top of `num_threads`. Zero is treated
    /// as one.
    pub max_in_flight_chunks: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        let n = available_threads();
        Self {
            num_threads: Some(n),
            chunk_size: 4_096,
            max_in_flight_chunks: n,
        }
    }
}

/// Chunked parallel row filter over a [`FlatTable`].
pub struct ExecutionEngine {
    pool: ThreadPool,
    opts: ExecutionOptions,
    observer: Option<Arc<dyn ExecutionObserver>>,
    metrics: Arc<ExecutionMetrics>,
}

impl ExecutionEngine {
    /// Create an engine with its own thread pool.
    pub fn new(opts: ExecutionOptions) -> Result<Self, ThreadPoolBuildError> {
        let threads = opts.num_threads.unwrap_or_else(available_threads).max(1);
        let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;
        Ok(Self {
            pool,
            opts: ExecutionOptions {
                num_threads: Some(threads),
                chunk_size: opts.chunk_size.max(1),
                max_in_flight_chunks: opts.max_in_flight_chunks.max(1),
            },
            observer: None,
            metrics: Arc::new(ExecutionMetrics::new()),
        })
    }

    /// Attach an observer for execution events.
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.opts
    }

    /// Handle to the live metrics of the most recent run.
    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Rows of `table` accepted by `predicate`, in their original order.
    pub fn filter_parallel(&self, table: &FlatTable, predicate: &RowPredicate) -> FlatTable {
        self.pool.install(|| self.filter_impl(table, predicate))
    }

    fn filter_impl(&self, table: &FlatTable, predicate: &RowPredicate) -> FlatTable {
        let start = Instant::now();
        self.metrics.begin_run();
        self.emit(ExecutionEvent::RunStarted {
            row_count: table.row_count(),
        });

        let sem = Semaphore::new(self.opts.max_in_flight_chunks);
        let per_chunk: Vec<Vec<Vec<Value>>> = chunk_ranges(table.row_count(), self.opts.chunk_size)
            .into_par_iter()
            .map(|range| {
                let permit = sem.acquire();
                if !permit.waited.is_zero() {
                    self.metrics.on_throttle_wait(permit.waited);
                    self.emit(ExecutionEvent::ThrottleWaited {
                        duration: permit.waited,
                    });
                }

                self.metrics.on_chunk_start();
                self.emit(ExecutionEvent::ChunkStarted {
                    start_row: range.start,
                    row_count: range.len(),
                });

                let processed = range.len();
                let kept: Vec<Vec<Value>> = table.rows[range]
                    .iter()
                    .filter(|values| predicate.evaluate(&Row::new(&table.schema, values)))
                    .cloned()
                    .collect();

                self.metrics.on_rows(processed, kept.len());
                self.emit(ExecutionEvent::ChunkFinished {
                    output_rows: kept.len(),
                });
                self.metrics.on_chunk_end();
                drop(permit);
                kept
            })
            .collect();

        let out = FlatTable::new(
            table.schema.clone(),
            per_chunk.into_iter().flatten().collect(),
        );

        self.metrics.end_run(start.elapsed());
        self.emit(ExecutionEvent::RunFinished {
            elapsed: start.elapsed(),
            metrics: self.metrics.snapshot(),
        });
        out
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

fn available_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn chunk_ranges(row_count: usize, chunk_size: usize) -> Vec<Range<usize>> {
    (0..row_count)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(row_count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ExecutionEngine, ExecutionOptions, chunk_ranges};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::execution::{ExecutionEvent, ExecutionObserver};
    use crate::filter::RowPredicate;
    use crate::types::{DataType, Field, FlatTable, Schema, Value};

    fn table_of_n(n: usize) -> FlatTable {
        let schema = Schema::new(vec![Field::new("id", DataType::Int64)]);
        let rows = (0..n as i64).map(|i| vec![Value::Int64(i)]).collect();
        FlatTable::new(schema, rows)
    }

    fn even_ids() -> RowPredicate {
        RowPredicate::new(|row| matches!(row.get("id"), Some(Value::Int64(v)) if v % 2 == 0))
    }

    #[test]
    fn chunk_ranges_cover_all_rows() {
        assert_eq!(chunk_ranges(0, 3), Vec::<std::ops::Range<usize>>::new());
        assert_eq!(chunk_ranges(7, 3), vec![0..3, 3..6, 6..7]);
    }

    #[test]
    fn parallel_filter_matches_sequential_order() {
        let table = table_of_n(1_000);
        let engine = ExecutionEngine::new(ExecutionOptions {
            num_threads: Some(4),
            chunk_size: 7,
            max_in_flight_chunks: 4,
        })
        .unwrap();

        let predicate = even_ids();
        let parallel = engine.filter_parallel(&table, &predicate);
        let sequential = table.filter_rows(|row| predicate.evaluate(row));
        assert_eq!(parallel, sequential);
        assert_eq!(parallel.row_count(), 500);
    }

    struct ConcurrencyObserver {
        active_chunks: AtomicUsize,
        max_active_chunks: AtomicUsize,
    }

    impl ExecutionObserver for ConcurrencyObserver {
        fn on_event(&self, event: &ExecutionEvent) {
            match event {
                ExecutionEvent::ChunkStarted { .. } => {
                    let now = self.active_chunks.fetch_add(1, Ordering::SeqCst) + 1;
                    self.max_active_chunks.fetch_max(now, Ordering::SeqCst);
                }
                ExecutionEvent::ChunkFinished { .. } => {
                    self.active_chunks.fetch_sub(1, Ordering::SeqCst);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn max_in_flight_chunks_throttles_chunk_concurrency() {
        let table = table_of_n(100);
        let observer = Arc::new(ConcurrencyObserver {
            active_chunks: AtomicUsize::new(0),
            max_active_chunks: AtomicUsize::new(0),
        });
        let obs_trait: Arc<dyn ExecutionObserver> = observer.clone();
        let engine = ExecutionEngine::new(ExecutionOptions {
            num_threads: Some(4),
            chunk_size: 1,
            max_in_flight_chunks: 1,
        })
        .unwrap()
        .with_observer(obs_trait);

        let slow = RowPredicate::new(|_| {
            std::thread::sleep(Duration::from_millis(1));
            true
        });
        let out = engine.filter_parallel(&table, &slow);

        assert_eq!(out.row_count(), table.row_count());
        assert_eq!(observer.max_active_chunks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn metrics_are_available_after_run() {
        let table = table_of_n(60);
        let engine = ExecutionEngine::new(ExecutionOptions {
            num_threads: Some(4),
            chunk_size: 1,
            max_in_flight_chunks: 1,
        })
        .unwrap();
        let metrics = engine.metrics();

        let slow_even = {
            let even = even_ids();
            RowPredicate::new(move |row| {
                std::thread::sleep(Duration::from_millis(2));
                even.evaluate(row)
            })
        };
        let out = engine.filter_parallel(&table, &slow_even);
        assert_eq!(out.row_count(), 30);

        let snap = metrics.snapshot();
        assert_eq!(snap.run_id, 1);
        assert_eq!(snap.rows_processed, 60);
        assert_eq!(snap.rows_accepted, 30);
        assert_eq!(snap.chunks_started, 60);
        assert_eq!(snap.chunks_finished, 60);
        assert_eq!(snap.max_active_chunks, 1);
        assert!(snap.throttle_wait > Duration::ZERO);
        assert!(snap.elapsed.is_some());
    }

    #[test]
    fn zero_sizes_are_clamped() {
        let engine = ExecutionEngine::new(ExecutionOptions {
            num_threads: Some(0),
            chunk_size: 0,
            max_in_flight_chunks: 0,
        })
        .unwrap();
        assert_eq!(engine.options().chunk_size, 1);
        assert_eq!(engine.options().max_in_flight_chunks, 1);
        assert_eq!(engine.options().num_threads, Some(1));
        assert_eq!(engine.filter_parallel(&table_of_n(5), &even_ids()).row_count(), 3);
    }
}
