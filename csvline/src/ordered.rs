// SPDX-License-Identifier: Apache-2.0

//! Parallel record mapping with ordered, fail-fast output.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use crate::record_reader::{LineSource, ReadError, RecordReader};
use crate::shared::{LineParser, Record};

use log::debug;

/// Error from [`OrderedProcessor::process`].
#[derive(Debug, thiserror::Error)]
pub enum ProcessError<E> {
    /// Reading the input failed.
    #[error(transparent)]
    Read(#[from] ReadError),
    /// The mapping function failed on the record with this index.
    #[error("record {index} failed: {source}")]
    Map {
        index: usize,
        #[source]
        source: E,
    },
}

/// Maps records on a fixed-size worker pool and hands results back in input order.
///
/// Records are pulled from the reader on the calling thread, at most one batch
/// at a time. Each batch is mapped in parallel and then re-sequenced by record
/// index. The first error in record order stops the run, and nothing after it
/// is delivered.
pub struct OrderedProcessor {
    pool: ThreadPool,
}

impl OrderedProcessor {
    /// Builds a pool with `workers` threads; 0 picks one per available core.
    pub fn new(workers: usize) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("csvline-worker-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Maps every record of `reader` with `f` and collects the results in order.
    ///
    /// `f` receives the zero-based record index and the record.
    pub fn process<S, P, T, E, F>(
        &self,
        reader: &mut RecordReader<S, P>,
        batch_size: usize,
        f: F,
    ) -> Result<Vec<T>, ProcessError<E>>
    where
        S: LineSource,
        P: LineParser,
        T: Send,
        E: Send,
        F: Fn(usize, Record) -> Result<T, E> + Sync,
    {
        let mut results = Vec::new();
        self.process_into(reader, batch_size, f, |_, value| results.push(value))?;
        Ok(results)
    }

    /// Like [`process`](Self::process), but hands each result to `sink` as soon
    /// as its batch has completed.
    pub fn process_into<S, P, T, E, F, K>(
        &self,
        reader: &mut RecordReader<S, P>,
        batch_size: usize,
        f: F,
        mut sink: K,
    ) -> Result<(), ProcessError<E>>
    where
        S: LineSource,
        P: LineParser,
        T: Send,
        E: Send,
        F: Fn(usize, Record) -> Result<T, E> + Sync,
        K: FnMut(usize, T),
    {
        let batch_size = batch_size.max(1);
        let mut next_index = 0;
        loop {
            let mut batch = Vec::with_capacity(batch_size);
            let mut read_error = None;
            while batch.len() < batch_size {
                match reader.read_record() {
                    Ok(Some(record)) => {
                        batch.push((next_index, record));
                        next_index += 1;
                    }
                    Ok(None) => break,
                    Err(error) => {
                        read_error = Some(error);
                        break;
                    }
                }
            }
            let exhausted = batch.len() < batch_size;
            if !batch.is_empty() {
                debug!(
                    "mapping records {}..{} on {} workers",
                    next_index - batch.len(),
                    next_index,
                    self.workers()
                );
            }

            let mapped: Vec<(usize, Result<T, E>)> = self.pool.install(|| {
                batch
                    .into_par_iter()
                    .map(|(index, record)| (index, f(index, record)))
                    .collect()
            });
            for (index, result) in mapped {
                match result {
                    Ok(value) => sink(index, value),
                    Err(source) => {
                        debug!("record {index} failed, aborting");
                        return Err(ProcessError::Map { index, source });
                    }
                }
            }

            if let Some(error) = read_error {
                return Err(error.into());
            }
            if exhausted {
                return Ok(());
            }
        }
    }
}
