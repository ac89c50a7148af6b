//! Numeric-ID allocation against the shared counter.
//!
//! The counter is read once per run. Each allocation hands out the current
//! value; after the account is created, `current + 1` is written back and the
//! in-run value advances. See [`CounterStore`] for the single-writer contract.

use tracing::{debug, warn};

use idmirror_connector::error::DirectoryResult;
use idmirror_connector::traits::CounterStore;

/// In-run view of the numeric-ID counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdAllocator {
    current: u64,
    degraded: bool,
}

impl IdAllocator {
    /// Read the counter, falling back to `baseline` if it cannot be read.
    pub async fn load<C>(store: &C, baseline: u64) -> Self
    where
        C: CounterStore + ?Sized,
    {
        match store.read_counter().await {
            Ok(current) => {
                debug!(current, "Loaded numeric id counter");
                Self {
                    current,
                    degraded: false,
                }
            }
            Err(e) => {
                warn!(
                    error = %e,
                    baseline,
                    "Numeric id counter unreadable, falling back to baseline"
                );
                Self {
                    current: baseline,
                    degraded: true,
                }
            }
        }
    }

    /// Value the next created account receives.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.current
    }

    /// Whether the counter could not be read and the baseline is in use.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Advance past the current value and persist it.
    ///
    /// The in-run value advances even when the write fails, so later
    /// allocations in this run never reuse an ID.
    pub async fn commit<C>(&mut self, store: &C) -> DirectoryResult<()>
    where
        C: CounterStore + ?Sized,
    {
        self.current += 1;
        store.write_counter(self.current).await
    }
}
