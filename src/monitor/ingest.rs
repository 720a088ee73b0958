//! The ingestion loop
//!
//! One task, one outstanding submission at a time: draw a sample, classify it,
//! submit the verdict, sleep a jittered interval, repeat. Failed submissions
//! are logged and dropped; the loop never retries. Shutdown is observed only
//! between cycles, so a submission that has started always runs to completion.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::classifier::Classifier;
use super::samples::SamplePool;
use super::submitter::EventSubmitter;

/// Bounded range the inter-cycle sleep is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    min: Duration,
    max: Duration,
}

impl Jitter {
    /// Swaps the bounds if given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

impl Default for Jitter {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), Duration::from_secs(5))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Sampling,
    Classifying,
    Submitting,
    Waiting,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Submitted { tx_hash: String },
    Dropped,
    Unclassified,
}

/// Totals for one run of the loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopReport {
    pub cycles: u64,
    pub submitted: u64,
    pub dropped: u64,
    pub unclassified: u64,
}

impl LoopReport {
    fn record(&mut self, outcome: &CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Submitted { .. } => self.submitted += 1,
            CycleOutcome::Dropped => self.dropped += 1,
            CycleOutcome::Unclassified => self.unclassified += 1,
        }
    }
}

pub struct IngestionLoop {
    pool: SamplePool,
    classifier: Arc<dyn Classifier>,
    submitter: Arc<dyn EventSubmitter>,
    jitter: Jitter,
    max_cycles: Option<u64>,
    rng: StdRng,
    state: LoopState,
}

impl IngestionLoop {
    pub fn new(
        pool: SamplePool,
        classifier: Arc<dyn Classifier>,
        submitter: Arc<dyn EventSubmitter>,
        jitter: Jitter,
    ) -> Self {
        Self {
            pool,
            classifier,
            submitter,
            jitter,
            max_cycles: None,
            rng: StdRng::from_entropy(),
            state: LoopState::Idle,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_max_cycles(mut self, max_cycles: Option<u64>) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Sample, classify and submit once.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.state = LoopState::Sampling;
        let sample = self.pool.draw(&mut self.rng);

        self.state = LoopState::Classifying;
        let flag = match self.classifier.predict(sample) {
            Ok(flag) => flag,
            Err(e) => {
                tracing::error!("Could not classify sample from {}: {}", sample.device, e);
                return CycleOutcome::Unclassified;
            }
        };

        if flag.is_malicious() {
            tracing::warn!(device = %sample.device, "Intrusion detected");
        } else {
            tracing::info!(device = %sample.device, "Benign traffic");
        }

        self.state = LoopState::Submitting;
        match self.submitter.submit(&sample.device, flag).await {
            Ok(receipt) => {
                tracing::info!(
                    device = %sample.device,
                    intrusion = flag.as_u8(),
                    "Logged {} (TX: {})",
                    flag,
                    receipt.short_hash()
                );
                CycleOutcome::Submitted { tx_hash: receipt.tx_hash }
            }
            Err(e) => {
                tracing::error!(device = %sample.device, "Dropped event: {}", e);
                CycleOutcome::Dropped
            }
        }
    }

    /// Run until `shutdown` turns true or `max_cycles` is reached.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> LoopReport {
        let mut report = LoopReport::default();
        tracing::info!(
            "Ingestion loop started ({} samples, interval {:?}..={:?})",
            self.pool.len(),
            self.jitter.min,
            self.jitter.max
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = self.run_cycle().await;
            report.record(&outcome);

            if self.max_cycles.map_or(false, |max| report.cycles >= max) {
                break;
            }

            self.state = LoopState::Waiting;
            let pause = self.jitter.draw(&mut self.rng);
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = shutdown.changed() => {
                    // Sender gone: finish the pause, the loop is no longer cancellable.
                    if changed.is_err() && !*shutdown.borrow() {
                        tokio::time::sleep(pause).await;
                    }
                }
            }
        }

        self.state = LoopState::Cancelled;
        tracing::info!(
            "Ingestion loop stopped after {} cycles ({} submitted, {} dropped, {} unclassified)",
            report.cycles,
            report.submitted,
            report.dropped,
            report.unclassified
        );
        report
    }
}
