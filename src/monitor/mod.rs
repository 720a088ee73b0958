//! Ingestion side: samples, classifiers, submitters and the loop tying them together

pub mod classifier;
pub mod ingest;
pub mod samples;
pub mod submitter;

use std::sync::Arc;

pub use classifier::{Classifier, ClassifierError, LabelReplay, ThresholdModel};
pub use ingest::{CycleOutcome, IngestionLoop, Jitter, LoopReport, LoopState};
pub use samples::{FeatureSchema, PredictionSample, SampleError, SamplePool};
pub use submitter::{EventSubmitter, HttpSubmitter, SubmitError};

use crate::config::MonitorConfig;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("sample pool {path}: {source}")]
    Samples {
        path: String,
        #[source]
        source: SampleError,
    },

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("no MODEL_PATH set and the sample pool has no intrusion_label column to replay")]
    NoClassifier,
}

/// Load the pool and pick a classifier, then assemble the loop.
pub fn build_loop(
    config: &MonitorConfig,
    submitter: Arc<dyn EventSubmitter>,
) -> Result<IngestionLoop, MonitorError> {
    let pool = SamplePool::load(&config.sample_path).map_err(|source| MonitorError::Samples {
        path: config.sample_path.display().to_string(),
        source,
    })?;
    tracing::info!(
        "Loaded {} samples with {} features from {}",
        pool.len(),
        pool.schema().len(),
        config.sample_path.display()
    );

    let classifier: Arc<dyn Classifier> = match &config.model_path {
        Some(path) => {
            tracing::info!("Using threshold model from {}", path.display());
            Arc::new(ThresholdModel::load(path, pool.schema())?)
        }
        None if pool.has_labels() => {
            tracing::info!("No model configured, replaying recorded labels");
            Arc::new(LabelReplay)
        }
        None => return Err(MonitorError::NoClassifier),
    };

    let jitter = Jitter::new(config.min_interval, config.max_interval);
    let mut ingest = IngestionLoop::new(pool, classifier, submitter, jitter)
        .with_max_cycles(config.max_cycles);
    if let Some(seed) = config.seed {
        ingest = ingest.with_seed(seed);
    }

    Ok(ingest)
}
