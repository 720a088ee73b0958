//! Verdicts for drawn samples

use serde::Deserialize;
use std::path::Path;

use super::samples::{FeatureSchema, PredictionSample};
use crate::models::IntrusionFlag;

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("could not read model at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("model file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model expects feature '{0}' which the sample data does not have")]
    MissingFeature(String),

    #[error("model has {features} features but {weights} weights")]
    ShapeMismatch { features: usize, weights: usize },

    #[error("sample has {found} features, expected {expected}")]
    SampleShape { expected: usize, found: usize },

    #[error("model produced a non-finite score")]
    NonFinite,

    #[error("sample has no recorded label")]
    NoLabel,

    #[error("unusable label: {0}")]
    BadLabel(String),
}

pub trait Classifier: Send + Sync {
    fn predict(&self, sample: &PredictionSample) -> Result<IntrusionFlag, ClassifierError>;
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    features: Vec<String>,
    weights: Vec<f64>,
    bias: f64,
    #[serde(default = "default_threshold")]
    threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

/// Logistic model bound to a pool's feature columns.
#[derive(Debug, Clone)]
pub struct ThresholdModel {
    /// (column index in the sample, weight)
    terms: Vec<(usize, f64)>,
    width: usize,
    bias: f64,
    threshold: f64,
}

impl ThresholdModel {
    pub fn load(path: &Path, schema: &FeatureSchema) -> Result<Self, ClassifierError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ClassifierError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw, schema)
    }

    pub fn from_json(raw: &str, schema: &FeatureSchema) -> Result<Self, ClassifierError> {
        let model: ModelFile = serde_json::from_str(raw)?;

        if model.features.len() != model.weights.len() {
            return Err(ClassifierError::ShapeMismatch {
                features: model.features.len(),
                weights: model.weights.len(),
            });
        }

        let terms = model
            .features
            .iter()
            .zip(&model.weights)
            .map(|(name, weight)| {
                schema
                    .index_of(name)
                    .map(|i| (i, *weight))
                    .ok_or_else(|| ClassifierError::MissingFeature(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            terms,
            width: schema.len(),
            bias: model.bias,
            threshold: model.threshold,
        })
    }

    pub fn score(&self, sample: &PredictionSample) -> Result<f64, ClassifierError> {
        if sample.features.len() != self.width {
            return Err(ClassifierError::SampleShape {
                expected: self.width,
                found: sample.features.len(),
            });
        }

        let z = self.terms.iter().fold(self.bias, |acc, (i, w)| acc + w * sample.features[*i]);
        let score = 1.0 / (1.0 + (-z).exp());

        if score.is_finite() {
            Ok(score)
        } else {
            Err(ClassifierError::NonFinite)
        }
    }
}

impl Classifier for ThresholdModel {
    fn predict(&self, sample: &PredictionSample) -> Result<IntrusionFlag, ClassifierError> {
        let score = self.score(sample)?;
        Ok(if score >= self.threshold {
            IntrusionFlag::Malicious
        } else {
            IntrusionFlag::Benign
        })
    }
}

/// Replays the label recorded with each sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelReplay;

impl Classifier for LabelReplay {
    fn predict(&self, sample: &PredictionSample) -> Result<IntrusionFlag, ClassifierError> {
        let label = sample.label.as_deref().ok_or(ClassifierError::NoLabel)?;
        IntrusionFlag::from_prediction(label).map_err(|e| ClassifierError::BadLabel(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(vec!["pkt_rate".to_string(), "mean_size".to_string()])
    }

    fn sample(features: Vec<f64>, label: Option<&str>) -> PredictionSample {
        PredictionSample {
            device: "Cam".to_string(),
            features,
            label: label.map(str::to_string),
        }
    }

    const MODEL: &str = r#"{"features": ["mean_size", "pkt_rate"], "weights": [0.0, 1.0], "bias": -10.0}"#;

    #[test]
    fn test_threshold_model_binds_by_name() {
        let model = ThresholdModel::from_json(MODEL, &schema()).unwrap();

        assert_eq!(model.predict(&sample(vec![50.0, 1.0], None)).unwrap(), IntrusionFlag::Malicious);
        assert_eq!(model.predict(&sample(vec![1.0, 50.0], None)).unwrap(), IntrusionFlag::Benign);
        assert!((model.score(&sample(vec![10.0, 0.0], None)).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_model_custom_threshold() {
        let raw = r#"{"features": ["pkt_rate"], "weights": [1.0], "bias": 0.0, "threshold": 0.9}"#;
        let model = ThresholdModel::from_json(raw, &schema()).unwrap();

        assert_eq!(model.predict(&sample(vec![1.0, 0.0], None)).unwrap(), IntrusionFlag::Benign);
        assert_eq!(model.predict(&sample(vec![5.0, 0.0], None)).unwrap(), IntrusionFlag::Malicious);
    }

    #[test]
    fn test_threshold_model_rejects_unknown_feature() {
        let raw = r#"{"features": ["jitter"], "weights": [1.0], "bias": 0.0}"#;
        let err = ThresholdModel::from_json(raw, &schema()).unwrap_err();
        assert!(matches!(err, ClassifierError::MissingFeature(name) if name == "jitter"));
    }

    #[test]
    fn test_threshold_model_rejects_bad_shapes() {
        let raw = r#"{"features": ["pkt_rate"], "weights": [1.0, 2.0], "bias": 0.0}"#;
        assert!(matches!(
            ThresholdModel::from_json(raw, &schema()),
            Err(ClassifierError::ShapeMismatch { features: 1, weights: 2 })
        ));

        let model = ThresholdModel::from_json(MODEL, &schema()).unwrap();
        assert!(matches!(
            model.predict(&sample(vec![1.0], None)),
            Err(ClassifierError::SampleShape { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_non_finite_score_is_an_error() {
        let model = ThresholdModel::from_json(MODEL, &schema()).unwrap();
        assert!(matches!(
            model.predict(&sample(vec![f64::NAN, 0.0], None)),
            Err(ClassifierError::NonFinite)
        ));
    }

    #[test]
    fn test_label_replay() {
        let replay = LabelReplay;

        assert_eq!(replay.predict(&sample(vec![], Some("1"))).unwrap(), IntrusionFlag::Malicious);
        assert_eq!(replay.predict(&sample(vec![], Some("0"))).unwrap(), IntrusionFlag::Benign);
        assert_eq!(
            replay.predict(&sample(vec![], Some("Mirai_UDP_Attack"))).unwrap(),
            IntrusionFlag::Malicious
        );
        assert_eq!(replay.predict(&sample(vec![], Some("benign"))).unwrap(), IntrusionFlag::Benign);
        assert!(matches!(replay.predict(&sample(vec![], Some("2"))), Err(ClassifierError::BadLabel(_))));
        assert!(matches!(replay.predict(&sample(vec![], None)), Err(ClassifierError::NoLabel)));
        assert!(matches!(
            replay.predict(&sample(vec![], Some("NaN"))),
            Err(ClassifierError::BadLabel(msg)) if msg.contains("'NaN'")
        ));
    }
}
