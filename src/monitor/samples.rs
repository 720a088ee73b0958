//! Sample pool the ingestion loop draws from

use rand::Rng;
use std::io;
use std::path::Path;

pub const DEVICE_COLUMN: &str = "device";
pub const LABEL_COLUMN: &str = "intrusion_label";
pub const UNKNOWN_DEVICE: &str = "Unknown_Device";

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("could not read sample data: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: column '{column}' is not numeric: '{value}'")]
    NotNumeric {
        row: usize,
        column: String,
        value: String,
    },
    #[error("sample data has no numeric feature columns")]
    NoFeatures,
    #[error("sample data has no rows")]
    Empty,
}

/// One traffic sample, consumed by a single ingestion cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSample {
    pub device: String,
    /// Values in [`FeatureSchema`] order
    pub features: Vec<f64>,
    /// Label recorded with the sample, if the pool has one
    pub label: Option<String>,
}

/// Names of the feature columns, in sample order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

pub struct SamplePool {
    schema: FeatureSchema,
    samples: Vec<PredictionSample>,
    has_labels: bool,
}

impl SamplePool {
    /// Load a CSV pool with a header row.
    ///
    /// `device` and `intrusion_label` are optional; every other column whose
    /// first value is numeric becomes a feature. Non-numeric columns are
    /// ignored.
    pub fn load(path: &Path) -> Result<Self, SampleError> {
        let reader = csv::Reader::from_path(path)?;
        Self::from_csv(reader)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, SampleError> {
        Self::from_csv(csv::Reader::from_reader(reader))
    }

    fn from_csv<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Self, SampleError> {
        let headers = reader.headers()?.clone();
        let device_col = headers.iter().position(|h| h == DEVICE_COLUMN);
        let label_col = headers.iter().position(|h| h == LABEL_COLUMN);

        let mut records = reader.records();
        let first = match records.next() {
            Some(record) => record?,
            None => return Err(SampleError::Empty),
        };

        let feature_cols: Vec<usize> = (0..headers.len())
            .filter(|i| Some(*i) != device_col && Some(*i) != label_col)
            .filter(|i| first.get(*i).map_or(false, |v| v.trim().parse::<f64>().is_ok()))
            .collect();

        if feature_cols.is_empty() {
            return Err(SampleError::NoFeatures);
        }

        let schema = FeatureSchema::new(
            feature_cols.iter().map(|i| headers[*i].to_string()).collect(),
        );

        let mut samples = Vec::new();
        for (row, record) in std::iter::once(Ok(first)).chain(records).enumerate() {
            let record = record?;

            let features = feature_cols
                .iter()
                .map(|i| {
                    let raw = record.get(*i).unwrap_or("").trim();
                    raw.parse::<f64>().map_err(|_| SampleError::NotNumeric {
                        row: row + 1,
                        column: headers[*i].to_string(),
                        value: raw.to_string(),
                    })
                })
                .collect::<Result<Vec<f64>, SampleError>>()?;

            let device = device_col
                .and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .unwrap_or(UNKNOWN_DEVICE)
                .to_string();

            let label = label_col
                .and_then(|i| record.get(i))
                .map(|l| l.trim().to_string());

            samples.push(PredictionSample { device, features, label });
        }

        if device_col.is_none() {
            tracing::warn!("'{}' column not found, using placeholder '{}'", DEVICE_COLUMN, UNKNOWN_DEVICE);
        }

        Ok(Self {
            schema,
            samples,
            has_labels: label_col.is_some(),
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn has_labels(&self) -> bool {
        self.has_labels
    }

    /// Uniform draw with replacement
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> &PredictionSample {
        &self.samples[rng.gen_range(0..self.samples.len())]
    }
}
