//! JSON success envelopes, one shape per endpoint family

use crate::batch::BatchItemResult;
use crate::processor::{RemovalOutcome, TransformOutcome, UploadOutcome};
use instant::Duration;
use serde::{Deserialize, Serialize};

/// Render a duration the way the API reports timings: `"<n>ms"`
#[must_use]
pub fn format_millis(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}

/// Size reduction as a whole percentage, `round((original - processed) / original * 100)`
#[must_use]
pub fn reduction_percent(original: usize, processed: usize) -> String {
    if original == 0 {
        return "0%".to_string();
    }
    let reduction = (original as f64 - processed as f64) / original as f64 * 100.0;
    format!("{}%", reduction.round() as i64)
}

/// Savings with two decimals, negative when the output grew
#[must_use]
pub fn savings_percent(original: usize, optimized: usize) -> String {
    if original == 0 {
        return "0.00%".to_string();
    }
    let savings = (original as f64 - optimized as f64) / original as f64 * 100.0;
    format!("{savings:.2}%")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    pub path: String,
    pub message: String,
}

impl From<UploadOutcome> for UploadResponse {
    fn from(outcome: UploadOutcome) -> Self {
        Self {
            success: true,
            filename: outcome.artifact.file_name,
            path: outcome.artifact.public_path,
            message: "Image uploaded successfully".to_string(),
        }
    }
}

/// Generic `{success, path, message}` envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactResponse {
    pub success: bool,
    pub path: String,
    pub message: String,
}

impl ArtifactResponse {
    #[must_use]
    pub fn new<S: Into<String>>(outcome: &TransformOutcome, message: S) -> Self {
        Self {
            success: true,
            path: outcome.artifact.public_path.clone(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalMetrics {
    pub total_time: String,
    pub preprocessing: String,
    pub background_removal: String,
    pub cleanup: String,
}

/// Local tool removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalResponse {
    pub success: bool,
    pub path: String,
    pub message: String,
    pub metrics: RemovalMetrics,
}

impl From<RemovalOutcome> for RemovalResponse {
    fn from(outcome: RemovalOutcome) -> Self {
        Self {
            success: true,
            path: outcome.artifact.public_path,
            message: "Background removed successfully".to_string(),
            metrics: RemovalMetrics {
                total_time: format_millis(outcome.total),
                preprocessing: format_millis(outcome.timings.preprocessing),
                background_removal: format_millis(outcome.timings.removal),
                cleanup: format_millis(outcome.timings.cleanup),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureStats {
    pub process_time: String,
    pub original_size: usize,
    pub processed_size: usize,
    pub reduction: String,
}

/// Azure removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureRemovalResponse {
    pub success: bool,
    pub path: String,
    pub message: String,
    pub stats: AzureStats,
}

impl From<RemovalOutcome> for AzureRemovalResponse {
    fn from(outcome: RemovalOutcome) -> Self {
        Self {
            success: true,
            path: outcome.artifact.public_path,
            message: "Background removed successfully with Azure".to_string(),
            stats: AzureStats {
                process_time: format_millis(outcome.total),
                original_size: outcome.original_size,
                processed_size: outcome.processed_size,
                reduction: reduction_percent(outcome.original_size, outcome.processed_size),
            },
        }
    }
}

/// PhotoRoom removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRoomRemovalResponse {
    pub success: bool,
    pub path: String,
    pub message: String,
    pub process_time: String,
    pub remaining_credits: Option<String>,
    pub model_version: Option<String>,
}

impl From<RemovalOutcome> for PhotoRoomRemovalResponse {
    fn from(outcome: RemovalOutcome) -> Self {
        Self {
            success: true,
            path: outcome.artifact.public_path,
            message: "Background removed successfully with PhotoRoom".to_string(),
            process_time: format_millis(outcome.total),
            remaining_credits: outcome.credits_remaining,
            model_version: outcome.model_version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeResponse {
    pub success: bool,
    pub path: String,
    pub original_size: usize,
    pub optimized_size: usize,
    pub savings: String,
    pub message: String,
}

impl From<TransformOutcome> for OptimizeResponse {
    fn from(outcome: TransformOutcome) -> Self {
        Self {
            success: true,
            path: outcome.artifact.public_path,
            original_size: outcome.original_size,
            optimized_size: outcome.processed_size,
            savings: savings_percent(outcome.original_size, outcome.processed_size),
            message: "Image optimized successfully".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub original_name: String,
    pub processed_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub success: bool,
    pub results: Vec<BatchEntry>,
    pub message: String,
}

impl From<Vec<BatchItemResult>> for BatchResponse {
    fn from(results: Vec<BatchItemResult>) -> Self {
        let message = format!("{} images processed successfully", results.len());
        Self {
            success: true,
            results: results
                .into_iter()
                .map(|r| BatchEntry {
                    original_name: r.original_name,
                    processed_path: r.processed_path,
                })
                .collect(),
            message,
        }
    }
}
