//! Runtime configuration, loaded from JSON.
//!
//! Every field has a default so an empty object is a valid config. The
//! numeric thresholds are tuning values carried over from intake practice
//! rather than derived constants; they stay configurable so tests can pin
//! them down.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Files above this size are rejected in automatic mode.
    #[serde(default = "default_max_auto_size_bytes")]
    pub max_auto_size_bytes: u64,
    /// Page budget per run when processing was triggered automatically.
    #[serde(default = "default_max_pages")]
    pub max_pages_auto: u32,
    /// Page budget per run when the user asked for processing explicitly.
    #[serde(default = "default_max_pages")]
    pub max_pages_manual: u32,
    /// Raster scale for PDF pages handed to OCR.
    #[serde(default = "default_pdf_scale")]
    pub pdf_scale: f32,
    /// Native PDF text at or above this length skips rasterized OCR.
    #[serde(default = "default_min_native_text_chars")]
    pub min_native_text_chars: usize,
    /// Combined text under this length is flagged unreadable.
    #[serde(default = "default_min_readable_chars")]
    pub min_readable_chars: usize,
    /// Languages handed to the OCR engine.
    #[serde(default = "default_ocr_languages")]
    pub ocr_languages: Vec<String>,
}

fn default_max_auto_size_bytes() -> u64 {
    15 * 1024 * 1024
}

fn default_max_pages() -> u32 {
    15
}

fn default_pdf_scale() -> f32 {
    1.6
}

fn default_min_native_text_chars() -> usize {
    200
}

fn default_min_readable_chars() -> usize {
    40
}

fn default_ocr_languages() -> Vec<String> {
    vec!["eng".to_string()]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_auto_size_bytes: default_max_auto_size_bytes(),
            max_pages_auto: default_max_pages(),
            max_pages_manual: default_max_pages(),
            pdf_scale: default_pdf_scale(),
            min_native_text_chars: default_min_native_text_chars(),
            min_readable_chars: default_min_readable_chars(),
            ocr_languages: default_ocr_languages(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileConfig {
    /// Extraction confidence required before a numeric comparison may flag.
    #[serde(default = "default_min_field_confidence")]
    pub min_field_confidence: f32,
    /// Overall OCR confidence in (0, cutoff) is flagged as low confidence.
    #[serde(default = "default_low_confidence_cutoff")]
    pub low_confidence_cutoff: f32,
    /// Relative difference beyond which gross pay conflicts.
    #[serde(default = "default_gross_pay_tolerance")]
    pub gross_pay_tolerance: f64,
    /// Relative difference beyond which YTD income conflicts.
    #[serde(default = "default_ytd_tolerance")]
    pub ytd_tolerance: f64,
}

fn default_min_field_confidence() -> f32 {
    0.6
}

fn default_low_confidence_cutoff() -> f32 {
    0.6
}

fn default_gross_pay_tolerance() -> f64 {
    0.15
}

fn default_ytd_tolerance() -> f64 {
    0.2
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            min_field_confidence: default_min_field_confidence(),
            low_confidence_cutoff: default_low_confidence_cutoff(),
            gross_pay_tolerance: default_gross_pay_tolerance(),
            ytd_tolerance: default_ytd_tolerance(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Where the durable snapshot lives. `None` keeps results in memory only.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
    /// Raw text is truncated to this many characters on every write.
    #[serde(default = "default_max_raw_text_chars")]
    pub max_raw_text_chars: usize,
    /// Quiet period before a dirty store is mirrored to disk.
    #[serde(default = "default_persist_debounce_ms")]
    pub persist_debounce_ms: u64,
}

fn default_max_raw_text_chars() -> usize {
    50_000
}

fn default_persist_debounce_ms() -> u64 {
    180
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            max_raw_text_chars: default_max_raw_text_chars(),
            persist_debounce_ms: default_persist_debounce_ms(),
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<IntakeConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<IntakeConfig, ConfigError> {
    let config: IntakeConfig = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &IntakeConfig) -> Result<(), ConfigError> {
    if config.pipeline.max_pages_auto == 0 || config.pipeline.max_pages_manual == 0 {
        return Err(ConfigError::Validation {
            message: "page budgets must be at least 1".to_string(),
        });
    }
    if config.pipeline.pdf_scale <= 0.0 {
        return Err(ConfigError::Validation {
            message: format!("pdfScale must be positive, got {}", config.pipeline.pdf_scale),
        });
    }
    if config.pipeline.ocr_languages.is_empty() {
        return Err(ConfigError::Validation {
            message: "ocrLanguages must name at least one language".to_string(),
        });
    }
    if !(0.0..=1.0).contains(&config.reconcile.min_field_confidence)
        || !(0.0..=1.0).contains(&config.reconcile.low_confidence_cutoff)
    {
        return Err(ConfigError::Validation {
            message: "confidence cutoffs must lie in 0..=1".to_string(),
        });
    }
    if config.reconcile.gross_pay_tolerance <= 0.0 || config.reconcile.ytd_tolerance <= 0.0 {
        return Err(ConfigError::Validation {
            message: "conflict tolerances must be positive".to_string(),
        });
    }
    if config.store.max_raw_text_chars == 0 {
        return Err(ConfigError::Validation {
            message: "maxRawTextChars must be at least 1".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_yields_defaults() {
        let config = load_config_from_str("{}").unwrap();
        assert_eq!(config, IntakeConfig::default());
        assert_eq!(config.pipeline.max_auto_size_bytes, 15 * 1024 * 1024);
        assert_eq!(config.pipeline.max_pages_auto, 15);
        assert_eq!(config.reconcile.gross_pay_tolerance, 0.15);
        assert_eq!(config.store.max_raw_text_chars, 50_000);
        assert_eq!(config.store.persist_debounce_ms, 180);
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let config = load_config_from_str(
            r#"{"pipeline": {"maxPagesAuto": 5}, "reconcile": {"ytdTolerance": 0.5}}"#,
        )
        .unwrap();
        assert_eq!(config.pipeline.max_pages_auto, 5);
        assert_eq!(config.pipeline.max_pages_manual, 15);
        assert_eq!(config.reconcile.ytd_tolerance, 0.5);
        assert_eq!(config.reconcile.gross_pay_tolerance, 0.15);
    }

    #[test]
    fn test_rejects_zero_page_budget() {
        let err = load_config_from_str(r#"{"pipeline": {"maxPagesAuto": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_rejects_out_of_range_confidence() {
        let err =
            load_config_from_str(r#"{"reconcile": {"minFieldConfidence": 1.5}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = load_config_from_str("not json").unwrap_err();
        assert!(matches!(err, ConfigError::ParseJson(_)));
    }

    #[test]
    fn test_load_config_reports_missing_file() {
        let err = load_config("/nonexistent/caseintake.json").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
