//! Pipeline Module
//! Runs Loader -> Cleaner -> Merger for one session and collects warnings.

use crate::config::AppConfig;
use crate::data::cleaner::{Cleaner, CoercionWarning, SchemaError};
use crate::data::loader::{LoadCache, LoadError};
use crate::data::merger::{MergeWarning, Merger};
use crate::data::model::EnrichedTable;
use polars::prelude::*;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Fatal pipeline failures. All of them concern the returns sheet.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("수익률 파일을 불러오는 데 실패했습니다: {0}")]
    Load(#[from] LoadError),
    #[error("수익률 파일 형식이 올바르지 않습니다: {0}")]
    Schema(#[from] SchemaError),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Non-fatal problems surfaced next to the rendered views.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineWarning {
    /// Fee sheet missing or unreadable; fee views are disabled.
    FeeUnavailable(String),
    Coercion(CoercionWarning),
    Merge(MergeWarning),
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::FeeUnavailable(reason) => {
                write!(f, "수수료 데이터를 사용할 수 없습니다: {}", reason)
            }
            PipelineWarning::Coercion(w) => write!(f, "{}", w),
            PipelineWarning::Merge(w) => write!(f, "{}", w),
        }
    }
}

/// A completed pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub table: EnrichedTable,
    pub warnings: Vec<PipelineWarning>,
}

/// Orchestrates a full load/clean/merge pass.
pub struct Pipeline;

impl Pipeline {
    /// Run the pipeline for `returns_path`, reading fees from the configured path.
    pub fn run(
        cache: &mut LoadCache,
        config: &AppConfig,
        returns_path: &Path,
    ) -> Result<PipelineOutcome, PipelineError> {
        let raw_returns = cache.load(returns_path, config.returns_header_row)?;
        let cleaned_returns = Cleaner::clean_returns(&raw_returns)?;
        info!(
            raw = raw_returns.height(),
            cleaned = cleaned_returns.df.height(),
            "returns sheet ready"
        );

        let mut warnings: Vec<PipelineWarning> = cleaned_returns
            .warnings
            .into_iter()
            .map(PipelineWarning::Coercion)
            .collect();

        let fees = match Self::load_fees(cache, config) {
            Ok(cleaned) => {
                warnings.extend(cleaned.warnings.into_iter().map(PipelineWarning::Coercion));
                Some(cleaned.df)
            }
            Err(reason) => {
                warn!(%reason, "fee sheet unavailable");
                warnings.push(PipelineWarning::FeeUnavailable(reason));
                None
            }
        };

        let merged = Merger::merge(cleaned_returns.df, fees.as_ref())?;
        warnings.extend(merged.warning.map(PipelineWarning::Merge));

        Ok(PipelineOutcome {
            table: merged.table,
            warnings,
        })
    }

    /// Fee failures of any kind degrade to "no fee data".
    fn load_fees(
        cache: &mut LoadCache,
        config: &AppConfig,
    ) -> Result<crate::data::cleaner::Cleaned, String> {
        let raw = cache
            .load(&config.fee_path, config.fee_header_row)
            .map_err(|e| e.to_string())?;
        Cleaner::clean_fees(&raw).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{NET_EFFICIENCY, RETURN_3Y};
    use std::fs;
    use tempfile::TempDir;

    fn preamble(lines: usize) -> String {
        (0..lines).map(|i| format!("meta {}\n", i)).collect()
    }

    fn write_returns(dir: &TempDir, rows: &str) -> std::path::PathBuf {
        let path = dir.path().join("returns.csv");
        let mut body = preamble(7);
        body.push_str("사업자명,원리금구분,적립금,1년,3년,5년,7년,10년\n");
        body.push_str(rows);
        fs::write(&path, body).unwrap();
        path
    }

    fn write_fees(dir: &TempDir, rows: &str) -> std::path::PathBuf {
        let path = dir.path().join("fees.csv");
        let mut body = preamble(8);
        body.push_str("사업자명,제도,운용관리,자산관리,펀드,총비용부담률\n");
        body.push_str(rows);
        fs::write(&path, body).unwrap();
        path
    }

    fn config_for(fee_path: std::path::PathBuf) -> AppConfig {
        AppConfig {
            fee_path,
            ..AppConfig::default()
        }
    }

    const RETURN_ROWS: &str = "\
A,원리금보장형,\"1,000\",2.50,-,-,-,-
A,합계,\"1,000\",2.50,-,-,-,-
B,원리금비보장형,500,4.00,3.1,-,-,-
";

    #[test]
    fn full_run_with_fees() {
        let dir = TempDir::new().unwrap();
        let returns = write_returns(&dir, RETURN_ROWS);
        let fees = write_fees(&dir, "A,DB,0.1,0.1,0.2,0.40\n합계,DB,0.1,0.1,0.2,0.4\n");
        let mut cache = LoadCache::new();

        let outcome = Pipeline::run(&mut cache, &config_for(fees), &returns).unwrap();
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.table.height(), 2);
        assert!(outcome.table.has_fee_data());

        let records = outcome.table.records();
        assert_eq!(records[0].net_efficiency, Some(2.5 - 0.4));
        assert_eq!(records[1].net_efficiency, None);
        assert_eq!(records[1].base.return_3y, Some(3.1));
    }

    #[test]
    fn missing_fee_file_degrades() {
        let dir = TempDir::new().unwrap();
        let returns = write_returns(&dir, RETURN_ROWS);
        let mut cache = LoadCache::new();

        let outcome =
            Pipeline::run(&mut cache, &config_for(dir.path().join("nope.csv")), &returns).unwrap();
        assert!(!outcome.table.has_column(NET_EFFICIENCY));
        assert!(matches!(
            outcome.warnings.as_slice(),
            [PipelineWarning::FeeUnavailable(_)]
        ));
    }

    #[test]
    fn missing_returns_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut cache = LoadCache::new();
        let err = Pipeline::run(
            &mut cache,
            &AppConfig::default(),
            &dir.path().join("absent.csv"),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Load(LoadError::NotFound(_))));
    }

    #[test]
    fn coercion_warnings_are_collected() {
        let dir = TempDir::new().unwrap();
        let returns = write_returns(&dir, "A,원리금보장형,100,1.0,bad,-,-,-\n");
        let mut cache = LoadCache::new();

        let outcome =
            Pipeline::run(&mut cache, &config_for(dir.path().join("nope.csv")), &returns).unwrap();
        assert!(outcome.warnings.iter().any(|w| matches!(
            w,
            PipelineWarning::Coercion(c) if c.column == RETURN_3Y
        )));
    }
}
