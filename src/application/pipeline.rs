//! Feature stage and cluster stage, wired together.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::application::clustering::selector::ClusterSelector;
use crate::application::clustering::standardizer::Standardizer;
use crate::application::features::aggregator::{Aggregation, FeatureAggregator};
use crate::application::features::extractor::MonthlyFeatureExtractor;
use crate::application::reporting::projection::project;
use crate::application::reporting::summary::ClusterReport;
use crate::config::PipelineConfig;
use crate::domain::clustering::{ClusterSelection, ClusteredRecord};
use crate::domain::features::{FEATURE_NAMES, FeatureTable};
use crate::domain::ports::ArchiveSource;
use crate::domain::run_log::{ExcludedRow, RunLog};

/// Result of the cluster stage.
#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    /// Every feature row, in table order. Excluded rows carry no cluster.
    pub records: Vec<ClusteredRecord>,
    pub selection: ClusterSelection,
    pub scaler: Standardizer,
    pub report: ClusterReport,
    pub run_log: RunLog,
}

pub struct RegimePipeline {
    config: PipelineConfig,
}

impl RegimePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Builds the feature table of `symbols`, one symbol in memory per worker.
    pub fn extract_features(&self, archive: &dyn ArchiveSource, symbols: &[String]) -> Aggregation {
        let extractor = MonthlyFeatureExtractor::new(&self.config);
        FeatureAggregator::new(extractor, self.config.parallel).aggregate(archive, symbols)
    }

    /// Standardizes the finite rows, selects k and labels every row.
    pub fn cluster(&self, table: &FeatureTable) -> Result<ClusterOutcome> {
        let mut run_log = RunLog::default();
        let (kept, excluded) = table.partition_finite();
        for &i in &excluded {
            let record = &table.records()[i];
            let non_finite: Vec<String> = record
                .non_finite_features()
                .into_iter()
                .map(String::from)
                .collect();
            warn!(
                "{} {} left out of clustering, non-finite: {:?}",
                record.symbol, record.month, non_finite
            );
            run_log.excluded_rows.push(ExcludedRow {
                symbol: record.symbol.clone(),
                month: record.month.clone(),
                non_finite,
            });
        }
        info!(
            "Clustering {} of {} feature rows",
            kept.len(),
            table.len()
        );

        let matrix = table.feature_matrix(&kept);
        let (scaler, scaled) = Standardizer::fit_transform(&matrix, FEATURE_NAMES)
            .context("Failed to standardize feature matrix")?;

        let selection = ClusterSelector::new(&self.config)
            .select(&scaled)
            .context("Cluster selection failed")?;
        run_log
            .infeasible_candidates
            .extend(selection.infeasible.iter().cloned());

        let projection = match project(&scaled) {
            Ok(points) => Some(points),
            Err(e) => {
                warn!("Projection skipped: {:#}", e);
                None
            }
        };

        let mut assignment: Vec<Option<(usize, Option<[f64; 2]>)>> = vec![None; table.len()];
        for (position, &row) in kept.iter().enumerate() {
            let point = projection.as_ref().map(|points| points[position]);
            assignment[row] = Some((selection.labels[position], point));
        }
        let records = table
            .records()
            .iter()
            .zip(&assignment)
            .map(|(record, slot)| match slot {
                Some((label, point)) => ClusteredRecord::from_record(record, Some(*label), *point),
                None => ClusteredRecord::from_record(record, None, None),
            })
            .collect();

        let clustered: Vec<_> = kept.iter().map(|&i| &table.records()[i]).collect();
        let report = ClusterReport::build(&clustered, &selection, &scaler, excluded.len())
            .context("Failed to build cluster report")?;

        Ok(ClusterOutcome {
            records,
            selection,
            scaler,
            report,
            run_log,
        })
    }
}
