//! Pipeline driver.

use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;

use liftmetrics_analyze::{
    BrakeAnalyzer, DoorAnalyzer, FloorTravelAnalyzer, LiftAnalyzer, LoadedLift, ModeAggregator,
    RowDedupSummary, RowDeduper,
};
use liftmetrics_core::{FileWarning, LiftDataset, LiftError, PipelineConfig, group_by_lift};
use liftmetrics_scan::{DedupReport, DigestIndex, FileDeduper, discover_logs};

use crate::artifact::{Artifact, ArtifactWriter, MetricFamily};
use crate::stage::{Pipeline, Stage};

/// Everything a run did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Stages that ran, in order.
    pub stages: Vec<Stage>,
    /// File deduplication results, when that stage ran.
    pub dedup: Option<DedupReport>,
    /// Row deduplication results, when that stage ran.
    pub rows: Option<RowDedupSummary>,
    /// Lifts that went through per-lift analytics.
    pub lifts_analyzed: usize,
    /// Artifacts written, grouped by lift.
    pub artifacts: Vec<Artifact>,
    /// Non-fatal problems from every stage.
    pub warnings: Vec<FileWarning>,
    pub duration: Duration,
}

impl RunSummary {
    /// Check if anything was skipped.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
            || self.dedup.as_ref().is_some_and(|d| !d.warnings.is_empty())
            || self.rows.as_ref().is_some_and(|r| !r.warnings.is_empty())
    }
}

/// Artifacts and warnings of one lift.
struct LiftOutcome {
    artifacts: Vec<Artifact>,
    warnings: Vec<FileWarning>,
}

/// Executes a [`Pipeline`] against a [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    config: PipelineConfig,
    pipeline: Pipeline,
}

impl PipelineRunner {
    /// Create a runner. The configuration is validated up front.
    pub fn new(config: PipelineConfig, pipeline: Pipeline) -> Result<Self, LiftError> {
        config.validate()?;
        Ok(Self { config, pipeline })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run every stage with a fresh digest index.
    pub fn run(&self) -> Result<RunSummary, LiftError> {
        self.run_with_index(&DigestIndex::new())
    }

    /// Run every stage, deduplicating files against `index`.
    pub fn run_with_index(&self, index: &DigestIndex) -> Result<RunSummary, LiftError> {
        let start = Instant::now();
        let mut summary = RunSummary {
            stages: self.pipeline.stages().to_vec(),
            ..RunSummary::default()
        };
        let writer = ArtifactWriter::new(self.config.output_path());

        if self.pipeline.contains(Stage::FileDedup) {
            let raw = self.config.raw_path();
            tracing::info!(root = %raw.display(), "stage: file-dedup");
            let deduper = FileDeduper::from_config(&self.config)?;
            summary.dedup = Some(deduper.dedup(&raw, index)?);
        }

        if self.pipeline.contains(Stage::RowDedup) {
            let (raw, clean) = (self.config.raw_path(), self.config.clean_path());
            tracing::info!(input = %raw.display(), output = %clean.display(), "stage: row-dedup");
            let deduper = RowDeduper::with_config((&self.config).into());
            summary.rows = Some(deduper.process_tree(&raw, &clean)?);
        }

        if self.pipeline.has_per_lift() {
            let datasets = self.lift_datasets(&mut summary.warnings)?;
            summary.lifts_analyzed = datasets.len();

            let outcomes: Vec<LiftOutcome> = if self.config.parallel_lifts {
                datasets
                    .par_iter()
                    .map(|dataset| self.analyze_lift(dataset, &writer))
                    .collect::<Result<_, _>>()?
            } else {
                datasets
                    .iter()
                    .map(|dataset| self.analyze_lift(dataset, &writer))
                    .collect::<Result<_, _>>()?
            };

            for outcome in outcomes {
                summary.artifacts.extend(outcome.artifacts);
                summary.warnings.extend(outcome.warnings);
            }
        }

        if self.pipeline.contains(Stage::Mode) {
            tracing::info!("stage: mode");
            self.aggregate_modes(&writer, &mut summary)?;
        }

        summary.duration = start.elapsed();
        tracing::info!(
            lifts = summary.lifts_analyzed,
            artifacts = summary.artifacts.len(),
            warnings = summary.warnings.len(),
            "pipeline finished"
        );
        Ok(summary)
    }

    /// Group the clean tree into lift datasets.
    fn lift_datasets(&self, warnings: &mut Vec<FileWarning>) -> Result<Vec<LiftDataset>, LiftError> {
        let clean = self.config.clean_path();
        let discovered = discover_logs(&clean, &self.config.file_matcher()?)?;
        warnings.extend(discovered.warnings);

        let grouping = group_by_lift(&discovered.files);
        warnings.extend(grouping.warnings);
        tracing::info!(
            lifts = grouping.datasets.len(),
            files = discovered.files.len(),
            "grouped logs by lift"
        );
        Ok(grouping.datasets)
    }

    /// Load one lift's tables once and run every selected per-lift stage on them.
    fn analyze_lift(&self, dataset: &LiftDataset, writer: &ArtifactWriter) -> Result<LiftOutcome, LiftError> {
        let lift = LoadedLift::load(dataset)?;
        tracing::info!(lift = %lift.lift, files = lift.tables.len(), "analyzing lift");

        let mut outcome = LiftOutcome {
            artifacts: Vec::new(),
            warnings: lift.warnings.clone(),
        };

        if self.pipeline.contains(Stage::Brake) {
            let analysis = BrakeAnalyzer::from_config(&self.config).analyze_lift(&lift)?;
            outcome.warnings.extend(analysis.warnings);
            outcome
                .artifacts
                .push(writer.write(MetricFamily::Brake, &lift.lift, &analysis.report)?);
        }

        if self.pipeline.contains(Stage::Door) {
            let analysis = DoorAnalyzer::from_config(&self.config).analyze_lift(&lift)?;
            outcome.warnings.extend(analysis.warnings);
            outcome
                .artifacts
                .push(writer.write(MetricFamily::Door, &lift.lift, &analysis.report)?);
        }

        let floors = self.pipeline.contains(Stage::FloorCount);
        let mileage = self.pipeline.contains(Stage::Mileage);
        if floors || mileage {
            let analyzer = FloorTravelAnalyzer::from_config(&self.config);
            let analysis = analyzer.analyze_lift(&lift)?;
            outcome.warnings.extend(analysis.warnings);
            if floors {
                outcome.artifacts.push(writer.write(
                    MetricFamily::FloorCount,
                    &lift.lift,
                    &analysis.report.floors,
                )?);
            }
            if mileage {
                outcome.artifacts.push(writer.write(
                    MetricFamily::Mileage,
                    &lift.lift,
                    &analysis.report.mileage,
                )?);
            }
        }

        Ok(outcome)
    }

    /// Derive a mode artifact from every floor count artifact on disk.
    fn aggregate_modes(&self, writer: &ArtifactWriter, summary: &mut RunSummary) -> Result<(), LiftError> {
        let aggregator = ModeAggregator::new(&self.config.mode);
        let sources = writer.list(MetricFamily::FloorCount)?;
        if sources.is_empty() {
            let err = LiftError::NoDataForAggregation {
                context: "no floor count artifacts".to_string(),
            };
            tracing::warn!(error = %err, "skipping mode stage");
            summary
                .warnings
                .push(FileWarning::from_error(writer.family_dir(MetricFamily::FloorCount), &err));
            return Ok(());
        }

        for (lift, path) in sources {
            match aggregator.aggregate_file(&path) {
                Ok((report, warnings)) => {
                    summary.warnings.extend(warnings);
                    summary
                        .artifacts
                        .push(writer.write(MetricFamily::Mode, &lift, &report)?);
                }
                Err(err) if err.is_recoverable() => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping floor count artifact");
                    summary.warnings.push(FileWarning::from_error(&path, &err));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}
