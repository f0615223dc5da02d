use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fetch_change::ChangeSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{ProcessorError, ProcessorResult};
use crate::registry::ProcessorProvider;
use crate::stage::{EntityPackage, Processor, ProcessorDecision, ProcessorRecord, Stage};

// ---------------------------------------------------------------------------
// PipelineReport
// ---------------------------------------------------------------------------

/// How a stage ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Every processor ran.
    Completed,
    /// A pre-stage processor vetoed the operation; later processors did not
    /// run.
    Cancelled { processor: String, reason: String },
}

/// The result of running one stage.
#[derive(Clone, Debug)]
pub struct PipelineReport {
    /// The stage that ran.
    pub stage: Stage,
    /// Completed or cancelled.
    pub outcome: PipelineOutcome,
    /// Per-processor results in invocation order.
    pub records: Vec<ProcessorRecord>,
    /// Total wall-clock time for the stage.
    pub elapsed: Duration,
}

impl PipelineReport {
    /// Returns `true` if a processor cancelled the stage.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome, PipelineOutcome::Cancelled { .. })
    }
}

// ---------------------------------------------------------------------------
// ProcessorPipeline
// ---------------------------------------------------------------------------

/// Runs the ordered processor list of each lifecycle stage.
///
/// Processors run strictly one after another in registration order. On a
/// pre-stage the first [`ProcessorDecision::Cancel`] stops the stage; on a
/// post-stage the storage mutation has already happened, so a cancel is
/// logged and ignored. Processor errors are never caught here.
pub struct ProcessorPipeline<T> {
    stages: HashMap<Stage, Vec<Arc<dyn Processor<T>>>>,
    config: PipelineConfig,
}

impl<T: Send + Sync> ProcessorPipeline<T> {
    /// Build a pipeline, resolving every stage from `provider` once.
    pub fn new(provider: &dyn ProcessorProvider<T>, config: PipelineConfig) -> Self {
        let stages = Stage::ALL
            .into_iter()
            .map(|stage| (stage, provider.processors(stage)))
            .collect();
        Self { stages, config }
    }

    /// A pipeline with no processors on any stage.
    pub fn empty() -> Self {
        Self {
            stages: HashMap::new(),
            config: PipelineConfig::default(),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Number of processors resolved for `stage`.
    pub fn processor_count(&self, stage: Stage) -> usize {
        self.processors(stage).len()
    }

    fn processors(&self, stage: Stage) -> &[Arc<dyn Processor<T>>] {
        self.stages.get(&stage).map_or(&[], Vec::as_slice)
    }

    /// Run the `Adding` stage.
    pub async fn adding(&self, entity: &T, cancel: &CancellationToken) -> ProcessorResult<PipelineReport> {
        let (report, _) = self.run(Stage::Adding, entity, None, cancel).await?;
        Ok(report)
    }

    /// Run the `Added` stage.
    pub async fn added(&self, entity: &T, cancel: &CancellationToken) -> ProcessorResult<PipelineReport> {
        let (report, _) = self.run(Stage::Added, entity, None, cancel).await?;
        Ok(report)
    }

    /// Run the `Updating` stage.
    ///
    /// Returns the report and the change set to persist: `changes`, or the
    /// last replacement a processor asked for.
    pub async fn updating(
        &self,
        entity: &T,
        changes: ChangeSet,
        cancel: &CancellationToken,
    ) -> ProcessorResult<(PipelineReport, ChangeSet)> {
        let (report, replaced) = self
            .run(Stage::Updating, entity, Some(&changes), cancel)
            .await?;
        Ok((report, replaced.unwrap_or(changes)))
    }

    /// Run the `Updated` stage.
    pub async fn updated(
        &self,
        entity: &T,
        changes: &ChangeSet,
        cancel: &CancellationToken,
    ) -> ProcessorResult<PipelineReport> {
        let (report, _) = self
            .run(Stage::Updated, entity, Some(changes), cancel)
            .await?;
        Ok(report)
    }

    /// Run the `Deleting` stage.
    pub async fn deleting(&self, entity: &T, cancel: &CancellationToken) -> ProcessorResult<PipelineReport> {
        let (report, _) = self.run(Stage::Deleting, entity, None, cancel).await?;
        Ok(report)
    }

    /// Run the `Deleted` stage.
    pub async fn deleted(&self, entity: &T, cancel: &CancellationToken) -> ProcessorResult<PipelineReport> {
        let (report, _) = self.run(Stage::Deleted, entity, None, cancel).await?;
        Ok(report)
    }

    async fn run(
        &self,
        stage: Stage,
        entity: &T,
        changes: Option<&ChangeSet>,
        cancel: &CancellationToken,
    ) -> ProcessorResult<(PipelineReport, Option<ChangeSet>)> {
        let stage_start = Instant::now();
        let mut records = Vec::new();
        let mut replaced: Option<ChangeSet> = None;

        if !self.config.enabled {
            let report = PipelineReport {
                stage,
                outcome: PipelineOutcome::Completed,
                records,
                elapsed: stage_start.elapsed(),
            };
            return Ok((report, None));
        }

        for processor in self.processors(stage) {
            if cancel.is_cancelled() {
                return Err(ProcessorError::Interrupted { stage });
            }

            let current = replaced.as_ref().or(changes);
            let package = EntityPackage::new(stage, entity, current)?;
            let started = Instant::now();
            let decision = self.invoke(processor.as_ref(), &package).await?;
            let elapsed = started.elapsed();

            let name = processor.name().to_string();
            debug!(%stage, processor = %name, decision = decision.kind(), ?elapsed, "processor finished");

            let mut record = ProcessorRecord {
                processor: name.clone(),
                decision: decision.kind(),
                reason: None,
                elapsed,
            };

            match decision {
                ProcessorDecision::Continue => records.push(record),
                ProcessorDecision::Cancel { reason } => {
                    record.reason = Some(reason.clone());
                    records.push(record);
                    if stage.is_pre() {
                        info!(%stage, processor = %name, %reason, "stage cancelled");
                        let report = PipelineReport {
                            stage,
                            outcome: PipelineOutcome::Cancelled {
                                processor: name,
                                reason,
                            },
                            records,
                            elapsed: stage_start.elapsed(),
                        };
                        return Ok((report, replaced));
                    }
                    warn!(%stage, processor = %name, %reason, "post-stage processor cannot cancel; ignored");
                }
                ProcessorDecision::ReplaceChanges(next) => {
                    if stage != Stage::Updating {
                        return Err(ProcessorError::InvalidDecision {
                            stage,
                            processor: name,
                            decision: "replace-changes",
                        });
                    }
                    records.push(record);
                    replaced = Some(next);
                }
            }
        }

        let report = PipelineReport {
            stage,
            outcome: PipelineOutcome::Completed,
            records,
            elapsed: stage_start.elapsed(),
        };
        Ok((report, replaced))
    }

    async fn invoke(
        &self,
        processor: &dyn Processor<T>,
        package: &EntityPackage<'_, T>,
    ) -> ProcessorResult<ProcessorDecision> {
        match self.config.processor_timeout() {
            Some(limit) => tokio::time::timeout(limit, processor.process(package))
                .await
                .map_err(|_| ProcessorError::Timeout {
                    processor: processor.name().to_string(),
                    limit,
                })?,
            None => processor.process(package).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProcessorRegistry;
    use async_trait::async_trait;
    use fetch_change::ChangePath;
    use serde_json::json;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    /// Test processor: logs its name, then returns a fixed decision.
    struct Scripted {
        name: &'static str,
        decision: ProcessorDecision,
        log: Log,
    }

    impl Scripted {
        fn new(name: &'static str, decision: ProcessorDecision, log: &Log) -> Self {
            Self {
                name,
                decision,
                log: log.clone(),
            }
        }
    }

    #[async_trait]
    impl Processor<String> for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn process(&self, package: &EntityPackage<'_, String>) -> ProcessorResult<ProcessorDecision> {
            let seen = package.changes().map_or(0, ChangeSet::len);
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}:{}", self.name, package.stage(), seen));
            Ok(self.decision.clone())
        }
    }

    struct Failing;

    #[async_trait]
    impl Processor<String> for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn process(&self, _package: &EntityPackage<'_, String>) -> ProcessorResult<ProcessorDecision> {
            Err(ProcessorError::failed("failing", "boom"))
        }
    }

    struct Slow;

    #[async_trait]
    impl Processor<String> for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        async fn process(&self, _package: &EntityPackage<'_, String>) -> ProcessorResult<ProcessorDecision> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ProcessorDecision::Continue)
        }
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    fn one_change() -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.insert(ChangePath::property("a"), json!(1));
        changes
    }

    #[tokio::test]
    async fn empty_stage_completes() {
        let pipeline = ProcessorPipeline::<String>::empty();
        let report = pipeline
            .adding(&"e".to_string(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.outcome, PipelineOutcome::Completed);
        assert!(report.records.is_empty());
    }

    #[tokio::test]
    async fn runs_in_registration_order() {
        let log = Log::default();
        let registry = ProcessorRegistry::new()
            .with(Stage::Adding, Scripted::new("first", ProcessorDecision::Continue, &log))
            .with(Stage::Adding, Scripted::new("second", ProcessorDecision::Continue, &log))
            .with(Stage::Added, Scripted::new("post", ProcessorDecision::Continue, &log));
        let pipeline = ProcessorPipeline::new(&registry, PipelineConfig::default());

        let entity = "e".to_string();
        let cancel = CancellationToken::new();
        let report = pipeline.adding(&entity, &cancel).await.unwrap();
        assert_eq!(report.records.len(), 2);
        pipeline.added(&entity, &cancel).await.unwrap();

        assert_eq!(
            entries(&log),
            vec!["first:adding:0", "second:adding:0", "post:added:0"]
        );
    }

    #[tokio::test]
    async fn pre_stage_cancel_short_circuits() {
        let log = Log::default();
        let registry = ProcessorRegistry::new()
            .with(Stage::Deleting, Scripted::new("veto", ProcessorDecision::cancel("locked"), &log))
            .with(Stage::Deleting, Scripted::new("never", ProcessorDecision::Continue, &log));
        let pipeline = ProcessorPipeline::new(&registry, PipelineConfig::default());

        let report = pipeline
            .deleting(&"e".to_string(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(report.is_cancelled());
        assert_eq!(
            report.outcome,
            PipelineOutcome::Cancelled {
                processor: "veto".into(),
                reason: "locked".into()
            }
        );
        assert_eq!(entries(&log), vec!["veto:deleting:0"]);
    }

    #[tokio::test]
    async fn post_stage_cancel_is_ignored() {
        let log = Log::default();
        let registry = ProcessorRegistry::new()
            .with(Stage::Deleted, Scripted::new("observer", ProcessorDecision::cancel("too late"), &log))
            .with(Stage::Deleted, Scripted::new("next", ProcessorDecision::Continue, &log));
        let pipeline = ProcessorPipeline::new(&registry, PipelineConfig::default());

        let report = pipeline
            .deleted(&"e".to_string(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(!report.is_cancelled());
        assert_eq!(entries(&log).len(), 2);
    }

    #[tokio::test]
    async fn updating_sees_changes_and_may_replace_them() {
        let log = Log::default();
        let mut replacement = ChangeSet::new();
        replacement.insert(ChangePath::property("a"), json!(1));
        replacement.insert(ChangePath::property("b"), json!(2));

        let registry = ProcessorRegistry::new()
            .with(Stage::Updating, Scripted::new("rewrite", ProcessorDecision::ReplaceChanges(replacement.clone()), &log))
            .with(Stage::Updating, Scripted::new("after", ProcessorDecision::Continue, &log));
        let pipeline = ProcessorPipeline::new(&registry, PipelineConfig::default());

        let (report, changes) = pipeline
            .updating(&"e".to_string(), one_change(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(!report.is_cancelled());
        assert_eq!(changes, replacement);
        assert_eq!(entries(&log), vec!["rewrite:updating:1", "after:updating:2"]);
    }

    #[tokio::test]
    async fn replace_outside_updating_is_rejected() {
        let log = Log::default();
        let registry = ProcessorRegistry::new().with(
            Stage::Updated,
            Scripted::new("bad", ProcessorDecision::ReplaceChanges(ChangeSet::new()), &log),
        );
        let pipeline = ProcessorPipeline::new(&registry, PipelineConfig::default());

        let err = pipeline
            .updated(&"e".to_string(), &one_change(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidDecision { stage: Stage::Updated, .. }));
    }

    #[tokio::test]
    async fn processor_errors_propagate() {
        let log = Log::default();
        let registry = ProcessorRegistry::new()
            .with(Stage::Adding, Failing)
            .with(Stage::Adding, Scripted::new("never", ProcessorDecision::Continue, &log));
        let pipeline = ProcessorPipeline::new(&registry, PipelineConfig::default());

        let err = pipeline
            .adding(&"e".to_string(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessorError::Failed { .. }));
        assert!(entries(&log).is_empty());
    }

    #[tokio::test]
    async fn cancellation_token_interrupts() {
        let log = Log::default();
        let registry = ProcessorRegistry::new()
            .with(Stage::Added, Scripted::new("post", ProcessorDecision::Continue, &log));
        let pipeline = ProcessorPipeline::new(&registry, PipelineConfig::default());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = pipeline.added(&"e".to_string(), &cancel).await.unwrap_err();
        assert!(matches!(err, ProcessorError::Interrupted { stage: Stage::Added }));
        assert!(entries(&log).is_empty());
    }

    #[tokio::test]
    async fn disabled_pipeline_skips_processors() {
        let log = Log::default();
        let registry = ProcessorRegistry::new()
            .with(Stage::Adding, Scripted::new("veto", ProcessorDecision::cancel("no"), &log));
        let pipeline = ProcessorPipeline::new(&registry, PipelineConfig::disabled());

        let report = pipeline
            .adding(&"e".to_string(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(!report.is_cancelled());
        assert!(entries(&log).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_processor_times_out() {
        let registry = ProcessorRegistry::new().with(Stage::Adding, Slow);
        let config = PipelineConfig {
            processor_timeout_ms: Some(50),
            ..Default::default()
        };
        let pipeline = ProcessorPipeline::new(&registry, config);

        let err = pipeline
            .adding(&"e".to_string(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessorError::Timeout { .. }));
    }

    #[test]
    fn resolves_each_stage_once() {
        struct Counting(Mutex<Vec<Stage>>);

        impl ProcessorProvider<String> for Counting {
            fn processors(&self, stage: Stage) -> Vec<Arc<dyn Processor<String>>> {
                self.0.lock().unwrap().push(stage);
                Vec::new()
            }
        }

        let provider = Counting(Mutex::new(Vec::new()));
        let pipeline = ProcessorPipeline::new(&provider, PipelineConfig::default());
        assert_eq!(*provider.0.lock().unwrap(), Stage::ALL.to_vec());
        assert_eq!(pipeline.processor_count(Stage::Adding), 0);
    }
}
