use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    path::{Path, PathBuf},
    sync::Arc,
};

use rayon::prelude::*;

use crate::{
    batch::failure_log::{FailureLog, FailureRecord},
    foundation::{
        cancel::CancelFlag,
        error::{PrintError, PrintResult},
    },
    order::context::{OrderContextBuilder, OrderJob},
    render::pipeline::RenderPipeline,
};

/// Failure while resolving an order's inputs.
pub const STAGE_PREPARE: &str = "prepare";
/// Failure inside the render pipeline.
pub const STAGE_RENDER: &str = "render";
/// The order's worker panicked.
pub const STAGE_PANIC: &str = "panic";

/// Where batch output goes and how wide the worker pool is.
#[derive(Clone, Debug)]
pub struct BatchOptions {
    /// Worker threads; at least one.
    pub workers: usize,
    /// Destination directory for rendered files.
    pub output_dir: PathBuf,
    /// Text appended to every output file name.
    pub file_suffix: String,
}

/// Why one order did not produce output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureDetail {
    /// Order record that failed.
    pub record_path: PathBuf,
    /// One of the `STAGE_*` names.
    pub stage: &'static str,
    /// [`PrintError::kind`] of the failure.
    pub kind: &'static str,
    /// Full error chain.
    pub message: String,
}

/// Result of one order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderOutcome {
    /// Output written to this path.
    Rendered(PathBuf),
    /// Order-fatal failure, already logged.
    Failed(FailureDetail),
    /// Not attempted because the batch was cancelled.
    Skipped,
}

/// Aggregate counts for a batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Orders with an output file.
    pub succeeded: usize,
    /// Orders that failed and were logged.
    pub failed: usize,
    /// Orders not attempted after cancellation.
    pub skipped: usize,
    /// Written files, in job order.
    pub outputs: Vec<PathBuf>,
    /// Failures, in job order.
    pub failures: Vec<FailureDetail>,
}

impl BatchSummary {
    fn record(&mut self, outcome: OrderOutcome) {
        match outcome {
            OrderOutcome::Rendered(path) => {
                self.succeeded += 1;
                self.outputs.push(path);
            }
            OrderOutcome::Failed(detail) => {
                self.failed += 1;
                self.failures.push(detail);
            }
            OrderOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// A failure tagged with the step it happened in.
struct StageError {
    stage: &'static str,
    scratch: Option<PathBuf>,
    error: PrintError,
}

/// Runs many orders on a fixed-size pool, isolating each order's failure.
pub struct BatchDriver {
    builder: Arc<OrderContextBuilder>,
    pipeline: Arc<RenderPipeline>,
    failure_log: Arc<FailureLog>,
    options: BatchOptions,
    cancel: CancelFlag,
}

impl BatchDriver {
    /// Driver over shared preparation and render state. `cancel` should be the flag the
    /// pipeline's sanitizer polls.
    pub fn new(
        builder: Arc<OrderContextBuilder>,
        pipeline: Arc<RenderPipeline>,
        failure_log: Arc<FailureLog>,
        options: BatchOptions,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            builder,
            pipeline,
            failure_log,
            options,
            cancel,
        }
    }

    /// Flag that stops the batch from starting further orders.
    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Process every job and block until all have finished or been skipped.
    ///
    /// Only failing to start the worker pool is an error; order failures are counted.
    pub fn process_all(&self, jobs: &[OrderJob]) -> PrintResult<BatchSummary> {
        let pool = build_thread_pool(self.options.workers)?;
        tracing::info!(
            orders = jobs.len(),
            workers = self.options.workers,
            output = %self.options.output_dir.display(),
            "batch started"
        );

        let outcomes: Vec<OrderOutcome> =
            pool.install(|| jobs.par_iter().map(|job| self.process_one(job)).collect());

        let mut summary = BatchSummary::default();
        for outcome in outcomes {
            summary.record(outcome);
        }
        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "batch finished"
        );
        Ok(summary)
    }

    /// Prepare and render one job; never panics and never returns an error.
    pub fn process_one(&self, job: &OrderJob) -> OrderOutcome {
        if self.cancel.is_cancelled() {
            tracing::debug!(record = %job.record_path.display(), "batch cancelled; order skipped");
            return OrderOutcome::Skipped;
        }

        let attempt = catch_unwind(AssertUnwindSafe(|| self.prepare_and_render(job)));
        let failure = match attempt {
            Ok(Ok(path)) => return OrderOutcome::Rendered(path),
            Ok(Err(StageError {
                error: PrintError::Cancelled(_),
                ..
            })) => return OrderOutcome::Skipped,
            Ok(Err(failure)) => failure,
            Err(payload) => StageError {
                stage: STAGE_PANIC,
                scratch: None,
                error: PrintError::render(panic_message(payload.as_ref())),
            },
        };
        OrderOutcome::Failed(self.report(job, failure))
    }

    fn prepare_and_render(&self, job: &OrderJob) -> Result<PathBuf, StageError> {
        let context = self
            .builder
            .prepare(job, &self.options.output_dir, &self.options.file_suffix)
            .map_err(|error| StageError {
                stage: STAGE_PREPARE,
                scratch: None,
                error,
            })?;

        let output = context.output_path.clone();
        let scratch = context.scratch.path().to_path_buf();
        self.pipeline.render(context).map_err(|error| {
            remove_partial_output(&output);
            StageError {
                stage: STAGE_RENDER,
                scratch: Some(scratch),
                error,
            }
        })
    }

    fn report(&self, job: &OrderJob, failure: StageError) -> FailureDetail {
        let message = failure.error.detail();
        let kind = failure.error.kind();
        tracing::error!(
            record = %job.record_path.display(),
            stage = failure.stage,
            kind,
            error = %message,
            "order failed"
        );

        let order_context = match &failure.scratch {
            Some(scratch) => format!(
                "{} (scratch {})",
                job.record_path.display(),
                scratch.display()
            ),
            None => job.record_path.display().to_string(),
        };
        let record = FailureRecord {
            stage: failure.stage.to_string(),
            order_context,
            leaf_folder: job.order_root.display().to_string(),
            ready_folder: self.options.output_dir.display().to_string(),
            customer: job.customer_hint.clone(),
            exception_type: kind.to_string(),
            message: message.clone(),
        };
        if let Err(e) = self.failure_log.append(&record) {
            tracing::warn!(error = %e, log = %self.failure_log.path().display(), "failure log append failed");
        }

        FailureDetail {
            record_path: job.record_path.clone(),
            stage: failure.stage,
            kind,
            message,
        }
    }
}

fn build_thread_pool(workers: usize) -> PrintResult<rayon::ThreadPool> {
    if workers == 0 {
        return Err(PrintError::validation("batch 'workers' must be >= 1"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("tumblerprint-worker-{i}"))
        .build()
        .map_err(|e| PrintError::render(format!("failed to build worker pool: {e}")))
}

fn remove_partial_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(output = %path.display(), "removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(output = %path.display(), error = %e, "failed to remove partial output"),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/batch/driver.rs"]
mod tests;
