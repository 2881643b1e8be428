use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    batch::{
        driver::{BatchDriver, BatchOptions, BatchSummary},
        failure_log::FailureLog,
    },
    config::PrintConfig,
    foundation::{cancel::CancelFlag, error::PrintResult},
    order::context::{OrderContextBuilder, OrderJob},
    render::{pipeline::RenderPipeline, raster::SvgRasterizer},
    sanitize::markup::AssetSanitizer,
    template::catalog::TemplateCatalog,
};

/// Long-lived rendering service: one font database, one template catalog, one pipeline.
///
/// ```no_run
/// use std::path::Path;
///
/// use tumblerprint::{OrderJob, PrintConfig, PrintService, TemplateCatalog};
///
/// let service = PrintService::new(PrintConfig::default(), TemplateCatalog::standard());
/// let job = OrderJob::for_record("orders/a/order.json");
/// let out = service.render_one(&job, Path::new("ready"))?;
/// println!("{}", out.display());
/// # Ok::<(), tumblerprint::PrintError>(())
/// ```
pub struct PrintService {
    config: PrintConfig,
    builder: Arc<OrderContextBuilder>,
    pipeline: Arc<RenderPipeline>,
    cancel: CancelFlag,
}

impl PrintService {
    /// Service with a fresh rasterizer loading system fonts plus `config.font_dirs`.
    pub fn new(config: PrintConfig, catalog: TemplateCatalog) -> Self {
        let rasterizer = Arc::new(SvgRasterizer::new(&config.font_dirs, config.remote_timeout()));
        Self::with_rasterizer(config, catalog, rasterizer)
    }

    /// Service reusing an existing rasterizer (and its font database).
    pub fn with_rasterizer(
        config: PrintConfig,
        catalog: TemplateCatalog,
        rasterizer: Arc<SvgRasterizer>,
    ) -> Self {
        let cancel = CancelFlag::new();
        let sanitizer = AssetSanitizer::new(
            config.build_normalizer(),
            config.sanitize_options(),
            cancel.clone(),
        );
        let builder = OrderContextBuilder::new(Arc::new(catalog), config.scratch_root.clone());
        Self {
            builder: Arc::new(builder),
            pipeline: Arc::new(RenderPipeline::new(sanitizer, rasterizer)),
            config,
            cancel,
        }
    }

    /// Settings this service was built from.
    pub fn config(&self) -> &PrintConfig {
        &self.config
    }

    /// Setting this stops batches from starting further orders and further image conversions.
    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Prepare and render a single order, failing on any order-fatal error.
    pub fn render_one(&self, job: &OrderJob, output_dir: &Path) -> PrintResult<PathBuf> {
        let context = self
            .builder
            .prepare(job, output_dir, &self.config.file_suffix)?;
        self.pipeline.render(context)
    }

    /// Render every job into `output_dir`, logging failures instead of stopping.
    pub fn run_batch(&self, jobs: &[OrderJob], output_dir: &Path) -> PrintResult<BatchSummary> {
        let log = FailureLog::open(self.config.failure_log_path(output_dir))?;
        let driver = BatchDriver::new(
            Arc::clone(&self.builder),
            Arc::clone(&self.pipeline),
            Arc::new(log),
            BatchOptions {
                workers: self.config.workers,
                output_dir: output_dir.to_path_buf(),
                file_suffix: self.config.file_suffix.clone(),
            },
            self.cancel.clone(),
        );
        driver.process_all(jobs)
    }
}
