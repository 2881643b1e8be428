use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;

use crate::{
    foundation::error::{PrintError, PrintResult},
    order::context::RenderContext,
    overlay::{info::InfoOverlayRenderer, text::TextRenderer},
    render::{
        composite::{WHITE, fill_rect, paste_crop, white_canvas},
        raster::SvgRasterizer,
    },
    sanitize::markup::AssetSanitizer,
    template::catalog::Side,
};

/// Turns a prepared [`RenderContext`] into a print-ready PNG.
///
/// Holds only shared read-only state, so one pipeline serves every worker thread.
pub struct RenderPipeline {
    sanitizer: AssetSanitizer,
    rasterizer: Arc<SvgRasterizer>,
    overlay: InfoOverlayRenderer,
}

impl RenderPipeline {
    /// Pipeline whose overlay text shares `rasterizer`'s font database.
    pub fn new(sanitizer: AssetSanitizer, rasterizer: Arc<SvgRasterizer>) -> Self {
        let overlay = InfoOverlayRenderer::new(TextRenderer::new(Arc::clone(&rasterizer)));
        Self {
            sanitizer,
            rasterizer,
            overlay,
        }
    }

    /// Render one order and return the written file.
    ///
    /// The context is consumed: its scratch directory and every normalized image are deleted
    /// when this returns, whether it succeeded or not. Nothing is written to the output path
    /// unless every compositing step succeeded.
    #[tracing::instrument(
        name = "render_order",
        skip_all,
        fields(order_id = %context.info.order_id, capacity = %context.template.capacity)
    )]
    pub fn render(&self, context: RenderContext) -> PrintResult<PathBuf> {
        let RenderContext {
            template,
            info,
            design_side,
            design_path,
            declared_assets,
            output_path,
            scratch,
        } = context;

        let mut canvas = white_canvas(template.final_width, template.final_height);

        let sanitized =
            self.sanitizer
                .sanitize_file(&design_path, &info.font_name, &declared_assets, &scratch)?;
        tracing::debug!(report = ?sanitized.report, "design sanitized");

        let master = self.rasterizer.rasterize(
            &sanitized.markup,
            design_path.parent(),
            template.render_size,
            template.render_size,
        )?;
        drop(sanitized);

        for side in Side::ALL {
            let paste = template.paste(side);
            if design_side.includes(side) {
                paste_crop(&mut canvas, &master, template.crop(side), paste)?;
            } else {
                fill_rect(&mut canvas, paste, WHITE);
            }
        }

        self.overlay
            .draw(&mut canvas, &info, &template, info.total_quantity);

        canvas
            .save_with_format(&output_path, image::ImageFormat::Png)
            .map_err(|e| {
                PrintError::render(format!("encode '{}': {e}", output_path.display()))
            })?;
        let bytes = std::fs::metadata(&output_path)
            .with_context(|| format!("stat output '{}'", output_path.display()))?
            .len();
        tracing::info!(output = %output_path.display(), bytes, "order rendered");

        drop(scratch);
        Ok(output_path)
    }
}
