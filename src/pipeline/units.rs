//! Per-unit extraction loop.
//!
//! Every rendered page or slide goes through normalise → extract → (clean),
//! one request at a time with the pacing pause in between. A failed unit is
//! kept as a placeholder so the output always has exactly one section per
//! input image, in input order.

use crate::config::PipelineConfig;
use crate::error::UnitError;
use crate::output::{ExtractedUnit, ExtractionContext, PageImage};
use crate::pipeline::client::VisionService;
use crate::pipeline::normalize::normalize_image;
use crate::pipeline::pace::{run_paced, Cancellation, Cancelled, Pacing};
use crate::pipeline::postprocess::clean_unit_text;
use crate::progress::ProgressReporter;
use tracing::{info, warn};

/// Extract every image in `images`, in order.
///
/// Returns one [`ExtractedUnit`] per image. Only cancellation aborts the
/// loop; remote failures are recorded on the unit.
pub async fn process_units(
    service: &dyn VisionService,
    images: Vec<PageImage>,
    context: ExtractionContext,
    config: &PipelineConfig,
    reporter: &dyn ProgressReporter,
    cancel: &Cancellation,
) -> Result<Vec<ExtractedUnit>, Cancelled> {
    let total = images.len();
    reporter.on_units_start(context, total);
    info!("Extracting {} {}(s)", total, context.unit_noun());

    let pacing = Pacing {
        pause: config.pause,
        reporter,
        cancel,
    };

    run_paced(images, &pacing, move |idx, page| async move {
        // Markers follow input order, not the renderer's numbering.
        let ordinal = idx + 1;
        reporter.on_unit_start(ordinal, total);

        let normalized = PageImage::new(
            ordinal,
            normalize_image(&page.image, config.max_image_dimension),
        );
        drop(page);

        let answer = service.extract(&normalized, context).await.and_then(|raw| {
            let body = if config.clean_output {
                clean_unit_text(&raw)
            } else {
                raw
            };
            if body.trim().is_empty() {
                Err(UnitError::EmptyResponse)
            } else {
                Ok(body)
            }
        });

        match answer {
            Ok(body) => {
                reporter.on_unit_complete(ordinal, total, body.len());
                ExtractedUnit::extracted(ordinal, context, &body)
            }
            Err(e) => {
                warn!("{} {}/{} failed: {}", context.unit_noun(), ordinal, total, e);
                reporter.on_unit_error(ordinal, total, &e.to_string());
                ExtractedUnit::failed(ordinal, context, e)
            }
        }
    })
    .await
}
