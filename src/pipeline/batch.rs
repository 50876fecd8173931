//! Second stage: enhance consecutive groups of extracted units.
//!
//! Units are partitioned into contiguous groups of `batch_size` (the last
//! group may be shorter). Each group's texts are joined with a blank line
//! and sent as one enhancement request, so cross-slide structure such as
//! continued lists can be repaired. A group whose request fails keeps its
//! raw text byte-for-byte.

use crate::config::PipelineConfig;
use crate::output::ExtractedUnit;
use crate::pipeline::client::VisionService;
use crate::pipeline::pace::{run_paced, Cancellation, Cancelled, Pacing};
use crate::pipeline::postprocess::clean_unit_text;
use crate::progress::ProgressReporter;
use std::ops::Range;
use tracing::{debug, info};

/// Separator between unit texts inside one enhancement request.
pub const GROUP_JOINER: &str = "\n\n";

/// Result of enhancing one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupResult {
    /// Indices into the unit list covered by this group.
    pub range: Range<usize>,
    /// Enhanced text, or the joined raw text when `applied` is false.
    pub text: String,
    pub applied: bool,
}

/// Contiguous index ranges of at most `group_size` covering `0..len`.
///
/// Yields `ceil(len / group_size)` ranges; a `group_size` of zero is
/// treated as one.
pub fn group_ranges(len: usize, group_size: usize) -> Vec<Range<usize>> {
    let size = group_size.max(1);
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}

/// Join the unit texts of one group in order.
pub fn join_group(units: &[ExtractedUnit]) -> String {
    units
        .iter()
        .map(|u| u.text.as_str())
        .collect::<Vec<_>>()
        .join(GROUP_JOINER)
}

/// Enhance `units` group by group, pausing between groups.
pub async fn enhance_units(
    service: &dyn VisionService,
    units: &[ExtractedUnit],
    config: &PipelineConfig,
    reporter: &dyn ProgressReporter,
    cancel: &Cancellation,
) -> Result<Vec<GroupResult>, Cancelled> {
    let ranges = group_ranges(units.len(), config.batch_size);
    let total_groups = ranges.len();
    info!(
        "Enhancing {} unit(s) in {} group(s) of up to {}",
        units.len(),
        total_groups,
        config.batch_size
    );

    let pacing = Pacing {
        pause: config.pause,
        reporter,
        cancel,
    };

    run_paced(ranges, &pacing, move |idx, range| async move {
        let group = idx + 1;
        reporter.on_group_start(group, total_groups);

        let raw = join_group(&units[range.clone()]);
        let outcome = service.enhance(&raw).await;
        let text = if outcome.applied && config.clean_output {
            clean_unit_text(&outcome.text)
        } else {
            outcome.text
        };
        debug!(
            "Group {}/{}: {} → {} chars (applied: {})",
            group,
            total_groups,
            raw.len(),
            text.len(),
            outcome.applied
        );

        reporter.on_group_complete(group, total_groups, outcome.applied);
        GroupResult {
            range,
            text,
            applied: outcome.applied,
        }
    })
    .await
}
