//! Pass 1: Notehead Blob Classification

use crate::analysis::{BarBox, BlobCandidate, Diagnostic, DiagnosticKind};
use crate::config::{BlobConfig, Config, PrefilterConfig};
use crate::contour::{find_contours, BoundingBox, Contour};
use crate::error::{Result as ScoreErrorResult, ScoreError};
use crate::raster::PageState;
use std::f64::consts::PI;

/// Shape metrics of one contour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlobMetrics {
    pub bbox: BoundingBox,
    pub area: f64,
    pub perimeter: f64,
    pub circularity: f64,
    pub aspect_ratio: f64,
    pub solidity: f64,
    pub contour_completeness: f64,
}

/// Measure a contour; `None` for degenerate zero-perimeter contours
pub fn measure(contour: &Contour) -> Option<BlobMetrics> {
    let perimeter = contour.perimeter();
    if perimeter <= 0.0 {
        return None;
    }

    let bbox = contour.bounding_box();
    let area = contour.area();
    let circularity = 4.0 * PI * area / (perimeter * perimeter);

    let (w, h) = (bbox.w.max(1) as f64, bbox.h.max(1) as f64);
    let aspect_ratio = if w > h { w / h } else { h / w };

    let hull_area = contour.hull_area();
    let solidity = if hull_area > 0.0 { area / hull_area } else { 0.0 };
    let hull_perimeter = contour.hull_perimeter();
    let contour_completeness = if hull_perimeter > 0.0 {
        perimeter / hull_perimeter
    } else {
        0.0
    };

    Some(BlobMetrics {
        bbox,
        area,
        perimeter,
        circularity,
        aspect_ratio,
        solidity,
        contour_completeness,
    })
}

/// Geometry gate for notehead candidates
pub fn is_notehead_candidate(metrics: &BlobMetrics, config: &BlobConfig) -> bool {
    metrics.circularity > config.circularity_threshold
        && metrics.aspect_ratio < config.aspect_ratio_threshold
        && metrics.area > config.min_area
        && metrics.area < config.max_area
}

/// Fill label of a candidate. Small dots are never filled.
pub fn is_filled(metrics: &BlobMetrics, config: &BlobConfig) -> bool {
    if metrics.area < config.small_dot_area_threshold {
        return false;
    }
    metrics.solidity > config.solidity_threshold
        && metrics.contour_completeness > config.completeness_threshold
}

/// Classify every contour of a frame into notehead candidates.
///
/// The leftmost-margin pre-filter measures distance from the leftmost
/// bounding-box centre over all contours, degenerate ones included.
pub fn classify_contours(
    contours: &[Contour],
    blob: &BlobConfig,
    prefilter: &PrefilterConfig,
) -> Vec<BlobCandidate> {
    let leftmost_cx = contours
        .iter()
        .map(|c| c.bounding_box().center().0)
        .min()
        .unwrap_or(0);

    contours
        .iter()
        .filter_map(measure)
        .filter(|m| is_notehead_candidate(m, blob))
        .filter(|m| {
            !prefilter.leftmost_margin_enabled
                || m.bbox.center().0 - leftmost_cx >= prefilter.leftmost_margin_px
        })
        .map(|m| {
            let (cx, cy) = m.bbox.center();
            BlobCandidate {
                cx,
                cy,
                area: m.area,
                perimeter: m.perimeter,
                circularity: m.circularity,
                aspect_ratio: m.aspect_ratio,
                solidity: m.solidity,
                contour_completeness: m.contour_completeness,
                filled: is_filled(&m, blob),
            }
        })
        .collect()
}

/// Keep candidates whose centroid lies inside at least one bar-line box
pub fn filter_by_bar_boxes(candidates: Vec<BlobCandidate>, boxes: &[BarBox]) -> Vec<BlobCandidate> {
    candidates
        .into_iter()
        .filter(|c| boxes.iter().any(|b| b.contains(c.cx, c.cy)))
        .collect()
}

pub fn run(state: &mut PageState, config: &Config) -> ScoreErrorResult<()> {
    log::info!("Pass 1: Notehead Blob Classification");

    if !state.preflight_done {
        return Err(ScoreError::ProcessingPipelineError(
            "Pass 0 must be run before Pass 1".to_string(),
        ));
    }

    // 1. Contour enumeration, bounded
    let (contours, truncated) = find_contours(&state.raster, config.limits.max_contours);
    if truncated {
        state.diagnostics.push(Diagnostic::new(
            DiagnosticKind::ContourCapExceeded,
            format!(
                "contour enumeration stopped at {} contours",
                config.limits.max_contours
            ),
        ));
    }
    log::debug!("  Found {} contours", contours.len());

    // 2. Geometry classification with the leftmost pre-filter
    let mut candidates = classify_contours(&contours, &config.blob, &config.prefilter);
    log::debug!("  {} contours pass the notehead geometry gate", candidates.len());

    // 3. Bar-box membership
    if config.prefilter.bar_membership_enabled {
        if state.bar_boxes.is_empty() {
            log::warn!("No bar-line boxes available; skipping membership filter");
        } else {
            let before = candidates.len();
            candidates = filter_by_bar_boxes(candidates, &state.bar_boxes);
            log::debug!(
                "  Bar-box membership removed {} candidates",
                before - candidates.len()
            );
        }
    }

    state.candidates = candidates;

    log::info!(
        "  ✓ {} notehead candidates ({} filled)",
        state.candidates.len(),
        state.candidates.iter().filter(|c| c.filled).count()
    );
    Ok(())
}
