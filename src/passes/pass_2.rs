//! Pass 2: Stem & Beam Correlation

use crate::analysis::NoteFeatures;
use crate::config::{Config, CorrelationConfig};
use crate::error::{Result as ScoreErrorResult, ScoreError};
use crate::raster::{any_value, PageState, Raster, Window, MASK_SET};

/// Square window searched for a stem
pub fn stem_window(cx: i32, cy: i32, config: &CorrelationConfig) -> Window {
    Window::centered(cx, cy, config.stem_half_size)
}

/// Tall window searched for a beam above or below the notehead
pub fn beam_window(cx: i32, cy: i32, config: &CorrelationConfig) -> Window {
    Window {
        x0: cx - config.beam_half_width,
        y0: cy - config.beam_extent_up,
        x1: cx + config.beam_half_width,
        y1: cy + config.beam_extent_down,
    }
}

/// Whether the stem mask has a detection near the notehead
pub fn has_stem(mask: Option<&Raster>, cx: i32, cy: i32, config: &CorrelationConfig) -> bool {
    mask.is_some_and(|m| any_value(m, stem_window(cx, cy, config), MASK_SET))
}

/// Whether the beam mask has a detection near the notehead
pub fn touches_beam(mask: Option<&Raster>, cx: i32, cy: i32, config: &CorrelationConfig) -> bool {
    mask.is_some_and(|m| any_value(m, beam_window(cx, cy, config), MASK_SET))
}

pub fn run(state: &mut PageState, config: &Config) -> ScoreErrorResult<()> {
    log::info!("Pass 2: Stem & Beam Correlation");

    if !state.preflight_done {
        return Err(ScoreError::ProcessingPipelineError(
            "Pass 0 must be run before Pass 2".to_string(),
        ));
    }

    let corr = &config.correlation;
    let features: Vec<NoteFeatures> = state
        .candidates
        .iter()
        .map(|c| NoteFeatures {
            cx: c.cx,
            cy: c.cy,
            filled: c.filled,
            has_stem: has_stem(state.stem_mask.as_ref(), c.cx, c.cy, corr),
            touches_beam: touches_beam(state.beam_mask.as_ref(), c.cx, c.cy, corr),
        })
        .collect();

    log::info!(
        "  ✓ {} with stems, {} touching beams",
        features.iter().filter(|f| f.has_stem).count(),
        features.iter().filter(|f| f.touches_beam).count()
    );

    state.note_features = features;
    Ok(())
}
