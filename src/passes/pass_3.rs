//! Pass 3: Duration Classification

use crate::analysis::{NoteEvent, NoteFeatures, NoteType};
use crate::config::{Config, DurationConfig, FillSource};
use crate::error::{Result as ScoreErrorResult, ScoreError};
use crate::raster::{any_value, is_ink_value, pixel, PageState, Raster, Window, INK};

/// Ink pixels in `window` outside the disc of `radius` around `(cx, cy)`
fn surrounding_ink(raster: &Raster, window: Window, cx: i32, cy: i32, radius: i32) -> usize {
    let (height, width) = raster.dim();
    let Some((x0, y0, x1, y1)) = window.clip(width, height) else {
        return 0;
    };
    let r2 = radius * radius;
    let mut count = 0;
    for y in y0..y1 {
        for x in x0..x1 {
            let (dx, dy) = (x as i32 - cx, y as i32 - cy);
            if dx * dx + dy * dy > r2 && raster[[y, x]] == INK {
                count += 1;
            }
        }
    }
    count
}

/// Box right of the notehead where an augmentation dot would sit
pub fn dot_window(cx: i32, cy: i32, config: &DurationConfig) -> Window {
    let half = config.dot_box_size / 2;
    Window {
        x0: cx + config.dot_offset_x,
        y0: cy - half,
        x1: cx + config.dot_offset_x + config.dot_box_size,
        y1: cy - half + config.dot_box_size,
    }
}

/// Resolve the fill flag from the configured source
pub fn resolve_filled(features: &NoteFeatures, raster: &Raster, config: &DurationConfig) -> bool {
    match config.fill_source {
        FillSource::BlobLabel => features.filled,
        FillSource::CentroidPixel => pixel(raster, features.cx, features.cy)
            .map(is_ink_value)
            .unwrap_or(false),
    }
}

/// Assign a duration label. The rules are checked in order and the first
/// match wins.
pub fn classify(features: &NoteFeatures, raster: &Raster, config: &DurationConfig) -> NoteType {
    let (cx, cy) = (features.cx, features.cy);
    let filled = resolve_filled(features, raster, config);

    if filled {
        if features.touches_beam {
            return NoteType::Quaver;
        }
        let window = Window::centered(cx, cy, config.density_half_size);
        let ink = surrounding_ink(raster, window, cx, cy, config.own_marker_radius);
        if ink > config.crotchet_rest_threshold {
            NoteType::CrotchetRest
        } else {
            NoteType::Crotchet
        }
    } else if features.has_stem {
        if any_value(raster, dot_window(cx, cy, config), INK) {
            NoteType::DottedMinim
        } else {
            NoteType::Minim
        }
    } else {
        let window = Window::centered(cx, cy, config.semibreve_half_size);
        let ink = surrounding_ink(raster, window, cx, cy, config.own_marker_radius);
        if ink > config.rest_threshold {
            NoteType::Semibreve
        } else {
            NoteType::Rest
        }
    }
}

pub fn run(state: &mut PageState, config: &Config) -> ScoreErrorResult<()> {
    log::info!("Pass 3: Duration Classification");

    if !state.preflight_done {
        return Err(ScoreError::ProcessingPipelineError(
            "Pass 0 must be run before Pass 3".to_string(),
        ));
    }

    let events: Vec<NoteEvent> = state
        .note_features
        .iter()
        .map(|f| NoteEvent::new(*f, classify(f, &state.raster, &config.duration)))
        .collect();

    for event in &events {
        log::trace!("  ({}, {}) -> {}", event.cx, event.cy, event.note_type);
    }
    log::info!("  ✓ Classified {} note events", events.len());

    state.note_events = events;
    Ok(())
}
