//! QA artifacts generation

use crate::analysis::{Clef, DiagnosticKind};
use crate::config::Config;
use crate::raster::{PageState, BACKGROUND};
use crate::ScoreError;
use image::{Rgb, RgbImage};
use std::collections::BTreeMap;
use std::fs;

const FILLED_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
const UNFILLED_COLOR: Rgb<u8> = Rgb([220, 0, 0]);
const STAFF_COLOR: Rgb<u8> = Rgb([120, 160, 255]);
const BAR_BOX_COLOR: Rgb<u8> = Rgb([255, 170, 0]);
const MARKER_HALF: i32 = 4;

/// Generate QA artifacts (overlay image, statistics report)
pub fn generate_artifacts(
    state: &PageState,
    output_dir: &std::path::Path,
    config: &Config,
) -> crate::ScoreErrorResult<()> {
    let qa_dir = output_dir.join("qa");
    fs::create_dir_all(&qa_dir)?;

    log::info!("Generating QA artifacts...");

    if config.qa.generate_images {
        generate_overlay(state, &qa_dir)?;
    }
    generate_statistics_report(state, &qa_dir)?;

    log::info!("QA artifacts generated in {}", qa_dir.display());
    Ok(())
}

fn put(img: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_rect(img: &mut RgbImage, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb<u8>) {
    for x in x0..=x1 {
        put(img, x, y0, color);
        put(img, x, y1, color);
    }
    for y in y0..=y1 {
        put(img, x0, y, color);
        put(img, x1, y, color);
    }
}

/// Render the page with staff rows, bar-line boxes and candidates marked
pub fn render_overlay(state: &PageState) -> RgbImage {
    let (height, width) = state.raster.dim();
    let mut img = RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let v = state.raster[[y as usize, x as usize]];
        Rgb([v, v, v])
    });

    // staff rows are tinted only where the stripped raster is blank
    for &row in &state.staff_rows {
        if row < 0 || row as usize >= height {
            continue;
        }
        for x in 0..width {
            if state.raster[[row as usize, x]] == BACKGROUND {
                put(&mut img, x as i32, row, STAFF_COLOR);
            }
        }
    }

    for b in &state.bar_boxes {
        draw_rect(&mut img, b.x, b.y, b.x + b.w, b.y + b.h, BAR_BOX_COLOR);
    }

    for c in &state.candidates {
        let color = if c.filled { FILLED_COLOR } else { UNFILLED_COLOR };
        draw_rect(
            &mut img,
            c.cx - MARKER_HALF,
            c.cy - MARKER_HALF,
            c.cx + MARKER_HALF,
            c.cy + MARKER_HALF,
            color,
        );
    }

    img
}

fn generate_overlay(state: &PageState, output_dir: &std::path::Path) -> crate::ScoreErrorResult<()> {
    let path = output_dir.join("qa_overlay.png");
    render_overlay(state).save(&path).map_err(|e| {
        ScoreError::QaGenerationError(format!("Failed to write {}: {}", path.display(), e))
    })?;
    Ok(())
}

fn generate_statistics_report(
    state: &PageState,
    output_dir: &std::path::Path,
) -> crate::ScoreErrorResult<()> {
    let path = output_dir.join("statistics.json");

    let mut stats = serde_json::Map::new();

    stats.insert("page_width".to_string(), state.width().into());
    stats.insert("page_height".to_string(), state.height().into());
    stats.insert("staff_rows".to_string(), state.staff_rows.len().into());
    stats.insert("staff_groups".to_string(), state.staff_groups.len().into());
    stats.insert("candidates".to_string(), state.candidates.len().into());
    stats.insert(
        "with_stem".to_string(),
        state.note_features.iter().filter(|f| f.has_stem).count().into(),
    );
    stats.insert(
        "touching_beam".to_string(),
        state.note_features.iter().filter(|f| f.touches_beam).count().into(),
    );

    // Beats per bar, a quick check against the time signature
    let beats_per_bar: BTreeMap<String, f32> = state
        .bars
        .iter()
        .map(|bar| {
            (
                bar.number.to_string(),
                bar.events.iter().map(|e| e.beats()).sum(),
            )
        })
        .collect();
    stats.insert(
        "beats_per_bar".to_string(),
        serde_json::to_value(beats_per_bar)?,
    );

    let unmapped = state
        .ordered_events()
        .filter(|e| e.staff_position.is_none())
        .count();
    stats.insert("unmapped_notes".to_string(), unmapped.into());

    let mut clef_counts = BTreeMap::new();
    for note in &state.resolved_notes {
        *clef_counts.entry(note.clef.name()).or_insert(0usize) += 1;
    }
    for clef in [Clef::Treble, Clef::Bass] {
        clef_counts.entry(clef.name()).or_insert(0);
    }
    stats.insert("notes_per_clef".to_string(), serde_json::to_value(clef_counts)?);

    let mut diagnostic_counts: BTreeMap<String, usize> = BTreeMap::new();
    for kind in [
        DiagnosticKind::InputMissing,
        DiagnosticKind::MalformedRecord,
        DiagnosticKind::StructuralMismatch,
        DiagnosticKind::ContourCapExceeded,
    ] {
        let count = state.diagnostics.iter().filter(|d| d.kind == kind).count();
        diagnostic_counts.insert(format!("{:?}", kind), count);
    }
    stats.insert(
        "diagnostics".to_string(),
        serde_json::to_value(diagnostic_counts)?,
    );

    let json = serde_json::to_string_pretty(&stats)?;
    fs::write(path, json)?;

    Ok(())
}
