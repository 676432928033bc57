//! Pass 0: Preflight & Staff Grouping

use crate::analysis::{Diagnostic, DiagnosticKind, StaffGroup};
use crate::config::Config;
use crate::error::{Result as ScoreErrorResult, ScoreError};
use crate::raster::{PageState, Raster, BACKGROUND, INK};

/// Raster validation result
#[derive(Debug)]
struct RasterValidation {
    non_binary_pixels: usize,
    ink_pixels: usize,
}

fn validate_raster(raster: &Raster) -> RasterValidation {
    let mut non_binary_pixels = 0;
    let mut ink_pixels = 0;
    for &v in raster.iter() {
        match v {
            INK => ink_pixels += 1,
            BACKGROUND => {}
            _ => non_binary_pixels += 1,
        }
    }
    RasterValidation {
        non_binary_pixels,
        ink_pixels,
    }
}

/// Masks must share the notehead raster's pixel grid exactly
fn check_mask(
    name: &str,
    mask: Option<&Raster>,
    dim: (usize, usize),
    diagnostics: &mut Vec<Diagnostic>,
) -> ScoreErrorResult<()> {
    match mask {
        Some(mask) if mask.dim() != dim => Err(ScoreError::DimensionMismatch {
            expected: dim,
            found: mask.dim(),
        }),
        Some(_) => Ok(()),
        None => {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::InputMissing,
                format!("no {} mask; every notehead is treated as unmatched", name),
            ));
            Ok(())
        }
    }
}

/// Slice the staff rows into groups of five, flagging a partial tail group
pub fn group_staff_rows(state: &mut PageState) {
    if state.staff_rows.is_empty() {
        state.diagnostics.push(Diagnostic::new(
            DiagnosticKind::InputMissing,
            "no staff rows detected; pitch mapping will skip every note",
        ));
        state.staff_groups.clear();
        return;
    }

    let (groups, remainder) = StaffGroup::group_rows(&state.staff_rows);
    if !remainder.is_empty() {
        state.diagnostics.push(Diagnostic::new(
            DiagnosticKind::StructuralMismatch,
            format!(
                "{} staff rows is not a multiple of 5; trailing rows {:?} ignored",
                state.staff_rows.len(),
                remainder
            ),
        ));
    }
    state.staff_groups = groups;
}

pub fn run(state: &mut PageState, _config: &Config) -> ScoreErrorResult<()> {
    log::info!("Pass 0: Preflight & Staff Grouping");

    // 1. Binary raster check
    let validation = validate_raster(&state.raster);
    if validation.non_binary_pixels > 0 {
        return Err(ScoreError::InputValidationError(format!(
            "raster has {} pixels outside {{0, 255}}",
            validation.non_binary_pixels
        )));
    }
    if validation.ink_pixels == 0 {
        log::warn!("Raster contains no ink; nothing will be detected");
    }
    log::debug!(
        "Raster {}x{} with {} ink pixels",
        state.width(),
        state.height(),
        validation.ink_pixels
    );

    // 2. Mask alignment
    let dim = state.raster.dim();
    check_mask("stem", state.stem_mask.as_ref(), dim, &mut state.diagnostics)?;
    check_mask("beam", state.beam_mask.as_ref(), dim, &mut state.diagnostics)?;

    // 3. Staff groups
    group_staff_rows(state);

    // 4. Clef markers take effect in index order
    state.clef_markers.sort_by_key(|m| m.index);
    if state.clef_markers.is_empty() {
        log::debug!("No clef markers; every bar uses the default clef");
    }

    state.preflight_done = true;
    log::info!(
        "  ✓ Pass 0 complete ({} staff groups, {} clef markers)",
        state.staff_groups.len(),
        state.clef_markers.len()
    );
    Ok(())
}
