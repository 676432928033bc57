//! Pass 5: Staff-Relative Pitch Mapping
//!
//! A notehead's vertical offset from each of the five lines of its bar's
//! staff is reduced to a symbolic [`StaffPosition`]. Differences are signed
//! (`cy - line`), so a note below a line has a positive difference.

use crate::analysis::{Diagnostic, DiagnosticKind, StaffGroup, StaffPosition};
use crate::config::{Config, OffByOnePolicy};
use crate::error::{Result as ScoreErrorResult, ScoreError};
use crate::raster::PageState;

const EXACT: i32 = 0;
const OFF_BY_ONE: i32 = 1;
const ADJACENT_TOLERANCE: i32 = 1;
const LINE_STEP: i32 = 2;
const BELOW_LINE5_DELTA: i32 = 6;
const BELOW_LINE_DIFF: i32 = 7;

const BOTTOM_LINE: usize = 4;
const MIDDLE_LINE: usize = 2;

/// Signed offsets of `cy` from each staff line, top line first
pub fn staff_differences(cy: i32, staff: &StaffGroup) -> [i32; 5] {
    let rows = staff.rows();
    [
        cy - rows[0],
        cy - rows[1],
        cy - rows[2],
        cy - rows[3],
        cy - rows[4],
    ]
}

fn line(index: usize) -> u8 {
    index as u8 + 1
}

/// Map staff differences to a position
pub fn staff_position(diffs: &[i32; 5], policy: OffByOnePolicy) -> StaffPosition {
    // An exact hit on any line wins over off-by-one hits
    if let Some(i) = diffs.iter().position(|&d| d == EXACT) {
        return StaffPosition::OnLine(line(i));
    }

    let mut near = diffs
        .iter()
        .enumerate()
        .filter(|(_, d)| d.abs() == OFF_BY_ONE)
        .map(|(i, _)| i);
    let near_hit = match policy {
        OffByOnePolicy::First => near.next(),
        OffByOnePolicy::Last => near.last(),
    };
    if let Some(i) = near_hit {
        return StaffPosition::OnLine(line(i));
    }

    let mut sorted: Vec<(usize, i32)> = diffs.iter().copied().enumerate().collect();
    sorted.sort_by_key(|&(_, d)| d.abs());
    let (closest, closest_diff) = sorted[0];
    let (second, second_diff) = sorted[1];
    let delta = (closest_diff.abs() - second_diff.abs()).abs();

    log::debug!(
        "closest {} (line {}), second {} (line {}), delta {}",
        closest_diff,
        line(closest),
        second_diff,
        line(second),
        delta
    );

    if delta <= ADJACENT_TOLERANCE {
        StaffPosition::Between(line(closest), line(second))
    } else if delta == BELOW_LINE5_DELTA && closest == BOTTOM_LINE && closest_diff < BELOW_LINE_DIFF
    {
        StaffPosition::BelowLine5
    } else if delta == LINE_STEP && (closest == BOTTOM_LINE || closest == MIDDLE_LINE) {
        StaffPosition::Between(line(second), line(closest))
    } else if closest == BOTTOM_LINE && closest_diff == BELOW_LINE_DIFF {
        StaffPosition::BelowLine
    } else if closest == BOTTOM_LINE && closest_diff > LINE_STEP {
        StaffPosition::BelowLine
    } else if delta == LINE_STEP {
        StaffPosition::OnLine(line(closest))
    } else {
        StaffPosition::Unknown
    }
}

/// Staff group of a 1-based bar number
pub fn staff_for_bar(groups: &[StaffGroup], bar: usize) -> Option<&StaffGroup> {
    bar.checked_sub(1).and_then(|i| groups.get(i))
}

pub fn run(state: &mut PageState, config: &Config) -> ScoreErrorResult<()> {
    log::info!("Pass 5: Staff-Relative Pitch Mapping");

    if !state.bars_grouped {
        return Err(ScoreError::ProcessingPipelineError(
            "Pass 4 must be run before Pass 5".to_string(),
        ));
    }

    let policy = config.pitch.off_by_one_policy;
    let mut mapped = 0;
    let mut diagnostics = Vec::new();

    for bar in &mut state.bars {
        let Some(staff) = staff_for_bar(&state.staff_groups, bar.number) else {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::StructuralMismatch,
                format!(
                    "bar {} has no complete staff group ({} available); {} notes skipped",
                    bar.number,
                    state.staff_groups.len(),
                    bar.events.len()
                ),
            ));
            continue;
        };

        for event in &mut bar.events {
            let diffs = staff_differences(event.cy, staff);
            event.differences = Some(diffs);
            event.staff_position = Some(staff_position(&diffs, policy));
            mapped += 1;
        }
    }

    state.diagnostics.extend(diagnostics);
    log::info!("  ✓ Mapped {} notes to staff positions", mapped);
    Ok(())
}
