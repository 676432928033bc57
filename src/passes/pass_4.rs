//! Pass 4: Bar Grouping & Ordering

use crate::analysis::{Bar, NoteEvent, NoteFeatures};
use crate::artifacts::ResultRecord;
use crate::config::Config;
use crate::error::{Result as ScoreErrorResult, ScoreError};
use crate::raster::PageState;

/// Split events into bars by vertical gaps, then order each bar left to
/// right. Both sorts are stable so equal coordinates keep detection order.
pub fn group_into_bars(mut events: Vec<NoteEvent>, bar_gap_px: i32) -> Vec<Bar> {
    events.sort_by_key(|e| e.cy);

    let mut groups: Vec<Vec<NoteEvent>> = Vec::new();
    let mut prev_cy: Option<i32> = None;
    for event in events {
        let starts_bar = prev_cy.map_or(true, |prev| event.cy - prev > bar_gap_px);
        prev_cy = Some(event.cy);
        if starts_bar || groups.is_empty() {
            groups.push(vec![event]);
        } else if let Some(current) = groups.last_mut() {
            current.push(event);
        }
    }

    groups
        .into_iter()
        .enumerate()
        .map(|(i, mut events)| {
            events.sort_by_key(|e| e.cx);
            let number = i + 1;
            for event in &mut events {
                event.bar = number;
            }
            Bar { number, events }
        })
        .collect()
}

/// Rebuild bars from a results artifact, keeping record order within a bar
pub fn bars_from_results(records: &[ResultRecord]) -> Vec<Bar> {
    let mut bars: Vec<Bar> = Vec::new();
    for record in records {
        let features = NoteFeatures {
            cx: record.cx,
            cy: record.cy,
            filled: false,
            has_stem: false,
            touches_beam: false,
        };
        let mut event = NoteEvent::new(features, record.note_type);
        event.bar = record.bar;

        match bars.iter_mut().find(|b| b.number == record.bar) {
            Some(bar) => bar.events.push(event),
            None => bars.push(Bar {
                number: record.bar,
                events: vec![event],
            }),
        }
    }
    bars.sort_by_key(|b| b.number);
    bars
}

pub fn run(state: &mut PageState, config: &Config) -> ScoreErrorResult<()> {
    log::info!("Pass 4: Bar Grouping & Ordering");

    if !state.preflight_done {
        return Err(ScoreError::ProcessingPipelineError(
            "Pass 0 must be run before Pass 4".to_string(),
        ));
    }

    let events = std::mem::take(&mut state.note_events);
    let mut bars = group_into_bars(events, config.grouping.bar_gap_px);

    if let Some(max_bars) = config.grouping.max_bars {
        if bars.len() > max_bars {
            log::warn!("Keeping the first {} of {} bars", max_bars, bars.len());
            bars.truncate(max_bars);
        }
    }

    state.bars = bars;
    state.bars_grouped = true;

    log::info!(
        "  ✓ {} bars, {} events",
        state.bars.len(),
        state.ordered_events().count()
    );
    Ok(())
}
