//! Pass 6: Clef Resolution & MIDI Numbering

use crate::analysis::{Clef, ClefMarker, ResolvedNote, StaffPosition};
use crate::artifacts::ProcessedRecord;
use crate::config::Config;
use crate::error::{Result as ScoreErrorResult, ScoreError};
use crate::raster::PageState;

const TREBLE_FALLBACK: &str = "C4";
const BASS_FALLBACK: &str = "C3";
const TREBLE_FALLBACK_MIDI: u8 = 60;
const BASS_FALLBACK_MIDI: u8 = 48;

/// Clef of the marker with the greatest index not past `bar`.
/// `markers` must be sorted by index.
pub fn clef_for_bar(markers: &[ClefMarker], bar: usize, default: Clef) -> Clef {
    markers
        .iter()
        .take_while(|m| m.index <= bar)
        .last()
        .map(|m| m.clef)
        .unwrap_or(default)
}

/// Note name sounded by a staff position under a clef
pub fn pitch_name(position: StaffPosition, clef: Clef) -> &'static str {
    use StaffPosition::*;
    match clef {
        Clef::Treble => match position {
            OnLine(1) => "F#5",
            Between(1, 2) => "E5",
            OnLine(2) => "D5",
            Between(2, 3) => "C5",
            OnLine(3) => "B4",
            Between(3, 4) | Between(4, 3) => "A4",
            OnLine(4) => "G4",
            Between(4, 5) => "F#4",
            OnLine(5) => "E4",
            BelowLine5 => "D4",
            BelowLine => "C4",
            _ => TREBLE_FALLBACK,
        },
        Clef::Bass => match position {
            OnLine(1) => "A3",
            Between(1, 2) => "G3",
            OnLine(2) => "F#3",
            Between(2, 3) => "E3",
            OnLine(3) => "D3",
            Between(3, 4) | Between(4, 3) => "C3",
            OnLine(4) => "B2",
            Between(4, 5) => "A2",
            OnLine(5) => "G2",
            BelowLine5 => "F2",
            _ => BASS_FALLBACK,
        },
    }
}

/// Parse a note name such as `F#5` into a MIDI number
pub fn note_name_to_midi(name: &str) -> Option<u8> {
    let mut chars = name.chars();
    let letter = chars.next()?;
    let rest = chars.as_str();
    let (sharp, octave_text) = match rest.strip_prefix('#') {
        Some(octave) => (1, octave),
        None => (0, rest),
    };

    let semitone: i32 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let octave: i32 = octave_text.parse().ok()?;
    let midi = (octave + 1) * 12 + semitone + sharp;
    u8::try_from(midi).ok().filter(|&m| m <= 127)
}

/// MIDI number of a position under a clef. Treble names are accepted in
/// octaves 4 to 6 and bass names in octaves 1 to 3; anything else falls
/// back to middle C (treble) or C3 (bass).
pub fn midi_number(position: StaffPosition, clef: Clef) -> u8 {
    let name = pitch_name(position, clef);
    let (octaves, fallback) = match clef {
        Clef::Treble => (4..=6, TREBLE_FALLBACK_MIDI),
        Clef::Bass => (1..=3, BASS_FALLBACK_MIDI),
    };

    let in_range = name
        .chars()
        .last()
        .and_then(|c| c.to_digit(10))
        .is_some_and(|octave| octaves.contains(&octave));
    if !in_range {
        return fallback;
    }
    note_name_to_midi(name).unwrap_or(fallback)
}

/// Resolve processed-note records into MIDI-ready notes, keeping record order
pub fn resolve_records(
    records: &[ProcessedRecord],
    markers: &[ClefMarker],
    default: Clef,
) -> Vec<ResolvedNote> {
    let mut sorted = markers.to_vec();
    sorted.sort_by_key(|m| m.index);

    records
        .iter()
        .map(|record| {
            let clef = clef_for_bar(&sorted, record.bar, default);
            let midi = midi_number(record.position, clef);
            log::debug!(
                "  bar {} {} {} -> {} ({})",
                record.bar,
                record.note_type,
                record.position,
                midi,
                clef.name()
            );
            ResolvedNote {
                bar: record.bar,
                note_type: record.note_type.clone(),
                position: record.position,
                beats: record.beats,
                clef,
                midi,
            }
        })
        .collect()
}

pub fn run(state: &mut PageState, config: &Config) -> ScoreErrorResult<()> {
    log::info!("Pass 6: Clef Resolution & MIDI Numbering");

    if !state.bars_grouped {
        return Err(ScoreError::ProcessingPipelineError(
            "Pass 4 must be run before Pass 6".to_string(),
        ));
    }

    let default = config.clef.default_clef;
    let mut resolved = Vec::new();

    for bar in &mut state.bars {
        let clef = clef_for_bar(&state.clef_markers, bar.number, default);
        for event in &mut bar.events {
            // notes without a staff were reported by Pass 5
            let Some(position) = event.staff_position else {
                continue;
            };
            let midi = midi_number(position, clef);
            event.clef = Some(clef);
            event.midi = Some(midi);
            resolved.push(ResolvedNote {
                bar: bar.number,
                note_type: event.note_type.label().to_string(),
                position,
                beats: event.beats(),
                clef,
                midi,
            });
        }
    }

    log::info!("  ✓ Resolved {} notes", resolved.len());
    state.resolved_notes = resolved;
    Ok(())
}
