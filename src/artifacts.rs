//! Line-oriented text artifacts exchanged between recognition stages
//!
//! * `results.txt`: `bar, note type, cx, cy` per notehead, after a header.
//! * `processed_notes.txt`: notes with staff differences, position and
//!   duration; the input of clef resolution.
//! * `clef_classification.txt`: `index,type,x,y` per clef marker.
//!
//! Readers never fail on a bad record: the record is skipped and a
//! [`Diagnostic`] is returned alongside the parsed records.

use crate::analysis::{
    Bar, Clef, ClefMarker, Diagnostic, DiagnosticKind, NoteType, StaffPosition,
};
use crate::error::Result as ScoreErrorResult;
use std::fmt::Write as _;
use std::path::Path;

pub const RESULTS_HEADER: &str = "Bar, Note Type, CX, CY";

/// One line of the results artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultRecord {
    pub bar: usize,
    pub note_type: NoteType,
    pub cx: i32,
    pub cy: i32,
}

/// One line of the processed-notes artifact, as the clef resolver needs it
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedRecord {
    pub bar: usize,
    pub note_type: String,
    pub position: StaffPosition,
    pub beats: f32,
}

/// Beats as written in the artifacts: whole numbers without a fraction
pub fn format_beats(beats: f32) -> String {
    if beats.fract() == 0.0 {
        format!("{}", beats as i64)
    } else {
        format!("{}", beats)
    }
}

pub fn format_results(bars: &[Bar]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", RESULTS_HEADER);
    for bar in bars {
        for event in &bar.events {
            let _ = writeln!(
                out,
                "{}, {}, {}, {}",
                bar.number,
                event.note_type.label(),
                event.cx,
                event.cy
            );
        }
    }
    out
}

pub fn write_results<P: AsRef<Path>>(bars: &[Bar], path: P) -> ScoreErrorResult<()> {
    std::fs::write(path, format_results(bars))?;
    Ok(())
}

/// Parse the results artifact. The first line is a header and is always
/// dropped; fields may be separated by `,` or `, `.
pub fn parse_results(text: &str) -> (Vec<ResultRecord>, Vec<Diagnostic>) {
    let mut records = Vec::new();
    let mut diagnostics = Vec::new();

    for (line_no, line) in text.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        match parse_result_line(line) {
            Ok(record) => records.push(record),
            Err(reason) => diagnostics.push(Diagnostic::new(
                DiagnosticKind::MalformedRecord,
                format!("results line {}: {} ('{}')", line_no + 1, reason, line.trim()),
            )),
        }
    }

    (records, diagnostics)
}

fn parse_result_line(line: &str) -> Result<ResultRecord, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 4 {
        return Err(format!("expected 4 fields, found {}", fields.len()));
    }

    let bar: usize = fields[0]
        .parse()
        .map_err(|_| format!("invalid bar '{}'", fields[0]))?;
    if bar == 0 {
        return Err("bar numbers start at 1".to_string());
    }
    let note_type = NoteType::from_label(fields[1])
        .ok_or_else(|| format!("unknown note type '{}'", fields[1]))?;
    let cx: i32 = fields[2]
        .parse()
        .map_err(|_| format!("invalid x '{}'", fields[2]))?;
    let cy: i32 = fields[3]
        .parse()
        .map_err(|_| format!("invalid y '{}'", fields[3]))?;

    Ok(ResultRecord {
        bar,
        note_type,
        cx,
        cy,
    })
}

pub fn read_results<P: AsRef<Path>>(
    path: P,
) -> ScoreErrorResult<(Vec<ResultRecord>, Vec<Diagnostic>)> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_results(&text))
}

/// Render the processed-notes artifact. Notes the mapper could not place are
/// written with `Position: Unknown`.
pub fn format_processed_notes(bars: &[Bar]) -> String {
    let mut out = String::new();
    for bar in bars {
        for event in &bar.events {
            let Some(diffs) = event.differences else {
                continue;
            };
            let position = event.staff_position.unwrap_or(StaffPosition::Unknown);
            let _ = writeln!(
                out,
                " {}, {}, CX {}, CY {}, Differences: [{}, {}, {}, {}, {}], Position: {}, Duration: {} beats",
                bar.number,
                event.note_type.label(),
                event.cx,
                event.cy,
                diffs[0],
                diffs[1],
                diffs[2],
                diffs[3],
                diffs[4],
                position,
                format_beats(event.beats())
            );
        }
    }
    out
}

pub fn write_processed_notes<P: AsRef<Path>>(bars: &[Bar], path: P) -> ScoreErrorResult<()> {
    std::fs::write(path, format_processed_notes(bars))?;
    Ok(())
}

const DURATION_MARKER: &str = "Duration:";
const POSITION_MARKER: &str = "Position:";

/// Parse the processed-notes artifact.
///
/// The bar is the first integer of the first field, the duration is the
/// token following `Duration:`, and the position is the text after the last
/// `Position:` that precedes `Duration:`. Position text outside the staff
/// vocabulary is kept as [`StaffPosition::Unknown`].
pub fn parse_processed_notes(text: &str) -> (Vec<ProcessedRecord>, Vec<Diagnostic>) {
    let mut records = Vec::new();
    let mut diagnostics = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_processed_line(line) {
            Ok(record) => records.push(record),
            Err(reason) => diagnostics.push(Diagnostic::new(
                DiagnosticKind::MalformedRecord,
                format!(
                    "processed notes line {}: {} ('{}')",
                    line_no + 1,
                    reason,
                    line.trim()
                ),
            )),
        }
    }

    (records, diagnostics)
}

fn first_integer(text: &str) -> Option<usize> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn parse_processed_line(line: &str) -> Result<ProcessedRecord, String> {
    let mut fields = line.split(',');
    let bar_field = fields.next().unwrap_or("");
    let note_type = fields
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or("missing note type")?
        .to_string();

    let bar = first_integer(bar_field).ok_or_else(|| format!("no bar number in '{}'", bar_field))?;

    let duration_at = line.find(DURATION_MARKER).ok_or("missing duration")?;
    let duration_token = line[duration_at + DURATION_MARKER.len()..]
        .split_whitespace()
        .next()
        .ok_or("empty duration")?;
    let beats: f32 = duration_token
        .trim_end_matches(',')
        .parse()
        .map_err(|_| format!("invalid duration '{}'", duration_token))?;

    let head = &line[..duration_at];
    let position_at = head.rfind(POSITION_MARKER).ok_or("missing position")?;
    let position_text = head[position_at + POSITION_MARKER.len()..]
        .trim()
        .trim_end_matches(',')
        .trim();
    if position_text.is_empty() {
        return Err("empty position".to_string());
    }
    let position = position_text.parse().unwrap_or_else(|_| {
        log::debug!("Position '{}' is outside the staff vocabulary", position_text);
        StaffPosition::Unknown
    });

    Ok(ProcessedRecord {
        bar,
        note_type,
        position,
        beats,
    })
}

pub fn read_processed_notes<P: AsRef<Path>>(
    path: P,
) -> ScoreErrorResult<(Vec<ProcessedRecord>, Vec<Diagnostic>)> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_processed_notes(&text))
}

pub fn format_clef_markers(markers: &[ClefMarker]) -> String {
    let mut out = String::new();
    for marker in markers {
        let _ = writeln!(
            out,
            "{},{},{},{}",
            marker.index,
            marker.clef.code(),
            marker.x,
            marker.y
        );
    }
    out
}

pub fn write_clef_markers<P: AsRef<Path>>(markers: &[ClefMarker], path: P) -> ScoreErrorResult<()> {
    std::fs::write(path, format_clef_markers(markers))?;
    Ok(())
}

/// Parse the clef artifact: strictly four comma-separated fields per line.
/// Markers come back sorted by index.
pub fn parse_clef_markers(text: &str) -> (Vec<ClefMarker>, Vec<Diagnostic>) {
    let mut markers = Vec::new();
    let mut diagnostics = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_clef_line(line) {
            Ok(marker) => markers.push(marker),
            Err(reason) => diagnostics.push(Diagnostic::new(
                DiagnosticKind::MalformedRecord,
                format!("clef line {}: {} ('{}')", line_no + 1, reason, line.trim()),
            )),
        }
    }

    markers.sort_by_key(|m| m.index);
    (markers, diagnostics)
}

fn parse_clef_line(line: &str) -> Result<ClefMarker, String> {
    let fields: Vec<&str> = line.trim().split(',').map(str::trim).collect();
    if fields.len() != 4 {
        return Err(format!("expected 4 fields, found {}", fields.len()));
    }
    let index: usize = fields[0]
        .parse()
        .map_err(|_| format!("invalid index '{}'", fields[0]))?;
    let clef = Clef::from_code(fields[1]).ok_or_else(|| format!("unknown clef '{}'", fields[1]))?;
    let x: i32 = fields[2]
        .parse()
        .map_err(|_| format!("invalid x '{}'", fields[2]))?;
    let y: i32 = fields[3]
        .parse()
        .map_err(|_| format!("invalid y '{}'", fields[3]))?;
    Ok(ClefMarker { index, clef, x, y })
}

pub fn read_clef_markers<P: AsRef<Path>>(
    path: P,
) -> ScoreErrorResult<(Vec<ClefMarker>, Vec<Diagnostic>)> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_clef_markers(&text))
}
