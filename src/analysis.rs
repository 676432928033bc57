//! Recognition data model and analysis export

use crate::raster::PageState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Rhythmic duration label of a notehead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteType {
    Semibreve,
    DottedMinim,
    Minim,
    Crotchet,
    CrotchetRest,
    Quaver,
    Rest,
}

impl NoteType {
    /// Canonical duration in beats
    pub fn beats(&self) -> f32 {
        match self {
            NoteType::Semibreve => 4.0,
            NoteType::DottedMinim => 3.0,
            NoteType::Minim => 2.0,
            NoteType::Crotchet => 1.0,
            NoteType::CrotchetRest => 1.0,
            NoteType::Quaver => 0.5,
            // Rest length is not derived from the glyph
            NoteType::Rest => 1.0,
        }
    }

    /// Label used in the text artifacts
    pub fn label(&self) -> &'static str {
        match self {
            NoteType::Semibreve => "Semibreve",
            NoteType::DottedMinim => "Dotted Minim",
            NoteType::Minim => "Minim",
            NoteType::Crotchet => "Crotchet",
            NoteType::CrotchetRest => "Crotchet Rest",
            NoteType::Quaver => "Quaver",
            NoteType::Rest => "Rests",
        }
    }

    /// Case-insensitive inverse of [`NoteType::label`]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "semibreve" => Some(NoteType::Semibreve),
            "dotted minim" => Some(NoteType::DottedMinim),
            "minim" => Some(NoteType::Minim),
            "crotchet" => Some(NoteType::Crotchet),
            "crotchet rest" => Some(NoteType::CrotchetRest),
            "quaver" => Some(NoteType::Quaver),
            "rest" | "rests" => Some(NoteType::Rest),
            _ => None,
        }
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Staff clef
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clef {
    Treble,
    Bass,
}

impl Clef {
    /// Single-letter code of the clef artifact
    pub fn code(&self) -> char {
        match self {
            Clef::Treble => 'T',
            Clef::Bass => 'B',
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "T" => Some(Clef::Treble),
            "B" => Some(Clef::Bass),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Clef::Treble => "treble",
            Clef::Bass => "bass",
        }
    }
}

/// Where a notehead sits relative to the five lines of its staff.
///
/// The `Display` form is the fixed vocabulary written to the processed-notes
/// artifact, and `FromStr` reads it back. `Between` keeps the line order in
/// which the mapper reported it, so `Between(4, 3)` and `Between(3, 4)` are
/// distinct positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StaffPosition {
    OnLine(u8),
    Between(u8, u8),
    BelowLine5,
    BelowLine,
    Unknown,
}

impl fmt::Display for StaffPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaffPosition::OnLine(n) => write!(f, "On Line {}", n),
            StaffPosition::Between(a, b) => write!(f, "Between Line {} and Line {}", a, b),
            StaffPosition::BelowLine5 => f.write_str("Below Line 5"),
            StaffPosition::BelowLine => f.write_str("Below Line"),
            StaffPosition::Unknown => f.write_str("Unknown"),
        }
    }
}

impl FromStr for StaffPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let line_number = |text: &str| -> Result<u8, String> {
            match text.trim().parse::<u8>() {
                Ok(n) if (1..=5).contains(&n) => Ok(n),
                _ => Err(format!("invalid staff line number in '{}'", s)),
            }
        };

        match s {
            "Below Line 5" => return Ok(StaffPosition::BelowLine5),
            "Below Line" => return Ok(StaffPosition::BelowLine),
            "Unknown" => return Ok(StaffPosition::Unknown),
            _ => {}
        }

        if let Some(rest) = s.strip_prefix("On Line ") {
            return Ok(StaffPosition::OnLine(line_number(rest)?));
        }

        if let Some(rest) = s.strip_prefix("Between Line ") {
            if let Some((a, b)) = rest.split_once(" and Line ") {
                return Ok(StaffPosition::Between(line_number(a)?, line_number(b)?));
            }
        }

        Err(format!("unrecognised staff position '{}'", s))
    }
}

/// Five staff-line rows of one staff, top line first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffGroup(pub [i32; 5]);

impl StaffGroup {
    /// Slice a detected row list into consecutive groups of five.
    ///
    /// Returns the complete groups and the rows of a trailing partial group.
    pub fn group_rows(rows: &[i32]) -> (Vec<StaffGroup>, Vec<i32>) {
        let mut groups = Vec::with_capacity(rows.len() / 5);
        let mut chunks = rows.chunks_exact(5);
        for chunk in &mut chunks {
            groups.push(StaffGroup([chunk[0], chunk[1], chunk[2], chunk[3], chunk[4]]));
        }
        (groups, chunks.remainder().to_vec())
    }

    pub fn rows(&self) -> &[i32; 5] {
        &self.0
    }
}

/// Axis-aligned box `(x, y, w, h)` spanning one row of bar lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl BarBox {
    /// Inclusive containment on all four edges
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.x <= x && x <= self.x + self.w && self.y <= y && y <= self.y + self.h
    }
}

/// A contour that passed the notehead geometry filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobCandidate {
    pub cx: i32,
    pub cy: i32,
    pub area: f64,
    pub perimeter: f64,
    pub circularity: f64,
    pub aspect_ratio: f64,
    pub solidity: f64,
    pub contour_completeness: f64,
    pub filled: bool,
}

/// Notehead features after stem/beam correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFeatures {
    pub cx: i32,
    pub cy: i32,
    pub filled: bool,
    pub has_stem: bool,
    pub touches_beam: bool,
}

/// Classified note event, progressively enriched by the later passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub cx: i32,
    pub cy: i32,
    pub filled: bool,
    pub has_stem: bool,
    pub touches_beam: bool,
    pub note_type: NoteType,
    /// 1-based bar number, 0 until grouped
    pub bar: usize,
    pub differences: Option<[i32; 5]>,
    pub staff_position: Option<StaffPosition>,
    pub clef: Option<Clef>,
    pub midi: Option<u8>,
}

impl NoteEvent {
    pub fn new(features: NoteFeatures, note_type: NoteType) -> Self {
        Self {
            cx: features.cx,
            cy: features.cy,
            filled: features.filled,
            has_stem: features.has_stem,
            touches_beam: features.touches_beam,
            note_type,
            bar: 0,
            differences: None,
            staff_position: None,
            clef: None,
            midi: None,
        }
    }

    pub fn beats(&self) -> f32 {
        self.note_type.beats()
    }
}

/// One bar of events in playing order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub number: usize,
    pub events: Vec<NoteEvent>,
}

/// Clef marker read from the clef-classification artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClefMarker {
    pub index: usize,
    pub clef: Clef,
    pub x: i32,
    pub y: i32,
}

/// Final per-note output handed to MIDI export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedNote {
    pub bar: usize,
    pub note_type: String,
    pub position: StaffPosition,
    pub beats: f32,
    pub clef: Clef,
    pub midi: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    InputMissing,
    MalformedRecord,
    StructuralMismatch,
    ContourCapExceeded,
}

/// A non-fatal condition reported while processing a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        let message = message.into();
        log::warn!("{:?}: {}", kind, message);
        Self { kind, message }
    }
}

/// Summary written to `analysis.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub page_width: usize,
    pub page_height: usize,
    pub staff_rows: Vec<i32>,
    pub staff_groups: usize,
    pub bar_boxes: usize,
    pub candidates: usize,
    pub filled_candidates: usize,
    pub bars: usize,
    pub note_type_counts: BTreeMap<String, usize>,
    pub total_beats: f32,
    pub notes: Vec<ResolvedNote>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Export analysis results to JSON
pub fn export_analysis(state: &PageState, output_dir: &std::path::Path) -> crate::ScoreErrorResult<()> {
    std::fs::create_dir_all(output_dir)?;

    let analysis_path = output_dir.join("analysis.json");
    let analysis = build_analysis_results(state);

    let json = serde_json::to_string_pretty(&analysis)?;
    std::fs::write(&analysis_path, json)?;

    log::info!("Exported analysis results to {}", analysis_path.display());
    Ok(())
}

pub fn build_analysis_results(state: &PageState) -> AnalysisResults {
    let mut note_type_counts = BTreeMap::new();
    for event in state.bars.iter().flat_map(|bar| bar.events.iter()) {
        *note_type_counts
            .entry(event.note_type.label().to_string())
            .or_insert(0) += 1;
    }

    AnalysisResults {
        page_width: state.width(),
        page_height: state.height(),
        staff_rows: state.staff_rows.clone(),
        staff_groups: state.staff_groups.len(),
        bar_boxes: state.bar_boxes.len(),
        candidates: state.candidates.len(),
        filled_candidates: state.candidates.iter().filter(|c| c.filled).count(),
        bars: state.bars.len(),
        note_type_counts,
        total_beats: state.resolved_notes.iter().map(|n| n.beats).sum(),
        notes: state.resolved_notes.clone(),
        diagnostics: state.diagnostics.clone(),
    }
}
