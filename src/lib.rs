//! Score-to-MIDI Recognition System
//!
//! A deterministic optical music recognition pipeline that turns a cleaned,
//! staff-stripped notehead raster into bar-ordered note events and MIDI.

pub mod analysis;
pub mod artifacts;
pub mod config;
pub mod contour;
pub mod detect;
pub mod error;
pub mod midi;
pub mod passes;
pub mod qa;
pub mod raster;

pub use analysis::{Clef, NoteType, ResolvedNote, StaffPosition};
pub use config::Config;
pub use error::{Result as ScoreErrorResult, ScoreError};
pub use raster::PageState;

use analysis::{ClefMarker, Diagnostic, DiagnosticKind};
use artifacts::ResultRecord;
use std::path::{Path, PathBuf};

/// Input files of one page. Only the notehead raster is required.
#[derive(Debug, Clone, Default)]
pub struct PageInputs {
    /// Staff-stripped notehead raster
    pub noteheads: PathBuf,
    /// Page with staff lines intact, used for staff, bar-line and clef detection
    pub staff_image: Option<PathBuf>,
    /// Explicit staff rows; overrides detection
    pub staff_rows: Option<Vec<i32>>,
    pub stems: Option<PathBuf>,
    pub beams: Option<PathBuf>,
    /// Clef classification artifact; overrides clef detection
    pub clefs: Option<PathBuf>,
    /// `noteheads` is a full page: strip its staff lines before recognition
    /// and use it for layout detection unless `staff_image` is given
    pub strip_staff: bool,
}

impl PageInputs {
    pub fn new<P: Into<PathBuf>>(noteheads: P) -> Self {
        Self {
            noteheads: noteheads.into(),
            ..Self::default()
        }
    }
}

/// Main processing pipeline for score-to-MIDI conversion
pub struct ScoreToMidi {
    config: Config,
}

impl ScoreToMidi {
    /// Create a new processor with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process one page and write MIDI and analysis output
    pub fn process<P: AsRef<Path>>(
        &self,
        inputs: &PageInputs,
        output_dir: P,
    ) -> ScoreErrorResult<PageState> {
        let mut state = self.load_page(inputs)?;

        self.run_pipeline(&mut state)?;

        self.export_results(&state, output_dir)?;

        Ok(state)
    }

    /// Load the notehead raster and gather the layout inputs around it.
    ///
    /// Only a notehead raster that fails to load is fatal; every other
    /// missing input leaves the corresponding state empty. With
    /// `strip_staff` the input page doubles as the staff image.
    pub fn load_page(&self, inputs: &PageInputs) -> ScoreErrorResult<PageState> {
        let threshold = self.config.raster.binarize_threshold;
        let mut state = PageState::load(&inputs.noteheads, &self.config)?;
        let full_page = if inputs.strip_staff {
            let page = state.raster.clone();
            state.raster = detect::strip_staff_lines(&page, &self.config.staff);
            Some(page)
        } else {
            None
        };

        state.stem_mask = load_optional_mask("stem", inputs.stems.as_deref(), threshold);
        state.beam_mask = load_optional_mask("beam", inputs.beams.as_deref(), threshold);

        let staff_image = match &inputs.staff_image {
            Some(path) => match raster::load_binary_raster(path, threshold) {
                Ok(raster) => Some(raster),
                Err(e) => {
                    state.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::InputMissing,
                        format!("staff image unavailable: {}", e),
                    ));
                    None
                }
            },
            None => None,
        }
        .or(full_page);
        let layout = staff_image.as_ref().unwrap_or(&state.raster);

        state.staff_rows = match &inputs.staff_rows {
            Some(rows) => rows.clone(),
            None => detect::staff_line_rows(layout, &self.config.staff),
        };
        state.bar_boxes = detect::bar_line_boxes(layout, &self.config.bar_lines);

        state.clef_markers = match (&inputs.clefs, &staff_image) {
            (Some(path), _) => read_clefs_or_report(path, &mut state.diagnostics),
            (None, Some(image)) => {
                detect::clef_markers(image, &self.config.clef, self.config.limits.max_contours)
            }
            (None, None) => Vec::new(),
        };

        Ok(state)
    }

    /// Execute the complete multi-pass pipeline
    pub fn run_pipeline(&self, state: &mut PageState) -> ScoreErrorResult<()> {
        // Pass 0: Preflight & Staff Grouping
        passes::pass_0::run(state, &self.config)?;

        // Pass 1: Notehead Blob Classification
        passes::pass_1::run(state, &self.config)?;

        // Pass 2: Stem & Beam Correlation
        passes::pass_2::run(state, &self.config)?;

        // Pass 3: Duration Classification
        passes::pass_3::run(state, &self.config)?;

        // Pass 4: Bar Grouping & Ordering
        passes::pass_4::run(state, &self.config)?;

        // Pass 5: Staff-Relative Pitch Mapping
        passes::pass_5::run(state, &self.config)?;

        // Pass 6: Clef Resolution & MIDI Numbering
        passes::pass_6::run(state, &self.config)?;

        Ok(())
    }

    /// Map a results artifact to pitches without a raster: staff grouping,
    /// pitch mapping and clef resolution only.
    pub fn process_results(
        &self,
        records: &[ResultRecord],
        staff_rows: Vec<i32>,
        clef_markers: Vec<ClefMarker>,
    ) -> ScoreErrorResult<PageState> {
        let mut state = PageState::new(ndarray::Array2::from_elem((0, 0), raster::BACKGROUND))
            .with_staff_rows(staff_rows)
            .with_clef_markers(clef_markers);
        state.clef_markers.sort_by_key(|m| m.index);

        passes::pass_0::group_staff_rows(&mut state);
        state.bars = passes::pass_4::bars_from_results(records);
        state.bars_grouped = true;

        passes::pass_5::run(&mut state, &self.config)?;
        passes::pass_6::run(&mut state, &self.config)?;
        Ok(state)
    }

    /// Re-run clef resolution and MIDI export from text artifacts alone.
    ///
    /// Returns the resolved notes with the diagnostics of both artifacts.
    pub fn resolve_artifacts(
        &self,
        processed_notes: &Path,
        clefs: Option<&Path>,
        output_dir: &Path,
    ) -> ScoreErrorResult<(Vec<ResolvedNote>, Vec<Diagnostic>)> {
        let (records, mut diagnostics) = artifacts::read_processed_notes(processed_notes)?;
        if records.is_empty() && !diagnostics.is_empty() {
            return Err(ScoreError::ArtifactParseError(format!(
                "no usable records in {}",
                processed_notes.display()
            )));
        }

        let markers = match clefs {
            Some(path) => read_clefs_or_report(path, &mut diagnostics),
            None => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::InputMissing,
                    "no clef artifact; every bar uses the default clef",
                ));
                Vec::new()
            }
        };

        let notes =
            passes::pass_6::resolve_records(&records, &markers, self.config.clef.default_clef);
        midi::export_midi(&notes, output_dir, &self.config)?;
        Ok((notes, diagnostics))
    }

    /// Export MIDI, text artifacts, analysis and QA results
    pub fn export_results<P: AsRef<Path>>(
        &self,
        state: &PageState,
        output_dir: P,
    ) -> ScoreErrorResult<()> {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)?;

        if self.config.export.write_artifacts {
            artifacts::write_results(&state.bars, output_dir.join("results.txt"))?;
            artifacts::write_processed_notes(&state.bars, output_dir.join("processed_notes.txt"))?;
            artifacts::write_clef_markers(
                &state.clef_markers,
                output_dir.join("clef_classification.txt"),
            )?;
        }

        midi::export_midi(&state.resolved_notes, output_dir, &self.config)?;
        analysis::export_analysis(state, output_dir)?;
        qa::generate_artifacts(state, output_dir, &self.config)?;
        Ok(())
    }
}

fn load_optional_mask(name: &str, path: Option<&Path>, threshold: u8) -> Option<raster::Raster> {
    let path = path?;
    match raster::load_mask(path, threshold) {
        Ok(mask) => Some(mask),
        Err(e) => {
            log::warn!("Could not load {} mask {}: {}", name, path.display(), e);
            None
        }
    }
}

/// Read a clef artifact; a missing file yields no markers and a diagnostic
fn read_clefs_or_report(path: &Path, diagnostics: &mut Vec<Diagnostic>) -> Vec<ClefMarker> {
    match artifacts::read_clef_markers(path) {
        Ok((markers, parse_diagnostics)) => {
            diagnostics.extend(parse_diagnostics);
            markers
        }
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::InputMissing,
                format!("clef artifact {} unavailable: {}", path.display(), e),
            ));
            Vec::new()
        }
    }
}

/// Validate configuration and input files
pub fn validate_input<P: AsRef<Path>>(input_path: P, config: &Config) -> ScoreErrorResult<()> {
    // Check input file exists and decodes
    raster::validate_raster_file(input_path)?;

    // Validate configuration
    config::validate_config(config)
        .map_err(|e| ScoreError::ConfigValidationFailed(e.to_string()))?;

    Ok(())
}
