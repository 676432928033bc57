//! Raster I/O, neighbourhood lookups and the per-page processing state

use crate::analysis::{
    Bar, BarBox, BlobCandidate, ClefMarker, Diagnostic, NoteEvent, NoteFeatures, ResolvedNote,
    StaffGroup,
};
use crate::config::Config;
use crate::error::{Result as ScoreErrorResult, ScoreError};
use ndarray::Array2;
use std::path::Path;

/// Binary raster indexed `[[y, x]]`, values restricted to {0, 255}
pub type Raster = Array2<u8>;

pub const INK: u8 = 0;
pub const BACKGROUND: u8 = 255;
/// Value of a detected pixel in stem and beam masks
pub const MASK_SET: u8 = 255;

pub fn is_ink_value(value: u8) -> bool {
    value == INK
}

/// Processing state for one page
#[derive(Debug, Clone)]
pub struct PageState {
    /// Staff-stripped notehead raster (0 = ink)
    pub raster: Raster,
    /// Detected vertical-line pixels (255 = stem)
    pub stem_mask: Option<Raster>,
    /// Detected beam-line pixels (255 = beam)
    pub beam_mask: Option<Raster>,
    /// Staff-line rows in detection order
    pub staff_rows: Vec<i32>,
    /// Clef markers sorted by index
    pub clef_markers: Vec<ClefMarker>,
    /// Bar-line boxes used as a notehead membership filter
    pub bar_boxes: Vec<BarBox>,

    // Pass 0: Preflight
    pub staff_groups: Vec<StaffGroup>,
    pub preflight_done: bool,

    // Pass 1: Blob classification
    pub candidates: Vec<BlobCandidate>,

    // Pass 2: Spatial correlation
    pub note_features: Vec<NoteFeatures>,

    // Pass 3: Duration classification
    pub note_events: Vec<NoteEvent>,

    // Pass 4: Bar grouping
    pub bars: Vec<Bar>,
    pub bars_grouped: bool,

    // Pass 6: Clef resolution
    pub resolved_notes: Vec<ResolvedNote>,

    /// Non-fatal conditions collected by every pass
    pub diagnostics: Vec<Diagnostic>,
}

impl PageState {
    /// Create a state around an in-memory notehead raster
    pub fn new(raster: Raster) -> Self {
        PageState {
            raster,
            stem_mask: None,
            beam_mask: None,
            staff_rows: Vec::new(),
            clef_markers: Vec::new(),
            bar_boxes: Vec::new(),
            staff_groups: Vec::new(),
            preflight_done: false,
            candidates: Vec::new(),
            note_features: Vec::new(),
            note_events: Vec::new(),
            bars: Vec::new(),
            bars_grouped: false,
            resolved_notes: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Load the notehead raster from an image file
    pub fn load<P: AsRef<Path>>(path: P, config: &Config) -> ScoreErrorResult<Self> {
        let raster = load_binary_raster(path, config.raster.binarize_threshold)?;
        Ok(Self::new(raster))
    }

    pub fn with_stem_mask(mut self, mask: Raster) -> Self {
        self.stem_mask = Some(mask);
        self
    }

    pub fn with_beam_mask(mut self, mask: Raster) -> Self {
        self.beam_mask = Some(mask);
        self
    }

    pub fn with_staff_rows(mut self, rows: Vec<i32>) -> Self {
        self.staff_rows = rows;
        self
    }

    pub fn with_clef_markers(mut self, markers: Vec<ClefMarker>) -> Self {
        self.clef_markers = markers;
        self
    }

    pub fn with_bar_boxes(mut self, boxes: Vec<BarBox>) -> Self {
        self.bar_boxes = boxes;
        self
    }

    pub fn width(&self) -> usize {
        self.raster.ncols()
    }

    pub fn height(&self) -> usize {
        self.raster.nrows()
    }

    /// All grouped events in playing order
    pub fn ordered_events(&self) -> impl Iterator<Item = &NoteEvent> {
        self.bars.iter().flat_map(|bar| bar.events.iter())
    }
}

/// Load an image as a binary raster: luma above `threshold` is background.
pub fn load_binary_raster<P: AsRef<Path>>(path: P, threshold: u8) -> ScoreErrorResult<Raster> {
    let path = path.as_ref();
    let luma = image::open(path)
        .map_err(|e| ScoreError::InvalidRaster(format!("{}: {}", path.display(), e)))?
        .into_luma8();
    let (width, height) = luma.dimensions();
    let raster = Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        binarize(luma.get_pixel(x as u32, y as u32).0[0], threshold)
    });
    Ok(raster)
}

/// Load a detector mask; set pixels become [`MASK_SET`], everything else 0.
pub fn load_mask<P: AsRef<Path>>(path: P, threshold: u8) -> ScoreErrorResult<Raster> {
    // a mask is stored white-on-black, so the binarized values already line up
    load_binary_raster(path, threshold)
}

pub fn binarize(value: u8, threshold: u8) -> u8 {
    if value > threshold {
        BACKGROUND
    } else {
        INK
    }
}

/// Save a binary raster as an 8-bit grayscale PNG
pub fn save_raster<P: AsRef<Path>>(raster: &Raster, path: P) -> ScoreErrorResult<()> {
    let (height, width) = raster.dim();
    let img = image::GrayImage::from_fn(width as u32, height as u32, |x, y| {
        image::Luma([raster[[y as usize, x as usize]]])
    });
    img.save(path.as_ref())?;
    Ok(())
}

/// Validate that an input raster exists and decodes
pub fn validate_raster_file<P: AsRef<Path>>(path: P) -> ScoreErrorResult<()> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ScoreError::InputValidationError(format!(
            "Raster file does not exist: {}",
            path.display()
        )));
    }

    let (width, height) = image::image_dimensions(path)
        .map_err(|e| ScoreError::InvalidRaster(format!("{}: {}", path.display(), e)))?;

    if width == 0 || height == 0 {
        return Err(ScoreError::InputValidationError(format!(
            "Raster is empty: {}",
            path.display()
        )));
    }

    Ok(())
}

/// Half-open pixel window `[x0, x1) x [y0, y1)`; may extend past the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Window {
    /// Square of side `2 * half` centred on `(cx, cy)`
    pub fn centered(cx: i32, cy: i32, half: i32) -> Self {
        Self {
            x0: cx - half,
            y0: cy - half,
            x1: cx + half,
            y1: cy + half,
        }
    }

    /// Clip to an image of the given size; `None` if nothing remains
    pub fn clip(&self, width: usize, height: usize) -> Option<(usize, usize, usize, usize)> {
        let x0 = self.x0.max(0);
        let y0 = self.y0.max(0);
        let x1 = self.x1.min(width as i32);
        let y1 = self.y1.min(height as i32);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as usize, y0 as usize, x1 as usize, y1 as usize))
    }
}

/// Whether any pixel inside the clipped window equals `value`
pub fn any_value(raster: &Raster, window: Window, value: u8) -> bool {
    let (height, width) = raster.dim();
    let Some((x0, y0, x1, y1)) = window.clip(width, height) else {
        return false;
    };
    raster
        .slice(ndarray::s![y0..y1, x0..x1])
        .iter()
        .any(|&v| v == value)
}

/// Raster value at `(x, y)`, `None` outside the image
pub fn pixel(raster: &Raster, x: i32, y: i32) -> Option<u8> {
    if x < 0 || y < 0 {
        return None;
    }
    raster.get([y as usize, x as usize]).copied()
}
