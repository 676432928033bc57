//! Configuration system for the score-to-MIDI processor

use crate::analysis::Clef;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub raster: RasterConfig,
    pub blob: BlobConfig,
    pub prefilter: PrefilterConfig,
    pub correlation: CorrelationConfig,
    pub duration: DurationConfig,
    pub grouping: GroupingConfig,
    pub pitch: PitchConfig,
    pub clef: ClefConfig,
    pub staff: StaffConfig,
    pub bar_lines: BarLineConfig,
    pub limits: LimitsConfig,
    pub export: ExportConfig,
    pub qa: QaConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            raster: RasterConfig::default(),
            blob: BlobConfig::default(),
            prefilter: PrefilterConfig::default(),
            correlation: CorrelationConfig::default(),
            duration: DurationConfig::default(),
            grouping: GroupingConfig::default(),
            pitch: PitchConfig::default(),
            clef: ClefConfig::default(),
            staff: StaffConfig::default(),
            bar_lines: BarLineConfig::default(),
            limits: LimitsConfig::default(),
            export: ExportConfig::default(),
            qa: QaConfig::default(),
        }
    }
}

/// Raster loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Grayscale values strictly above this become background (255)
    pub binarize_threshold: u8,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            binarize_threshold: 127,
        }
    }
}

/// Notehead blob geometry thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
    pub circularity_threshold: f64,
    pub aspect_ratio_threshold: f64,
    pub min_area: f64,
    pub max_area: f64,
    pub solidity_threshold: f64,
    pub completeness_threshold: f64,
    /// Candidates smaller than this are always unfilled
    pub small_dot_area_threshold: f64,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            circularity_threshold: 0.2,
            aspect_ratio_threshold: 2.8,
            min_area: 1.0,
            max_area: 500.0,
            solidity_threshold: 0.5,
            completeness_threshold: 0.4,
            small_dot_area_threshold: 30.0,
        }
    }
}

/// Candidate pre-filters applied before classification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefilterConfig {
    /// Drop candidates too close to the leftmost blob (clef / key signature)
    pub leftmost_margin_enabled: bool,
    pub leftmost_margin_px: i32,
    /// Drop candidates outside every detected bar-line box
    pub bar_membership_enabled: bool,
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self {
            leftmost_margin_enabled: true,
            leftmost_margin_px: 50,
            bar_membership_enabled: true,
        }
    }
}

/// Stem / beam neighbourhood geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Half side of the square stem window
    pub stem_half_size: i32,
    pub beam_half_width: i32,
    pub beam_extent_up: i32,
    pub beam_extent_down: i32,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            stem_half_size: 6,
            beam_half_width: 6,
            beam_extent_up: 16,
            beam_extent_down: 16,
        }
    }
}

/// Where the filled/hollow flag of a notehead is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillSource {
    /// Label assigned by the blob classifier
    BlobLabel,
    /// Raster pixel directly under the centroid
    CentroidPixel,
}

/// Duration classifier thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationConfig {
    pub fill_source: FillSource,
    /// Half side of the crotchet-rest density window (12x12)
    pub density_half_size: i32,
    pub crotchet_rest_threshold: usize,
    /// Horizontal offset from the centroid to the augmentation-dot box
    pub dot_offset_x: i32,
    pub dot_box_size: i32,
    /// Half side of the semibreve density window (14x14)
    pub semibreve_half_size: i32,
    pub rest_threshold: usize,
    /// Radius of the notehead's own disc, left out of both density counts
    pub own_marker_radius: i32,
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            fill_source: FillSource::BlobLabel,
            density_half_size: 6,
            crotchet_rest_threshold: 20,
            dot_offset_x: 7,
            dot_box_size: 11,
            semibreve_half_size: 7,
            rest_threshold: 5,
            own_marker_radius: 5,
        }
    }
}

/// Bar grouping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// A vertical gap strictly greater than this opens a new bar
    pub bar_gap_px: i32,
    pub max_bars: Option<usize>,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            bar_gap_px: 30,
            max_bars: None,
        }
    }
}

/// Which staff line wins when several sit exactly one pixel away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffByOnePolicy {
    First,
    Last,
}

/// Staff-relative pitch mapping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    pub off_by_one_policy: OffByOnePolicy,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            off_by_one_policy: OffByOnePolicy::Last,
        }
    }
}

/// Clef assignment and clef-marker detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClefConfig {
    pub default_clef: Clef,
    /// Column band `[band_start, band_end)` searched for clef markers
    pub band_start: usize,
    pub band_end: usize,
    pub circularity_threshold: f64,
}

impl Default for ClefConfig {
    fn default() -> Self {
        Self {
            default_clef: Clef::Treble,
            band_start: 12,
            band_end: 32,
            circularity_threshold: 0.65,
        }
    }
}

/// Staff-row detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffConfig {
    /// Fraction of the width that must be ink for a row to count
    pub row_fill_fraction: f64,
    /// Rows closer than this are merged into one line
    pub merge_gap_px: usize,
}

impl Default for StaffConfig {
    fn default() -> Self {
        Self {
            row_fill_fraction: 1.0 / 3.0,
            merge_gap_px: 2,
        }
    }
}

/// Bar-line bounding-box detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BarLineConfig {
    pub min_bar_height: usize,
    pub row_bucket_px: usize,
    pub right_padding: usize,
}

impl Default for BarLineConfig {
    fn default() -> Self {
        Self {
            min_bar_height: 20,
            row_bucket_px: 20,
            right_padding: 10,
        }
    }
}

/// Resource bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_contours: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_contours: 100_000,
        }
    }
}

/// MIDI and artifact export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub ticks_per_beat: u16,
    pub tempo_bpm: f64,
    pub velocity: u8,
    pub midi_filename: String,
    pub write_artifacts: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            ticks_per_beat: 480,
            tempo_bpm: 120.0,
            velocity: 64,
            midi_filename: "transcription.mid".to_string(),
            write_artifacts: true,
        }
    }
}

/// QA artifacts configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    pub generate_images: bool,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            generate_images: true,
        }
    }
}

/// Validate configuration parameters
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    let blob = &config.blob;
    if blob.min_area >= blob.max_area {
        anyhow::bail!("blob.min_area must be < blob.max_area");
    }
    if blob.circularity_threshold < 0.0 || blob.aspect_ratio_threshold < 1.0 {
        anyhow::bail!("blob circularity must be >= 0 and aspect ratio threshold >= 1");
    }

    let corr = &config.correlation;
    if corr.stem_half_size <= 0 || corr.beam_half_width <= 0 {
        anyhow::bail!("correlation windows must have a positive size");
    }
    if corr.beam_extent_up < 0 || corr.beam_extent_down < 0 {
        anyhow::bail!("beam extents must be non-negative");
    }

    let dur = &config.duration;
    if dur.density_half_size <= 0 || dur.semibreve_half_size <= 0 || dur.dot_box_size <= 0 {
        anyhow::bail!("duration windows must have a positive size");
    }
    if dur.own_marker_radius < 0 {
        anyhow::bail!("duration.own_marker_radius must be non-negative");
    }

    if config.grouping.bar_gap_px < 0 {
        anyhow::bail!("grouping.bar_gap_px must be non-negative");
    }

    if config.clef.band_start >= config.clef.band_end {
        anyhow::bail!("clef.band_start must be < clef.band_end");
    }

    if !(0.0..=1.0).contains(&config.staff.row_fill_fraction) {
        anyhow::bail!("staff.row_fill_fraction must lie in [0, 1]");
    }

    if config.export.ticks_per_beat == 0 || config.export.ticks_per_beat > 0x7fff {
        anyhow::bail!("export.ticks_per_beat must lie in 1..=32767");
    }
    if crate::midi::tempo_micros(config.export.tempo_bpm).is_none() {
        anyhow::bail!("export.tempo_bpm must be positive and at least 3.58 (24-bit MIDI tempo)");
    }
    if config.export.velocity > 127 {
        anyhow::bail!("export.velocity must be <= 127");
    }

    if config.limits.max_contours == 0 {
        anyhow::bail!("limits.max_contours must be positive");
    }

    Ok(())
}

/// Load configuration from JSON file
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Save configuration to JSON file
pub fn save_config<P: AsRef<std::path::Path>>(config: &Config, path: P) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
