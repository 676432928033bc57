//! Comprehensive validation tests for Pass 3: Duration Classification

use ndarray::Array2;
use score2midi::analysis::{NoteFeatures, NoteType};
use score2midi::config::{Config, DurationConfig, FillSource};
use score2midi::passes::{pass_0, pass_3};
use score2midi::raster::{PageState, Raster, BACKGROUND, INK};

const CX: i32 = 50;
const CY: i32 = 50;

fn blank() -> Raster {
    Array2::from_elem((100, 100), BACKGROUND)
}

/// Paint every pixel within `radius` of (cx, cy)
fn paint_disc(raster: &mut Raster, cx: i32, cy: i32, radius: i32) {
    for y in cy - radius..=cy + radius {
        for x in cx - radius..=cx + radius {
            if (x - cx).pow(2) + (y - cy).pow(2) <= radius * radius {
                raster[[y as usize, x as usize]] = INK;
            }
        }
    }
}

/// Paint the half-open block [x0, x1) x [y0, y1)
fn paint_block(raster: &mut Raster, x0: i32, y0: i32, x1: i32, y1: i32) {
    for y in y0..y1 {
        for x in x0..x1 {
            raster[[y as usize, x as usize]] = INK;
        }
    }
}

fn features(filled: bool, has_stem: bool, touches_beam: bool) -> NoteFeatures {
    NoteFeatures {
        cx: CX,
        cy: CY,
        filled,
        has_stem,
        touches_beam,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_with_beam_is_quaver() {
        let mut raster = blank();
        // dense surroundings do not matter once a beam is touched
        paint_block(&mut raster, 40, 40, 60, 60);
        let config = DurationConfig::default();

        assert_eq!(
            pass_3::classify(&features(true, true, true), &raster, &config),
            NoteType::Quaver
        );
        assert_eq!(
            pass_3::classify(&features(true, false, true), &raster, &config),
            NoteType::Quaver
        );
    }

    #[test]
    fn test_filled_notehead_is_crotchet() {
        let mut raster = blank();
        paint_disc(&mut raster, CX, CY, 4);

        let note = pass_3::classify(&features(true, true, false), &raster, &DurationConfig::default());
        assert_eq!(note, NoteType::Crotchet);
    }

    #[test]
    fn test_dense_surroundings_are_crotchet_rest() {
        let mut raster = blank();
        // fill the whole 12x12 density window: 144 px, 81 of them in the own disc
        paint_block(&mut raster, CX - 6, CY - 6, CX + 6, CY + 6);

        let note = pass_3::classify(&features(true, false, false), &raster, &DurationConfig::default());
        assert_eq!(note, NoteType::CrotchetRest);
    }

    #[test]
    fn test_crotchet_rest_threshold_is_strict() {
        let mut raster = blank();
        // exactly 20 ink pixels along the top and left window edges, all
        // outside the own disc
        paint_block(&mut raster, CX - 6, CY - 6, CX + 6, CY - 5);
        paint_block(&mut raster, CX - 6, CY - 5, CX - 5, CY + 3);

        let config = DurationConfig::default();
        assert_eq!(
            pass_3::classify(&features(true, false, false), &raster, &config),
            NoteType::Crotchet
        );

        raster[[(CY + 5) as usize, (CX + 5) as usize]] = INK;
        assert_eq!(
            pass_3::classify(&features(true, false, false), &raster, &config),
            NoteType::CrotchetRest
        );
    }

    #[test]
    fn test_open_stemmed_note_with_dot_is_dotted_minim() {
        let mut raster = blank();
        paint_disc(&mut raster, CX, CY, 4);
        paint_disc(&mut raster, CX + 10, CY, 1);

        let note = pass_3::classify(&features(false, true, false), &raster, &DurationConfig::default());
        assert_eq!(note, NoteType::DottedMinim);
    }

    #[test]
    fn test_open_stemmed_note_without_dot_is_minim() {
        let mut raster = blank();
        paint_disc(&mut raster, CX, CY, 4);
        // ink just left of the dot box does not count
        raster[[CY as usize, (CX + 6) as usize]] = INK;

        let note = pass_3::classify(&features(false, true, false), &raster, &DurationConfig::default());
        assert_eq!(note, NoteType::Minim);
    }

    #[test]
    fn test_dot_box_geometry() {
        let window = pass_3::dot_window(CX, CY, &DurationConfig::default());
        assert_eq!(window.x0, CX + 7);
        assert_eq!(window.x1, CX + 18);
        assert_eq!(window.y0, CY - 5);
        assert_eq!(window.y1, CY + 6);
    }

    #[test]
    fn test_open_stemless_note_is_semibreve() {
        let mut raster = blank();
        paint_block(&mut raster, CX - 7, CY - 7, CX + 7, CY + 7);

        let note = pass_3::classify(&features(false, false, false), &raster, &DurationConfig::default());
        assert_eq!(note, NoteType::Semibreve);
    }

    #[test]
    fn test_sparse_stemless_blob_is_rest() {
        let mut raster = blank();
        paint_disc(&mut raster, CX, CY, 3);

        let note = pass_3::classify(&features(false, false, false), &raster, &DurationConfig::default());
        assert_eq!(note, NoteType::Rest);
    }

    #[test]
    fn test_centroid_pixel_fill_source() {
        let mut raster = blank();
        raster[[CY as usize, CX as usize]] = INK;

        let config = DurationConfig {
            fill_source: FillSource::CentroidPixel,
            ..DurationConfig::default()
        };

        // the blob label says open, the pixel under the centroid says filled
        assert_eq!(
            pass_3::classify(&features(false, false, false), &raster, &config),
            NoteType::Crotchet
        );
        assert_eq!(
            pass_3::classify(&features(false, false, false), &raster, &DurationConfig::default()),
            NoteType::Rest
        );
    }

    #[test]
    fn test_run_produces_one_event_per_feature() {
        let mut raster = blank();
        paint_disc(&mut raster, CX, CY, 4);

        let mut state = PageState::new(raster);
        let config = Config::default();
        pass_0::run(&mut state, &config).unwrap();
        state.note_features = vec![features(true, true, false), features(true, true, true)];

        pass_3::run(&mut state, &config).unwrap();

        let types: Vec<NoteType> = state.note_events.iter().map(|e| e.note_type).collect();
        assert_eq!(types, vec![NoteType::Crotchet, NoteType::Quaver]);
        assert!(state.note_events.iter().all(|e| e.bar == 0));
        assert_eq!(state.note_events[1].beats(), 0.5);
    }
}
