//! Comprehensive validation tests for Pass 1: Notehead Blob Classification

use ndarray::Array2;
use score2midi::analysis::{BarBox, BlobCandidate, DiagnosticKind};
use score2midi::config::{BlobConfig, Config, PrefilterConfig};
use score2midi::contour::{Contour, Point};
use score2midi::passes::{pass_0, pass_1};
use score2midi::raster::{PageState, Raster, BACKGROUND, INK};

/// Paint a filled `size` x `size` square with its top-left corner at (x, y)
fn paint_square(raster: &mut Raster, x: usize, y: usize, size: usize) {
    for yy in y..y + size {
        for xx in x..x + size {
            raster[[yy, xx]] = INK;
        }
    }
}

fn candidate_at(cx: i32, cy: i32) -> BlobCandidate {
    BlobCandidate {
        cx,
        cy,
        area: 81.0,
        perimeter: 36.0,
        circularity: 0.785,
        aspect_ratio: 1.0,
        solidity: 1.0,
        contour_completeness: 1.0,
        filled: true,
    }
}

/// Plus sign with 2 px arms spanning 20 px: round bounding box, low circularity
fn thin_cross() -> Contour {
    Contour::new(vec![
        Point::new(9, 0),
        Point::new(11, 0),
        Point::new(11, 9),
        Point::new(20, 9),
        Point::new(20, 11),
        Point::new(11, 11),
        Point::new(11, 20),
        Point::new(9, 20),
        Point::new(9, 11),
        Point::new(0, 11),
        Point::new(0, 9),
        Point::new(9, 9),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_square_contour() {
        let metrics = pass_1::measure(&Contour::rectangle(0, 0, 9, 9)).unwrap();

        assert!((metrics.area - 81.0).abs() < 1e-9);
        assert!((metrics.perimeter - 36.0).abs() < 1e-9);
        assert!((metrics.circularity - 0.785).abs() < 0.01);
        assert!((metrics.aspect_ratio - 1.0).abs() < 1e-9);
        assert!((metrics.solidity - 1.0).abs() < 1e-9);
        assert!((metrics.contour_completeness - 1.0).abs() < 1e-9);
        assert_eq!(metrics.bbox.center(), (5, 5));
    }

    #[test]
    fn test_degenerate_contour_is_excluded() {
        let single = Contour::new(vec![Point::new(4, 4)]);
        assert!(pass_1::measure(&single).is_none());
    }

    #[test]
    fn test_elongated_blob_is_rejected() {
        let config = BlobConfig::default();
        // 30 x 5: round enough, but far too elongated
        let metrics = pass_1::measure(&Contour::rectangle(0, 0, 29, 4)).unwrap();
        assert!(metrics.circularity > config.circularity_threshold);
        assert!(metrics.aspect_ratio > config.aspect_ratio_threshold);
        assert!(!pass_1::is_notehead_candidate(&metrics, &config));
    }

    #[test]
    fn test_low_circularity_blob_is_rejected() {
        let config = BlobConfig::default();
        let metrics = pass_1::measure(&thin_cross()).unwrap();

        // area 76, perimeter 80
        assert!((metrics.area - 76.0).abs() < 1e-9);
        assert!((metrics.perimeter - 80.0).abs() < 1e-9);
        assert!(metrics.circularity < config.circularity_threshold);
        assert!(metrics.aspect_ratio < config.aspect_ratio_threshold);
        assert!(metrics.area > config.min_area && metrics.area < config.max_area);
        assert!(!pass_1::is_notehead_candidate(&metrics, &config));
    }

    #[test]
    fn test_circularity_at_threshold_is_rejected() {
        let config = BlobConfig::default();
        let mut metrics = pass_1::measure(&Contour::rectangle(0, 0, 9, 9)).unwrap();
        assert!(pass_1::is_notehead_candidate(&metrics, &config));

        metrics.circularity = config.circularity_threshold;
        assert!(!pass_1::is_notehead_candidate(&metrics, &config));
    }

    #[test]
    fn test_oversized_blob_is_rejected() {
        let config = BlobConfig::default();
        let metrics = pass_1::measure(&Contour::rectangle(0, 0, 29, 29)).unwrap();
        assert!(metrics.area > config.max_area);
        assert!(!pass_1::is_notehead_candidate(&metrics, &config));
    }

    #[test]
    fn test_small_dot_is_never_filled() {
        let config = BlobConfig::default();
        let metrics = pass_1::measure(&Contour::rectangle(0, 0, 4, 4)).unwrap();

        assert!(pass_1::is_notehead_candidate(&metrics, &config));
        assert!(metrics.solidity > config.solidity_threshold);
        assert!(!pass_1::is_filled(&metrics, &config));
    }

    #[test]
    fn test_low_solidity_blob_is_unfilled() {
        let config = BlobConfig::default();
        let mut metrics = pass_1::measure(&Contour::rectangle(0, 0, 9, 9)).unwrap();
        assert!(pass_1::is_filled(&metrics, &config));

        metrics.solidity = 0.3;
        assert!(!pass_1::is_filled(&metrics, &config));
    }

    #[test]
    fn test_leftmost_margin_prefilter() {
        let contours = vec![
            Contour::rectangle(0, 0, 9, 9),     // centre x 5: the leftmost blob
            Contour::rectangle(40, 0, 49, 9),   // centre x 45: 40 px from the leftmost
            Contour::rectangle(100, 0, 109, 9), // centre x 105
        ];

        let candidates = pass_1::classify_contours(
            &contours,
            &BlobConfig::default(),
            &PrefilterConfig::default(),
        );

        assert_eq!(candidates.len(), 1);
        assert_eq!((candidates[0].cx, candidates[0].cy), (105, 5));
        assert!(candidates[0].filled);

        let disabled = PrefilterConfig {
            leftmost_margin_enabled: false,
            ..PrefilterConfig::default()
        };
        let all = pass_1::classify_contours(&contours, &BlobConfig::default(), &disabled);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_bar_box_membership_is_inclusive() {
        let boxes = vec![BarBox {
            x: 100,
            y: 40,
            w: 200,
            h: 60,
        }];
        let candidates = vec![
            candidate_at(100, 40),
            candidate_at(300, 100),
            candidate_at(301, 50),
            candidate_at(150, 39),
        ];

        let kept = pass_1::filter_by_bar_boxes(candidates, &boxes);

        let centres: Vec<(i32, i32)> = kept.iter().map(|c| (c.cx, c.cy)).collect();
        assert_eq!(centres, vec![(100, 40), (300, 100)]);
    }

    #[test]
    fn test_run_finds_noteheads_on_raster() {
        let mut raster = Array2::from_elem((60, 200), BACKGROUND);
        paint_square(&mut raster, 10, 20, 10);
        paint_square(&mut raster, 100, 20, 10);

        let mut state = PageState::new(raster);
        let config = Config::default();
        pass_0::run(&mut state, &config).unwrap();
        pass_1::run(&mut state, &config).unwrap();

        assert_eq!(state.candidates.len(), 1);
        assert_eq!((state.candidates[0].cx, state.candidates[0].cy), (105, 25));
        assert!(state.candidates[0].filled);
    }

    #[test]
    fn test_run_drops_candidates_outside_bar_boxes() {
        let mut raster = Array2::from_elem((100, 300), BACKGROUND);
        paint_square(&mut raster, 10, 20, 10);
        paint_square(&mut raster, 100, 20, 10);
        paint_square(&mut raster, 200, 70, 10);

        let mut state = PageState::new(raster).with_bar_boxes(vec![BarBox {
            x: 50,
            y: 10,
            w: 200,
            h: 30,
        }]);
        let config = Config::default();
        pass_0::run(&mut state, &config).unwrap();
        pass_1::run(&mut state, &config).unwrap();

        let centres: Vec<(i32, i32)> = state.candidates.iter().map(|c| (c.cx, c.cy)).collect();
        assert_eq!(centres, vec![(105, 25)]);
    }

    #[test]
    fn test_run_requires_preflight() {
        let mut state = PageState::new(Array2::from_elem((10, 10), BACKGROUND));
        assert!(pass_1::run(&mut state, &Config::default()).is_err());
    }

    #[test]
    fn test_contour_cap_records_diagnostic() {
        let mut raster = Array2::from_elem((30, 100), BACKGROUND);
        paint_square(&mut raster, 5, 5, 5);
        paint_square(&mut raster, 50, 5, 5);

        let mut config = Config::default();
        config.limits.max_contours = 1;

        let mut state = PageState::new(raster);
        pass_0::run(&mut state, &config).unwrap();
        pass_1::run(&mut state, &config).unwrap();

        assert!(state
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::ContourCapExceeded));
    }
}
