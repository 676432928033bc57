//! Validation tests for contour extraction and the layout detectors

use ndarray::Array2;
use score2midi::analysis::Clef;
use score2midi::config::{BarLineConfig, ClefConfig, StaffConfig};
use score2midi::contour::{convex_hull, find_contours, Contour, Point};
use score2midi::detect::{bar_line_boxes, clef_markers, staff_line_rows, strip_staff_lines};
use score2midi::raster::{Raster, BACKGROUND, INK};

fn blank(height: usize, width: usize) -> Raster {
    Array2::from_elem((height, width), BACKGROUND)
}

fn paint(raster: &mut Raster, x0: usize, y0: usize, x1: usize, y1: usize) {
    for y in y0..y1 {
        for x in x0..x1 {
            raster[[y, x]] = INK;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_contour_geometry() {
        let mut raster = blank(40, 40);
        paint(&mut raster, 10, 10, 20, 20);

        let (contours, truncated) = find_contours(&raster, 100);

        assert!(!truncated);
        assert_eq!(contours.len(), 1);
        let contour = &contours[0];
        assert!((contour.area() - 81.0).abs() < 1e-9);
        assert!((contour.perimeter() - 36.0).abs() < 1e-9);
        let bbox = contour.bounding_box();
        assert_eq!((bbox.x, bbox.y, bbox.w, bbox.h), (10, 10, 10, 10));
    }

    #[test]
    fn test_components_are_eight_connected() {
        let mut raster = blank(20, 20);
        raster[[5, 5]] = INK;
        raster[[6, 6]] = INK;
        raster[[7, 7]] = INK;
        paint(&mut raster, 12, 12, 15, 15);

        let (contours, _) = find_contours(&raster, 100);

        assert_eq!(contours.len(), 2);
    }

    #[test]
    fn test_contour_cap_truncates() {
        let mut raster = blank(20, 40);
        for i in 0..5 {
            raster[[10, i * 8]] = INK;
        }

        let (contours, truncated) = find_contours(&raster, 3);

        assert!(truncated);
        assert_eq!(contours.len(), 3);
    }

    #[test]
    fn test_isolated_pixel_has_no_perimeter() {
        let mut raster = blank(10, 10);
        raster[[4, 4]] = INK;

        let (contours, _) = find_contours(&raster, 10);

        assert_eq!(contours[0].points, vec![Point::new(4, 4)]);
        assert_eq!(contours[0].perimeter(), 0.0);
    }

    #[test]
    fn test_convex_hull_of_concave_shape() {
        // L shape: the hull closes the notch
        let l_shape = Contour::new(vec![
            Point::new(0, 0),
            Point::new(2, 0),
            Point::new(2, 8),
            Point::new(8, 8),
            Point::new(8, 10),
            Point::new(0, 10),
        ]);

        assert!((l_shape.area() - 32.0).abs() < 1e-9);
        assert_eq!(convex_hull(&l_shape.points).len(), 5);
        assert!((l_shape.hull_area() - 56.0).abs() < 1e-9);
        assert!(l_shape.area() / l_shape.hull_area() < 0.6);
    }

    #[test]
    fn test_moment_centroid_of_rectangle() {
        let rect = Contour::rectangle(10, 20, 30, 60);
        assert_eq!(rect.moment_centroid(), Some((20, 40)));
        assert_eq!(Contour::new(vec![Point::new(1, 1)]).moment_centroid(), None);
    }

    #[test]
    fn test_staff_rows_merge_keeps_last_row() {
        let mut raster = blank(40, 100);
        paint(&mut raster, 0, 10, 100, 12); // rows 10 and 11
        paint(&mut raster, 0, 20, 100, 21);
        paint(&mut raster, 0, 30, 30, 31); // under a third of the width

        let rows = staff_line_rows(&raster, &StaffConfig::default());

        assert_eq!(rows, vec![11, 20]);
    }

    #[test]
    fn test_bar_line_box_spans_first_to_last_bar() {
        let mut raster = blank(100, 200);
        paint(&mut raster, 20, 10, 21, 50);
        paint(&mut raster, 150, 10, 151, 50);
        // too short to be a bar line
        paint(&mut raster, 80, 10, 81, 20);

        let boxes = bar_line_boxes(&raster, &BarLineConfig::default());

        assert_eq!(boxes.len(), 1);
        let b = boxes[0];
        assert_eq!((b.x, b.y, b.w, b.h), (20, 10, 140, 40));
        assert!(b.contains(100, 30));
        assert!(!b.contains(100, 70));
    }

    #[test]
    fn test_single_bar_line_gives_no_box() {
        let mut raster = blank(100, 200);
        paint(&mut raster, 20, 10, 21, 50);

        assert!(bar_line_boxes(&raster, &BarLineConfig::default()).is_empty());
    }

    #[test]
    fn test_clef_markers_alternate_treble_and_bass() {
        let mut raster = blank(200, 100);
        paint(&mut raster, 15, 80, 25, 90);
        paint(&mut raster, 15, 20, 25, 30);
        // outside the clef band
        paint(&mut raster, 60, 40, 70, 50);

        let markers = clef_markers(&raster, &ClefConfig::default(), 100);

        assert_eq!(markers.len(), 2);
        assert_eq!((markers[0].index, markers[0].clef), (1, Clef::Treble));
        assert_eq!((markers[1].index, markers[1].clef), (2, Clef::Bass));
        assert!(markers[0].y < markers[1].y);
        assert!((18..=21).contains(&markers[0].x));
        assert!((23..=25).contains(&markers[0].y));
    }

    #[test]
    fn test_strip_staff_lines_keeps_crossing_strokes() {
        let mut raster = blank(30, 40);
        paint(&mut raster, 0, 10, 40, 11); // thin line
        paint(&mut raster, 0, 20, 40, 22); // two-pixel line
        paint(&mut raster, 5, 5, 6, 25); // vertical stroke through both

        let cleaned = strip_staff_lines(&raster, &StaffConfig::default());

        assert_eq!(cleaned[[10, 5]], INK);
        assert_eq!(cleaned[[10, 20]], BACKGROUND);
        assert_eq!(cleaned[[20, 5]], INK);
        assert_eq!(cleaned[[21, 5]], INK);
        assert_eq!(cleaned[[20, 30]], BACKGROUND);
        assert_eq!(cleaned[[21, 30]], BACKGROUND);
        assert_eq!(cleaned[[15, 5]], INK);
        assert!(staff_line_rows(&cleaned, &StaffConfig::default()).is_empty());
    }
}
