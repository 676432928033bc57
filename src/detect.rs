//! Upstream layout detectors: staff rows, bar-line boxes, clef markers and
//! staff-line removal
//!
//! These produce the inputs the recognition passes consume. They work on the
//! binarized page with the staff lines still present.

use crate::analysis::{BarBox, Clef, ClefMarker};
use crate::config::{BarLineConfig, ClefConfig, StaffConfig};
use crate::contour::{find_contours, label_components, BoundingBox, Point};
use crate::raster::{is_ink_value, Raster, BACKGROUND};
use ndarray::{s, Axis};
use std::collections::BTreeMap;

/// Every row whose ink count exceeds `row_fill_fraction` of the width
fn dense_rows(raster: &Raster, config: &StaffConfig) -> Vec<usize> {
    let threshold = raster.ncols() as f64 * config.row_fill_fraction;
    raster
        .axis_iter(Axis(0))
        .enumerate()
        .filter(|(_, row)| row.iter().filter(|&&v| is_ink_value(v)).count() as f64 > threshold)
        .map(|(y, _)| y)
        .collect()
}

/// Rows whose ink count exceeds `row_fill_fraction` of the width, with runs of
/// nearby rows collapsed onto the last row of each run
pub fn staff_line_rows(raster: &Raster, config: &StaffConfig) -> Vec<i32> {
    let raw_rows = dense_rows(raster, config);

    let mut rows = Vec::new();
    let mut iter = raw_rows.into_iter();
    let Some(mut prev) = iter.next() else {
        return rows;
    };
    for row in iter {
        if row - prev > config.merge_gap_px {
            rows.push(prev as i32);
        }
        prev = row;
    }
    rows.push(prev as i32);

    log::debug!("Detected {} staff rows: {:?}", rows.len(), rows);
    rows
}

/// Erase staff lines from a full page, leaving the notation on top of them.
///
/// Rows are visited top to bottom and each ink pixel on a dense row is
/// cleared unless ink sits directly above and below it. Clearing is applied
/// in place, so the lower row of a thick line sees the upper row already gone.
pub fn strip_staff_lines(raster: &Raster, config: &StaffConfig) -> Raster {
    let mut cleaned = raster.clone();
    let height = cleaned.nrows();
    let rows = dense_rows(raster, config);

    for &y in &rows {
        for x in 0..cleaned.ncols() {
            if !is_ink_value(cleaned[[y, x]]) {
                continue;
            }
            let above = y > 0 && is_ink_value(cleaned[[y - 1, x]]);
            let below = y + 1 < height && is_ink_value(cleaned[[y + 1, x]]);
            if !(above && below) {
                cleaned[[y, x]] = BACKGROUND;
            }
        }
    }

    log::debug!("Stripped staff lines from {} rows", rows.len());
    cleaned
}

/// Boxes spanning the first to last bar line of each row of bar lines.
///
/// Bar lines are components of pixels lying on vertical ink runs at least
/// `min_bar_height` tall. Lines are bucketed into rows by `y / row_bucket_px`;
/// a bucket needs two lines to form a box.
pub fn bar_line_boxes(raster: &Raster, config: &BarLineConfig) -> Vec<BarBox> {
    let (height, width) = raster.dim();
    let min_run = config.min_bar_height.max(1);

    let mut on_run = vec![false; width * height];
    for x in 0..width {
        let mut y = 0;
        while y < height {
            if !is_ink_value(raster[[y, x]]) {
                y += 1;
                continue;
            }
            let start = y;
            while y < height && is_ink_value(raster[[y, x]]) {
                y += 1;
            }
            if y - start >= min_run {
                for yy in start..y {
                    on_run[yy * width + x] = true;
                }
            }
        }
    }

    let (components, _) = label_components(width, height, usize::MAX, |x, y| on_run[y * width + x]);

    let bucket = config.row_bucket_px.max(1) as i32;
    let mut rows: BTreeMap<i32, Vec<BoundingBox>> = BTreeMap::new();
    for pixels in components {
        let bbox = pixel_bounds(&pixels);
        if bbox.h as usize >= config.min_bar_height {
            rows.entry(bbox.y / bucket).or_default().push(bbox);
        }
    }

    let mut boxes = Vec::new();
    for (_, mut bars) in rows {
        if bars.len() < 2 {
            continue;
        }
        bars.sort_by_key(|b| b.x);
        let first = bars[0];
        let last = bars[bars.len() - 1];
        let right = last.x + config.right_padding as i32;
        let bottom = (first.y + first.h).max(last.y + last.h);
        boxes.push(BarBox {
            x: first.x,
            y: first.y,
            w: right - first.x,
            h: bottom - first.y,
        });
    }

    log::debug!("Detected {} bar-line boxes", boxes.len());
    boxes
}

fn pixel_bounds(pixels: &[Point]) -> BoundingBox {
    let min_x = pixels.iter().map(|p| p.x).min().unwrap_or(0);
    let max_x = pixels.iter().map(|p| p.x).max().unwrap_or(0);
    let min_y = pixels.iter().map(|p| p.y).min().unwrap_or(0);
    let max_y = pixels.iter().map(|p| p.y).max().unwrap_or(0);
    BoundingBox {
        x: min_x,
        y: min_y,
        w: max_x - min_x + 1,
        h: max_y - min_y + 1,
    }
}

/// Round blobs in the clef column band, top to bottom, labelled treble and
/// bass alternately (a grand staff starts with the treble clef).
pub fn clef_markers(raster: &Raster, config: &ClefConfig, max_contours: usize) -> Vec<ClefMarker> {
    let width = raster.ncols();
    let start = config.band_start.min(width);
    let end = config.band_end.min(width);
    if start >= end {
        return Vec::new();
    }

    let band = raster.slice(s![.., start..end]).to_owned();
    let (contours, _) = find_contours(&band, max_contours);

    let mut centres: Vec<(i32, i32)> = contours
        .iter()
        .filter_map(|contour| {
            let perimeter = contour.perimeter();
            if perimeter == 0.0 {
                return None;
            }
            let circularity = 4.0 * std::f64::consts::PI * contour.area() / (perimeter * perimeter);
            if circularity <= config.circularity_threshold {
                return None;
            }
            contour
                .moment_centroid()
                .map(|(cx, cy)| (cx + start as i32, cy))
        })
        .collect();

    centres.sort_by_key(|&(_, cy)| cy);

    centres
        .into_iter()
        .enumerate()
        .map(|(i, (x, y))| ClefMarker {
            index: i + 1,
            clef: if i % 2 == 0 { Clef::Treble } else { Clef::Bass },
            x,
            y,
        })
        .collect()
}
