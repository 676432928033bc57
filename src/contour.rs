//! Connected-component contours and their shape geometry
//!
//! Contours follow the usual raster conventions: points are pixel centres,
//! `x` grows to the right and `y` grows downwards, and a contour is the
//! closed outer boundary of one 8-connected ink component.

use crate::raster::{is_ink_value, Raster};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Integer bounding box with inclusive pixel extent (`w = max_x - min_x + 1`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl BoundingBox {
    /// Centre of the box, rounded down
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.w / 2, self.y + self.h / 2)
    }
}

/// Closed polygon through boundary pixel centres
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    pub points: Vec<Point>,
}

impl Contour {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle (closed polygon) with corners at the given pixels
    pub fn rectangle(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self::new(vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    pub fn bounding_box(&self) -> BoundingBox {
        if self.points.is_empty() {
            return BoundingBox { x: 0, y: 0, w: 0, h: 0 };
        }
        let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
        let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
        for p in &self.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        BoundingBox {
            x: min_x,
            y: min_y,
            w: max_x - min_x + 1,
            h: max_y - min_y + 1,
        }
    }

    /// Enclosed polygon area (shoelace)
    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }

    /// Closed arc length
    pub fn perimeter(&self) -> f64 {
        closed_length(&self.points)
    }

    pub fn convex_hull(&self) -> Vec<Point> {
        convex_hull(&self.points)
    }

    pub fn hull_area(&self) -> f64 {
        polygon_area(&self.convex_hull())
    }

    pub fn hull_perimeter(&self) -> f64 {
        closed_length(&self.convex_hull())
    }

    /// Centroid from the polygon's zeroth and first moments, `None` when the
    /// enclosed area is zero
    pub fn moment_centroid(&self) -> Option<(i32, i32)> {
        let n = self.points.len();
        if n < 3 {
            return None;
        }
        let (mut m00, mut m10, mut m01) = (0.0f64, 0.0f64, 0.0f64);
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            let cross = (a.x as f64) * (b.y as f64) - (b.x as f64) * (a.y as f64);
            m00 += cross;
            m10 += (a.x + b.x) as f64 * cross;
            m01 += (a.y + b.y) as f64 * cross;
        }
        m00 /= 2.0;
        if m00.abs() < f64::EPSILON {
            return None;
        }
        let cx = m10 / (6.0 * m00);
        let cy = m01 / (6.0 * m00);
        Some((cx as i32, cy as i32))
    }
}

fn polygon_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice = 0i64;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        twice += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
    }
    (twice as f64).abs() / 2.0
}

fn closed_length(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            (((b.x - a.x) as f64).powi(2) + ((b.y - a.y) as f64).powi(2)).sqrt()
        })
        .sum()
}

fn cross(o: Point, a: Point, b: Point) -> i64 {
    (a.x - o.x) as i64 * (b.y - o.y) as i64 - (a.y - o.y) as i64 * (b.x - o.x) as i64
}

/// Andrew's monotone chain; collinear points are dropped
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts = points.to_vec();
    pts.sort_by_key(|p| (p.x, p.y));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut lower: Vec<Point> = Vec::with_capacity(pts.len());
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point> = Vec::with_capacity(pts.len());
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Neighbour offsets, clockwise on screen starting east
const DIRS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

const WEST: usize = 4;

fn direction_index(dx: i32, dy: i32) -> usize {
    DIRS.iter()
        .position(|&d| d == (dx, dy))
        .unwrap_or(WEST)
}

/// Pixel lists of all 8-connected components of `is_fg`, in raster-scan order
/// of their first pixel. Stops after `max_components` components and reports
/// whether it had to.
pub fn label_components<F>(
    width: usize,
    height: usize,
    max_components: usize,
    is_fg: F,
) -> (Vec<Vec<Point>>, bool)
where
    F: Fn(usize, usize) -> bool,
{
    let mut visited = vec![false; width * height];
    let mut components = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if visited[y * width + x] || !is_fg(x, y) {
                continue;
            }
            if components.len() >= max_components {
                return (components, true);
            }

            let mut pixels = Vec::new();
            let mut stack = vec![(x, y)];
            visited[y * width + x] = true;

            while let Some((px, py)) = stack.pop() {
                pixels.push(Point::new(px as i32, py as i32));
                for &(dx, dy) in &DIRS {
                    let nx = px as i32 + dx;
                    let ny = py as i32 + dy;
                    if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                        continue;
                    }
                    let (nx, ny) = (nx as usize, ny as usize);
                    if !visited[ny * width + nx] && is_fg(nx, ny) {
                        visited[ny * width + nx] = true;
                        stack.push((nx, ny));
                    }
                }
            }
            components.push(pixels);
        }
    }

    (components, false)
}

/// Moore-neighbour trace of the outer boundary of one component.
///
/// `start` must be the component's first pixel in raster-scan order so that
/// its west neighbour is guaranteed to be background.
fn trace_boundary<F>(start: Point, max_steps: usize, inside: F) -> Vec<Point>
where
    F: Fn(Point) -> bool,
{
    let mut contour = vec![start];
    let mut current = start;
    let mut backtrack = WEST;

    for _ in 0..max_steps {
        let mut found = None;
        for k in 1..=8 {
            let d = (backtrack + k) % 8;
            let candidate = Point::new(current.x + DIRS[d].0, current.y + DIRS[d].1);
            if inside(candidate) {
                found = Some((candidate, d));
                break;
            }
        }

        let Some((next, d)) = found else {
            break; // isolated pixel
        };

        if current == start && contour.len() > 1 && next == contour[1] {
            break;
        }

        // the last background pixel examined, seen from `next`
        let prev = DIRS[(d + 7) % 8];
        let probe = Point::new(current.x + prev.0, current.y + prev.1);
        backtrack = direction_index(probe.x - next.x, probe.y - next.y);

        contour.push(next);
        current = next;
    }

    if contour.len() > 1 && contour.last() == Some(&start) {
        contour.pop();
    }
    contour
}

/// Outer contours of every ink component of a binary raster (0 = ink).
///
/// Returns the contours and whether `max_contours` cut the enumeration short.
pub fn find_contours(raster: &Raster, max_contours: usize) -> (Vec<Contour>, bool) {
    let (height, width) = raster.dim();
    let (components, truncated) =
        label_components(width, height, max_contours, |x, y| is_ink_value(raster[[y, x]]));

    let contours = components
        .into_iter()
        .map(|pixels| {
            let start = pixels
                .iter()
                .copied()
                .min_by_key(|p| (p.y, p.x))
                .unwrap_or(Point::new(0, 0));
            let max_steps = 4 * pixels.len() + 8;
            let inside = |p: Point| {
                p.x >= 0
                    && p.y >= 0
                    && (p.x as usize) < width
                    && (p.y as usize) < height
                    && is_ink_value(raster[[p.y as usize, p.x as usize]])
            };
            Contour::new(trace_boundary(start, max_steps, inside))
        })
        .collect();

    (contours, truncated)
}
