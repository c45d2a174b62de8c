//! Connected-component analysis of the color mask.

use std::collections::BTreeMap;

use crate::mask::Mask;

/// A connected region of the mask, with the per-row extents needed for
/// shape analysis.
#[derive(Debug, Clone)]
pub(crate) struct Blob {
    pub(crate) area: u32,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    /// y -> (min_x, max_x) for that row.
    row_extents: BTreeMap<u32, (u32, u32)>,
}

impl Blob {
    pub(crate) fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub(crate) fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Bounding-box width over height.
    pub(crate) fn aspect(&self) -> f32 {
        self.width() as f32 / self.height().max(1) as f32
    }

    /// Pixel area over convex-hull area. Degenerate hulls (a line of
    /// pixels) yield zero.
    pub(crate) fn solidity(&self) -> f32 {
        let points: Vec<(f64, f64)> = self
            .row_extents
            .iter()
            .flat_map(|(&y, &(lo, hi))| [(lo as f64, y as f64), (hi as f64, y as f64)])
            .collect();
        let hull_area = polygon_area(&convex_hull(points));
        if hull_area <= f64::EPSILON {
            0.0
        } else {
            (self.area as f64 / hull_area) as f32
        }
    }
}

/// Label the 8-connected components of a mask.
pub(crate) fn find_blobs(mask: &Mask) -> Vec<Blob> {
    let (width, height) = (mask.width(), mask.height());
    let mut visited = vec![false; (width * height) as usize];
    let mut blobs = Vec::new();
    let index = |x: u32, y: u32| (y * width + x) as usize;

    for start_y in 0..height {
        for start_x in 0..width {
            if visited[index(start_x, start_y)] || !mask.get(start_x, start_y) {
                continue;
            }

            let mut area = 0u32;
            let mut row_extents: BTreeMap<u32, (u32, u32)> = BTreeMap::new();
            let mut stack = vec![(start_x, start_y)];
            visited[index(start_x, start_y)] = true;

            while let Some((x, y)) = stack.pop() {
                area += 1;
                row_extents
                    .entry(y)
                    .and_modify(|(lo, hi)| {
                        *lo = (*lo).min(x);
                        *hi = (*hi).max(x);
                    })
                    .or_insert((x, x));

                for dy in -1i32..=1 {
                    for dx in -1i32..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let nx = x as i32 + dx;
                        let ny = y as i32 + dy;
                        if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                            continue;
                        }
                        let (nx, ny) = (nx as u32, ny as u32);
                        if !visited[index(nx, ny)] && mask.get(nx, ny) {
                            visited[index(nx, ny)] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }

            let min_y = *row_extents.keys().next().unwrap_or(&start_y);
            let max_y = *row_extents.keys().next_back().unwrap_or(&start_y);
            let min_x = row_extents.values().map(|&(lo, _)| lo).min().unwrap_or(start_x);
            let max_x = row_extents.values().map(|&(_, hi)| hi).max().unwrap_or(start_x);

            blobs.push(Blob {
                area,
                min_x,
                min_y,
                max_x,
                max_y,
                row_extents,
            });
        }
    }

    blobs
}

/// Andrew's monotone chain. Returns hull vertices in counter-clockwise
/// order.
fn convex_hull(mut points: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    points.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    points.dedup();
    if points.len() < 3 {
        return points;
    }

    let cross = |o: (f64, f64), a: (f64, f64), b: (f64, f64)| {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    };

    let mut lower: Vec<(f64, f64)> = Vec::new();
    for &p in &points {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<(f64, f64)> = Vec::new();
    for &p in points.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Shoelace formula.
fn polygon_area(vertices: &[(f64, f64)]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..vertices.len() {
        let (x1, y1) = vertices[i];
        let (x2, y2) = vertices[(i + 1) % vertices.len()];
        sum += x1 * y2 - x2 * y1;
    }
    sum.abs() / 2.0
}
