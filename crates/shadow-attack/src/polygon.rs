//! Shadow polygons

use serde::{Deserialize, Serialize};

/// Candidate shadow: a polygon in image pixel coordinates and how much it
/// darkens the pixels it covers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowPolygon {
    pub vertices: Vec<(f32, f32)>,
    /// Fraction of brightness removed inside the polygon, `[0, 1]`
    pub darkness: f32,
}

impl ShadowPolygon {
    pub fn new(vertices: Vec<(f32, f32)>, darkness: f32) -> Self {
        Self { vertices, darkness }
    }

    /// Unpack a flat `[x0, y0, x1, y1, ..., darkness]` parameter vector
    pub fn from_params(params: &[f32]) -> Self {
        let (coords, darkness) = params.split_at(params.len().saturating_sub(1));
        Self {
            vertices: coords.chunks_exact(2).map(|c| (c[0], c[1])).collect(),
            darkness: darkness.first().copied().unwrap_or(0.0),
        }
    }

    /// Flat parameter vector, inverse of [`ShadowPolygon::from_params`]
    pub fn to_params(&self) -> Vec<f32> {
        let mut params: Vec<f32> = self.vertices.iter().flat_map(|&(x, y)| [x, y]).collect();
        params.push(self.darkness);
        params
    }

    /// Enclosed area (shoelace formula).
    ///
    /// Only matches the filled area for simple polygons; a self-intersecting
    /// vertex order cancels out lobes. See [`ShadowPolygon::untangle`].
    pub fn area(&self) -> f32 {
        let n = self.vertices.len();
        if n < 3 {
            return 0.0;
        }
        let twice: f32 = (0..n)
            .map(|i| {
                let (x0, y0) = self.vertices[i];
                let (x1, y1) = self.vertices[(i + 1) % n];
                x0 * y1 - x1 * y0
            })
            .sum();
        twice.abs() / 2.0
    }

    /// Mean of the vertices
    pub fn center(&self) -> (f32, f32) {
        let n = self.vertices.len().max(1) as f32;
        let (sx, sy) = self
            .vertices
            .iter()
            .fold((0.0, 0.0), |(ax, ay), &(x, y)| (ax + x, ay + y));
        (sx / n, sy / n)
    }

    /// Scale vertices about [`ShadowPolygon::center`]
    pub fn scale(&mut self, factor: f32) {
        let (cx, cy) = self.center();
        for v in &mut self.vertices {
            v.0 = cx + (v.0 - cx) * factor;
            v.1 = cy + (v.1 - cy) * factor;
        }
    }

    /// Reorder the vertices by angle around [`ShadowPolygon::center`].
    ///
    /// The result is star-shaped about the centre and never crosses itself,
    /// so [`ShadowPolygon::area`] equals the area the even-odd fill covers.
    /// Vertices at the same angle are ordered by distance from the centre.
    pub fn untangle(&mut self) {
        let (cx, cy) = self.center();
        let key = |&(x, y): &(f32, f32)| {
            let (dx, dy) = (x - cx, y - cy);
            (dy.atan2(dx), dx * dx + dy * dy)
        };
        self.vertices.sort_by(|a, b| {
            let (ka, kb) = (key(a), key(b));
            ka.0.total_cmp(&kb.0).then(ka.1.total_cmp(&kb.1))
        });
    }

    /// Axis-aligned bounds `(x_min, y_min, x_max, y_max)`
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        self.vertices.iter().fold(
            (f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
            |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        )
    }

    /// Point-in-polygon test, even-odd rule
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.vertices[i];
            let (xj, yj) = self.vertices[j];
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}
