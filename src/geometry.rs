use serde::{Deserialize, Serialize};

/// Point in diagram coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Two points share a horizontal or vertical line.
    pub fn is_axis_aligned_with(&self, other: &Point) -> bool {
        self.x == other.x || self.y == other.y
    }
}

/// Axis-aligned rectangle reported by a toolkit for an anchorage visual.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Point where the ray from the center towards `reference` leaves the
    /// outline. Falls back to the center for degenerate input.
    pub fn chop(&self, reference: &Point) -> Point {
        let center = self.center();
        let dx = reference.x - center.x;
        let dy = reference.y - center.y;
        if (dx == 0.0 && dy == 0.0) || self.width <= 0.0 || self.height <= 0.0 {
            return center;
        }

        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        let scale_x = if dx != 0.0 { half_w / dx.abs() } else { f64::INFINITY };
        let scale_y = if dy != 0.0 { half_h / dy.abs() } else { f64::INFINITY };
        let scale = scale_x.min(scale_y);

        Point::new(center.x + dx * scale, center.y + dy * scale)
    }
}
