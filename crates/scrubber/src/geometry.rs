use serde::{Deserialize, Serialize};

/// A point in host-view coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// `width / height`, or `None` when the ratio is not a usable number.
    pub fn aspect_ratio(&self) -> Option<f64> {
        let ratio = self.width / self.height;
        (ratio.is_finite() && ratio > 0.0).then_some(ratio)
    }

    /// True when both sides are finite and strictly positive.
    pub fn is_positive(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Margins around the thumbnail strip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeInsets {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl EdgeInsets {
    pub const fn uniform(value: f64) -> Self {
        Self {
            top: value,
            left: value,
            bottom: value,
            right: value,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }

    pub(crate) fn is_valid(&self) -> bool {
        [self.top, self.left, self.bottom, self.right]
            .iter()
            .all(|edge| edge.is_finite() && *edge >= 0.0)
    }
}

impl Default for EdgeInsets {
    fn default() -> Self {
        Self::uniform(8.0)
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn min_x(&self) -> f64 {
        self.origin.x
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn center_x(&self) -> f64 {
        self.origin.x + self.size.width / 2.0
    }

    /// Hit test, inclusive on the min edges and exclusive on the max edges.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x < self.max_x()
            && point.y >= self.origin.y
            && point.y < self.origin.y + self.size.height
    }
}

#[cfg(test)]
mod tests {
    use super::{Point, Rect, Size};

    #[test]
    fn contains_is_half_open() {
        let rect = Rect::new(10.0, 0.0, 20.0, 10.0);

        assert!(rect.contains(Point::new(10.0, 0.0)));
        assert!(rect.contains(Point::new(29.9, 9.9)));
        assert!(!rect.contains(Point::new(30.0, 5.0)));
        assert!(!rect.contains(Point::new(15.0, 10.0)));
    }

    #[test]
    fn aspect_ratio_rejects_zero_height() {
        assert_eq!(Size::new(16.0, 0.0).aspect_ratio(), None);
        assert_eq!(Size::new(16.0, 9.0).aspect_ratio(), Some(16.0 / 9.0));
    }
}
