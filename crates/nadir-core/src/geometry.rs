use serde::{Deserialize, Serialize};

/// Integer rectangle in canvas coordinates, half-open: `[left, right) x [top, bottom)`.
///
/// A rectangle with `right <= left` or `bottom <= top` is empty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl Rect {
    pub fn new(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle anchored at `(x, y)` with the given size.
    pub fn from_origin_size(x: i64, y: i64, width: usize, height: usize) -> Self {
        Self::new(x, y, x + width as i64, y + height as i64)
    }

    /// Rectangle covering `[0, width) x [0, height)`.
    pub fn of_size(width: usize, height: usize) -> Self {
        Self::from_origin_size(0, 0, width, height)
    }

    pub fn width(&self) -> usize {
        (self.right - self.left).max(0) as usize
    }

    pub fn height(&self) -> usize {
        (self.bottom - self.top).max(0) as usize
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }

    /// Overlap of two rectangles. Disjoint inputs yield an empty rectangle.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let r = Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        if r.is_empty() {
            Rect::default()
        } else {
            r
        }
    }

    /// Smallest rectangle containing both. Empty operands are ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    pub fn translate(&self, dx: i64, dy: i64) -> Rect {
        Rect::new(self.left + dx, self.top + dy, self.right + dx, self.bottom + dy)
    }

    /// Rescale by `factor`, rounding outward so the result covers the source.
    pub fn scaled(&self, factor: f64) -> Rect {
        if self.is_empty() {
            return Rect::default();
        }
        Rect::new(
            (self.left as f64 * factor).floor() as i64,
            (self.top as f64 * factor).floor() as i64,
            (self.right as f64 * factor).ceil() as i64,
            (self.bottom as f64 * factor).ceil() as i64,
        )
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{},{}]-[{},{}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}
