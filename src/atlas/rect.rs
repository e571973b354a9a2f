/// Axis-aligned rectangle in integer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    /// Exclusive top edge.
    pub fn top(&self) -> u32 {
        self.y + self.h
    }

    pub fn area(&self) -> u64 {
        u64::from(self.w) * u64::from(self.h)
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    pub fn intersects(&self, other: &PixelRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.top()
            && other.y < self.top()
    }

    /// Whether `other` lies fully inside `self`.
    pub fn contains(&self, other: &PixelRect) -> bool {
        other.x >= self.x && other.y >= self.y && other.right() <= self.right() && other.top() <= self.top()
    }

    /// Grow by `margin` on every side, clipped to a `width` x `height` image.
    pub fn dilate(&self, margin: u32, width: u32, height: u32) -> PixelRect {
        let x = self.x.saturating_sub(margin);
        let y = self.y.saturating_sub(margin);
        let right = (self.right() + margin).min(width);
        let top = (self.top() + margin).min(height);
        PixelRect::new(x, y, right.saturating_sub(x), top.saturating_sub(y))
    }
}
