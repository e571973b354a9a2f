use super::rect::PixelRect;

/// One horizontal segment of the skyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Skyline {
    x: u32,
    y: u32,
    w: u32,
}

impl Skyline {
    /// Inclusive right edge.
    fn right(&self) -> u32 {
        self.x + self.w - 1
    }
}

/// Skyline bin packer for a single fixed-size bin.
///
/// Placements are final: the packer never moves a rectangle once placed.
/// Every request is inflated by `padding + 2 * extrusion`; the returned
/// rectangle is the content area, inset by `extrusion` from the reserved one.
#[derive(Debug, Clone)]
pub struct SkylinePacker {
    width: u32,
    height: u32,
    padding: u32,
    extrusion: u32,
    skylines: Vec<Skyline>,
}

impl SkylinePacker {
    pub fn new(width: u32, height: u32, padding: u32, extrusion: u32) -> Self {
        let skylines = if width > 0 {
            vec![Skyline { x: 0, y: 0, w: width }]
        } else {
            Vec::new()
        };
        Self {
            width,
            height,
            padding,
            extrusion,
            skylines,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Size reserved for a `w` x `h` chart, `None` on overflow.
    fn inflate(&self, w: u32, h: u32) -> Option<(u32, u32)> {
        let margin = self.extrusion.checked_mul(2)?.checked_add(self.padding)?;
        Some((w.checked_add(margin)?, h.checked_add(margin)?))
    }

    /// Lowest position for a `w` x `h` rect starting at segment `i`.
    fn can_put(&self, mut i: usize, w: u32, h: u32) -> Option<PixelRect> {
        let x = self.skylines[i].x;
        if x.checked_add(w)? > self.width {
            return None;
        }
        let mut y = 0;
        let mut width_left = w;
        while i < self.skylines.len() {
            y = y.max(self.skylines[i].y);
            if y.checked_add(h)? > self.height {
                return None;
            }
            if self.skylines[i].w >= width_left {
                return Some(PixelRect::new(x, y, w, h));
            }
            width_left -= self.skylines[i].w;
            i += 1;
        }
        None
    }

    /// Candidate with the lowest top edge, ties broken by the narrower segment.
    fn find_skyline(&self, w: u32, h: u32) -> Option<(usize, PixelRect)> {
        let mut best: Option<(usize, PixelRect)> = None;
        for i in 0..self.skylines.len() {
            let Some(rect) = self.can_put(i, w, h) else {
                continue;
            };
            let better = match best {
                None => true,
                Some((bi, br)) => {
                    rect.top() < br.top()
                        || (rect.top() == br.top() && self.skylines[i].w < self.skylines[bi].w)
                }
            };
            if better {
                best = Some((i, rect));
            }
        }
        best
    }

    fn split(&mut self, index: usize, rect: PixelRect) {
        self.skylines.insert(
            index,
            Skyline {
                x: rect.x,
                y: rect.top(),
                w: rect.w,
            },
        );

        let i = index + 1;
        while i < self.skylines.len() {
            let prev_right = self.skylines[i - 1].right();
            let cur = self.skylines[i];
            if cur.x > prev_right {
                break;
            }
            let shrink = prev_right - cur.x + 1;
            if cur.w <= shrink {
                self.skylines.remove(i);
            } else {
                self.skylines[i].x += shrink;
                self.skylines[i].w -= shrink;
                break;
            }
        }
    }

    fn merge(&mut self) {
        let mut i = 1;
        while i < self.skylines.len() {
            if self.skylines[i - 1].y == self.skylines[i].y {
                self.skylines[i - 1].w += self.skylines[i].w;
                self.skylines.remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// Place a `width` x `height` rect, `None` when it does not fit.
    pub fn pack(&mut self, width: u32, height: u32) -> Option<PixelRect> {
        if width == 0 || height == 0 {
            return None;
        }
        let (w, h) = self.inflate(width, height)?;
        let (index, reserved) = self.find_skyline(w, h)?;
        self.split(index, reserved);
        self.merge();

        Some(PixelRect::new(
            reserved.x + self.extrusion,
            reserved.y + self.extrusion,
            width,
            height,
        ))
    }

    /// Whether [`pack`](Self::pack) would succeed, without placing anything.
    pub fn can_pack(&self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.inflate(width, height)
            .and_then(|(w, h)| self.find_skyline(w, h))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_disjoint_and_inside(rects: &[PixelRect], w: u32, h: u32) {
        let bin = PixelRect::new(0, 0, w, h);
        for (i, a) in rects.iter().enumerate() {
            assert!(bin.contains(a), "{a:?} outside bin");
            for b in &rects[i + 1..] {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn uniform_rects_at_eighty_percent_fit() {
        // 20 x 16x16 = 5120 px of a 6400 px bin
        let mut packer = SkylinePacker::new(80, 80, 0, 0);
        let rects: Vec<_> = (0..20).map(|_| packer.pack(16, 16).expect("fits")).collect();
        assert_disjoint_and_inside(&rects, 80, 80);
    }

    #[test]
    fn padded_rects_do_not_overlap() {
        let mut packer = SkylinePacker::new(128, 128, 2, 1);
        let mut rects = Vec::new();
        for i in 0..30 {
            let w = 8 + (i % 5) * 3;
            let h = 6 + (i % 3) * 4;
            if let Some(r) = packer.pack(w, h) {
                assert_eq!((r.w, r.h), (w, h));
                rects.push(r.dilate(1, 128, 128));
            }
        }
        assert!(rects.len() > 20);
        assert_disjoint_and_inside(&rects, 128, 128);
    }

    #[test]
    fn too_large_fails() {
        let mut packer = SkylinePacker::new(32, 32, 0, 0);
        assert!(packer.pack(33, 1).is_none());
        assert!(!packer.can_pack(1, 33));
        assert!(packer.pack(32, 32).is_some());
        assert!(packer.pack(1, 1).is_none());
    }

    #[test]
    fn huge_requests_fail_instead_of_wrapping() {
        let mut packer = SkylinePacker::new(64, 64, 2, 1);
        assert!(packer.pack(u32::MAX - 1, 4).is_none());
        assert!(packer.pack(4, u32::MAX).is_none());
        assert!(!packer.can_pack(u32::MAX, u32::MAX));

        let mut wide_margin = SkylinePacker::new(64, 64, u32::MAX, 1);
        assert!(wide_margin.pack(1, 1).is_none());

        // bin still usable afterwards
        assert_eq!(packer.pack(4, 4), Some(PixelRect::new(1, 1, 4, 4)));
    }

    #[test]
    fn zero_size_is_rejected() {
        let mut packer = SkylinePacker::new(32, 32, 0, 0);
        assert!(packer.pack(0, 4).is_none());
        assert!(!packer.can_pack(4, 0));
    }

    #[test]
    fn prefers_lowest_placement() {
        let mut packer = SkylinePacker::new(64, 64, 0, 0);
        let a = packer.pack(32, 48).unwrap();
        let b = packer.pack(32, 8).unwrap();
        assert_eq!((a.x, a.y), (0, 0));
        assert_eq!((b.x, b.y), (32, 0));
        // next one sits on top of the shorter column
        let c = packer.pack(32, 8).unwrap();
        assert_eq!((c.x, c.y), (32, 8));
    }

    #[test]
    fn extrusion_offsets_content() {
        let mut packer = SkylinePacker::new(32, 32, 0, 2);
        let r = packer.pack(4, 4).unwrap();
        assert_eq!(r, PixelRect::new(2, 2, 4, 4));
        let next = packer.pack(4, 4).unwrap();
        assert_eq!(next.x, 10);
    }

    #[test]
    fn can_pack_does_not_mutate() {
        let packer = SkylinePacker::new(16, 16, 0, 0);
        assert!(packer.can_pack(16, 16));
        assert!(packer.can_pack(16, 16));
    }
}
