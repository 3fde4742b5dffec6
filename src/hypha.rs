use glam::Vec2;

use crate::types::{RenderSegment, Rgba, TipId};

/// Tolerance for the unit-length direction invariant.
pub const UNIT_TOLERANCE: f32 = 1e-3;

/// A growing (or frozen) filament segment. The segment runs from `position`
/// along `direction` for `length` units; its far end is the growing head.
#[derive(Clone, Debug)]
pub struct Tip {
    pub position: Vec2,
    pub direction: Vec2,
    // Last steering direction, kept for the gradient overlay
    pub gradient: Vec2,
    pub age: f32,
    pub length: f32,
    pub branch_timer: f32,
    pub color: Rgba,
    pub active: bool,
    pub parent: Option<TipId>,
}

impl Tip {
    pub fn new(
        position: Vec2,
        direction: Vec2,
        color: Rgba,
        branch_window_period: f32,
        parent: Option<TipId>,
    ) -> Self {
        debug_assert!(
            is_unit(direction),
            "tip direction must be unit length, got {direction:?}"
        );
        Self {
            position,
            direction,
            gradient: Vec2::ZERO,
            age: 0.0,
            length: 0.0,
            branch_timer: branch_window_period,
            color,
            active: true,
            parent,
        }
    }

    /// Current growing end of the segment.
    pub fn head(&self) -> Vec2 {
        self.position + self.direction * self.length
    }

    /// The branch window is armed while the timer is strictly inside (0, 1).
    pub fn branch_armed(&self) -> bool {
        self.branch_timer > 0.0 && self.branch_timer < 1.0
    }

    /// Line width grows sub-linearly with age: `k * sqrt(ln(1 + age))`.
    pub fn thickness(&self, scale: f32) -> f32 {
        scale * self.age.max(0.0).ln_1p().sqrt()
    }

    pub fn segment(&self, thickness_scale: f32) -> RenderSegment {
        RenderSegment {
            start: self.position,
            end: self.head(),
            color: self.color,
            thickness: self.thickness(thickness_scale),
            active: self.active,
        }
    }
}

pub fn is_unit(v: Vec2) -> bool {
    (v.length() - 1.0).abs() < UNIT_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn green() -> Rgba {
        Rgba::new(0.0, 1.0, 0.0, 0.5)
    }

    #[test]
    fn new_tip_starts_fresh() {
        let tip = Tip::new(Vec2::new(10.0, 20.0), Vec2::X, green(), 2.0, Some(3));
        assert_eq!(tip.age, 0.0);
        assert_eq!(tip.length, 0.0);
        assert_eq!(tip.branch_timer, 2.0);
        assert!(tip.active);
        assert!(!tip.branch_armed());
        assert_eq!(tip.head(), Vec2::new(10.0, 20.0));
    }

    #[test]
    fn segment_ends_at_head() {
        let mut tip = Tip::new(Vec2::new(0.0, 0.0), Vec2::Y, green(), 2.0, None);
        tip.length = 5.0;
        tip.age = 0.5;
        let seg = tip.segment(1.0);
        assert_eq!(seg.start, Vec2::ZERO);
        assert_eq!(seg.end, Vec2::new(0.0, 5.0));
        assert_eq!(seg.color, green());
    }

    #[test]
    fn thickness_is_monotone_and_sublinear() {
        let mut tip = Tip::new(Vec2::ZERO, Vec2::X, green(), 2.0, None);
        let mut last = tip.thickness(2.0);
        assert_eq!(last, 0.0);
        for age in [0.1f32, 0.5, 1.0, 4.0, 16.0, 64.0] {
            tip.age = age;
            let t = tip.thickness(2.0);
            assert!(t > last);
            assert!(t < 2.0 * age + 1.0);
            last = t;
        }
    }
}
