// Uniform grid over a fixed 2D domain for box-shaped neighbour queries.

use glam::{UVec2, Vec2};

/// Largest relative coordinate a point can map to. Points on or beyond the
/// upper domain edge land in the last bucket instead of wrapping.
const MAX_REL: f32 = 0.999;

/// Append-only point store partitioned into `partition.x * partition.y`
/// buckets. Entries are never removed; use [`PointBin::clear`] to start over.
pub struct PointBin<T> {
    size: Vec2,
    partition: UVec2,
    bins: Vec<Vec<(Vec2, T)>>,
    len: usize,
}

impl<T> PointBin<T> {
    pub fn new(size: Vec2, partition: UVec2) -> Self {
        assert!(
            size.x > 0.0 && size.y > 0.0,
            "point bin domain must be positive, got {size:?}"
        );
        assert!(
            partition.x > 0 && partition.y > 0,
            "point bin partition must be positive, got {partition:?}"
        );
        let count = (partition.x as usize)
            .checked_mul(partition.y as usize)
            .expect("point bin bucket count overflows usize");
        let mut bins = Vec::with_capacity(count);
        bins.resize_with(count, Vec::new);
        Self {
            size,
            partition,
            bins,
            len: 0,
        }
    }

    /// Total number of stored points across all buckets.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Stores `payload` at `position` in the bucket owning the (clamped)
    /// position. The original position is kept as given.
    pub fn add(&mut self, position: Vec2, payload: T) {
        let idx = self.flat_index(self.bucket_of(position));
        self.bins[idx].push((position, payload));
        self.len += 1;
    }

    /// Visits every point stored in the buckets overlapped by the square
    /// `[position - radius, position + radius]`. Points outside the radius
    /// but sharing a bucket are visited too.
    ///
    /// Order: rows (y) outer, columns (x) inner, insertion order in a bucket.
    pub fn for_each_neighbour<F>(&self, position: Vec2, radius: f32, mut visitor: F)
    where
        F: FnMut(Vec2, &T),
    {
        for (point, payload) in self.neighbours(position, radius) {
            visitor(point, payload);
        }
    }

    /// Iterator form of [`PointBin::for_each_neighbour`], same order.
    ///
    /// Box corners that overflow to infinity saturate to the edge buckets.
    pub fn neighbours(&self, position: Vec2, radius: f32) -> impl Iterator<Item = (Vec2, &T)> + '_ {
        assert!(
            position.is_finite() && !radius.is_nan(),
            "non-finite query {position:?} radius {radius} in point bin"
        );
        let start = self.clamped_bucket(position - Vec2::splat(radius));
        let end = self.clamped_bucket(position + Vec2::splat(radius));
        (start.y..=end.y).flat_map(move |y| {
            (start.x..=end.x).flat_map(move |x| {
                self.bins[self.flat_index(UVec2::new(x, y))]
                    .iter()
                    .map(|(point, payload)| (*point, payload))
            })
        })
    }

    /// Bucket coordinates owning `position`, clamped into the grid.
    pub fn bucket_of(&self, position: Vec2) -> UVec2 {
        assert!(
            position.is_finite(),
            "non-finite position {position:?} in point bin"
        );
        self.clamped_bucket(position)
    }

    fn clamped_bucket(&self, position: Vec2) -> UVec2 {
        let rel = (position / self.size).clamp(Vec2::ZERO, Vec2::splat(MAX_REL));
        (rel * self.partition.as_vec2())
            .as_uvec2()
            .min(self.partition - UVec2::ONE)
    }

    /// Drops every stored point, keeping the grid layout.
    pub fn clear(&mut self) {
        for bin in &mut self.bins {
            bin.clear();
        }
        self.len = 0;
    }

    fn flat_index(&self, idx: UVec2) -> usize {
        debug_assert!(idx.x < self.partition.x && idx.y < self.partition.y);
        (idx.x + idx.y * self.partition.x) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin() -> PointBin<usize> {
        PointBin::new(Vec2::new(1920.0, 1080.0), UVec2::new(80, 45))
    }

    #[test]
    fn full_domain_query_visits_every_point() {
        let mut bin = bin();
        let n = 500;
        for i in 0..n {
            let x = (i * 37 % 1920) as f32 + 0.5;
            let y = (i * 91 % 1080) as f32 + 0.25;
            bin.add(Vec2::new(x, y), i);
        }
        assert_eq!(bin.len(), n);

        let mut visits = 0;
        bin.for_each_neighbour(Vec2::new(960.0, 540.0), 1920.0, |_, _| visits += 1);
        assert_eq!(visits, n);
    }

    #[test]
    fn upper_boundary_maps_to_last_bucket() {
        let bin = bin();
        assert_eq!(bin.bucket_of(Vec2::new(1920.0, 1080.0)), UVec2::new(79, 44));
        assert_eq!(bin.bucket_of(Vec2::new(5000.0, 1080.0001)), UVec2::new(79, 44));
        assert_eq!(bin.bucket_of(Vec2::new(-3.0, -100.0)), UVec2::ZERO);
    }

    #[test]
    fn out_of_domain_points_are_clamped_not_wrapped() {
        let mut bin = bin();
        bin.add(Vec2::new(2500.0, 10.0), 7);
        assert_eq!(bin.bucket_of(Vec2::new(2500.0, 10.0)), UVec2::new(79, 0));
        // only the last column is searched; the far left stays empty
        assert_eq!(bin.neighbours(Vec2::new(1915.0, 5.0), 1.0).count(), 1);
        assert_eq!(bin.neighbours(Vec2::new(5.0, 5.0), 1.0).count(), 0);
        // stored position is the original, not the clamped one
        let (point, payload) = bin.neighbours(Vec2::new(1915.0, 5.0), 1.0).next().unwrap();
        assert_eq!((point, *payload), (Vec2::new(2500.0, 10.0), 7));
    }

    #[test]
    fn query_is_box_shaped_and_includes_bucket_mates() {
        let mut bin = bin();
        // Same bucket (24x24 cells): (480..504, 480..504)
        bin.add(Vec2::new(481.0, 481.0), 0);
        bin.add(Vec2::new(503.0, 503.0), 1);
        // Far away
        bin.add(Vec2::new(1500.0, 900.0), 2);

        let mut seen = Vec::new();
        bin.for_each_neighbour(Vec2::new(481.0, 481.0), 1.0, |_, id| seen.push(*id));
        assert_eq!(seen, vec![0, 1]);
    }

    #[test]
    fn query_includes_point_at_query_location() {
        let mut bin = bin();
        bin.add(Vec2::new(100.0, 100.0), 3);
        let hits: Vec<_> = bin.neighbours(Vec2::new(100.0, 100.0), 0.0).collect();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn iteration_is_row_major_then_insertion_order() {
        let mut bin = PointBin::new(Vec2::new(4.0, 4.0), UVec2::new(2, 2));
        bin.add(Vec2::new(3.0, 3.0), "d");
        bin.add(Vec2::new(1.0, 3.0), "c");
        bin.add(Vec2::new(3.0, 1.0), "b");
        bin.add(Vec2::new(1.0, 1.0), "a");
        bin.add(Vec2::new(1.5, 1.5), "a2");

        let order: Vec<_> = bin
            .neighbours(Vec2::new(2.0, 2.0), 10.0)
            .map(|(_, p)| *p)
            .collect();
        assert_eq!(order, vec!["a", "a2", "b", "c", "d"]);
    }

    #[test]
    fn later_inserts_are_not_seen_by_finished_query() {
        let mut bin = bin();
        bin.add(Vec2::new(960.0, 540.0), 0);
        let mut first = Vec::new();
        bin.for_each_neighbour(Vec2::new(960.0, 540.0), 50.0, |_, id| first.push(*id));
        bin.add(Vec2::new(965.0, 540.0), 1);
        assert_eq!(first, vec![0]);

        let second: Vec<_> = bin.neighbours(Vec2::new(960.0, 540.0), 50.0).collect();
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn clear_empties_every_bucket() {
        let mut bin = bin();
        bin.add(Vec2::new(10.0, 10.0), 0);
        bin.add(Vec2::new(1000.0, 10.0), 1);
        bin.clear();
        assert_eq!(bin.len(), 0);
        assert_eq!(bin.neighbours(Vec2::ZERO, 4000.0).count(), 0);
    }

    #[test]
    fn overflowing_query_box_saturates_to_edges() {
        let mut bin = bin();
        bin.add(Vec2::new(1900.0, 10.0), 0);
        bin.add(Vec2::new(10.0, 1000.0), 1);
        // 3e38 + 1e38 is +inf in f32
        let hits: Vec<_> = bin
            .neighbours(Vec2::new(3e38, 10.0), 1e38)
            .map(|(_, id)| *id)
            .collect();
        assert_eq!(hits, vec![0]);

        let all = bin.neighbours(Vec2::new(960.0, 540.0), f32::INFINITY).count();
        assert_eq!(all, 2);
    }

    #[test]
    #[should_panic(expected = "non-finite position")]
    fn nan_position_is_rejected() {
        let mut bin = bin();
        bin.add(Vec2::new(f32::NAN, 1.0), 0);
    }
}
