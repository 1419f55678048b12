//! Procedural placement for instanced geometry.
//!
//! [`scatter_xz`] drops points uniformly over a rectangle on the ground
//! plane (foliage); [`AsteroidRing`] lays rocks out on a ring around a
//! planet and recomputes every matrix in parallel each frame.

use glam::{Mat4, Quat, Vec3};
use rand::Rng;
use rayon::prelude::*;

/// Axis-aligned rectangle on the y = 0 plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct XzRect {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl XzRect {
    pub fn new(min_x: f32, max_x: f32, min_z: f32, max_z: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_z,
            max_z,
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        (self.min_x..=self.max_x).contains(&point.x) && (self.min_z..=self.max_z).contains(&point.z)
    }
}

fn sample_range<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    if max > min { rng.gen_range(min..max) } else { min }
}

/// `count` points uniformly distributed over `rect` at y = 0.
///
/// A zero-width side collapses to its minimum instead of panicking.
pub fn scatter_xz<R: Rng + ?Sized>(rect: XzRect, count: usize, rng: &mut R) -> Vec<Vec3> {
    (0..count)
        .map(|_| {
            let x = sample_range(rng, rect.min_x, rect.max_x);
            let z = sample_range(rng, rect.min_z, rect.max_z);
            Vec3::new(x, 0.0, z)
        })
        .collect()
}

/// Translation matrices for a set of scattered points.
pub fn translations(points: &[Vec3]) -> Vec<Mat4> {
    points.iter().copied().map(Mat4::from_translation).collect()
}

/// `points` ordered farthest from `eye` first, the order alpha-blended
/// geometry has to be drawn in. Equally distant points keep their input order.
pub fn back_to_front(points: &[Vec3], eye: Vec3) -> Vec<Vec3> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| b.distance_squared(eye).total_cmp(&a.distance_squared(eye)));
    sorted
}

/// Integer hash mapped to [-1, 1]. Deterministic per `(x, seed)`.
pub fn hash_noise(x: u32, seed: u32) -> f32 {
    let mut h = seed;
    h = h.wrapping_add(x.wrapping_mul(374761393));
    h = h.wrapping_add(668265263);
    h ^= h >> 13;
    h = h.wrapping_mul(1274126177);
    h ^= h >> 16;
    (h as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32
}

/// Rocks orbiting a planet.
///
/// Rock `i` sits at angle `i / amount * 360` on a circle of `radius`
/// (the angle is fed to `sin`/`cos` unconverted, which scatters the rocks
/// around the ring rather than spacing them evenly), jittered by up to
/// `offset` and scaled between 0.05 and 0.24.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AsteroidRing {
    pub amount: u32,
    pub radius: f32,
    pub offset: f32,
    pub seed: u32,
}

impl Default for AsteroidRing {
    fn default() -> Self {
        Self {
            amount: 2000,
            radius: 50.0,
            offset: 2.5,
            seed: 123456,
        }
    }
}

impl AsteroidRing {
    /// Orbit phase at `time` seconds: `max(sin(0.05 t), 0)`.
    pub fn orbit_at(time: f32) -> f32 {
        (time * 0.05).sin().max(0.0)
    }

    pub fn matrix_at(&self, i: u32, orbit: f32) -> Mat4 {
        let angle = i as f32 / self.amount as f32 * 360.0;
        let wrap = (2.0 * self.offset * 100.0) as u32;
        let displacement = (i % wrap.max(1)) as f32 / 100.0 - self.offset;

        let x = (angle + orbit).sin() * self.radius + displacement;
        let y = displacement * 0.4;
        let z = (angle + orbit).cos() * self.radius + hash_noise(i, self.seed) / 100.0
            - self.offset;

        let scale = (i % 20) as f32 / 100.0 + 0.05;
        let rotation = Quat::from_axis_angle(Vec3::new(0.4, 0.6, 0.8).normalize(), (i % 360) as f32);

        Mat4::from_translation(Vec3::new(x, y, z))
            * Mat4::from_scale(Vec3::splat(scale))
            * Mat4::from_quat(rotation)
    }

    /// Every rock's model matrix. Each element is computed independently,
    /// so the work is split across the rayon pool.
    pub fn matrices(&self, orbit: f32) -> Vec<Mat4> {
        (0..self.amount)
            .into_par_iter()
            .map(|i| self.matrix_at(i, orbit))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn back_to_front_puts_the_farthest_first() {
        let eye = Vec3::new(0.0, 1.0, 10.0);
        let windows = [
            Vec3::new(0.0, 0.0, 8.0),
            Vec3::new(0.0, 0.0, -4.0),
            Vec3::new(3.0, 0.0, 2.0),
        ];
        let sorted = back_to_front(&windows, eye);
        assert_eq!(sorted, vec![windows[1], windows[2], windows[0]]);
        let distances: Vec<f32> = sorted.iter().map(|p| p.distance(eye)).collect();
        assert!(distances.windows(2).all(|d| d[0] >= d[1]), "{distances:?}");
    }

    #[test]
    fn back_to_front_keeps_equidistant_points() {
        let eye = Vec3::ZERO;
        let ring = [Vec3::X, Vec3::Z, Vec3::NEG_X, Vec3::new(0.0, 0.0, 5.0)];
        let sorted = back_to_front(&ring, eye);
        assert_eq!(sorted.len(), 4);
        assert_eq!(sorted, vec![ring[3], ring[0], ring[1], ring[2]]);
    }

    #[test]
    fn scattered_points_stay_inside_the_rect() {
        let rect = XzRect::new(-5.3, 4.3, -5.0, 5.0);
        let mut rng = StdRng::seed_from_u64(7);
        let points = scatter_xz(rect, 2000, &mut rng);
        assert_eq!(points.len(), 2000);
        assert!(points.iter().all(|p| p.y == 0.0 && rect.contains(*p)));
    }

    #[test]
    fn scatter_is_reproducible_per_seed() {
        let rect = XzRect::new(0.0, 1.0, 0.0, 1.0);
        let a = scatter_xz(rect, 16, &mut StdRng::seed_from_u64(42));
        let b = scatter_xz(rect, 16, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn degenerate_rect_collapses_instead_of_panicking() {
        let rect = XzRect::new(2.0, 2.0, -1.0, -1.0);
        let points = scatter_xz(rect, 3, &mut StdRng::seed_from_u64(1));
        assert!(points.iter().all(|p| *p == Vec3::new(2.0, 0.0, -1.0)));
    }

    #[test]
    fn hash_noise_is_bounded_and_deterministic() {
        for i in 0..1000 {
            let n = hash_noise(i, 123456);
            assert!((-1.0..=1.0).contains(&n));
            assert_eq!(n, hash_noise(i, 123456));
        }
    }

    #[test]
    fn parallel_matrices_match_sequential() {
        let ring = AsteroidRing {
            amount: 257,
            ..AsteroidRing::default()
        };
        let orbit = AsteroidRing::orbit_at(12.0);
        let sequential: Vec<Mat4> = (0..ring.amount).map(|i| ring.matrix_at(i, orbit)).collect();
        assert_eq!(ring.matrices(orbit), sequential);
    }

    #[test]
    fn first_rock_layout() {
        let ring = AsteroidRing::default();
        let m = ring.matrix_at(0, 0.0);
        // angle 0: x = -2.5, y = -1, z = 50 + noise/100 - 2.5, scale 0.05
        let origin = m.transform_point3(Vec3::ZERO);
        approx::assert_abs_diff_eq!(origin.x, -2.5, epsilon = 1e-5);
        approx::assert_abs_diff_eq!(origin.y, -1.0, epsilon = 1e-5);
        approx::assert_abs_diff_eq!(origin.z, 47.5, epsilon = 0.011);
        approx::assert_abs_diff_eq!(m.x_axis.truncate().length(), 0.05, epsilon = 1e-6);
    }

    #[test]
    fn orbit_never_goes_negative() {
        assert_eq!(AsteroidRing::orbit_at(0.0), 0.0);
        // sin(0.05 * 100) = sin(5) < 0
        assert_eq!(AsteroidRing::orbit_at(100.0), 0.0);
        assert!(AsteroidRing::orbit_at(10.0) > 0.0);
    }
}
