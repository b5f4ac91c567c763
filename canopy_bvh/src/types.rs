// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types and helpers.

use core::cmp::Ordering;
use core::fmt::Debug;

/// Axis-aligned bounding box in 3D.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Aabb3<T> {
    /// Minimum x
    pub min_x: T,
    /// Minimum y
    pub min_y: T,
    /// Minimum z
    pub min_z: T,
    /// Maximum x
    pub max_x: T,
    /// Maximum y
    pub max_y: T,
    /// Maximum z
    pub max_z: T,
}

impl<T> Aabb3<T> {
    /// Create a new AABB from min/max corners.
    #[inline(always)]
    pub const fn new(min_x: T, min_y: T, min_z: T, max_x: T, max_y: T, max_z: T) -> Self {
        Self {
            min_x,
            min_y,
            min_z,
            max_x,
            max_y,
            max_z,
        }
    }
}

impl<T: Copy + PartialOrd> Aabb3<T> {
    /// Whether this AABB contains the point.
    #[inline]
    pub fn contains_point(&self, x: T, y: T, z: T) -> bool {
        self.min_x <= x
            && self.min_y <= y
            && self.min_z <= z
            && x <= self.max_x
            && y <= self.max_y
            && z <= self.max_z
    }

    /// Whether this AABB fully contains another.
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.min_z <= other.min_z
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
            && self.max_z >= other.max_z
    }

    /// Determines whether this AABB overlaps with another in any way.
    ///
    /// The boundary of the AABB is considered to be part of itself, meaning
    /// that two AABBs that share a face are considered to overlap.
    ///
    /// # Examples
    ///
    /// ```
    /// use canopy_bvh::Aabb3;
    ///
    /// let a = Aabb3::new(0.0, 0.0, 0.0, 10.0, 10.0, 10.0);
    /// let b = Aabb3::new(5.0, 5.0, 5.0, 15.0, 15.0, 15.0);
    /// assert!(a.overlaps(&b));
    ///
    /// let c = Aabb3::new(11.0, 0.0, 0.0, 20.0, 10.0, 10.0);
    /// assert!(!a.overlaps(&c));
    /// ```
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
            && self.min_z <= other.max_z
            && self.max_z >= other.min_z
    }

    /// The smallest AABB enclosing two AABBs.
    #[inline]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_x: min_t(self.min_x, other.min_x),
            min_y: min_t(self.min_y, other.min_y),
            min_z: min_t(self.min_z, other.min_z),
            max_x: max_t(self.max_x, other.max_x),
            max_y: max_t(self.max_y, other.max_y),
            max_z: max_t(self.max_z, other.max_z),
        }
    }

    /// Return true if the AABB is empty or inverted (no volume). Assumes no NaN.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max_x <= self.min_x || self.max_y <= self.min_y || self.max_z <= self.min_z
    }
}

impl<T: Scalar> Aabb3<T> {
    /// This AABB expanded by `margin` in every direction.
    #[inline]
    pub fn fattened(&self, margin: T) -> Self {
        Self {
            min_x: T::sub(self.min_x, margin),
            min_y: T::sub(self.min_y, margin),
            min_z: T::sub(self.min_z, margin),
            max_x: T::add(self.max_x, margin),
            max_y: T::add(self.max_y, margin),
            max_z: T::add(self.max_z, margin),
        }
    }

    /// Compute the surface area of an AABB using the scalar's widened accumulator type.
    #[inline]
    pub fn surface_area(&self) -> T::Acc {
        let dx = T::widen(T::max(T::sub(self.max_x, self.min_x), T::zero()));
        let dy = T::widen(T::max(T::sub(self.max_y, self.min_y), T::zero()));
        let dz = T::widen(T::max(T::sub(self.max_z, self.min_z), T::zero()));
        let half = dx * dy + dy * dz + dz * dx;
        half + half
    }

    /// Squared gap distance between two AABBs, in the widened accumulator type.
    ///
    /// Zero when the boxes overlap or touch; otherwise the square of the
    /// shortest distance between their surfaces.
    #[inline]
    pub fn dist2(&self, other: &Self) -> T::Acc {
        let gx = axis_gap::<T>(self.min_x, self.max_x, other.min_x, other.max_x);
        let gy = axis_gap::<T>(self.min_y, self.max_y, other.min_y, other.max_y);
        let gz = axis_gap::<T>(self.min_z, self.max_z, other.min_z, other.max_z);
        gx * gx + gy * gy + gz * gz
    }
}

/// Per-axis separation between two intervals, widened; zero when they overlap.
#[inline]
fn axis_gap<T: Scalar>(a_min: T, a_max: T, b_min: T, b_max: T) -> T::Acc {
    let gap = T::max(T::max(T::sub(b_min, a_max), T::sub(a_min, b_max)), T::zero());
    T::widen(gap)
}

/// Numeric scalar abstraction for 3D AABBs used by the tree.
///
/// This trait provides a minimal set of operations required for surface-area
/// and distance metrics, and an associated widened accumulator type for those
/// metrics (e.g., f32→f64, i64→i128).
pub trait Scalar: Copy + PartialOrd + Debug {
    /// Widened accumulator type suitable for area/cost computations.
    type Acc: Copy
        + PartialOrd
        + core::ops::Add<Output = Self::Acc>
        + core::ops::Sub<Output = Self::Acc>
        + core::ops::Mul<Output = Self::Acc>
        + Debug;

    /// Add two scalar values.
    fn add(a: Self, b: Self) -> Self;

    /// Subtract two scalar values: a - b.
    fn sub(a: Self, b: Self) -> Self;

    /// Zero value for the scalar type.
    fn zero() -> Self;

    /// Max of the two scalar values.
    fn max(a: Self, b: Self) -> Self;

    /// Min of the two scalar values.
    fn min(a: Self, b: Self) -> Self;

    /// Convert a scalar to the accumulator type.
    fn widen(v: Self) -> Self::Acc;

    /// The default leaf fattening margin for this scalar type.
    ///
    /// Non-zero so that small motion does not immediately invalidate a
    /// stored fat box.
    fn default_margin() -> Self;
}

impl Scalar for f32 {
    type Acc = f64;

    #[inline]
    fn add(a: Self, b: Self) -> Self {
        a + b
    }

    #[inline]
    fn sub(a: Self, b: Self) -> Self {
        a - b
    }

    #[inline(always)]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn max(a: Self, b: Self) -> Self {
        Self::max(a, b)
    }

    #[inline]
    fn min(a: Self, b: Self) -> Self {
        Self::min(a, b)
    }

    #[inline]
    fn widen(v: Self) -> Self::Acc {
        v as f64
    }

    #[inline(always)]
    fn default_margin() -> Self {
        0.5
    }
}

impl Scalar for f64 {
    type Acc = Self;

    #[inline]
    fn add(a: Self, b: Self) -> Self {
        a + b
    }

    #[inline]
    fn sub(a: Self, b: Self) -> Self {
        a - b
    }

    #[inline(always)]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn max(a: Self, b: Self) -> Self {
        Self::max(a, b)
    }

    #[inline]
    fn min(a: Self, b: Self) -> Self {
        Self::min(a, b)
    }

    #[inline(always)]
    fn widen(v: Self) -> Self::Acc {
        v
    }

    #[inline(always)]
    fn default_margin() -> Self {
        0.5
    }
}

impl Scalar for i64 {
    type Acc = i128;

    #[inline]
    fn add(a: Self, b: Self) -> Self {
        a.saturating_add(b)
    }

    #[inline]
    fn sub(a: Self, b: Self) -> Self {
        a.saturating_sub(b)
    }

    #[inline(always)]
    fn zero() -> Self {
        0
    }

    #[inline]
    fn max(a: Self, b: Self) -> Self {
        core::cmp::max(a, b)
    }

    #[inline]
    fn min(a: Self, b: Self) -> Self {
        core::cmp::min(a, b)
    }

    #[inline]
    fn widen(v: Self) -> Self::Acc {
        v as i128
    }

    #[inline(always)]
    fn default_margin() -> Self {
        1
    }
}

/// Scalar types that support division, for ray parameters.
///
/// This is kept separate from [`Scalar`] so that integer coordinates remain
/// usable for everything that does not need a ray parameterization.
pub trait FloatScalar: Scalar {
    /// One value for the scalar type.
    fn one() -> Self;

    /// Divide two scalar values: a / b.
    fn div(a: Self, b: Self) -> Self;

    /// Multiply two scalar values.
    fn mul(a: Self, b: Self) -> Self;

    /// Positive infinity.
    fn infinity() -> Self;
}

impl FloatScalar for f32 {
    #[inline(always)]
    fn one() -> Self {
        1.0
    }

    #[inline]
    fn div(a: Self, b: Self) -> Self {
        a / b
    }

    #[inline]
    fn mul(a: Self, b: Self) -> Self {
        a * b
    }

    #[inline(always)]
    fn infinity() -> Self {
        Self::INFINITY
    }
}

impl FloatScalar for f64 {
    #[inline(always)]
    fn one() -> Self {
        1.0
    }

    #[inline]
    fn div(a: Self, b: Self) -> Self {
        a / b
    }

    #[inline]
    fn mul(a: Self, b: Self) -> Self {
        a * b
    }

    #[inline(always)]
    fn infinity() -> Self {
        Self::INFINITY
    }
}

/// Helper alias for the widened accumulator type `Scalar::Acc` associated with a `T: Scalar`.
pub type ScalarAcc<T> = <T as Scalar>::Acc;

/// A ray with an origin and a (not necessarily unit) direction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray3<T> {
    /// Origin x
    pub origin_x: T,
    /// Origin y
    pub origin_y: T,
    /// Origin z
    pub origin_z: T,
    /// Direction x
    pub dir_x: T,
    /// Direction y
    pub dir_y: T,
    /// Direction z
    pub dir_z: T,
}

impl<T> Ray3<T> {
    /// Create a new ray from origin and direction components.
    #[inline(always)]
    pub const fn new(origin_x: T, origin_y: T, origin_z: T, dir_x: T, dir_y: T, dir_z: T) -> Self {
        Self {
            origin_x,
            origin_y,
            origin_z,
            dir_x,
            dir_y,
            dir_z,
        }
    }
}

impl<T: FloatScalar> Ray3<T> {
    /// Slab test: whether the ray hits the AABB at any non-negative parameter.
    ///
    /// A zero direction component restricts the hit to rays originating
    /// inside the corresponding slab (division yields infinities with the
    /// usual IEEE semantics).
    pub fn hits_aabb(&self, aabb: &Aabb3<T>) -> bool {
        let mut t_min = T::zero();
        let mut t_max = T::infinity();

        for (o, d, lo, hi) in [
            (self.origin_x, self.dir_x, aabb.min_x, aabb.max_x),
            (self.origin_y, self.dir_y, aabb.min_y, aabb.max_y),
            (self.origin_z, self.dir_z, aabb.min_z, aabb.max_z),
        ] {
            let inv = T::div(T::one(), d);
            let t1 = T::mul(T::sub(lo, o), inv);
            let t2 = T::mul(T::sub(hi, o), inv);
            t_min = T::max(t_min, T::min(t1, t2));
            t_max = T::min(t_max, T::max(t1, t2));
            if t_min > t_max {
                return false;
            }
        }
        true
    }
}

/// A plane `a*x + b*y + c*z + d = 0`, not necessarily normalized.
///
/// Only the sign of the evaluation is used by the frustum test, so
/// normalization is never required.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Plane<T> {
    /// Normal x
    pub a: T,
    /// Normal y
    pub b: T,
    /// Normal z
    pub c: T,
    /// Offset
    pub d: T,
}

impl<T: Scalar> Plane<T> {
    /// Whether the AABB lies entirely on the negative side of the plane.
    ///
    /// Evaluates the plane at the box's positive vertex (the corner furthest
    /// along the plane normal), in the widened accumulator type.
    #[inline]
    pub fn outside(&self, aabb: &Aabb3<T>) -> bool {
        let px = if self.a >= T::zero() { aabb.max_x } else { aabb.min_x };
        let py = if self.b >= T::zero() { aabb.max_y } else { aabb.min_y };
        let pz = if self.c >= T::zero() { aabb.max_z } else { aabb.min_z };
        let v = T::widen(self.a) * T::widen(px)
            + T::widen(self.b) * T::widen(py)
            + T::widen(self.c) * T::widen(pz)
            + T::widen(self.d);
        v < T::widen(T::zero())
    }
}

/// A view frustum as six inward-facing planes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Frustum<T> {
    /// Left, right, bottom, top, near, far.
    pub planes: [Plane<T>; 6],
}

impl<T: Scalar> Frustum<T> {
    /// Extract frustum planes from a row-major view-projection matrix.
    ///
    /// Uses the Gribb–Hartmann method. The planes are left unnormalized;
    /// [`Plane::outside`] only looks at the sign.
    pub fn from_view_proj(m: &[[T; 4]; 4]) -> Self {
        // Row-major, column-vector convention (clip = M * p). Each plane is
        // the last matrix row plus or minus one of the first three rows.
        let sum = |s: &[T; 4]| Plane {
            a: T::add(m[3][0], s[0]),
            b: T::add(m[3][1], s[1]),
            c: T::add(m[3][2], s[2]),
            d: T::add(m[3][3], s[3]),
        };
        let diff = |s: &[T; 4]| Plane {
            a: T::sub(m[3][0], s[0]),
            b: T::sub(m[3][1], s[1]),
            c: T::sub(m[3][2], s[2]),
            d: T::sub(m[3][3], s[3]),
        };
        Self {
            planes: [
                sum(&m[0]),
                diff(&m[0]),
                sum(&m[1]),
                diff(&m[1]),
                sum(&m[2]),
                diff(&m[2]),
            ],
        }
    }

    /// Conservative box test: the box passes unless it is fully outside
    /// some plane.
    #[inline]
    pub fn intersects(&self, aabb: &Aabb3<T>) -> bool {
        !self.planes.iter().any(|p| p.outside(aabb))
    }
}

pub(crate) fn min_t<T: PartialOrd + Copy>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Greater) => b,
        _ => a,
    }
}

pub(crate) fn max_t<T: PartialOrd + Copy>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Less) => b,
        _ => a,
    }
}

#[cfg(test)]
mod tests {
    use super::{Aabb3, Frustum, Ray3, Scalar};

    #[test]
    fn aabb_surface_area_and_empty() {
        const EPSILON: f64 = 1e-10;

        let mut aabb = Aabb3::<f64>::new(0., 0., 0., 2., 3., 4.);
        // 2 * (2*3 + 3*4 + 4*2) = 52
        assert!((aabb.surface_area() - 52.).abs() < EPSILON);
        assert!(!aabb.is_empty());

        // "negative" AABBs are considered empty (and get zero area)
        aabb.max_x = -aabb.max_x;
        assert!(aabb.surface_area() < EPSILON);
        assert!(aabb.is_empty());
    }

    #[test]
    fn aabb_union_and_contains() {
        let a = Aabb3::<i64>::new(0, 0, 0, 2, 2, 2);
        let b = Aabb3::<i64>::new(1, -1, 0, 3, 1, 4);
        let u = a.union(&b);
        assert_eq!(u, Aabb3::new(0, -1, 0, 3, 2, 4));
        assert!(u.contains(&a));
        assert!(u.contains(&b));
        assert!(!a.contains(&b));
    }

    #[test]
    fn aabb_dist2_gap() {
        let a = Aabb3::<f64>::new(0., 0., 0., 1., 1., 1.);
        let touching = Aabb3::<f64>::new(1., 0., 0., 2., 1., 1.);
        assert_eq!(a.dist2(&touching), 0.);

        let apart = Aabb3::<f64>::new(4., 0., 0., 5., 1., 1.);
        assert_eq!(a.dist2(&apart), 9.);

        let diagonal = Aabb3::<f64>::new(2., 2., 1., 3., 3., 2.);
        assert_eq!(a.dist2(&diagonal), 2.);
    }

    #[test]
    fn fattened_margin() {
        let a = Aabb3::<f64>::new(0., 0., 0., 1., 1., 1.).fattened(0.5);
        assert_eq!(a, Aabb3::new(-0.5, -0.5, -0.5, 1.5, 1.5, 1.5));
        assert!(f64::default_margin() > 0.);
        assert!(i64::default_margin() > 0);
    }

    #[test]
    fn ray_slab_hits_and_misses() {
        let aabb = Aabb3::<f64>::new(1., 1., 1., 2., 2., 2.);
        let toward = Ray3::new(0., 0., 0., 1., 1., 1.);
        assert!(toward.hits_aabb(&aabb));

        let away = Ray3::new(0., 0., 0., -1., -1., -1.);
        assert!(!away.hits_aabb(&aabb));

        let offset = Ray3::new(0., 0., 0., 1., 0., 0.);
        assert!(!offset.hits_aabb(&aabb));

        // Zero direction component: origin inside the y/z slabs.
        let axis = Ray3::new(0., 1.5, 1.5, 1., 0., 0.);
        assert!(axis.hits_aabb(&aabb));
    }

    #[test]
    fn frustum_from_identity_clips_unit_cube() {
        // The identity view-projection gives the clip volume itself:
        // -1 <= x, y, z <= 1 (after the trivial w = 1 divide).
        let mut m = [[0.0_f64; 4]; 4];
        for (i, r) in m.iter_mut().enumerate() {
            r[i] = 1.0;
        }
        let f = Frustum::from_view_proj(&m);

        let inside = Aabb3::new(-0.5, -0.5, -0.5, 0.5, 0.5, 0.5);
        assert!(f.intersects(&inside));

        let straddling = Aabb3::new(0.5, 0.5, 0.5, 2.0, 2.0, 2.0);
        assert!(f.intersects(&straddling));

        let outside = Aabb3::new(2.0, 0.0, 0.0, 3.0, 1.0, 1.0);
        assert!(!f.intersects(&outside));
    }
}
