use std::ops::Sub;

use nalgebra::{ClosedAddAssign, ClosedDivAssign, Point, Point2, Scalar};
use num_traits::One;

use super::{WorldPoint, WorldTriangle};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AABB<P> {
    pub min: P,
    pub max: P,
}

impl<P> AABB<P> {
    pub fn new(min: P, max: P) -> AABB<P> {
        AABB { min, max }
    }

    pub fn map<P2, F: FnMut(&P) -> P2>(&self, mut f: F) -> AABB<P2> {
        AABB {
            min: f(&self.min),
            max: f(&self.max),
        }
    }
}

impl<P: Sub + Copy> AABB<P> {
    pub fn size(&self) -> P::Output {
        self.max - self.min
    }
}

impl<T: Scalar + Copy + Sub> AABB<Point2<T>> {
    pub fn width(&self) -> T::Output {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> T::Output {
        self.max[1] - self.min[1]
    }
}

impl<T: Scalar + ClosedAddAssign + ClosedDivAssign + One, const D: usize> AABB<Point<T, D>> {
    pub fn center(&self) -> Point<T, D> {
        let two = T::one() + T::one();
        let avg_coords = (&self.min.coords + &self.max.coords) / two;
        Point::from(avg_coords)
    }
}

impl AABB<WorldPoint> {
    /// Tightest box around a set of points, `None` if there are no points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a WorldPoint>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = *points.next()?;
        Some(points.fold(AABB::new(first, first), |b, p| AABB {
            min: b.min.inf(p),
            max: b.max.sup(p),
        }))
    }

    pub fn from_triangle(triangle: &WorldTriangle) -> Self {
        AABB {
            min: triangle[0].inf(&triangle[1]).inf(&triangle[2]),
            max: triangle[0].sup(&triangle[1]).sup(&triangle[2]),
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        AABB {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Index of the axis with the largest extent.
    /// Ties go to the earlier axis (x before y before z).
    pub fn largest_axis(&self) -> usize {
        let size = self.size();
        let mut axis = if size.y > size.x { 1 } else { 0 };
        if size.z > size[axis] {
            axis = 2;
        }
        axis
    }

    pub fn contains_box(&self, other: &Self) -> bool {
        (0..3).all(|i| self.min[i] <= other.min[i] && other.max[i] <= self.max[i])
    }
}

impl<P> From<[P; 2]> for AABB<P> {
    fn from(value: [P; 2]) -> Self {
        let [min, max] = value;
        AABB { min, max }
    }
}

impl<P> From<(P, P)> for AABB<P> {
    fn from(value: (P, P)) -> Self {
        let (min, max) = value;
        AABB { min, max }
    }
}
