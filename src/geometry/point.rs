use core::ops::{Add, Div, Mul, Sub};

/// A spatial coordinate in R^3. 2-D meshes simply leave `z` at zero; the
/// same type backs mesh node positions, grid velocities, and flux-point
/// normal vectors throughout `element/state.rs`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point(pub f64, pub f64, pub f64);

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(x, y, z)
    }

    pub fn zero() -> Self {
        Self(0.0, 0.0, 0.0)
    }

    pub fn x(&self) -> f64 {
        self.0
    }

    pub fn y(&self) -> f64 {
        self.1
    }

    pub fn z(&self) -> f64 {
        self.2
    }

    pub fn dot(&self, other: &Point) -> f64 {
        self.0 * other.0 + self.1 * other.1 + self.2 * other.2
    }

    pub fn cross(&self, other: &Point) -> Point {
        Point(
            self.1 * other.2 - self.2 * other.1,
            self.2 * other.0 - self.0 * other.2,
            self.0 * other.1 - self.1 * other.0,
        )
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }
}

impl Add<Point> for Point {
    type Output = Point;
    fn add(self, o: Point) -> Point {
        Point(self.0 + o.0, self.1 + o.1, self.2 + o.2)
    }
}

impl Sub<Point> for Point {
    type Output = Point;
    fn sub(self, o: Point) -> Point {
        Point(self.0 - o.0, self.1 - o.1, self.2 - o.2)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, a: f64) -> Point {
        Point(self.0 * a, self.1 * a, self.2 * a)
    }
}

impl Div<f64> for Point {
    type Output = Point;
    fn div(self, a: f64) -> Point {
        Point(self.0 / a, self.1 / a, self.2 / a)
    }
}

#[cfg(test)]
mod test {
    use super::Point;

    #[test]
    fn cross_product_is_orthogonal_to_both_operands() {
        let a = Point::new(1.0, 0.0, 0.0);
        let b = Point::new(0.0, 1.0, 0.0);
        let c = a.cross(&b);
        assert!((c.dot(&a)).abs() < 1e-14);
        assert!((c.dot(&b)).abs() < 1e-14);
        assert_eq!(c, Point::new(0.0, 0.0, 1.0));
    }
}
