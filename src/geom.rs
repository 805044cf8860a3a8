//! Plane geometry shared by ray casting and collision resolution.
//!
//! The world is a 2-D plane; `y` on a [`Point`] is the world's depth axis
//! (called `z` by the physics code).

/// Below this the cross product of two segment directions counts as parallel
/// (relative to the product of their lengths).
const PARALLEL_EPSILON: f64 = 1e-12;
/// Slack on the parametric range so exactly-touching endpoints survive rounding.
const PARAM_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Rotate about `anchor` by `angle` radians.
    pub fn rotated(self, anchor: Point, angle: f64) -> Point {
        if angle == 0.0 {
            return self;
        }
        // Translate into anchor space
        let dx = self.x - anchor.x;
        let dy = self.y - anchor.y;
        let (s, c) = angle.sin_cos();
        Point {
            x: anchor.x + (c * dx - s * dy),
            y: anchor.y + (s * dx + c * dy),
        }
    }

    #[inline]
    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    #[inline]
    pub fn offset(self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

/// A finite line between two points with cached length, angle and midpoint.
///
/// The endpoints are private so every mutation goes through a method that
/// refreshes the derived values.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    start: Point,
    end: Point,
    length: f64,
    angle: f64,
    midpoint: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        let mut seg = Self {
            start,
            end,
            length: 0.0,
            angle: 0.0,
            midpoint: start,
        };
        seg.refresh();
        seg
    }

    #[inline]
    pub fn from_coords(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(Point::new(x1, y1), Point::new(x2, y2))
    }

    /// Segment starting at `origin`, pointing along `angle`, `length` long.
    pub fn from_angle(origin: Point, angle: f64, length: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(origin, origin.offset(length * c, length * s))
    }

    #[inline]
    pub fn start(&self) -> Point {
        self.start
    }

    #[inline]
    pub fn end(&self) -> Point {
        self.end
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// atan2 of `end - start`.
    #[inline]
    pub fn angle(&self) -> f64 {
        self.angle
    }

    #[inline]
    pub fn midpoint(&self) -> Point {
        self.midpoint
    }

    pub fn set_to(&mut self, start: Point, end: Point) {
        self.start = start;
        self.end = end;
        self.refresh();
    }

    pub fn set_start(&mut self, start: Point) {
        self.set_to(start, self.end);
    }

    pub fn set_end(&mut self, end: Point) {
        self.set_to(self.start, end);
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.set_to(self.start.offset(dx, dy), self.end.offset(dx, dy));
    }

    /// Rotate both endpoints about the midpoint.
    pub fn rotate(&mut self, angle: f64) {
        let mid = self.midpoint;
        self.set_to(self.start.rotated(mid, angle), self.end.rotated(mid, angle));
    }

    /// Unit direction from start to end, zero for a degenerate segment.
    pub fn direction(&self) -> (f64, f64) {
        if self.length == 0.0 {
            return (0.0, 0.0);
        }
        (
            (self.end.x - self.start.x) / self.length,
            (self.end.y - self.start.y) / self.length,
        )
    }

    fn refresh(&mut self) {
        let dx = self.end.x - self.start.x;
        let dy = self.end.y - self.start.y;
        self.length = dx.hypot(dy);
        self.angle = dy.atan2(dx);
        self.midpoint = Point::new(
            (self.start.x + self.end.x) * 0.5,
            (self.start.y + self.end.y) * 0.5,
        );
    }
}

/// Parametric segment/segment intersection.
///
/// Returns `None` for zero-length or parallel inputs. Parameters are inclusive
/// on both ends, so touching at an endpoint is a hit.
pub fn intersect(a: &Segment, b: &Segment) -> Option<Point> {
    if a.length == 0.0 || b.length == 0.0 {
        return None;
    }

    let (x1, y1, x2, y2) = (a.start.x, a.start.y, a.end.x, a.end.y);
    let (x3, y3, x4, y4) = (b.start.x, b.start.y, b.end.x, b.end.y);

    let denominator = (y4 - y3) * (x2 - x1) - (x4 - x3) * (y2 - y1);
    if denominator.abs() <= PARALLEL_EPSILON * a.length * b.length {
        return None;
    }

    let ua = ((x4 - x3) * (y1 - y3) - (y4 - y3) * (x1 - x3)) / denominator;
    let ub = ((x2 - x1) * (y1 - y3) - (y2 - y1) * (x1 - x3)) / denominator;

    let range = -PARAM_EPSILON..=1.0 + PARAM_EPSILON;
    if !range.contains(&ua) || !range.contains(&ub) {
        return None;
    }

    let ua = ua.clamp(0.0, 1.0);
    Some(Point::new(x1 + ua * (x2 - x1), y1 + ua * (y2 - y1)))
}

/// Linearly map `value` from `[in_min, in_max]` onto `[out_min, out_max]`.
#[inline]
pub fn scale(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    if in_max == in_min {
        return out_min;
    }
    (value - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// 2-D cross product `a x b`.
#[inline]
pub fn cross(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.0 * b.1 - a.1 * b.0
}
