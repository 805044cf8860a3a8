//! Top-down overview of the registry, drawn into a corner of the frame.

use crate::color::{Color, pack_rgb};
use crate::geom::Point;
use crate::renderer::FrameBuffer;
use crate::world::{BodyId, World, WorldBounds};

const RAY_PIXEL: u32 = 0x00FF_0000;
const HIT_PIXEL: u32 = 0x0000_FF00;

#[derive(Debug, Clone, PartialEq)]
pub struct Minimap {
    /// Top-left corner on screen.
    pub x: f64,
    pub y: f64,
    /// Side of the square the world is fitted into.
    pub size: f64,
    pub background: Color,
    pub viewer_color: Color,
}

impl Default for Minimap {
    fn default() -> Self {
        Self {
            x: 8.0,
            y: 8.0,
            size: 160.0,
            background: Color::rgba(0, 0, 0, 0.6),
            viewer_color: Color::rgb(255, 60, 60),
        }
    }
}

/// Maps world coordinates into the minimap square, keeping aspect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapTransform {
    origin: Point,
    min: Point,
    scale: f64,
}

impl MapTransform {
    pub fn new(min: Point, max: Point, origin: Point, size: f64) -> Self {
        let span = (max.x - min.x).max(max.y - min.y);
        let scale = if span > 0.0 { size / span } else { 1.0 };
        Self { origin, min, scale }
    }

    #[inline]
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.origin.x + (p.x - self.min.x) * self.scale,
            self.origin.y + (p.y - self.min.y) * self.scale,
        )
    }
}

/// World rectangle to show: the bounds when enclosed, else the extent of all bodies.
pub fn extent(world: &World, bounds: &WorldBounds) -> Option<(Point, Point)> {
    if let (Some(w), Some(h)) = (bounds.width, bounds.height) {
        return Some((Point::new(0.0, 0.0), Point::new(w, h)));
    }
    let mut points = world.bodies().iter().flat_map(|b| [b.start(), b.end()]);
    let first = points.next()?;
    Some(points.fold((first, first), |(lo, hi), p| {
        (
            Point::new(lo.x.min(p.x), lo.y.min(p.y)),
            Point::new(hi.x.max(p.x), hi.y.max(p.y)),
        )
    }))
}

/// Liang-Barsky clip of `a -> b` to the box `lo..hi`.
pub fn clip_line(a: Point, b: Point, lo: Point, hi: Point) -> Option<(Point, Point)> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    for (p, q) in [
        (-dx, a.x - lo.x),
        (dx, hi.x - a.x),
        (-dy, a.y - lo.y),
        (dy, hi.y - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((
        Point::new(a.x + t0 * dx, a.y + t0 * dy),
        Point::new(a.x + t1 * dx, a.y + t1 * dy),
    ))
}

impl Minimap {
    fn line(&self, frame: &mut FrameBuffer, a: Point, b: Point, pixel: u32) {
        let lo = Point::new(self.x, self.y);
        let hi = Point::new(self.x + self.size, self.y + self.size);
        if let Some((a, b)) = clip_line(a, b, lo, hi) {
            frame.draw_line(
                a.x.round() as i64,
                a.y.round() as i64,
                b.x.round() as i64,
                b.y.round() as i64,
                pixel,
            );
        }
    }

    /// Draw every body as a line in its colour, the viewer highlighted.
    /// With `debug` the viewer's rays and their hits are overlaid.
    pub fn draw(
        &self,
        frame: &mut FrameBuffer,
        world: &World,
        bounds: &WorldBounds,
        viewer: Option<BodyId>,
        debug: bool,
    ) {
        frame.fill_rect(self.x, self.y, self.size, self.size, self.background);
        let Some((min, max)) = extent(world, bounds) else {
            return;
        };
        let map = MapTransform::new(min, max, Point::new(self.x, self.y), self.size);

        if debug {
            if let Some(camera) = viewer.and_then(|id| world.get(id)).and_then(|b| b.camera()) {
                for ray in camera.rays() {
                    let origin = map.apply(ray.origin);
                    self.line(frame, origin, map.apply(ray.segment.end()), RAY_PIXEL);
                    for hit in &ray.collisions {
                        self.line(frame, origin, map.apply(hit.point), HIT_PIXEL);
                    }
                }
            }
        }

        for (id, body) in world.iter() {
            let color = if Some(id) == viewer {
                self.viewer_color
            } else {
                body.color
            };
            let pixel = pack_rgb(color.r, color.g, color.b);
            self.line(frame, map.apply(body.start()), map.apply(body.end()), pixel);
        }

        // Facing tick on the viewer
        if let Some(body) = viewer.and_then(|id| world.get(id)) {
            let mid = map.apply(body.midpoint());
            let (s, c) = body.facing().sin_cos();
            let tip = Point::new(mid.x + c * 6.0, mid.y + s * 6.0);
            self.line(frame, mid, tip, self.viewer_color.to_pixel());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, BodyConfig};
    use crate::geom::Segment;
    use crate::texture::TextureCache;

    fn body(x1: f64, y1: f64, x2: f64, y2: f64, color: Color) -> Body {
        Body::new(
            &WorldBounds::unbounded(),
            &TextureCache::new(),
            Segment::from_coords(x1, y1, x2, y2),
            BodyConfig::default().with_color(color),
        )
        .unwrap()
    }

    #[test]
    fn extent_prefers_bounds() {
        let mut world = World::new();
        world.add_body(body(-5.0, 2.0, 10.0, 8.0, Color::WHITE));
        world.add_body(body(0.0, -3.0, 1.0, 1.0, Color::WHITE));
        let (lo, hi) = extent(&world, &WorldBounds::unbounded()).unwrap();
        assert_eq!((lo, hi), (Point::new(-5.0, -3.0), Point::new(10.0, 8.0)));

        let bounded = WorldBounds::new(Some(100.0), Some(40.0));
        let (lo, hi) = extent(&world, &bounded).unwrap();
        assert_eq!((lo, hi), (Point::new(0.0, 0.0), Point::new(100.0, 40.0)));

        assert!(extent(&World::new(), &WorldBounds::unbounded()).is_none());
    }

    #[test]
    fn clipping_keeps_lines_inside_the_box() {
        let lo = Point::new(0.0, 0.0);
        let hi = Point::new(10.0, 10.0);
        let (a, b) = clip_line(Point::new(5.0, 5.0), Point::new(1e7, 5.0), lo, hi).unwrap();
        assert_eq!(a, Point::new(5.0, 5.0));
        assert!((b.x - 10.0).abs() < 1e-9);
        assert!(clip_line(Point::new(-5.0, -5.0), Point::new(-1.0, 20.0), lo, hi).is_none());
    }

    #[test]
    fn bodies_are_drawn_in_their_colour() {
        let mut world = World::new();
        world.add_body(body(0.0, 0.0, 100.0, 100.0, Color::rgb(0, 0, 255)));
        let map = Minimap {
            x: 0.0,
            y: 0.0,
            size: 10.0,
            background: Color::BLACK,
            ..Minimap::default()
        };
        let mut frame = FrameBuffer::new(20, 20);
        frame.clear(pack_rgb(9, 9, 9));
        map.draw(&mut frame, &world, &WorldBounds::unbounded(), None, false);
        assert_eq!(frame.pixel(5, 5), pack_rgb(0, 0, 255));
        assert_eq!(frame.pixel(9, 0), pack_rgb(0, 0, 0));
        assert_eq!(frame.pixel(15, 15), pack_rgb(9, 9, 9));
    }
}
