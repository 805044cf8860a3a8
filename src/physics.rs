//! Per-body integration of velocity, friction and terminal velocity.

use crate::body::Body;

/// Decelerate `v` by `decel * dt` towards zero without crossing it.
#[inline]
pub fn apply_drag(v: f64, decel: f64, dt: f64) -> f64 {
    if v == 0.0 {
        return 0.0;
    }
    let sign = v.signum();
    let next = v - sign * decel * dt;
    if next.signum() != sign || next == 0.0 {
        0.0
    } else {
        next
    }
}

#[inline]
fn clamp_terminal(v: f64, terminal: Option<f64>) -> f64 {
    match terminal {
        Some(t) => v.clamp(-t.abs(), t.abs()),
        None => v,
    }
}

/// Advance `body` by `dt` seconds.
///
/// Vertical motion is written straight to `y_pos_3d`. The planar
/// displacement is returned for the collision resolver instead of being
/// applied here.
pub fn integrate(body: &mut Body, dt: f64) -> Option<(f64, f64)> {
    let mass = body.mass;

    body.velocity.x = apply_drag(body.velocity.x, body.friction.x / mass, dt);
    body.velocity.z = apply_drag(body.velocity.z, body.friction.z / mass, dt);
    // y is a constant one-way bias (gravity), not drag
    body.velocity.y -= body.friction.y / mass * dt;

    body.velocity.x = clamp_terminal(body.velocity.x, body.terminal_velocity.x);
    body.velocity.z = clamp_terminal(body.velocity.z, body.terminal_velocity.z);
    body.velocity.y = clamp_terminal(body.velocity.y, body.terminal_velocity.y);

    if body.velocity.y != 0.0 {
        body.y_pos_3d += body.velocity.y * dt;
    }

    if body.velocity.x != 0.0 || body.velocity.z != 0.0 {
        Some((body.velocity.x * dt, body.velocity.z * dt))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Axis3, BodyConfig};
    use crate::geom::Segment;
    use crate::texture::TextureCache;
    use crate::world::WorldBounds;

    fn body() -> Body {
        Body::new(
            &WorldBounds::unbounded(),
            &TextureCache::new(),
            Segment::from_coords(0.0, 0.0, 10.0, 0.0),
            BodyConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn friction_stops_at_zero_without_reversing() {
        let mut v = 3.0;
        for _ in 0..10 {
            let next = apply_drag(v, 2.0, 0.4);
            assert!(next >= 0.0);
            v = next;
        }
        assert_eq!(v, 0.0);

        let mut w = -3.0;
        for _ in 0..10 {
            let next = apply_drag(w, 2.0, 0.4);
            assert!(next <= 0.0);
            w = next;
        }
        assert_eq!(w, 0.0);
    }

    #[test]
    fn friction_decelerates_by_force_over_mass() {
        let mut b = body();
        b.mass = 2.0;
        b.friction = Axis3::new(4.0, 0.0, 0.0);
        b.velocity.x = 10.0;
        integrate(&mut b, 0.5);
        assert_eq!(b.velocity.x, 9.0);
    }

    #[test]
    fn vertical_axis_is_a_constant_bias() {
        let mut b = body();
        b.friction.y = 10.0;
        integrate(&mut b, 0.1);
        assert!((b.velocity.y + 1.0).abs() < 1e-12);
        integrate(&mut b, 0.1);
        assert!((b.velocity.y + 2.0).abs() < 1e-12);
        assert!(b.y_pos_3d < 0.0);
    }

    #[test]
    fn terminal_velocity_clamps_each_axis() {
        let mut b = body();
        b.velocity = Axis3::new(50.0, -50.0, 80.0);
        b.terminal_velocity = Axis3::new(Some(10.0), Some(20.0), None);
        integrate(&mut b, 0.01);
        assert_eq!(b.velocity.x, 10.0);
        assert_eq!(b.velocity.z, -20.0);
        assert_eq!(b.velocity.y, 80.0);
    }

    #[test]
    fn displacement_is_velocity_times_dt() {
        let mut b = body();
        b.velocity.x = 100.0;
        assert_eq!(integrate(&mut b, 0.5), Some((50.0, 0.0)));
        b.velocity.x = 0.0;
        assert_eq!(integrate(&mut b, 0.5), None);
    }

    #[test]
    fn jump_rises_then_falls() {
        let mut b = body();
        b.friction.y = 20.0;
        b.move_y(10.0, 1.0);
        integrate(&mut b, 0.25);
        assert!(b.y_pos_3d > 0.0);
        for _ in 0..8 {
            integrate(&mut b, 0.25);
        }
        assert!(b.y_pos_3d < 0.0);
    }
}
