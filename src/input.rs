//! Per-frame command snapshot and the stock player script that consumes it.

use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2, PI};

use crate::body::{Body, Controller, DEFAULT_TURN_SPEED, Strafe};

/// Which commands are active this frame. Built by whatever owns the window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputSnapshot {
    /// +1 forward, -1 back.
    pub forward: f64,
    pub strafe: Strafe,
    /// +1 turns towards increasing angle, -1 the other way.
    pub turn: f64,
    /// Pointer motion since the last frame, in pixels.
    pub look_dx: f64,
    pub look_dy: f64,
    pub jump: bool,
}

impl InputSnapshot {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Keyboard/mouse driven movement for a camera body.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerController {
    /// Force applied along the move direction while a key is held.
    pub move_force: f64,
    /// Upward velocity change per jump, scaled by mass.
    pub jump_impulse: f64,
    /// Radians per pixel of pointer motion.
    pub look_sensitivity: f64,
    /// Pitch stays within `PI +- pitch_limit`.
    pub pitch_limit: f64,
}

impl Default for PlayerController {
    fn default() -> Self {
        Self {
            move_force: 2400.0,
            jump_impulse: 6.0,
            look_sensitivity: 0.003,
            pitch_limit: FRAC_PI_2,
        }
    }
}

impl Controller for PlayerController {
    fn pre_update(&mut self, body: &mut Body, input: &InputSnapshot, dt: f64) {
        let forward = input.forward.clamp(-1.0, 1.0);
        let strafing = input.strafe != Strafe::None;

        // Same top speed diagonally as along either axis
        let share = if forward != 0.0 && strafing {
            FRAC_1_SQRT_2
        } else {
            1.0
        };
        if forward != 0.0 {
            body.move_planar(self.move_force * forward * share, Strafe::None, dt);
        }
        if strafing {
            body.move_planar(self.move_force * share, input.strafe, dt);
        }

        let turn_speed = body.camera().map_or(DEFAULT_TURN_SPEED, |c| c.turn_speed);
        let yaw = input.turn.clamp(-1.0, 1.0) * turn_speed * dt
            + input.look_dx * self.look_sensitivity;
        if yaw != 0.0 {
            body.turn_horizontally(yaw);
        }

        if input.look_dy != 0.0 {
            let pitch = (body.vertical_angle - input.look_dy * self.look_sensitivity)
                .clamp(PI - self.pitch_limit, PI + self.pitch_limit);
            body.turn_vertically(pitch - body.vertical_angle);
        }

        if input.jump && body.is_grounded() {
            body.move_y(self.jump_impulse, 1.0);
        }
    }

    /// Keep the body on the floor once gravity has pulled it under.
    fn post_update(&mut self, body: &mut Body, _dt: f64) {
        if body.y_pos_3d < 0.0 {
            body.y_pos_3d = 0.0;
            body.velocity.y = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyConfig;
    use crate::geom::Segment;
    use crate::physics;
    use crate::texture::TextureCache;
    use crate::world::WorldBounds;

    const EPS: f64 = 1e-9;

    /// Faces +z.
    fn player() -> Body {
        let mut b = Body::new(
            &WorldBounds::unbounded(),
            &TextureCache::new(),
            Segment::from_coords(0.0, 0.0, 2.0, 0.0),
            BodyConfig::default(),
        )
        .unwrap();
        b.attach_camera(None, Some(2.0));
        b
    }

    #[test]
    fn idle_snapshot_does_nothing() {
        let mut b = player();
        let mut c = PlayerController::default();
        assert!(InputSnapshot::default().is_idle());
        c.pre_update(&mut b, &InputSnapshot::default(), 0.1);
        assert_eq!(b.velocity.x, 0.0);
        assert_eq!(b.velocity.z, 0.0);
        assert_eq!(b.angle(), 0.0);
    }

    #[test]
    fn forward_accelerates_along_facing() {
        let mut b = player();
        let mut c = PlayerController {
            move_force: 100.0,
            ..PlayerController::default()
        };
        let input = InputSnapshot {
            forward: 1.0,
            ..InputSnapshot::default()
        };
        c.pre_update(&mut b, &input, 0.5);
        assert!(b.velocity.x.abs() < EPS);
        assert!((b.velocity.z - 50.0).abs() < EPS);
    }

    #[test]
    fn diagonal_is_not_faster() {
        let mut b = player();
        let mut c = PlayerController {
            move_force: 100.0,
            ..PlayerController::default()
        };
        let input = InputSnapshot {
            forward: 1.0,
            strafe: Strafe::Right,
            ..InputSnapshot::default()
        };
        c.pre_update(&mut b, &input, 1.0);
        let speed = b.velocity.x.hypot(b.velocity.z);
        assert!((speed - 100.0).abs() < 1e-6);
    }

    #[test]
    fn turn_uses_camera_turn_speed() {
        let mut b = player();
        let mut c = PlayerController::default();
        let input = InputSnapshot {
            turn: 1.0,
            ..InputSnapshot::default()
        };
        c.pre_update(&mut b, &input, 0.25);
        assert!((b.angle() - 0.5).abs() < EPS);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut b = player();
        let mut c = PlayerController::default();
        let input = InputSnapshot {
            look_dy: -1e6,
            ..InputSnapshot::default()
        };
        c.pre_update(&mut b, &input, 0.016);
        assert!((b.vertical_angle - (PI + FRAC_PI_2)).abs() < EPS);
    }

    #[test]
    fn jump_only_from_the_ground_and_lands() {
        let mut b = player();
        b.friction.y = 20.0;
        let mut c = PlayerController::default();
        let jump = InputSnapshot {
            jump: true,
            ..InputSnapshot::default()
        };

        c.pre_update(&mut b, &jump, 0.05);
        assert_eq!(b.velocity.y, 6.0);
        physics::integrate(&mut b, 0.05);
        c.post_update(&mut b, 0.05);
        assert!(b.y_pos_3d > 0.0);

        // Airborne: holding jump adds nothing
        let vy = b.velocity.y;
        c.pre_update(&mut b, &jump, 0.05);
        assert_eq!(b.velocity.y, vy);

        for _ in 0..100 {
            physics::integrate(&mut b, 0.05);
            c.post_update(&mut b, 0.05);
        }
        assert_eq!(b.y_pos_3d, 0.0);
        assert_eq!(b.velocity.y, 0.0);
    }
}
