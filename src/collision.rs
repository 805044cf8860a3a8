//! Axis-separated sweep of a moving body against the registry.
//!
//! The z and x components of a move are probed independently from the
//! previous midpoint, so a blocked axis is reverted while the other keeps
//! going; this is what lets bodies slide along walls. The first collidable
//! body in registry order that crosses a probe blocks it, not the nearest.

use crate::body::Body;
use crate::geom::{Point, Segment, intersect};

/// Which axes were reverted, as indices into the body slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveOutcome {
    pub blocked_x: Option<usize>,
    pub blocked_z: Option<usize>,
}

impl MoveOutcome {
    pub fn is_blocked(&self) -> bool {
        self.blocked_x.is_some() || self.blocked_z.is_some()
    }
}

/// First collidable body other than `mover` crossing `probe`.
pub fn first_blocker(bodies: &[Body], mover: usize, probe: &Segment) -> Option<usize> {
    bodies
        .iter()
        .enumerate()
        .filter(|&(i, b)| i != mover && b.collidable)
        .find(|(_, b)| intersect(probe, b.segment()).is_some())
        .map(|(i, _)| i)
}

/// Translate `bodies[index]` by `(dx, dz)` and undo whichever axis is blocked.
///
/// A body with no collision history (first move, or just teleported) is
/// moved unresolved and only starts its history at the new midpoint.
pub fn move_and_resolve(bodies: &mut [Body], index: usize, dx: f64, dz: f64) -> MoveOutcome {
    let Some(prev) = bodies[index].prev_mid else {
        let body = &mut bodies[index];
        body.translate(dx, dz);
        body.prev_mid = Some(body.midpoint());
        return MoveOutcome::default();
    };
    bodies[index].translate(dx, dz);
    let new = bodies[index].midpoint();

    let z_probe = Segment::new(prev, Point::new(prev.x, new.y));
    let x_probe = Segment::new(prev, Point::new(new.x, prev.y));
    let outcome = MoveOutcome {
        blocked_z: first_blocker(bodies, index, &z_probe),
        blocked_x: first_blocker(bodies, index, &x_probe),
    };

    let body = &mut bodies[index];
    if outcome.blocked_z.is_some() {
        body.translate(0.0, prev.y - new.y);
    }
    if outcome.blocked_x.is_some() {
        body.translate(prev.x - new.x, 0.0);
    }
    if outcome.is_blocked() {
        log::trace!("{body} blocked: {outcome:?}");
    }
    body.prev_mid = Some(body.midpoint());
    outcome
}
