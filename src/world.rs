use crate::body::{Body, BodyConfig};
use crate::error::EngineResult;
use crate::geom::Segment;
use crate::texture::TextureCache;

/// Stable handle to a registered body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(u64);

impl BodyId {
    pub fn raw(self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// Optional rectangle `[0, width] x [0, height]` bodies must be built inside.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorldBounds {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl WorldBounds {
    pub fn new(width: Option<f64>, height: Option<f64>) -> Self {
        Self { width, height }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Each configured dimension is checked on its own.
    pub fn contains_segment(&self, segment: &Segment) -> bool {
        let (s, e) = (segment.start(), segment.end());
        if let Some(w) = self.width {
            if s.x.min(e.x) < 0.0 || s.x.max(e.x) > w {
                return false;
            }
        }
        if let Some(h) = self.height {
            if s.y.min(e.y) < 0.0 || s.y.max(e.y) > h {
                return false;
            }
        }
        true
    }
}

/// Ordered body registry. Order is iteration/tie-break order, never z-order.
#[derive(Default)]
pub struct World {
    ids: Vec<BodyId>,
    bodies: Vec<Body>,
    next_id: u64,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_body(&mut self, body: Body) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        log::debug!("registered {body} as #{}", id.0);
        self.ids.push(id);
        self.bodies.push(body);
        id
    }

    pub fn add_bodies(&mut self, bodies: impl IntoIterator<Item = Body>) -> Vec<BodyId> {
        bodies.into_iter().map(|b| self.add_body(b)).collect()
    }

    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        let index = self.index_of(id)?;
        self.ids.remove(index);
        let body = self.bodies.remove(index);
        log::debug!("removed {body} (#{})", id.0);
        Some(body)
    }

    pub fn get(&self, id: BodyId) -> Option<&Body> {
        self.index_of(id).map(|i| &self.bodies[i])
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.index_of(id).map(|i| &mut self.bodies[i])
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn index_of(&self, id: BodyId) -> Option<usize> {
        self.ids.iter().position(|&i| i == id)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Registry order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.ids.iter().copied().zip(self.bodies.iter())
    }

    pub fn ids(&self) -> &[BodyId] {
        &self.ids
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub(crate) fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }
}

/// Four walls around a rectangle, in the order top, left, bottom, right.
///
/// With `surrounding` the front faces look inward, otherwise outward.
pub fn wall_block(
    bounds: &WorldBounds,
    textures: &TextureCache,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    config: &BodyConfig,
    surrounding: bool,
) -> EngineResult<Vec<Body>> {
    let sides = if surrounding {
        [
            Segment::from_coords(x1, y1, x2, y1),
            Segment::from_coords(x1, y2, x1, y1),
            Segment::from_coords(x2, y2, x1, y2),
            Segment::from_coords(x2, y1, x2, y2),
        ]
    } else {
        [
            Segment::from_coords(x2, y1, x1, y1),
            Segment::from_coords(x1, y1, x1, y2),
            Segment::from_coords(x1, y2, x2, y2),
            Segment::from_coords(x2, y2, x2, y1),
        ]
    };
    sides
        .into_iter()
        .map(|seg| Body::new(bounds, textures, seg, config.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall(x1: f64, y1: f64, x2: f64, y2: f64) -> Body {
        Body::new(
            &WorldBounds::unbounded(),
            &TextureCache::new(),
            Segment::from_coords(x1, y1, x2, y2),
            BodyConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn ids_survive_removal_and_order_is_kept() {
        let mut world = World::new();
        let a = world.add_body(wall(0.0, 0.0, 1.0, 0.0));
        let b = world.add_body(wall(0.0, 1.0, 1.0, 1.0));
        let c = world.add_body(wall(0.0, 2.0, 1.0, 2.0));
        assert!(world.remove_body(b).is_some());
        assert!(world.remove_body(b).is_none());
        let order: Vec<BodyId> = world.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![a, c]);
        assert_eq!(world.get(c).unwrap().start().y, 2.0);
        let d = world.add_body(wall(0.0, 3.0, 1.0, 3.0));
        assert_ne!(d, b);
    }

    #[test]
    fn bounds_check_each_dimension_independently() {
        let only_width = WorldBounds::new(Some(10.0), None);
        assert!(only_width.contains_segment(&Segment::from_coords(0.0, -50.0, 10.0, 500.0)));
        assert!(!only_width.contains_segment(&Segment::from_coords(-0.1, 0.0, 5.0, 0.0)));
        assert!(WorldBounds::unbounded().contains_segment(&Segment::from_coords(-1e9, 0.0, 1e9, 0.0)));
    }

    #[test]
    fn wall_block_winding_flips_with_surrounding() {
        let bounds = WorldBounds::unbounded();
        let cache = TextureCache::new();
        let cfg = BodyConfig::default();
        let outward = wall_block(&bounds, &cache, 0.0, 0.0, 10.0, 10.0, &cfg, false).unwrap();
        let inward = wall_block(&bounds, &cache, 0.0, 0.0, 10.0, 10.0, &cfg, true).unwrap();
        assert_eq!(outward.len(), 4);
        for (o, i) in outward.iter().zip(&inward) {
            assert_eq!(o.start(), i.end());
            assert_eq!(o.end(), i.start());
        }
    }
}
