//! Ray casting camera.
//!
//! Every frame runs `cast_rays -> calculate_ray_collisions -> apply_occlusion
//! -> draw`, starting and ending in [`CameraPhase::Idle`]. Rays and their
//! collision lists are rebuilt from scratch each time.

use std::f64::consts::TAU;
use std::sync::Arc;

use crate::body::Body;
use crate::color::Color;
use crate::geom::{Point, Segment, cross, intersect, scale};
use crate::renderer::FrameBuffer;
use crate::texture::TextureFrame;
use crate::world::{BodyId, World};

/// Eye height above the viewer's `y_pos_3d`, in wall units.
pub const EYE_LEVEL: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewSettings {
    pub total_rays: usize,
    pub render_distance: f64,
    pub variable_height: bool,
    pub sky_color: Color,
    pub ground_color: Color,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            total_rays: 640,
            render_distance: 1e7,
            variable_height: false,
            sky_color: Color::rgb(99, 185, 255),
            ground_color: Color::rgb(226, 226, 226),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraPhase {
    #[default]
    Idle,
    RaysCast,
    CollisionsGathered,
}

/// One hit along a ray.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    pub point: Point,
    pub body: BodyId,
    /// Euclidean distance from the ray origin.
    pub distance: f64,
    pub render_this_frame: bool,
    /// Registry slot of `body`; valid for the frame it was gathered in.
    pub(crate) slot: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ray {
    pub origin: Point,
    pub angle: f64,
    pub segment: Segment,
    /// Farthest first once gathered.
    pub collisions: Vec<Collision>,
}

impl Ray {
    pub fn new(origin: Point, angle: f64, length: f64) -> Self {
        Self {
            origin,
            angle,
            segment: Segment::from_angle(origin, angle, length),
            collisions: Vec::new(),
        }
    }

    #[inline]
    pub fn direction(&self) -> (f64, f64) {
        let (s, c) = self.angle.sin_cos();
        (c, s)
    }
}

/// Screen rectangle of one projected collision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone)]
pub struct Camera {
    /// Degrees.
    pub fov: f64,
    /// Radians per second.
    pub turn_speed: f64,
    rays: Vec<Ray>,
    phase: CameraPhase,
}

/// `(total_rays / 2) / tan(fov / 2)`.
#[inline]
pub fn distance_to_projection_plane(total_rays: usize, fov: f64) -> f64 {
    (total_rays as f64 / 2.0) / (fov.to_radians() / 2.0).tan()
}

/// Angle of ray `index`; atan spacing keeps the projection free of fisheye.
///
/// The centre index is `total_rays / 2` (integer), so for an odd ray count
/// the middle ray points exactly along `facing`.
#[inline]
pub fn ray_angle(index: usize, total_rays: usize, fov: f64, facing: f64) -> f64 {
    let dist = distance_to_projection_plane(total_rays, fov);
    let offset = index as f64 - (total_rays / 2) as f64;
    (offset / dist).atan() + facing
}

/// Screen height of a unit-height body at fisheye-corrected `distance`.
#[inline]
pub fn projected_height(distance: f64, fov: f64, screen_height: f64) -> f64 {
    screen_height / (distance / fov)
}

/// Row the sky/ground split sits on for a given pitch.
#[inline]
pub fn horizon(screen_height: f64, vertical_angle: f64) -> f64 {
    screen_height * (vertical_angle / TAU)
}

impl Camera {
    pub fn new(fov: f64, turn_speed: f64) -> Self {
        Self {
            fov,
            turn_speed,
            rays: Vec::new(),
            phase: CameraPhase::Idle,
        }
    }

    pub fn phase(&self) -> CameraPhase {
        self.phase
    }

    pub fn rays(&self) -> &[Ray] {
        &self.rays
    }

    /// Rebuild the fan of rays from `origin`.
    pub fn cast_rays(&mut self, origin: Point, facing: f64, settings: &ViewSettings) {
        self.rays.clear();
        self.rays.extend((0..settings.total_rays).map(|x| {
            let angle = ray_angle(x, settings.total_rays, self.fov, facing);
            Ray::new(origin, angle, settings.render_distance)
        }));
        self.phase = CameraPhase::RaysCast;
    }

    /// Collect every hit on every visible body except `viewer`, farthest first.
    pub fn calculate_ray_collisions(&mut self, viewer: BodyId, world: &World) {
        for ray in &mut self.rays {
            ray.collisions.clear();
            for (slot, (id, body)) in world.iter().enumerate() {
                if id == viewer || !body.visible {
                    continue;
                }
                if let Some(point) = intersect(&ray.segment, body.segment()) {
                    ray.collisions.push(Collision {
                        point,
                        body: id,
                        distance: ray.origin.distance(point),
                        render_this_frame: true,
                        slot,
                    });
                }
            }
            ray.collisions
                .sort_by(|a, b| b.distance.total_cmp(&a.distance));
        }
        self.phase = CameraPhase::CollisionsGathered;
    }

    /// An opaque hit hides the hit just behind it. Skipped entirely in
    /// variable-height mode, where a short near body need not hide a tall far one.
    pub fn apply_occlusion(&mut self, world: &World, variable_height: bool) {
        if variable_height {
            return;
        }
        let bodies = world.bodies();
        for ray in &mut self.rays {
            for m in 1..ray.collisions.len() {
                if bodies[ray.collisions[m].slot].color.is_opaque() {
                    ray.collisions[m - 1].render_this_frame = false;
                }
            }
        }
    }

    /// Screen rectangle for `hit` on `target` seen by `viewer` along `ray`.
    pub fn project(
        &self,
        ray_index: usize,
        ray: &Ray,
        hit: &Collision,
        viewer: &Body,
        target: &Body,
        settings: &ViewSettings,
        screen_width: f64,
        screen_height: f64,
    ) -> Option<Column> {
        let corrected = hit.distance * (ray.angle - viewer.facing()).cos();
        if corrected <= f64::EPSILON {
            return None;
        }
        let width = screen_width / settings.total_rays as f64;
        let projected = projected_height(corrected, self.fov, screen_height);
        let body_height = if settings.variable_height {
            target.var_height
        } else {
            1.0
        };
        let height = 2.0 * body_height * (projected / 2.0);

        // One wall unit is `projected` pixels tall; the target stands on its
        // own y_pos_3d, the eye sits EYE_LEVEL above the viewer's.
        let eye = viewer.y_pos_3d + EYE_LEVEL;
        let bottom = horizon(screen_height, viewer.vertical_angle)
            + (eye - target.y_pos_3d) * projected;

        let x = (ray_index as f64 * width).floor();
        let right = ((ray_index + 1) as f64 * width).floor().max(x + 1.0);
        Some(Column {
            x,
            y: bottom - height,
            width: right - x,
            height,
        })
    }

    /// Run the whole frame for `viewer` into `frame`.
    pub fn render(
        &mut self,
        viewer_id: BodyId,
        world: &World,
        settings: &ViewSettings,
        frame: &mut FrameBuffer,
    ) {
        let Some(viewer) = world.get(viewer_id) else {
            return;
        };
        let (sw, sh) = (frame.width() as f64, frame.height() as f64);

        frame.fill_sky_and_ground(
            horizon(sh, viewer.vertical_angle),
            settings.sky_color.to_pixel(),
            settings.ground_color.to_pixel(),
        );

        self.cast_rays(viewer.midpoint(), viewer.facing(), settings);
        self.calculate_ray_collisions(viewer_id, world);
        self.apply_occlusion(world, settings.variable_height);

        let bodies = world.bodies();
        for (i, ray) in self.rays.iter().enumerate() {
            for hit in &ray.collisions {
                if !settings.variable_height && !hit.render_this_frame {
                    continue;
                }
                let target = &bodies[hit.slot];
                let Some(col) = self.project(i, ray, hit, viewer, target, settings, sw, sh) else {
                    continue;
                };
                match surface(target, hit.point, ray.direction()) {
                    Surface::Textured(image, u) => {
                        frame.draw_texture_slice(&image, u, col.x, col.y, col.width, col.height)
                    }
                    Surface::Flat => {
                        frame.fill_rect(col.x, col.y, col.width, col.height, target.color)
                    }
                }
            }
        }
        self.phase = CameraPhase::Idle;
    }
}

/// What to paint for one hit.
#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    Flat,
    /// Image and source pixel column.
    Textured(Arc<TextureFrame>, usize),
}

/// Whether the ray sees the back of `target`.
///
/// Sweeping rays left to right, the front face maps to increasing texture
/// columns; the column runs backwards exactly when the ray direction crosses
/// the wall direction negatively.
#[inline]
pub fn is_back_face(target: &Body, ray_dir: (f64, f64)) -> bool {
    cross(ray_dir, target.segment().direction()) < 0.0
}

/// Pick texture (front or back) or flat colour for a hit.
pub fn surface(target: &Body, hit: Point, ray_dir: (f64, f64)) -> Surface {
    let length = target.segment().length();
    let from_start = hit.distance(target.start());

    let texture = if is_back_face(target, ray_dir) {
        target.back_texture()
    } else {
        target.texture()
    };

    let Some(image) = texture.and_then(|t| t.current_frame()) else {
        return Surface::Flat;
    };
    let column = scale(from_start, 0.0, length, 0.0, image.width as f64)
        .floor()
        .clamp(0.0, (image.width - 1) as f64) as usize;
    Surface::Textured(image, column)
}
