//! The one renderable, collidable body type.
//!
//! Static walls and camera holders are the same [`Body`]; what used to be a
//! subclass difference is data (`collidable`, an optional owned [`Camera`],
//! an optional [`Controller`] script).

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;

use crate::camera::Camera;
use crate::color::Color;
use crate::error::{EngineError, EngineResult};
use crate::geom::{Point, Segment};
use crate::input::InputSnapshot;
use crate::texture::{Texture, TextureCache};
use crate::world::WorldBounds;

pub const DEFAULT_FOV: f64 = 100.0;
pub const DEFAULT_TURN_SPEED: f64 = PI;

/// Per-axis triple. `x`/`z` span the ground plane, `y` is vertical.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Axis3<T> {
    pub x: T,
    pub z: T,
    pub y: T,
}

impl<T> Axis3<T> {
    pub const fn new(x: T, z: T, y: T) -> Self {
        Self { x, z, y }
    }
}

/// Sideways component of a planar move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strafe {
    #[default]
    None,
    Left,
    Right,
}

impl Strafe {
    /// Rotation applied to the facing angle.
    pub fn offset(self) -> f64 {
        match self {
            Strafe::None => 0.0,
            Strafe::Left => -FRAC_PI_2,
            Strafe::Right => FRAC_PI_2,
        }
    }

    pub fn from_sign(sign: i32) -> Self {
        match sign.signum() {
            -1 => Strafe::Left,
            1 => Strafe::Right,
            _ => Strafe::None,
        }
    }
}

/// Script attached to a body. `pre_update` runs before physics, `post_update`
/// after the move has been resolved.
pub trait Controller {
    fn pre_update(&mut self, body: &mut Body, input: &InputSnapshot, dt: f64);

    fn post_update(&mut self, _body: &mut Body, _dt: f64) {}
}

/// Construction options with documented defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyConfig {
    pub collidable: bool,
    /// Height in wall units; only honoured in variable-height mode.
    pub var_height: f64,
    pub texture: Option<String>,
    pub back_texture: Option<String>,
    pub color: Color,
    pub visible: bool,
    /// Label used by the debug report.
    pub name: Option<String>,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            collidable: true,
            var_height: 1.0,
            texture: None,
            back_texture: None,
            color: Color::WHITE,
            visible: true,
            name: None,
        }
    }
}

impl BodyConfig {
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_texture(mut self, key: impl Into<String>) -> Self {
        self.texture = Some(key.into());
        self
    }

    pub fn with_back_texture(mut self, key: impl Into<String>) -> Self {
        self.back_texture = Some(key.into());
        self
    }

    pub fn with_height(mut self, var_height: f64) -> Self {
        self.var_height = var_height;
        self
    }

    pub fn with_collidable(mut self, collidable: bool) -> Self {
        self.collidable = collidable;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

pub struct Body {
    segment: Segment,
    pub var_height: f64,
    pub color: Color,
    texture: Option<Texture>,
    back_texture: Option<Texture>,
    pub collidable: bool,
    pub visible: bool,
    pub name: Option<String>,

    /// Acceleration = force / mass.
    pub mass: f64,
    pub velocity: Axis3<f64>,
    /// `None` leaves the axis unclamped.
    pub terminal_velocity: Axis3<Option<f64>>,
    /// Deceleration opposing x/z motion; constant downward bias on y.
    pub friction: Axis3<f64>,
    /// Vertical offset, 0 is the ground.
    pub y_pos_3d: f64,
    /// Visual pitch; PI puts the horizon mid-screen.
    pub vertical_angle: f64,

    camera: Option<Camera>,
    controller: Option<Box<dyn Controller>>,
    /// Midpoint before the last resolved move.
    pub(crate) prev_mid: Option<Point>,
}

impl Body {
    /// Build a body, failing if any endpoint lies outside `bounds`.
    ///
    /// Unknown texture keys are logged and leave the body untextured.
    pub fn new(
        bounds: &WorldBounds,
        textures: &TextureCache,
        segment: Segment,
        config: BodyConfig,
    ) -> EngineResult<Self> {
        if !bounds.contains_segment(&segment) {
            return Err(EngineError::Bounds {
                body: describe(&segment),
                width: bounds.width.unwrap_or(f64::INFINITY),
                height: bounds.height.unwrap_or(f64::INFINITY),
            });
        }

        let texture = config.texture.as_deref().and_then(|k| textures.resolve(k));
        let back_texture = config
            .back_texture
            .as_deref()
            .and_then(|k| textures.resolve(k));

        Ok(Self {
            segment,
            var_height: config.var_height,
            color: config.color,
            texture,
            back_texture,
            collidable: config.collidable,
            visible: config.visible,
            name: config.name,
            mass: 1.0,
            velocity: Axis3::default(),
            terminal_velocity: Axis3::default(),
            friction: Axis3::default(),
            y_pos_3d: 0.0,
            vertical_angle: PI,
            camera: None,
            controller: None,
            prev_mid: None,
        })
    }

    #[inline]
    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    #[inline]
    pub fn start(&self) -> Point {
        self.segment.start()
    }

    #[inline]
    pub fn end(&self) -> Point {
        self.segment.end()
    }

    #[inline]
    pub fn midpoint(&self) -> Point {
        self.segment.midpoint()
    }

    /// Segment angle.
    #[inline]
    pub fn angle(&self) -> f64 {
        self.segment.angle()
    }

    /// View direction: perpendicular to the body's own segment.
    #[inline]
    pub fn facing(&self) -> f64 {
        self.segment.angle() + FRAC_PI_2
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    pub fn back_texture(&self) -> Option<&Texture> {
        self.back_texture.as_ref()
    }

    pub fn set_texture(&mut self, texture: Option<Texture>) {
        self.texture = texture;
    }

    pub fn set_back_texture(&mut self, texture: Option<Texture>) {
        self.back_texture = texture;
    }

    /// Look `key` up in the cache; a miss is logged and clears the texture.
    pub fn set_texture_key(&mut self, textures: &TextureCache, key: &str) {
        self.texture = textures.resolve(key);
    }

    pub fn set_back_texture_key(&mut self, textures: &TextureCache, key: &str) {
        self.back_texture = textures.resolve(key);
    }

    /// Create the owned camera, replacing any previous one.
    pub fn attach_camera(&mut self, fov: Option<f64>, turn_speed: Option<f64>) {
        self.camera = Some(Camera::new(
            fov.unwrap_or(DEFAULT_FOV),
            turn_speed.unwrap_or(DEFAULT_TURN_SPEED),
        ));
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.camera.as_mut()
    }

    pub fn has_camera(&self) -> bool {
        self.camera.is_some()
    }

    pub(crate) fn take_camera(&mut self) -> Option<Camera> {
        self.camera.take()
    }

    pub(crate) fn restore_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
    }

    pub fn set_controller(&mut self, controller: Box<dyn Controller>) {
        self.controller = Some(controller);
    }

    pub fn has_controller(&self) -> bool {
        self.controller.is_some()
    }

    /// Run the controller script, if any.
    pub fn pre_update(&mut self, input: &InputSnapshot, dt: f64) {
        // Taken out so the script can borrow the body mutably
        if let Some(mut controller) = self.controller.take() {
            controller.pre_update(self, input, dt);
            if self.controller.is_none() {
                self.controller = Some(controller);
            }
        }
    }

    pub fn post_update(&mut self, dt: f64) {
        if let Some(mut controller) = self.controller.take() {
            controller.post_update(self, dt);
            if self.controller.is_none() {
                self.controller = Some(controller);
            }
        }
    }

    pub(crate) fn update_textures(&mut self, dt: f64) {
        if let Some(t) = self.texture.as_mut() {
            t.update(dt);
        }
        if let Some(t) = self.back_texture.as_mut() {
            t.update(dt);
        }
    }

    /// Rotate about the midpoint.
    pub fn turn_horizontally(&mut self, angle: f64) {
        self.segment.rotate(angle);
    }

    /// Pitch only; the segment is untouched.
    pub fn turn_vertically(&mut self, angle: f64) {
        self.vertical_angle += angle;
    }

    /// Absolute segment angle.
    pub fn set_angle(&mut self, angle: f64) {
        self.turn_horizontally(angle - self.segment.angle());
    }

    /// Absolute view direction.
    pub fn set_facing(&mut self, facing: f64) {
        self.set_angle(facing - FRAC_PI_2);
    }

    /// Accelerate along the facing direction, turned +-90 degrees when strafing.
    pub fn move_planar(&mut self, force: f64, strafe: Strafe, dt: f64) {
        let acceleration = force / self.mass;
        let (s, c) = (self.facing() + strafe.offset()).sin_cos();
        self.velocity.x += acceleration * c * dt;
        self.velocity.z += acceleration * s * dt;
    }

    /// Vertical impulse; callers gate jumps on [`Body::is_grounded`].
    pub fn move_y(&mut self, force: f64, dt: f64) {
        self.velocity.y += force / self.mass * dt;
    }

    pub fn is_grounded(&self) -> bool {
        self.y_pos_3d <= 0.0
    }

    pub(crate) fn translate(&mut self, dx: f64, dz: f64) {
        self.segment.translate(dx, dz);
    }

    /// Move so the start point sits at `x`, keeping shape.
    pub fn set_x(&mut self, x: f64) {
        let dx = x - self.segment.start().x;
        self.segment.translate(dx, 0.0);
        self.prev_mid = None;
    }

    /// Move so the start point sits at `z`, keeping shape.
    pub fn set_z(&mut self, z: f64) {
        let dz = z - self.segment.start().y;
        self.segment.translate(0.0, dz);
        self.prev_mid = None;
    }

    /// Teleport the midpoint; the next move is not swept from the old spot.
    pub fn set_position(&mut self, midpoint: Point) {
        let mid = self.segment.midpoint();
        self.segment.translate(midpoint.x - mid.x, midpoint.y - mid.y);
        self.prev_mid = None;
    }

    pub fn prev_midpoint(&self) -> Option<Point> {
        self.prev_mid
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("Body")
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe(&self.segment))
    }
}

fn describe(segment: &Segment) -> String {
    let (s, e) = (segment.start(), segment.end());
    format!("[Body({},{},{},{})]", s.x, s.y, e.x, e.y)
}
