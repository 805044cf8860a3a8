//! Engine context: owns the registry, the texture cache and the loop state.
//!
//! `update` runs every body in registry order (controller script, texture
//! animation, physics, collision, post script) before anything renders.
//! Nothing happens until `start()` has moved the loop into
//! [`LoopState::Running`].

use std::fmt;
use std::time::{Duration, Instant};

use crate::body::{Body, BodyConfig};
use crate::camera::ViewSettings;
use crate::collision;
use crate::color::Color;
use crate::error::{EngineError, EngineResult};
use crate::geom::Segment;
use crate::input::InputSnapshot;
use crate::minimap::Minimap;
use crate::physics;
use crate::renderer::FrameBuffer;
use crate::texture::TextureCache;
use crate::world::{BodyId, World, WorldBounds, wall_block};

/// Longest step a single frame may integrate.
pub const MAX_FRAME_DT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub screen_width: usize,
    pub screen_height: usize,
    /// Ray length in world units.
    pub render_distance: f64,
    /// Defaults to `screen_width`; must not exceed it.
    pub total_rays: Option<usize>,
    pub debug_mode: bool,
    pub world_width: Option<f64>,
    pub world_height: Option<f64>,
    pub variable_height: bool,
    /// Hold off simulating until every cached texture has loaded or failed.
    pub wait_for_assets: bool,
    /// Register a boundary wall block on `init()` when both world sizes are set.
    pub enclose_world: bool,
    pub sky_color: Color,
    pub ground_color: Color,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            screen_width: 640,
            screen_height: 480,
            render_distance: 1e7,
            total_rays: None,
            debug_mode: false,
            world_width: None,
            world_height: None,
            variable_height: false,
            wait_for_assets: false,
            enclose_world: true,
            sky_color: Color::rgb(99, 185, 255),
            ground_color: Color::rgb(226, 226, 226),
        }
    }
}

impl EngineConfig {
    pub fn total_rays(&self) -> usize {
        self.total_rays.unwrap_or(self.screen_width)
    }

    pub fn bounds(&self) -> WorldBounds {
        WorldBounds::new(self.world_width, self.world_height)
    }

    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            total_rays: self.total_rays(),
            render_distance: self.render_distance,
            variable_height: self.variable_height,
            sky_color: self.sky_color,
            ground_color: self.ground_color,
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.screen_width == 0 || self.screen_height == 0 {
            return Err(EngineError::InvalidConfig(format!(
                "screen size must be non-zero, got {}x{}",
                self.screen_width, self.screen_height
            )));
        }
        let total_rays = self.total_rays();
        if total_rays == 0 {
            return Err(EngineError::InvalidConfig("total_rays must be at least 1".into()));
        }
        if total_rays > self.screen_width {
            return Err(EngineError::TooManyRays {
                total_rays,
                width: self.screen_width,
            });
        }
        if self.render_distance.is_nan() || self.render_distance <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "render_distance must be positive, got {}",
                self.render_distance
            )));
        }
        for (name, dim) in [("world_width", self.world_width), ("world_height", self.world_height)] {
            if let Some(d) = dim {
                if d.is_nan() || d <= 0.0 {
                    return Err(EngineError::InvalidConfig(format!(
                        "{name} must be positive, got {d}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Constructed,
    Initialized,
    Running,
}

/// Monotonic frame timer with a capped step.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    max_dt: Duration,
}

impl FrameClock {
    pub fn new(max_dt: Duration) -> Self {
        Self {
            last: Instant::now(),
            max_dt,
        }
    }

    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Seconds since the previous tick, capped.
    pub fn tick(&mut self) -> f64 {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> f64 {
        let dt = now.saturating_duration_since(self.last).min(self.max_dt);
        self.last = now;
        dt.as_secs_f64()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(MAX_FRAME_DT)
    }
}

/// Frames counted over one-second windows.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frames: u32,
    window_start: Instant,
    fps: f64,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            frames: 0,
            window_start: Instant::now(),
            fps: 0.0,
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Count a frame; returns the new rate whenever a window closes.
    pub fn frame_at(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start).as_secs_f64();
        if elapsed < 1.0 {
            return None;
        }
        self.fps = self.frames as f64 / elapsed;
        self.frames = 0;
        self.window_start = now;
        Some(self.fps)
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// FPS plus the positions of tracked bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugReport {
    pub fps: f64,
    /// `(label, x, z)` of each tracked body, midpoint rounded.
    pub tracked: Vec<(String, i64, i64)>,
}

impl fmt::Display for DebugReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FPS: {:.0}", self.fps)?;
        for (name, x, z) in &self.tracked {
            write!(f, " | {name}({x}, {z})")?;
        }
        Ok(())
    }
}

pub struct Engine {
    config: EngineConfig,
    view: ViewSettings,
    bounds: WorldBounds,
    world: World,
    textures: TextureCache,
    state: LoopState,
    assets_ready: bool,
    clock: FrameClock,
    fps: FpsCounter,
    tracked: Vec<BodyId>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        log::info!(
            "engine created: {}x{} screen, {} rays, bounds {:?}",
            config.screen_width,
            config.screen_height,
            config.total_rays(),
            config.bounds()
        );
        Ok(Self {
            view: config.view_settings(),
            bounds: config.bounds(),
            config,
            world: World::new(),
            textures: TextureCache::new(),
            state: LoopState::Constructed,
            assets_ready: false,
            clock: FrameClock::default(),
            fps: FpsCounter::new(),
            tracked: Vec::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn view_settings(&self) -> &ViewSettings {
        &self.view
    }

    pub fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureCache {
        &mut self.textures
    }

    pub fn set_debug_mode(&mut self, on: bool) {
        self.config.debug_mode = on;
    }

    /// Constructed -> Initialized. Encloses a bounded world in walls.
    pub fn init(&mut self) -> EngineResult<()> {
        if self.state != LoopState::Constructed {
            log::warn!("init() called in state {:?}; ignored", self.state);
            return Ok(());
        }
        if self.config.enclose_world {
            if let (Some(w), Some(h)) = (self.config.world_width, self.config.world_height) {
                let walls = wall_block(
                    &self.bounds,
                    &self.textures,
                    0.0,
                    0.0,
                    w,
                    h,
                    &BodyConfig::default().with_name("Boundary"),
                    false,
                )?;
                self.world.add_bodies(walls);
            }
        }
        self.state = LoopState::Initialized;
        log::info!("engine initialized with {} bodies", self.world.len());
        Ok(())
    }

    /// -> Running. Initializes first if that has not happened yet.
    pub fn start(&mut self) -> EngineResult<()> {
        match self.state {
            LoopState::Running => return Ok(()),
            LoopState::Constructed => self.init()?,
            LoopState::Initialized => {}
        }
        self.state = LoopState::Running;
        self.clock.reset();
        log::info!("engine running");
        Ok(())
    }

    /// Running, and with assets settled when the config asks to wait for them.
    pub fn poll_ready(&mut self) -> bool {
        if self.state != LoopState::Running {
            return false;
        }
        if !self.assets_ready {
            if self.config.wait_for_assets && !self.textures.all_settled() {
                return false;
            }
            self.assets_ready = true;
            if self.config.wait_for_assets {
                log::info!("all {} textures settled", self.textures.len());
            }
        }
        true
    }

    /// Build a body against this engine's bounds and texture cache.
    pub fn create_body(&self, segment: Segment, config: BodyConfig) -> EngineResult<Body> {
        Body::new(&self.bounds, &self.textures, segment, config)
    }

    pub fn add_body(&mut self, body: Body) -> BodyId {
        self.world.add_body(body)
    }

    pub fn add_bodies(&mut self, bodies: impl IntoIterator<Item = Body>) -> Vec<BodyId> {
        self.world.add_bodies(bodies)
    }

    /// Create and register in one step; an out-of-bounds body is never added.
    pub fn spawn(&mut self, segment: Segment, config: BodyConfig) -> EngineResult<BodyId> {
        let body = self.create_body(segment, config)?;
        Ok(self.world.add_body(body))
    }

    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        self.tracked.retain(|&t| t != id);
        self.world.remove_body(id)
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.world.get(id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.world.get_mut(id)
    }

    /// Add `id` to the debug report.
    pub fn track(&mut self, id: BodyId) {
        if !self.tracked.contains(&id) {
            self.tracked.push(id);
        }
    }

    pub fn untrack(&mut self, id: BodyId) {
        self.tracked.retain(|&t| t != id);
    }

    /// Advance every body by `dt` seconds. A no-op until the loop is active.
    pub fn update(&mut self, dt: f64, input: &InputSnapshot) {
        if !self.poll_ready() {
            return;
        }
        let bodies = self.world.bodies_mut();
        for i in 0..bodies.len() {
            bodies[i].pre_update(input, dt);
            bodies[i].update_textures(dt);
            if let Some((dx, dz)) = physics::integrate(&mut bodies[i], dt) {
                collision::move_and_resolve(bodies, i, dx, dz);
            }
            bodies[i].post_update(dt);
        }
    }

    /// First camera-bearing body in registry order.
    pub fn primary_camera(&self) -> Option<BodyId> {
        self.world
            .iter()
            .find(|(_, b)| b.has_camera())
            .map(|(id, _)| id)
    }

    /// Draw the primary camera's view. Returns false when nothing was drawn.
    pub fn render(&mut self, frame: &mut FrameBuffer) -> bool {
        if !self.poll_ready() {
            return false;
        }
        match self.primary_camera() {
            Some(id) => self.render_view(id, frame),
            None => false,
        }
    }

    /// Draw the view of the camera owned by `id`.
    pub fn render_view(&mut self, id: BodyId, frame: &mut FrameBuffer) -> bool {
        let Some(mut camera) = self.world.get_mut(id).and_then(Body::take_camera) else {
            return false;
        };
        // Out of the body while it reads the whole registry
        camera.render(id, &self.world, &self.view, frame);
        if let Some(body) = self.world.get_mut(id) {
            body.restore_camera(camera);
        }
        true
    }

    /// Top-down overview; rays of `viewer` are overlaid in debug mode.
    pub fn render_minimap(&self, minimap: &Minimap, frame: &mut FrameBuffer) {
        let viewer = self.primary_camera();
        minimap.draw(frame, &self.world, &self.bounds, viewer, self.config.debug_mode);
    }

    /// One whole frame: clock, update, render, FPS. Returns the step used.
    pub fn frame(&mut self, input: &InputSnapshot, frame: &mut FrameBuffer) -> f64 {
        let dt = self.clock.tick();
        self.update(dt, input);
        self.render(frame);
        if let Some(fps) = self.fps.frame_at(Instant::now()) {
            if self.config.debug_mode {
                log::debug!("{}", self.debug_report());
            }
            log::trace!("fps window closed at {fps:.1}");
        }
        dt
    }

    pub fn fps(&self) -> f64 {
        self.fps.fps()
    }

    pub fn debug_report(&self) -> DebugReport {
        let tracked = self
            .tracked
            .iter()
            .filter_map(|&id| self.world.get(id))
            .map(|b| {
                let mid = b.midpoint();
                (b.label().to_string(), mid.x.round() as i64, mid.y.round() as i64)
            })
            .collect();
        DebugReport {
            fps: self.fps.fps(),
            tracked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Controller;
    use crate::geom::Point;
    use crate::texture::TextureFrame;

    fn engine(config: EngineConfig) -> Engine {
        Engine::new(config).unwrap()
    }

    #[test]
    fn defaults_are_documented_values() {
        let c = EngineConfig::default();
        assert_eq!((c.screen_width, c.screen_height), (640, 480));
        assert_eq!(c.total_rays(), 640);
        assert_eq!(c.render_distance, 1e7);
        assert!(!c.debug_mode && !c.variable_height && !c.wait_for_assets);
        assert!(c.bounds().width.is_none());
    }

    #[test]
    fn more_rays_than_columns_is_rejected() {
        let err = Engine::new(EngineConfig {
            total_rays: Some(641),
            ..EngineConfig::default()
        })
        .err()
        .unwrap();
        assert_eq!(
            err,
            EngineError::TooManyRays {
                total_rays: 641,
                width: 640
            }
        );
        assert!(matches!(
            Engine::new(EngineConfig {
                screen_height: 0,
                ..EngineConfig::default()
            }),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn state_machine_transitions() {
        let mut e = engine(EngineConfig::default());
        assert_eq!(e.state(), LoopState::Constructed);
        e.init().unwrap();
        assert_eq!(e.state(), LoopState::Initialized);
        e.start().unwrap();
        assert_eq!(e.state(), LoopState::Running);
        e.start().unwrap();
        assert_eq!(e.state(), LoopState::Running);
    }

    #[test]
    fn bounded_world_is_enclosed_on_init() {
        let mut e = engine(EngineConfig {
            world_width: Some(100.0),
            world_height: Some(50.0),
            ..EngineConfig::default()
        });
        e.init().unwrap();
        assert_eq!(e.world().len(), 4);
        // Default winding: the top wall runs from (w, 0) back to the origin
        let top = e.world().bodies()[0].segment();
        assert_eq!(top.start(), Point::new(100.0, 0.0));
        assert_eq!(top.end(), Point::new(0.0, 0.0));

        let mut open = engine(EngineConfig {
            world_width: Some(100.0),
            world_height: Some(50.0),
            enclose_world: false,
            ..EngineConfig::default()
        });
        open.init().unwrap();
        assert!(open.world().is_empty());
    }

    #[test]
    fn out_of_bounds_spawn_is_not_registered() {
        let mut e = engine(EngineConfig {
            world_width: Some(100.0),
            world_height: Some(100.0),
            enclose_world: false,
            ..EngineConfig::default()
        });
        let res = e.spawn(Segment::from_coords(50.0, 50.0, 150.0, 50.0), BodyConfig::default());
        assert!(matches!(res, Err(EngineError::Bounds { .. })));
        assert!(e.world().is_empty());
    }

    #[test]
    fn update_is_a_no_op_before_start() {
        let mut e = engine(EngineConfig::default());
        let id = e
            .spawn(Segment::from_coords(0.0, 0.0, 2.0, 0.0), BodyConfig::default())
            .unwrap();
        e.body_mut(id).unwrap().velocity.x = 10.0;
        e.update(1.0, &InputSnapshot::default());
        assert_eq!(e.body(id).unwrap().midpoint().x, 1.0);

        e.start().unwrap();
        e.update(1.0, &InputSnapshot::default());
        assert_eq!(e.body(id).unwrap().midpoint().x, 11.0);
    }

    #[test]
    fn waits_for_pending_textures() {
        let mut e = engine(EngineConfig {
            wait_for_assets: true,
            ..EngineConfig::default()
        });
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let handle = e
            .textures_mut()
            .load_with("gate", move || {
                let _ = rx.recv();
                Ok(vec![TextureFrame::checker(4, 2, 0xFF00_0000, 0xFFFF_FFFF)])
            })
            .unwrap();
        let id = e
            .spawn(Segment::from_coords(0.0, 0.0, 2.0, 0.0), BodyConfig::default())
            .unwrap();
        e.body_mut(id).unwrap().velocity.x = 10.0;
        e.start().unwrap();

        e.update(1.0, &InputSnapshot::default());
        assert_eq!(e.body(id).unwrap().midpoint().x, 1.0);

        tx.send(()).unwrap();
        handle.join().unwrap();
        e.update(1.0, &InputSnapshot::default());
        assert_eq!(e.body(id).unwrap().midpoint().x, 11.0);
    }

    struct Log(std::rc::Rc<std::cell::RefCell<Vec<u64>>>, u64);

    impl Controller for Log {
        fn pre_update(&mut self, _body: &mut Body, _input: &InputSnapshot, _dt: f64) {
            self.0.borrow_mut().push(self.1);
        }
    }

    #[test]
    fn bodies_update_in_registry_order() {
        let mut e = engine(EngineConfig::default());
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        for (i, z) in [30.0, 10.0, 20.0].into_iter().enumerate() {
            let mut b = e
                .create_body(Segment::from_coords(0.0, z, 1.0, z), BodyConfig::default())
                .unwrap();
            b.set_controller(Box::new(Log(seen.clone(), i as u64)));
            e.add_body(b);
        }
        e.start().unwrap();
        e.update(0.1, &InputSnapshot::default());
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn render_needs_a_camera_and_a_running_loop() {
        let mut e = engine(EngineConfig {
            screen_width: 16,
            screen_height: 12,
            ..EngineConfig::default()
        });
        let mut frame = FrameBuffer::new(16, 12);
        let mut viewer = e
            .create_body(Segment::from_coords(0.0, 1.0, 0.0, -1.0), BodyConfig::default())
            .unwrap();
        viewer.attach_camera(None, None);
        let id = e.add_body(viewer);

        assert!(!e.render(&mut frame));
        e.start().unwrap();
        assert_eq!(e.primary_camera(), Some(id));
        assert!(e.render(&mut frame));
        assert!(e.body(id).unwrap().has_camera());
        assert_eq!(frame.pixel(0, 0), e.view_settings().sky_color.to_pixel());
    }

    #[test]
    fn frame_clock_caps_long_pauses() {
        let start = Instant::now();
        let mut clock = FrameClock::default();
        clock.tick_at(start);
        let dt = clock.tick_at(start + Duration::from_secs(3));
        assert!((dt - 0.1).abs() < 1e-9);
        let dt = clock.tick_at(start + Duration::from_millis(3016));
        assert!((dt - 0.016).abs() < 1e-9);
    }

    #[test]
    fn fps_counter_reports_once_per_second() {
        let start = Instant::now();
        let mut fps = FpsCounter {
            frames: 0,
            window_start: start,
            fps: 0.0,
        };
        for i in 1..60 {
            assert!(fps.frame_at(start + Duration::from_millis(i * 16)).is_none());
        }
        let rate = fps.frame_at(start + Duration::from_secs(1)).unwrap();
        assert!((rate - 60.0).abs() < 1e-9);
    }

    #[test]
    fn debug_report_lists_tracked_bodies() {
        let mut e = engine(EngineConfig::default());
        let id = e
            .spawn(
                Segment::from_coords(10.0, 20.0, 12.0, 20.0),
                BodyConfig::default().with_name("Player"),
            )
            .unwrap();
        e.track(id);
        e.track(id);
        let report = e.debug_report();
        assert_eq!(report.tracked, vec![("Player".to_string(), 11, 20)]);
        assert_eq!(report.to_string(), "FPS: 0 | Player(11, 20)");
        e.remove_body(id);
        assert!(e.debug_report().tracked.is_empty());
    }
}
