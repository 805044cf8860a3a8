use std::collections::HashSet;
use std::f64::consts::FRAC_PI_2;
use std::num::NonZeroU32;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

use planar_raycaster::body::Axis3;
use planar_raycaster::scaler::{ScaleLut, blit_bilinear_stretch};
use planar_raycaster::texture::TextureFrame;
use planar_raycaster::{
    Body, BodyConfig, BodyId, CellSpec, Color, Controller, Engine, EngineConfig, FrameBuffer,
    InputSnapshot, MapBuilder, Minimap, PlayerController, Segment, Strafe,
};

// Internal framebuffer size; one ray per column
const FB_W: usize = 640;
const FB_H: usize = 480;

const LEVEL: &str = "
##########
#........#
#..#.....#
#..#..\\..#
#........#
#.....##.#
#........#
#.\\......#
#........#
##########
";

/// Turns its body at a constant rate.
struct Spinner(f64);

impl Controller for Spinner {
    fn pre_update(&mut self, body: &mut Body, _input: &InputSnapshot, dt: f64) {
        body.turn_horizontally(self.0 * dt);
    }
}

struct App {
    window: Option<Rc<Window>>,
    surface: Option<softbuffer::Surface<Rc<Window>, Rc<Window>>>,
    engine: Engine,

    frame: FrameBuffer,
    scale_lut: ScaleLut,
    minimap: Minimap,
    show_minimap: bool,

    // Input
    keys_down: HashSet<KeyCode>,
    look: (f64, f64),
    pointer_grabbed: bool,

    last_title: Instant,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(err) = self.create_window(event_loop) {
            log::error!("{err:#}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("close requested; stopping");
                event_loop.exit();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat,
                        ..
                    },
                ..
            } => match state {
                ElementState::Pressed => {
                    self.keys_down.insert(code);
                    if !repeat {
                        self.key_pressed(code);
                    }
                }
                ElementState::Released => {
                    self.keys_down.remove(&code);
                }
            },

            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self.set_pointer_grab(true),

            WindowEvent::Focused(false) => {
                self.keys_down.clear();
                self.set_pointer_grab(false);
            }

            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw(id) {
                    log::error!("{err:#}");
                    event_loop.exit();
                }
            }

            WindowEvent::Resized(size) => {
                self.scale_lut =
                    ScaleLut::new(size.width as usize, size.height as usize, FB_W, FB_H);
            }
            _ => (),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.pointer_grabbed {
                self.look.0 += delta.0;
                self.look.1 += delta.1;
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl App {
    fn new() -> anyhow::Result<Self> {
        let mut engine = Engine::new(EngineConfig {
            screen_width: FB_W,
            screen_height: FB_H,
            world_width: Some(1000.0),
            world_height: Some(1000.0),
            ..EngineConfig::default()
        })?;
        load_textures(&mut engine)?;
        let player = build_world(&mut engine)?;
        engine.track(player);
        engine.start()?;

        Ok(Self {
            window: None,
            surface: None,
            engine,
            frame: FrameBuffer::new(FB_W, FB_H),
            scale_lut: ScaleLut::empty(),
            minimap: Minimap::default(),
            show_minimap: true,
            keys_down: HashSet::new(),
            look: (0.0, 0.0),
            pointer_grabbed: false,
            last_title: Instant::now(),
        })
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let attributes = Window::default_attributes()
            .with_title("Planar Raycaster")
            .with_inner_size(LogicalSize::new(960.0, 720.0));
        let window = Rc::new(event_loop.create_window(attributes)?);

        let context = softbuffer::Context::new(window.clone())
            .map_err(|e| anyhow::anyhow!("softbuffer context: {e}"))?;
        let surface = softbuffer::Surface::new(&context, window.clone())
            .map_err(|e| anyhow::anyhow!("softbuffer surface: {e}"))?;

        let size = window.inner_size();
        self.scale_lut = ScaleLut::new(size.width as usize, size.height as usize, FB_W, FB_H);
        self.surface = Some(surface);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn key_pressed(&mut self, code: KeyCode) {
        match code {
            KeyCode::Escape => self.set_pointer_grab(false),
            KeyCode::KeyM => self.show_minimap = !self.show_minimap,
            KeyCode::F3 => {
                let on = !self.engine.config().debug_mode;
                self.engine.set_debug_mode(on);
                log::info!("debug mode {}", if on { "on" } else { "off" });
            }
            _ => {}
        }
    }

    fn set_pointer_grab(&mut self, grab: bool) {
        let Some(window) = &self.window else {
            return;
        };
        if grab {
            let grabbed = window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
            match grabbed {
                Ok(()) => {
                    window.set_cursor_visible(false);
                    self.pointer_grabbed = true;
                }
                Err(err) => log::warn!("pointer grab failed: {err}"),
            }
        } else if self.pointer_grabbed {
            if let Err(err) = window.set_cursor_grab(CursorGrabMode::None) {
                log::warn!("pointer release failed: {err}");
            }
            window.set_cursor_visible(true);
            self.pointer_grabbed = false;
        }
    }

    fn input_snapshot(&mut self) -> InputSnapshot {
        let down = |k: KeyCode| self.keys_down.contains(&k);
        let axis = |pos: bool, neg: bool| (pos as i32 - neg as i32) as f64;

        let snapshot = InputSnapshot {
            forward: axis(down(KeyCode::KeyW), down(KeyCode::KeyS)),
            strafe: Strafe::from_sign(down(KeyCode::KeyD) as i32 - down(KeyCode::KeyA) as i32),
            turn: axis(
                down(KeyCode::KeyE) || down(KeyCode::ArrowRight),
                down(KeyCode::KeyQ) || down(KeyCode::ArrowLeft),
            ),
            look_dx: self.look.0,
            look_dy: self.look.1,
            jump: down(KeyCode::Space),
        };
        self.look = (0.0, 0.0);
        snapshot
    }

    fn redraw(&mut self, id: WindowId) -> anyhow::Result<()> {
        let input = self.input_snapshot();
        self.engine.frame(&input, &mut self.frame);
        if self.show_minimap {
            self.engine.render_minimap(&self.minimap, &mut self.frame);
        }

        let (window, surface) = match (&self.window, &mut self.surface) {
            (Some(w), Some(s)) if w.id() == id => (w, s),
            _ => return Ok(()),
        };

        let size = window.inner_size();
        let (Some(dw), Some(dh)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            return Ok(()); // Minimized window, skip drawing
        };
        let (dw_us, dh_us) = (dw.get() as usize, dh.get() as usize);
        if !self.scale_lut.matches(dw_us, dh_us, FB_W, FB_H) {
            self.scale_lut = ScaleLut::new(dw_us, dh_us, FB_W, FB_H);
        }

        surface
            .resize(dw, dh)
            .map_err(|e| anyhow::anyhow!("surface resize: {e}"))?;
        let mut buf = surface
            .buffer_mut()
            .map_err(|e| anyhow::anyhow!("surface buffer: {e}"))?;
        blit_bilinear_stretch(&mut buf, dw_us, &self.frame, &self.scale_lut);
        buf.present()
            .map_err(|e| anyhow::anyhow!("present: {e}"))?;

        if self.last_title.elapsed() >= Duration::from_secs(1) {
            let report = self.engine.debug_report();
            log::info!("{report}");
            window.set_title(&format!("Planar Raycaster - {report}"));
            self.last_title = Instant::now();
        }
        Ok(())
    }
}

fn load_textures(engine: &mut Engine) -> anyhow::Result<()> {
    let textures = engine.textures_mut();
    textures.insert(
        "bricks",
        vec![TextureFrame::bricks(64, 64, 0x00A0_4030, 0x00C8_C8C0)],
    );

    // Decoded off the frame loop; walls show flat colour until it lands
    textures
        .load_with("tiles", || {
            Ok(vec![TextureFrame::checker(64, 8, 0x0030_3040, 0x0090_90A0)])
        })
        .context("spawning tile loader")?;
    textures
        .load_with("marquee", || {
            Ok((0..8)
                .map(|phase| {
                    TextureFrame::stripes(32, 4, 0x00FF_D020, phase).with_frame_length(0.12)
                })
                .collect())
        })
        .context("spawning marquee loader")?;
    Ok(())
}

/// Map, extra props and the player. Returns the player's id.
fn build_world(engine: &mut Engine) -> anyhow::Result<BodyId> {
    let level = MapBuilder::new()
        .with_cell('#', CellSpec::block(BodyConfig::default().with_texture("bricks")))
        .with_cell(
            '\\',
            CellSpec::diagonal(
                BodyConfig::default()
                    .with_texture("tiles")
                    .with_back_texture("marquee")
                    .with_color(Color::rgb(60, 60, 80)),
            ),
        )
        .build(&engine.bounds(), engine.textures(), LEVEL)?;
    engine.add_bodies(level);

    // Translucent pane; the walls behind it stay visible
    engine.spawn(
        Segment::from_coords(450.0, 650.0, 550.0, 650.0),
        BodyConfig::default()
            .with_color(Color::rgba(80, 200, 255, 0.35))
            .with_collidable(false),
    )?;

    let mut spinner = engine.create_body(
        Segment::from_coords(700.0, 300.0, 760.0, 300.0),
        BodyConfig::default()
            .with_color(Color::rgb(200, 40, 120))
            .with_name("Spinner"),
    )?;
    spinner.set_controller(Box::new(Spinner(1.0)));
    engine.add_body(spinner);

    let mut player = engine.create_body(
        Segment::from_coords(490.0, 850.0, 510.0, 850.0),
        BodyConfig::default().with_visible(false).with_name("Player"),
    )?;
    player.set_facing(-FRAC_PI_2);
    player.attach_camera(Some(90.0), None);
    player.friction = Axis3::new(1500.0, 1500.0, 20.0);
    player.terminal_velocity = Axis3::new(Some(300.0), Some(300.0), None);
    player.set_controller(Box::new(PlayerController::default()));
    Ok(engine.add_body(player))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let event_loop = EventLoop::new()?;
    // Redraws are requested from about_to_wait, so waiting costs no frames
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new()?;
    log::info!(
        "controls: WASD move, Q/E or arrows turn, click to grab the mouse, Space jump, \
         Esc release, M minimap, F3 debug"
    );
    event_loop.run_app(&mut app)?;
    Ok(())
}
