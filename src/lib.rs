//! Planar raycasting engine: walls and entities are line segments on a 2-D
//! plane, rendered as vertical screen columns from a camera body's point
//! of view, with simple per-axis physics and axis-separated collision.

pub mod body;
pub mod camera;
pub mod collision;
pub mod color;
pub mod engine;
pub mod error;
pub mod geom;
pub mod input;
pub mod map;
pub mod minimap;
pub mod physics;
pub mod renderer;
pub mod scaler;
pub mod texture;
pub mod world;

pub use body::{Axis3, Body, BodyConfig, Controller, Strafe};
pub use camera::{Camera, CameraPhase, Collision, Ray, ViewSettings};
pub use color::Color;
pub use engine::{DebugReport, Engine, EngineConfig, LoopState};
pub use error::{EngineError, EngineResult};
pub use geom::{Point, Segment, intersect};
pub use input::{InputSnapshot, PlayerController};
pub use map::{CellShape, CellSpec, MapBuilder};
pub use minimap::Minimap;
pub use renderer::FrameBuffer;
pub use texture::{Texture, TextureCache, TextureFrame};
pub use world::{BodyId, World, WorldBounds, wall_block};
