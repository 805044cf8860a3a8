//! Texture resources sampled by the camera.
//!
//! Decoding never happens on the frame loop. A [`TextureData`] is shared
//! between the cache, a background loader thread and every [`Texture`]
//! cursor that references it; the loader appends frames and then flips the
//! status, so readers only ever see `Pending -> Loaded` (or `Failed`).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::RwLock;

use crate::color::pack_rgb;
use crate::error::{EngineError, EngineResult};

/// Texel whose high byte is zero is transparent.
pub const OPAQUE: u32 = 0xFF00_0000;

/// One decoded image, `ARGB` texels in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureFrame {
    pub width: usize,
    pub height: usize,
    pub texels: Vec<u32>,
    /// How long this frame stays on screen in an animation, in seconds.
    pub frame_length: Option<f64>,
}

impl TextureFrame {
    pub fn new(width: usize, height: usize, texels: Vec<u32>) -> EngineResult<Self> {
        if width == 0 || height == 0 || texels.len() != width * height {
            return Err(EngineError::InvalidConfig(format!(
                "texture frame {width}x{height} with {} texels",
                texels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            texels,
            frame_length: None,
        })
    }

    /// Build from tightly packed RGBA bytes.
    pub fn from_rgba(width: usize, height: usize, rgba: &[u8]) -> EngineResult<Self> {
        if rgba.len() != width * height * 4 {
            return Err(EngineError::InvalidConfig(format!(
                "expected {} RGBA bytes for {width}x{height}, got {}",
                width * height * 4,
                rgba.len()
            )));
        }
        let texels = rgba
            .chunks_exact(4)
            .map(|px| {
                let alpha = if px[3] == 0 { 0 } else { OPAQUE };
                alpha | pack_rgb(px[0], px[1], px[2])
            })
            .collect();
        Self::new(width, height, texels)
    }

    pub fn with_frame_length(mut self, seconds: f64) -> Self {
        self.frame_length = Some(seconds);
        self
    }

    #[inline]
    pub fn texel(&self, u: usize, v: usize) -> u32 {
        let u = u.min(self.width - 1);
        let v = v.min(self.height - 1);
        self.texels[v * self.width + u]
    }

    pub fn checker(size: usize, cell: usize, a: u32, b: u32) -> Self {
        let size = size.max(1);
        let cell = cell.max(1);
        let texels = (0..size * size)
            .map(|i| {
                let (u, v) = (i % size, i / size);
                (if ((u / cell) + (v / cell)) % 2 == 0 { a } else { b }) | OPAQUE
            })
            .collect();
        Self {
            width: size,
            height: size,
            texels,
            frame_length: None,
        }
    }

    pub fn bricks(width: usize, height: usize, brick: u32, mortar: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let row_h = (height / 8).max(2);
        let brick_w = (width / 4).max(2);
        let texels = (0..width * height)
            .map(|i| {
                let (u, v) = (i % width, i / width);
                let row = v / row_h;
                let shift = if row % 2 == 0 { 0 } else { brick_w / 2 };
                let on_mortar = v % row_h == 0 || (u + shift) % brick_w == 0;
                (if on_mortar { mortar } else { brick }) | OPAQUE
            })
            .collect();
        Self {
            width,
            height,
            texels,
            frame_length: None,
        }
    }

    /// Vertical stripes; `phase` shifts them, handy for animation frames.
    /// Gaps between stripes are transparent.
    pub fn stripes(size: usize, stripe: usize, color: u32, phase: usize) -> Self {
        let size = size.max(1);
        let stripe = stripe.max(1);
        let texels = (0..size * size)
            .map(|i| {
                let u = i % size;
                if ((u + phase) / stripe) % 2 == 0 {
                    color | OPAQUE
                } else {
                    0
                }
            })
            .collect();
        Self {
            width: size,
            height: size,
            texels,
            frame_length: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoadStatus {
    Pending = 0,
    Loaded = 1,
    Failed = 2,
}

impl LoadStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => LoadStatus::Loaded,
            2 => LoadStatus::Failed,
            _ => LoadStatus::Pending,
        }
    }
}

/// Cached texture source: append-only frames behind a load status.
#[derive(Debug)]
pub struct TextureData {
    key: String,
    frames: RwLock<Vec<Arc<TextureFrame>>>,
    status: AtomicU8,
}

impl TextureData {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            frames: RwLock::new(Vec::new()),
            status: AtomicU8::new(LoadStatus::Pending as u8),
        }
    }

    /// Already decoded frames, loaded immediately.
    pub fn from_frames(key: impl Into<String>, frames: Vec<TextureFrame>) -> Self {
        let data = Self::new(key);
        data.complete(frames);
        data
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn status(&self) -> LoadStatus {
        LoadStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn is_loaded(&self) -> bool {
        self.status() == LoadStatus::Loaded
    }

    /// Loaded or failed; nothing more will happen to it.
    pub fn is_settled(&self) -> bool {
        self.status() != LoadStatus::Pending
    }

    pub fn frame_count(&self) -> usize {
        self.frames.read().len()
    }

    pub fn frame(&self, index: usize) -> Option<Arc<TextureFrame>> {
        if !self.is_loaded() {
            return None;
        }
        self.frames.read().get(index).cloned()
    }

    fn complete(&self, frames: Vec<TextureFrame>) {
        self.frames.write().extend(frames.into_iter().map(Arc::new));
        self.status.store(LoadStatus::Loaded as u8, Ordering::Release);
    }

    fn fail(&self) {
        self.status.store(LoadStatus::Failed as u8, Ordering::Release);
    }
}

/// Per-body playback cursor over shared [`TextureData`].
#[derive(Debug, Clone)]
pub struct Texture {
    data: Arc<TextureData>,
    current: usize,
    elapsed: f64,
}

impl Texture {
    pub fn new(data: Arc<TextureData>) -> Self {
        Self {
            data,
            current: 0,
            elapsed: 0.0,
        }
    }

    pub fn key(&self) -> &str {
        self.data.key()
    }

    pub fn data(&self) -> &Arc<TextureData> {
        &self.data
    }

    /// `None` until the source has loaded.
    pub fn current_frame(&self) -> Option<Arc<TextureFrame>> {
        self.data.frame(self.current)
    }

    /// Advance animation timing by `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        let Some(frame) = self.current_frame() else {
            return;
        };
        let Some(length) = frame.frame_length else {
            return;
        };
        self.elapsed += dt;
        if self.elapsed >= length {
            self.elapsed = 0.0;
            self.play_next_frame();
        }
    }

    pub fn play_next_frame(&mut self) {
        let count = self.data.frame_count();
        self.current += 1;
        if self.current >= count {
            self.current = 0;
        }
    }
}

/// Keyed store of texture sources.
#[derive(Debug, Default)]
pub struct TextureCache {
    entries: HashMap<String, Arc<TextureData>>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, frames: Vec<TextureFrame>) -> Arc<TextureData> {
        let key = key.into();
        let data = Arc::new(TextureData::from_frames(key.clone(), frames));
        self.entries.insert(key, data.clone());
        data
    }

    /// Register `key` now and decode it on a background thread.
    ///
    /// The returned handle joins the loader; dropping it detaches the thread.
    pub fn load_with<F>(&mut self, key: impl Into<String>, decode: F) -> EngineResult<JoinHandle<()>>
    where
        F: FnOnce() -> EngineResult<Vec<TextureFrame>> + Send + 'static,
    {
        let key = key.into();
        let data = Arc::new(TextureData::new(key.clone()));
        self.entries.insert(key.clone(), data.clone());

        thread::Builder::new()
            .name(format!("texture-{key}"))
            .spawn(move || match decode() {
                Ok(frames) if !frames.is_empty() => {
                    log::info!("texture '{}' loaded ({} frames)", data.key(), frames.len());
                    data.complete(frames);
                }
                Ok(_) => {
                    log::warn!(
                        "{}",
                        EngineError::TextureLoad {
                            key: data.key().to_string(),
                            reason: "no frames decoded".into(),
                        }
                    );
                    data.fail();
                }
                Err(err) => {
                    log::warn!("{err}");
                    data.fail();
                }
            })
            .map_err(|e| EngineError::TextureLoad {
                key,
                reason: e.to_string(),
            })
    }

    pub fn get(&self, key: &str) -> EngineResult<Arc<TextureData>> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| EngineError::Cache { key: key.to_string() })
    }

    /// New playback cursor, or `None` (logged) when the key is unknown.
    pub fn resolve(&self, key: &str) -> Option<Texture> {
        match self.get(key) {
            Ok(data) => Some(Texture::new(data)),
            Err(err) => {
                log::warn!("{err}");
                None
            }
        }
    }

    pub fn all_settled(&self) -> bool {
        self.entries.values().all(|t| t.is_settled())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
