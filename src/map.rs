//! Builds bodies from a text grid and a legend.
//!
//! ```text
//! ##.#
//! #..\
//! ```
//!
//! Each character is a cell of `world_width / columns` by
//! `world_height / rows`. Characters missing from the legend (and spaces)
//! are empty.

use std::collections::HashMap;

use crate::body::{Body, BodyConfig};
use crate::error::{EngineError, EngineResult};
use crate::geom::Segment;
use crate::texture::TextureCache;
use crate::world::{WorldBounds, wall_block};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellShape {
    /// Four outward-facing walls around the cell.
    Block,
    /// One wall from the cell's top-left to bottom-right corner.
    Diagonal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellSpec {
    pub shape: CellShape,
    pub config: BodyConfig,
}

impl CellSpec {
    pub fn block(config: BodyConfig) -> Self {
        Self {
            shape: CellShape::Block,
            config,
        }
    }

    pub fn diagonal(config: BodyConfig) -> Self {
        Self {
            shape: CellShape::Diagonal,
            config,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MapBuilder {
    legend: HashMap<char, CellSpec>,
    min_columns: usize,
    min_rows: usize,
}

impl MapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cell(mut self, key: char, spec: CellSpec) -> Self {
        self.legend.insert(key, spec);
        self
    }

    /// Divide the world into at least this many cells even if the grid is smaller.
    pub fn with_dimensions(mut self, columns: usize, rows: usize) -> Self {
        self.min_columns = columns;
        self.min_rows = rows;
        self
    }

    /// Bodies for every legend cell in `grid`, row by row, left to right.
    ///
    /// Needs both world dimensions; bodies are checked against `bounds`.
    pub fn build(
        &self,
        bounds: &WorldBounds,
        textures: &TextureCache,
        grid: &str,
    ) -> EngineResult<Vec<Body>> {
        let (Some(world_w), Some(world_h)) = (bounds.width, bounds.height) else {
            return Err(EngineError::InvalidConfig(
                "map building needs both world_width and world_height".into(),
            ));
        };

        let rows = grid_rows(grid);
        let cell_h = world_h / self.min_rows.max(rows.len()).max(1) as f64;
        let mut bodies = Vec::new();

        for (row, line) in rows.iter().enumerate() {
            let cells: Vec<char> = line.chars().collect();
            let cell_w = world_w / self.min_columns.max(cells.len()).max(1) as f64;
            for (col, key) in cells.into_iter().enumerate() {
                let Some(spec) = self.legend.get(&key) else {
                    continue;
                };
                let x1 = cell_w * col as f64;
                let y1 = cell_h * row as f64;
                // Rounding must not push the last cell past the world edge
                let x2 = (x1 + cell_w).min(world_w);
                let y2 = (y1 + cell_h).min(world_h);

                match spec.shape {
                    CellShape::Block => bodies.extend(wall_block(
                        bounds,
                        textures,
                        x1,
                        y1,
                        x2,
                        y2,
                        &spec.config,
                        false,
                    )?),
                    CellShape::Diagonal => bodies.push(Body::new(
                        bounds,
                        textures,
                        Segment::from_coords(x1, y1, x2, y2),
                        spec.config.clone(),
                    )?),
                }
            }
        }
        log::debug!("map built: {} rows, {} bodies", rows.len(), bodies.len());
        Ok(bodies)
    }
}

/// Lines of `grid` without blank leading and trailing lines.
fn grid_rows(grid: &str) -> Vec<&str> {
    let lines: Vec<&str> = grid.lines().collect();
    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    match (first, last) {
        (Some(f), Some(l)) => lines[f..=l].to_vec(),
        _ => Vec::new(),
    }
}
