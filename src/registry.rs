//! Block registry: the live blocks, advance, cull, group spawn and column guard.

use crate::SimConfig;

/// One falling cell. `row` is fractional and grows every frame until culled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub column: u16,
    pub row: f64,
    /// Palette index; the theme maps it to a colour.
    pub color: u8,
}

/// Read-only descriptor handed to the rendering sink.
pub type BlockView = Block;

/// Owns the live blocks in insertion order (stable draw order).
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    blocks: Vec<Block>,
    rows: u16,
    group_size: u16,
    spawn_offset: f64,
    block_threshold: f64,
}

impl BlockRegistry {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            blocks: Vec::with_capacity(config.group_size as usize * 8),
            rows: config.rows,
            group_size: config.group_size,
            spawn_offset: config.spawn_offset,
            block_threshold: config.block_threshold(),
        }
    }

    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Move every block down by `delta_rows`. Not scaled by wall-clock time.
    pub fn advance(&mut self, delta_rows: f64) {
        for block in &mut self.blocks {
            block.row += delta_rows;
        }
    }

    /// Drop blocks that reached the bottom edge (`row >= rows`). Returns how many went.
    pub fn cull(&mut self) -> usize {
        let before = self.blocks.len();
        let bottom = f64::from(self.rows);
        self.blocks.retain(|b| b.row < bottom);
        before - self.blocks.len()
    }

    /// Append a vertical chain of `group_size` blocks in `column`, sharing `color`.
    /// Block `i` starts at `spawn_offset - i`, so the chain trails up above the first one.
    pub fn spawn_group(&mut self, column: u16, color: u8) {
        let offset = self.spawn_offset;
        self.blocks.extend((0..self.group_size).map(|i| Block {
            column,
            row: offset - f64::from(i),
            color,
        }));
    }

    /// True while a block in `column` is still above the blocking row.
    pub fn is_column_blocked(&self, column: u16) -> bool {
        self.blocks
            .iter()
            .any(|b| b.column == column && b.row < self.block_threshold)
    }

    /// Spawn only into a free column. Returns whether the group went in.
    pub fn try_spawn(&mut self, column: u16, color: u8) -> bool {
        if self.is_column_blocked(column) {
            return false;
        }
        self.spawn_group(column, color);
        true
    }
}
