pub mod block;
pub mod block_palette;
pub mod content;
pub mod structure;

pub use block::{Block, BlockKey};
pub use block_palette::{Palette, Slot};
pub use structure::{PositionData, RawBlock, RawStructure};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Palette reference stored for a voxel that holds no block.
pub const NO_BLOCK: i32 = -1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}
impl BlockPosition {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        BlockPosition { x, y, z }
    }
}
impl Display for BlockPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}

/// Extents of a structure, serialized as `[width, height, depth]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 3]", into = "[u32; 3]")]
pub struct StructureSize {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}
impl StructureSize {
    pub fn new(width: u32, height: u32, depth: u32) -> Self {
        StructureSize {
            width,
            height,
            depth,
        }
    }
    pub fn voxel_count(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }
    /// Flat offset of a voxel, `(x * height + y) * depth + z`.
    #[inline(always)]
    pub fn index_of(&self, x: u32, y: u32, z: u32) -> usize {
        (x as usize * self.height as usize + y as usize) * self.depth as usize + z as usize
    }
    pub fn as_array(&self) -> [u32; 3] {
        [self.width, self.height, self.depth]
    }
}
impl From<[u32; 3]> for StructureSize {
    fn from(value: [u32; 3]) -> Self {
        StructureSize::new(value[0], value[1], value[2])
    }
}
impl From<StructureSize> for [u32; 3] {
    fn from(value: StructureSize) -> Self {
        value.as_array()
    }
}
impl Display for StructureSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}
