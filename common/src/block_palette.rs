use crate::Block;
use serde::{Serialize, Serializer};

/// Ordered palette slots. A removed entry stays behind as a [`Slot::Tombstone`]
/// so that every other index keeps its position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Palette {
    slots: Vec<Slot>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Slot {
    Live(Block),
    Tombstone,
}
impl Slot {
    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Slot::Live(block) => Some(block),
            Slot::Tombstone => None,
        }
    }
    pub fn is_live(&self) -> bool {
        matches!(self, Slot::Live(_))
    }
}

impl Palette {
    pub fn new() -> Self {
        Palette { slots: Vec::new() }
    }
    pub fn from_blocks<I: IntoIterator<Item = Block>>(blocks: I) -> Self {
        Palette {
            slots: blocks.into_iter().map(Slot::Live).collect(),
        }
    }
    pub fn push(&mut self, block: Block) -> usize {
        self.slots.push(Slot::Live(block));
        self.slots.len() - 1
    }
    pub fn push_tombstone(&mut self) -> usize {
        self.slots.push(Slot::Tombstone);
        self.slots.len() - 1
    }
    /// Marks a slot as removed. Returns the block that lived there.
    pub fn tombstone(&mut self, index: usize) -> Option<Block> {
        let slot = self.slots.get_mut(index)?;
        match std::mem::replace(slot, Slot::Tombstone) {
            Slot::Live(block) => Some(block),
            Slot::Tombstone => None,
        }
    }
    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_live()).count()
    }
    /// Resolves a voxel reference. Negative, out of range and tombstoned
    /// references all resolve to `None`.
    pub fn get(&self, index: i32) -> Option<&Block> {
        if index < 0 {
            return None;
        }
        self.slots.get(index as usize).and_then(Slot::as_block)
    }
    pub fn is_live(&self, index: i32) -> bool {
        self.get(index).is_some()
    }
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }
    pub fn iter_live(&self) -> impl Iterator<Item = (usize, &Block)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_block().map(|block| (index, block)))
    }
}
impl Serialize for Palette {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.slots.iter().map(Slot::as_block))
    }
}
