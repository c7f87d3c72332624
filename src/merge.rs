use crate::normalize::{remap_index, NormalizedStructure};
use holo_pack_common::{BlockKey, Palette, Slot, NO_BLOCK};
use log::{debug, warn};
use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use twox_hash::XxHash64;

/// One palette shared by every structure, plus each structure's layers
/// re-pointed at it.
#[derive(Clone, Debug)]
pub struct MergedPalette {
    pub palette: Palette,
    /// `structures[structure][layer][voxel]`
    pub structures: Vec<Vec<Vec<i32>>>,
    /// Live slots no voxel refers to.
    pub dangling: Vec<usize>,
}

/// Unions the palettes in input order. Blocks are deduplicated by content,
/// so the first structure to use a block decides its slot.
pub fn merge_palettes(structures: &[NormalizedStructure]) -> MergedPalette {
    let (palette, remapped) = match structures {
        [single] => (single.palette.clone(), vec![resolve_layers(single)]),
        _ => merge_many(structures),
    };
    let dangling = find_dangling(&palette, &remapped);
    for slot in &dangling {
        if let Some(block) = palette.get(*slot as i32) {
            warn!("palette entry {slot} ({block}) is not used by any voxel");
        }
    }
    MergedPalette {
        palette,
        structures: remapped,
        dangling,
    }
}

fn merge_many(structures: &[NormalizedStructure]) -> (Palette, Vec<Vec<Vec<i32>>>) {
    let mut merged = Palette::new();
    let mut slots: HashMap<BlockKey, usize, BuildHasherDefault<XxHash64>> = HashMap::default();
    let mut remapped = Vec::with_capacity(structures.len());
    for structure in structures {
        let remap: Vec<i32> = structure
            .palette
            .slots()
            .iter()
            .map(|slot| match slot {
                Slot::Live(block) => *slots
                    .entry(block.key())
                    .or_insert_with(|| merged.push(block.clone()))
                    as i32,
                Slot::Tombstone => NO_BLOCK,
            })
            .collect();
        debug!(
            "merged palette of {:?}: {} local slots, {} merged so far",
            structure.name,
            remap.len(),
            merged.len()
        );
        remapped.push(
            structure
                .layers
                .iter()
                .map(|layer| layer.iter().map(|index| remap_index(&remap, *index)).collect())
                .collect(),
        );
    }
    (merged, remapped)
}

/// Keeps a lone structure's palette as it is. Only references that no
/// longer resolve are cleared.
fn resolve_layers(structure: &NormalizedStructure) -> Vec<Vec<i32>> {
    structure
        .layers
        .iter()
        .map(|layer| {
            layer
                .iter()
                .map(|index| if structure.palette.is_live(*index) { *index } else { NO_BLOCK })
                .collect()
        })
        .collect()
}

fn find_dangling(palette: &Palette, structures: &[Vec<Vec<i32>>]) -> Vec<usize> {
    let mut used = vec![false; palette.len()];
    for index in structures.iter().flatten().flatten() {
        if let Ok(index) = usize::try_from(*index) {
            if let Some(used) = used.get_mut(index) {
                *used = true;
            }
        }
    }
    palette
        .iter_live()
        .filter(|(index, _)| !used[*index])
        .map(|(index, _)| index)
        .collect()
}
