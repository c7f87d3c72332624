use crate::config::PackConfig;
use crate::error::{PackError, PackResult};
use crate::upgrade::{format_block_version, BlockUpgrader};
use holo_pack_common::{
    Block, BlockKey, Palette, PositionData, RawBlock, RawStructure, StructureSize, NO_BLOCK,
};
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::BuildHasherDefault;
use twox_hash::XxHash64;

const NAMESPACE_PREFIX: &str = "minecraft:";
const POSITION_FIELDS: [&str; 3] = ["x", "y", "z"];

/// One structure after palette cleanup. `layers` keep the raw shape but may
/// point at entity variants appended to the end of the palette.
#[derive(Clone, Debug)]
pub struct NormalizedStructure {
    pub name: String,
    pub size: StructureSize,
    pub palette: Palette,
    pub layers: Vec<Vec<i32>>,
    pub upgraded: usize,
}
impl NormalizedStructure {
    /// Re-encodes the structure as decoder output, dropping tombstones and
    /// remapping voxels that referenced them to [`NO_BLOCK`].
    pub fn to_raw(&self) -> RawStructure {
        let mut remap = vec![NO_BLOCK; self.palette.len()];
        let mut palette = Vec::with_capacity(self.palette.live_count());
        for (index, block) in self.palette.iter_live() {
            remap[index] = palette.len() as i32;
            palette.push(RawBlock::from(block));
        }
        RawStructure {
            name: self.name.clone(),
            size: self.size,
            palette,
            block_indices: self
                .layers
                .iter()
                .map(|layer| layer.iter().map(|index| remap_index(&remap, *index)).collect())
                .collect(),
            block_position_data: BTreeMap::new(),
        }
    }
}

pub(crate) fn remap_index(remap: &[i32], index: i32) -> i32 {
    usize::try_from(index)
        .ok()
        .and_then(|index| remap.get(index).copied())
        .unwrap_or(NO_BLOCK)
}

pub struct Normalizer<'a> {
    config: &'a PackConfig,
    upgrader: &'a dyn BlockUpgrader,
}
impl<'a> Normalizer<'a> {
    pub fn new(config: &'a PackConfig, upgrader: &'a dyn BlockUpgrader) -> Self {
        Normalizer { config, upgrader }
    }
    pub fn normalize(&self, structure: RawStructure) -> PackResult<NormalizedStructure> {
        let RawStructure {
            name,
            size,
            palette: raw_palette,
            block_indices: mut layers,
            block_position_data,
        } = structure;
        let voxel_count = size.voxel_count();
        if layers.is_empty() {
            return Err(PackError::User(format!("structure {name:?} has no block layers")));
        }
        if let Some((layer, indices)) = layers
            .iter()
            .enumerate()
            .find(|(_, indices)| indices.len() != voxel_count)
        {
            return Err(PackError::User(format!(
                "layer {layer} of structure {name:?} has {} entries, expected {voxel_count} for size {size}",
                indices.len()
            )));
        }

        let mut palette = Palette::new();
        let mut versions = BTreeSet::new();
        let mut upgraded = 0;
        for (index, mut raw) in raw_palette.into_iter().enumerate() {
            if raw.name.is_empty() {
                return Err(PackError::MalformedBlock {
                    index,
                    reason: "block has no name".to_string(),
                });
            }
            if let Some(version) = raw.version {
                versions.insert(version);
            }
            if self.upgrader.needs_updating(&raw) {
                self.upgrader.update(&mut raw)?;
                upgraded += 1;
            }
            let name = raw
                .name
                .strip_prefix(NAMESPACE_PREFIX)
                .map(str::to_string)
                .unwrap_or(raw.name);
            if self.config.is_block_ignored(&name) {
                palette.push_tombstone();
                continue;
            }
            palette.push(Block {
                name,
                states: raw.states,
                block_entity_data: raw.block_entity_data,
            });
        }
        if upgraded > 0 {
            let versions: Vec<String> = versions.into_iter().map(format_block_version).collect();
            info!(
                "Updated {upgraded} block{} from {} to {}",
                if upgraded > 1 { "s" } else { "" },
                versions.join(", "),
                format_block_version(self.upgrader.latest_version())
            );
        }

        let folded = self.fold_block_entities(&mut palette, &mut layers, block_position_data);
        for base in folded {
            let still_used = layers
                .iter()
                .any(|layer| layer.iter().any(|index| *index == base as i32));
            if still_used {
                debug!("keeping palette slot {base} of {name:?}, voxels still use it without block entity data");
            } else {
                palette.tombstone(base);
            }
        }
        Ok(NormalizedStructure {
            name,
            size,
            palette,
            layers,
            upgraded,
        })
    }
    /// Gives every primary-layer voxel with block entity data its own palette
    /// entry. Returns the base slots that variants were built from.
    fn fold_block_entities(
        &self,
        palette: &mut Palette,
        layers: &mut [Vec<i32>],
        position_data: BTreeMap<usize, PositionData>,
    ) -> BTreeSet<usize> {
        let mut variants: HashMap<BlockKey, usize, BuildHasherDefault<XxHash64>> =
            HashMap::default();
        let mut bases = BTreeSet::new();
        let Some(primary) = layers.first_mut() else {
            return bases;
        };
        for (offset, data) in position_data {
            let Some(base_index) = primary.get(offset).copied() else {
                debug!("ignoring block position data for voxel {offset} outside the structure");
                continue;
            };
            let Some(base) = palette.get(base_index) else {
                continue;
            };
            let Some(mut entity_data) = data.block_entity_data else {
                continue;
            };
            let ignored = entity_data
                .get("id")
                .and_then(|id| id.as_str())
                .is_some_and(|id| self.config.is_block_entity_ignored(id));
            if ignored {
                continue;
            }
            for field in POSITION_FIELDS {
                entity_data.remove(field);
            }
            let variant = base.clone().with_block_entity_data(entity_data);
            let key = variant.key();
            let index = match variants.get(&key) {
                Some(index) => *index,
                None => {
                    let index = palette.push(variant);
                    variants.insert(key, index);
                    index
                }
            };
            primary[offset] = index as i32;
            bases.insert(base_index as usize);
        }
        bases
    }
}
