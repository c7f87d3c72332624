use crate::config::LayerMode;
use crate::error::PackResult;
use holo_pack_common::content::{
    Animation, AnimationDocument, BoneAnimation, GeometryBone, ANIMATION_FORMAT_VERSION,
};
use holo_pack_common::{BlockPosition, Palette, StructureSize};
use packscript::Bindings;
use std::collections::BTreeMap;

pub const HOLOGRAM_ROOT_BONE: &str = "hologram_root";

/// Full size when every layer is shown or the bone's layer is selected,
/// `mini_scale` otherwise.
const BONE_SCALE: &str = "v.hologram.layer == -1 || (v.hologram.layer_mode == $[all_below] ? v.hologram.layer >= $[y] : v.hologram.layer == $[y]) ? 1.0 : $[mini_scale]";

/// Name the entity refers to a structure animation by.
pub fn animation_short_name(structure: usize) -> String {
    format!("hologram.structure_{structure}")
}
pub fn animation_name(structure: usize) -> String {
    format!("animation.{}", animation_short_name(structure))
}
pub fn template_bone_name(slot: usize) -> String {
    format!("template_{slot}")
}

/// A primary-layer block the validation particles check.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockToValidate {
    pub locator: String,
    pub block: String,
    pub position: BlockPosition,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationList {
    pub blocks: Vec<BlockToValidate>,
    /// Number of blocks to validate on each layer, indexed by y.
    pub counts_by_layer: Vec<usize>,
}

pub struct StructureAnimation {
    pub document: AnimationDocument,
    /// Voxel bones, each parented to the template of its palette slot.
    pub bones: Vec<GeometryBone>,
    pub validation: ValidationList,
}

/// One hidden template bone per live palette slot. Voxel bones reuse them.
pub fn template_bones(palette: &Palette) -> Vec<GeometryBone> {
    palette
        .iter_live()
        .map(|(slot, _)| GeometryBone {
            name: template_bone_name(slot),
            parent: HOLOGRAM_ROOT_BONE.to_string(),
            pivot: Some([8.0, 0.0, -8.0]),
            scale: Some(0.0),
        })
        .collect()
}

/// Builds the looping animation that places every voxel bone of a structure
/// and shrinks those outside the selected layer.
pub fn build_structure_animation(
    structure: usize,
    size: StructureSize,
    layers: &[Vec<i32>],
    palette: &Palette,
    mini_scale: f64,
) -> PackResult<StructureAnimation> {
    let mut bones = BTreeMap::new();
    let mut geometry = Vec::new();
    let mut validation = ValidationList::default();
    for y in 0..size.height {
        let scale = packscript::compile_expression(
            BONE_SCALE,
            &Bindings::new()
                .with("all_below", LayerMode::AllBelow as i32)
                .with("y", y)
                .with("mini_scale", mini_scale),
        )?;
        let mut layer_count = 0;
        for x in 0..size.width {
            for z in 0..size.depth {
                let offset = size.index_of(x, y, z);
                for (layer_index, layer) in layers.iter().enumerate() {
                    let Some(&slot) = layer.get(offset) else {
                        continue;
                    };
                    let Some(block) = palette.get(slot) else {
                        continue;
                    };
                    let bone = format!("p_{x}_{y}_{z}_{layer_index}");
                    bones.insert(
                        bone.clone(),
                        BoneAnimation {
                            position: [-16.0 * x as f64, 16.0 * y as f64, 16.0 * z as f64],
                            scale: scale.clone(),
                        },
                    );
                    geometry.push(GeometryBone {
                        name: bone,
                        parent: template_bone_name(slot as usize),
                        pivot: None,
                        scale: None,
                    });
                    if layer_index == 0 {
                        validation.blocks.push(BlockToValidate {
                            locator: format!("b_{x}_{y}_{z}"),
                            block: block.name.clone(),
                            position: BlockPosition::new(x as i32, y as i32, z as i32),
                        });
                        layer_count += 1;
                    }
                }
            }
        }
        validation.counts_by_layer.push(layer_count);
    }
    Ok(StructureAnimation {
        document: AnimationDocument {
            format_version: ANIMATION_FORMAT_VERSION.to_string(),
            animations: BTreeMap::from([(
                animation_name(structure),
                Animation {
                    looping: true,
                    bones,
                },
            )]),
        },
        bones: geometry,
        validation,
    })
}
