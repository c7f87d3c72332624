use crate::animation::{
    animation_name, animation_short_name, build_structure_animation, template_bones, ValidationList,
    HOLOGRAM_ROOT_BONE,
};
use crate::config::PackConfig;
use crate::controllers::{
    build_bounding_box_controller, build_structures_controller, build_validation_controller,
    validation_particle_name, validation_particle_short_name, BOUNDING_BOX_CONTROLLER,
    BOUNDING_BOX_PARTICLE, SAVING_BACKUP_PARTICLE, STRUCTURES_CONTROLLER, VALIDATION_CONTROLLER,
};
use crate::error::{PackError, PackResult};
use crate::merge::merge_palettes;
use crate::normalize::Normalizer;
use crate::scripts::{compile_entity_scripts, EntityScripts};
use crate::upgrade::BlockUpgrader;
use holo_pack_common::content::{AnimationControllerFile, AnimationDocument, GeometryBone};
use holo_pack_common::{Palette, RawStructure, StructureSize};
use log::{debug, info, warn};
use serde_json::json;
use std::collections::BTreeMap;

pub const GEOMETRY_IDENTIFIER: &str = "geometry.armor_stand.hologram";
pub const PARTICLE_ALIGNMENT_BONE: &str = "particle_alignment";
const GEOMETRY_FORMAT_VERSION: &str = "1.16.0";

/// Everything generated for one set of structures.
#[derive(Debug)]
pub struct HologramPack {
    pub palette: Palette,
    /// `structure_indices[structure][layer][voxel]` into `palette`.
    pub structure_indices: Vec<Vec<Vec<i32>>>,
    pub structure_sizes: Vec<StructureSize>,
    pub animations: Vec<AnimationDocument>,
    /// Template bones first, then voxel bones in structure order.
    pub geometry_bones: Vec<GeometryBone>,
    /// Validation particle locators on the alignment bone.
    pub particle_locators: BTreeMap<String, [f64; 3]>,
    pub animation_controllers: AnimationControllerFile,
    pub scripts: EntityScripts,
    /// Short particle name to full identifier, as the entity declares them.
    pub particle_effects: BTreeMap<String, String>,
    pub dangling_entries: Vec<usize>,
}

impl HologramPack {
    /// Pack-relative paths with their pretty-printed JSON contents.
    pub fn files(&self) -> PackResult<Vec<(String, String)>> {
        let mut files = Vec::new();
        for (structure, document) in self.animations.iter().enumerate() {
            files.push((
                format!("animations/{}.json", animation_short_name(structure)),
                serde_json::to_string_pretty(document)?,
            ));
        }
        files.push((
            "animation_controllers/armor_stand.hologram.animation_controllers.json".to_string(),
            serde_json::to_string_pretty(&self.animation_controllers)?,
        ));
        files.push((
            "models/entity/armor_stand.hologram.geo.json".to_string(),
            serde_json::to_string_pretty(&self.geometry())?,
        ));
        let animations: BTreeMap<String, String> = (0..self.animations.len())
            .map(|structure| (animation_short_name(structure), animation_name(structure)))
            .collect();
        files.push((
            "entity/armor_stand.hologram.scripts.json".to_string(),
            serde_json::to_string_pretty(&json!({
                "initialize": [self.scripts.initialize],
                "pre_animation": [self.scripts.pre_animation],
                "animations": animations,
                "particle_effects": self.particle_effects,
            }))?,
        ));
        files.push((
            "block_palette.json".to_string(),
            serde_json::to_string_pretty(&json!({
                "palette": self.palette,
                "dangling_entries": self.dangling_entries,
            }))?,
        ));
        Ok(files)
    }

    fn geometry(&self) -> serde_json::Value {
        let mut bones = vec![
            json!({ "name": HOLOGRAM_ROOT_BONE, "pivot": [0, 0, 0] }),
            json!({
                "name": PARTICLE_ALIGNMENT_BONE,
                "parent": HOLOGRAM_ROOT_BONE,
                "locators": self.particle_locators,
            }),
        ];
        bones.extend(self.geometry_bones.iter().map(|bone| json!(bone)));
        json!({
            "format_version": GEOMETRY_FORMAT_VERSION,
            "minecraft:geometry": [{
                "description": { "identifier": GEOMETRY_IDENTIFIER },
                "bones": bones,
            }],
        })
    }
}

/// Runs the whole pipeline: normalize each structure, merge the palettes,
/// then build animations, controllers and scripts from the merged result.
pub fn make_pack(
    structures: Vec<RawStructure>,
    config: &PackConfig,
    upgrader: &dyn BlockUpgrader,
) -> PackResult<HologramPack> {
    if structures.is_empty() {
        return Err(PackError::User("No structure files were given.".to_string()));
    }
    let normalizer = Normalizer::new(config, upgrader);
    let normalized = structures
        .into_iter()
        .map(|structure| normalizer.normalize(structure))
        .collect::<PackResult<Vec<_>>>()?;
    let upgraded: usize = normalized.iter().map(|structure| structure.upgraded).sum();
    let structure_sizes: Vec<StructureSize> =
        normalized.iter().map(|structure| structure.size).collect();

    let merged = merge_palettes(&normalized);
    if merged.palette.live_count() == 0 {
        return Err(PackError::User(
            "Structure is empty! No blocks are inside the structure.".to_string(),
        ));
    }
    debug!(
        "merged {} structure palettes into {} entries",
        normalized.len(),
        merged.palette.len()
    );

    let mut geometry_bones = template_bones(&merged.palette);
    let mut bone_parents: BTreeMap<String, String> = BTreeMap::new();
    let mut animations = Vec::with_capacity(structure_sizes.len());
    let mut validations: Vec<ValidationList> = Vec::with_capacity(structure_sizes.len());
    let mut particle_locators = BTreeMap::new();
    let namespace = &config.validation_particle_namespace;
    let mut particle_effects = BTreeMap::from([
        (
            BOUNDING_BOX_PARTICLE.to_string(),
            format!("{namespace}:{BOUNDING_BOX_PARTICLE}"),
        ),
        (
            SAVING_BACKUP_PARTICLE.to_string(),
            format!("{namespace}:{SAVING_BACKUP_PARTICLE}"),
        ),
    ]);
    for (structure, (size, layers)) in structure_sizes.iter().zip(&merged.structures).enumerate() {
        let built = build_structure_animation(
            structure,
            *size,
            layers,
            &merged.palette,
            config.mini_scale,
        )?;
        for bone in built.bones {
            match bone_parents.get(&bone.name) {
                Some(parent) if *parent != bone.parent => warn!(
                    "bone {} of structure {structure} keeps parent {parent} from an earlier structure",
                    bone.name
                ),
                Some(_) => {}
                None => {
                    bone_parents.insert(bone.name.clone(), bone.parent.clone());
                    geometry_bones.push(bone);
                }
            }
        }
        for block in &built.validation.blocks {
            let position = block.position;
            particle_locators.insert(
                block.locator.clone(),
                [
                    8.0 - 16.0 * position.x as f64,
                    16.0 * position.y as f64,
                    -8.0 + 16.0 * position.z as f64,
                ],
            );
            particle_effects.insert(
                validation_particle_short_name(&block.block),
                validation_particle_name(namespace, &block.block),
            );
        }
        animations.push(built.document);
        validations.push(built.validation);
    }

    let mut animation_controllers = AnimationControllerFile::new();
    let validation_inputs: Vec<(StructureSize, &ValidationList)> =
        structure_sizes.iter().copied().zip(&validations).collect();
    animation_controllers.animation_controllers.insert(
        VALIDATION_CONTROLLER.to_string(),
        build_validation_controller(namespace, &validation_inputs),
    );
    animation_controllers.animation_controllers.insert(
        BOUNDING_BOX_CONTROLLER.to_string(),
        build_bounding_box_controller(&structure_sizes)?,
    );
    animation_controllers.animation_controllers.insert(
        STRUCTURES_CONTROLLER.to_string(),
        build_structures_controller(structure_sizes.len()),
    );

    let validation_refs: Vec<&ValidationList> = validations.iter().collect();
    let scripts = compile_entity_scripts(config, &structure_sizes, &validation_refs)?;

    let blocks_to_validate: usize = validations.iter().map(|list| list.blocks.len()).sum();
    info!(
        "Built hologram of {} structure{}: {} palette entries, {} bones, {blocks_to_validate} blocks to validate, {upgraded} upgraded",
        structure_sizes.len(),
        if structure_sizes.len() > 1 { "s" } else { "" },
        merged.palette.live_count(),
        geometry_bones.len(),
    );
    Ok(HologramPack {
        palette: merged.palette,
        structure_indices: merged.structures,
        structure_sizes,
        animations,
        geometry_bones,
        particle_locators,
        animation_controllers,
        scripts,
        particle_effects,
        dangling_entries: merged.dangling,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upgrade::NoUpgrade;
    use holo_pack_common::RawBlock;

    fn single(name: &str, palette: &[&str], indices: Vec<i32>) -> RawStructure {
        RawStructure {
            name: name.to_string(),
            size: StructureSize::new(indices.len() as u32, 1, 1),
            palette: palette.iter().map(|name| RawBlock::new(*name)).collect(),
            block_indices: vec![indices],
            ..Default::default()
        }
    }

    #[test]
    fn rejects_missing_and_empty_input() {
        let config = PackConfig::default();
        assert!(matches!(make_pack(Vec::new(), &config, &NoUpgrade), Err(PackError::User(_))));
        let air = single("air", &["minecraft:air"], vec![0, 0]);
        match make_pack(vec![air], &config, &NoUpgrade) {
            Err(PackError::User(message)) => {
                assert_eq!(message, "Structure is empty! No blocks are inside the structure.")
            }
            other => panic!("expected an empty structure error, got {other:?}"),
        }
    }

    #[test]
    fn builds_every_output() {
        let pack = make_pack(
            vec![
                single("a", &["minecraft:stone", "minecraft:dirt"], vec![0, 1, 0, -1]),
                single("b", &["minecraft:dirt", "minecraft:stone"], vec![0, 1, 0, 1]),
            ],
            &PackConfig::default(),
            &NoUpgrade,
        )
        .unwrap();
        assert_eq!(pack.structure_indices[1], vec![vec![1, 0, 1, 0]]);
        assert_eq!(pack.animations.len(), 2);
        assert_eq!(pack.animation_controllers.animation_controllers.len(), 3);
        let short_names: Vec<&str> = pack.particle_effects.keys().map(String::as_str).collect();
        assert_eq!(
            short_names,
            vec!["bounding_box_outline", "saving_backup", "validate_dirt", "validate_stone"]
        );
        assert_eq!(pack.particle_effects["validate_dirt"], "hololab:validate_dirt");
        // two templates, then four voxel bones shared by both structures
        assert_eq!(pack.geometry_bones.len(), 6);
        assert_eq!(pack.particle_locators["b_1_0_0"], [-8.0, 0.0, -8.0]);

        let files = pack.files().unwrap();
        let paths: Vec<&str> = files.iter().map(|(path, _)| path.as_str()).collect();
        assert!(paths.contains(&"animations/hologram.structure_1.json"));
        assert!(paths.contains(&"models/entity/armor_stand.hologram.geo.json"));
        let (_, geometry) = files
            .iter()
            .find(|(path, _)| path.ends_with(".geo.json"))
            .unwrap();
        let geometry: serde_json::Value = serde_json::from_str(geometry).unwrap();
        assert_eq!(
            geometry["minecraft:geometry"][0]["bones"][2]["name"],
            "template_0"
        );

        let (_, entity) = files
            .iter()
            .find(|(path, _)| path.ends_with(".scripts.json"))
            .unwrap();
        let entity: serde_json::Value = serde_json::from_str(entity).unwrap();
        assert_eq!(
            entity["particle_effects"]["bounding_box_outline"],
            "hololab:bounding_box_outline"
        );
    }
}
