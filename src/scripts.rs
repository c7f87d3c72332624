use crate::animation::ValidationList;
use crate::config::{LayerMode, PackConfig, PlayerControl, HELD_ITEM_SLOT};
use crate::error::{PackError, PackResult};
use holo_pack_common::StructureSize;
use packscript::{ArrayEncoder, Bindings, Value};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

const INITIALIZE: &str = include_str!("../scripts/initialize.pbs");
const PRE_ANIMATION: &str = include_str!("../scripts/pre_animation.pbs");

const STRUCTURE_INDEX: &str = "v.hologram.structure_index";
const LAYER: &str = "v.hologram.layer";

/// Compiled entity scripts, ready for the client entity description.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityScripts {
    pub initialize: String,
    pub pre_animation: String,
}

/// Value of `v.hologram.last_action` after each control; `NONE` is 0.
pub fn action_ids() -> BTreeMap<String, i64> {
    let mut actions = BTreeMap::from([("NONE".to_string(), 0)]);
    for (index, control) in PlayerControl::iter().enumerate() {
        actions.insert(control.to_string(), index as i64 + 1);
    }
    actions
}

fn binding_name(control: PlayerControl) -> String {
    control.as_ref().to_lowercase()
}

pub fn compile_entity_scripts(
    config: &PackConfig,
    sizes: &[StructureSize],
    validations: &[&ValidationList],
) -> PackResult<EntityScripts> {
    let Some(first) = sizes.first() else {
        return Err(PackError::User("no structures to write scripts for".to_string()));
    };
    let encoder = ArrayEncoder::new(config.array_split_threshold);
    let dimension = |axis: usize| {
        let values: Vec<u32> = sizes.iter().map(|size| size.as_array()[axis]).collect();
        encoder.array_to_expression(STRUCTURE_INDEX, &values)
    };
    let totals: Vec<usize> = validations.iter().map(|list| list.blocks.len()).collect();
    let by_layer: Vec<Vec<usize>> = validations
        .iter()
        .map(|list| list.counts_by_layer.clone())
        .collect();

    let mut bindings = Bindings::new()
        .with("structure_count", sizes.len())
        .with("structure_size", first.as_array())
        .with("initial_offset", config.initial_offset)
        .with("single_layer_mode", LayerMode::Single as i32)
        .with("all_below_layer_mode", LayerMode::AllBelow as i32)
        .with("backup_slot_count", config.backup_slot_count)
        .with("structure_w", dimension(0))
        .with("structure_h", dimension(1))
        .with("structure_d", dimension(2))
        .with(
            "total_blocks_to_validate",
            encoder.array_to_expression(STRUCTURE_INDEX, &totals),
        )
        .with(
            "total_blocks_to_validate_by_layer",
            encoder.array_2d_to_expression(STRUCTURE_INDEX, LAYER, &by_layer),
        )
        .with("ACTIONS", Value::from(action_ids()));
    for control in PlayerControl::iter() {
        bindings.insert(
            binding_name(control).as_str(),
            config.control(control).to_expression(HELD_ITEM_SLOT),
        );
    }

    Ok(EntityScripts {
        initialize: packscript::compile(INITIALIZE, &bindings)?,
        pre_animation: packscript::compile(PRE_ANIMATION, &bindings)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::BlockToValidate;
    use crate::config::ItemCriteria;
    use holo_pack_common::BlockPosition;
    use packscript::eval::{EvalValue, Evaluator};

    fn validation(counts: Vec<usize>) -> ValidationList {
        let blocks = counts
            .iter()
            .enumerate()
            .flat_map(|(y, count)| {
                (0..*count).map(move |x| BlockToValidate {
                    locator: format!("b_{x}_{y}_0"),
                    block: "stone".to_string(),
                    position: BlockPosition::new(x as i32, y as i32, 0),
                })
            })
            .collect();
        ValidationList {
            blocks,
            counts_by_layer: counts,
        }
    }

    fn compiled() -> EntityScripts {
        let first = validation(vec![2, 0, 1]);
        let second = validation(vec![4, 4]);
        compile_entity_scripts(
            &PackConfig::default(),
            &[StructureSize::new(2, 3, 1), StructureSize::new(4, 2, 1)],
            &[&first, &second],
        )
        .unwrap()
    }

    /// Evaluator with the held item named `held`, or nothing held.
    fn entity(held: Option<&'static str>) -> Evaluator {
        let mut evaluator = Evaluator::new();
        evaluator.register_function("q.is_item_name_any", move |arguments| {
            let matched = arguments
                .iter()
                .skip(1)
                .any(|argument| matches!((argument, held), (EvalValue::String(name), Some(held)) if name == held));
            Ok(EvalValue::from(matched))
        });
        evaluator.register_function("q.equipped_item_any_tag", |_| Ok(EvalValue::from(false)));
        evaluator
    }

    fn sneak_once(evaluator: &mut Evaluator, pre_animation: &str) {
        evaluator.set_number("q.is_sneaking", 1.0);
        evaluator.execute_source(pre_animation).unwrap();
        evaluator.set_number("q.is_sneaking", 0.0);
        evaluator.execute_source(pre_animation).unwrap();
    }

    #[test]
    fn action_ids_start_after_none() {
        let actions = action_ids();
        assert_eq!(actions["NONE"], 0);
        assert_eq!(actions["TOGGLE_RENDERING"], 1);
        assert_eq!(actions["BACKUP_HOLOGRAM"], 12);
        assert_eq!(actions.len(), 13);
    }

    #[test]
    fn initialize_sets_every_variable() {
        let scripts = compiled();
        assert!(scripts.initialize.starts_with("v.hologram.rendering=1;v.hologram.validating=0;"));
        let mut evaluator = Evaluator::new();
        evaluator.execute_source(&scripts.initialize).unwrap();
        assert_eq!(evaluator.number("v.hologram.layer"), -1.0);
        assert_eq!(evaluator.number("v.hologram.structure_count"), 2.0);
        assert_eq!(evaluator.number("v.hologram.structure_h"), 3.0);
        assert_eq!(evaluator.number("v.hologram.backup_slot"), -1.0);
    }

    #[test]
    fn pre_animation_follows_the_selected_structure() {
        let scripts = compiled();
        let mut evaluator = entity(None);
        evaluator.execute_source(&scripts.initialize).unwrap();
        evaluator.execute_source(&scripts.pre_animation).unwrap();
        assert_eq!(evaluator.number("v.hologram.structure_w"), 2.0);
        assert_eq!(evaluator.number("v.hologram.total_blocks_to_validate"), 3.0);

        evaluator.set_number("v.hologram.structure_index", 1.0);
        evaluator.set_number("v.hologram.layer", 2.0);
        evaluator.execute_source(&scripts.pre_animation).unwrap();
        assert_eq!(evaluator.number("v.hologram.structure_w"), 4.0);
        assert_eq!(evaluator.number("v.hologram.structure_h"), 2.0);
        // layer 2 does not exist in the second structure
        assert_eq!(evaluator.number("v.hologram.layer"), 1.0);
        assert_eq!(evaluator.number("v.hologram.total_blocks_to_validate"), 8.0);
        assert_eq!(evaluator.number("v.hologram.total_blocks_to_validate_layer"), 4.0);
    }

    #[test]
    fn sneaking_with_a_control_item_acts_once() {
        let scripts = compiled();
        let mut evaluator = entity(Some("minecraft:leather"));
        evaluator.execute_source(&scripts.initialize).unwrap();
        let mut layers = Vec::new();
        for _ in 0..5 {
            sneak_once(&mut evaluator, &scripts.pre_animation);
            layers.push(evaluator.number("v.hologram.layer"));
        }
        assert_eq!(layers, vec![0.0, 1.0, 2.0, -1.0, 0.0]);
        assert_eq!(
            evaluator.number("v.hologram.last_action"),
            action_ids()["CHANGE_LAYER"] as f64
        );

        // holding still does nothing after the first frame
        evaluator.set_number("q.is_sneaking", 1.0);
        for _ in 0..3 {
            evaluator.execute_source(&scripts.pre_animation).unwrap();
        }
        assert_eq!(evaluator.number("v.hologram.layer"), 1.0);
    }

    #[test]
    fn decreasing_below_all_layers_wraps_to_the_top() {
        let scripts = compiled();
        let mut evaluator = entity(Some("minecraft:feather"));
        evaluator.execute_source(&scripts.initialize).unwrap();
        sneak_once(&mut evaluator, &scripts.pre_animation);
        assert_eq!(evaluator.number("v.hologram.layer"), 2.0);
    }

    #[test]
    fn disabled_controls_ignore_items() {
        let scripts = compiled();
        let mut bone = entity(Some("minecraft:bone"));
        bone.execute_source(&scripts.initialize).unwrap();
        sneak_once(&mut bone, &scripts.pre_animation);
        assert_eq!(bone.number("v.hologram.controls_disabled"), 1.0);

        let mut evaluator = entity(Some("minecraft:arrow"));
        evaluator.execute_source(&scripts.initialize).unwrap();
        evaluator.set_number("v.hologram.controls_disabled", 1.0);
        sneak_once(&mut evaluator, &scripts.pre_animation);
        assert_eq!(evaluator.number("v.hologram.structure_index"), 0.0);
        evaluator.set_number("v.hologram.controls_disabled", 0.0);
        sneak_once(&mut evaluator, &scripts.pre_animation);
        sneak_once(&mut evaluator, &scripts.pre_animation);
        assert_eq!(evaluator.number("v.hologram.structure_index"), 0.0);
        sneak_once(&mut evaluator, &scripts.pre_animation);
        assert_eq!(evaluator.number("v.hologram.structure_index"), 1.0);
    }

    #[test]
    fn backups_cycle_through_slots() {
        let config = PackConfig {
            backup_slot_count: 2,
            controls: BTreeMap::from([(PlayerControl::BackupHologram, ItemCriteria::named("mod:disk"))]),
            ..Default::default()
        };
        let list = validation(vec![1]);
        let scripts =
            compile_entity_scripts(&config, &[StructureSize::new(1, 1, 1)], &[&list]).unwrap();
        assert!(scripts.pre_animation.contains("'mod:disk'"));
        let mut evaluator = entity(Some("mod:disk"));
        evaluator.execute_source(&scripts.initialize).unwrap();
        let mut slots = Vec::new();
        for _ in 0..3 {
            evaluator.set_number("q.is_sneaking", 1.0);
            evaluator.execute_source(&scripts.pre_animation).unwrap();
            assert_eq!(evaluator.number("v.hologram.saving_backup"), 1.0);
            slots.push(evaluator.number("v.hologram.backup_slot"));
            evaluator.set_number("q.is_sneaking", 0.0);
            evaluator.execute_source(&scripts.pre_animation).unwrap();
            assert_eq!(evaluator.number("v.hologram.saving_backup"), 0.0);
        }
        assert_eq!(slots, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn no_structures_is_an_error() {
        assert!(matches!(
            compile_entity_scripts(&PackConfig::default(), &[], &[]),
            Err(PackError::User(_))
        ));
    }
}
