use holo_pack::controllers::VALIDATION_CONTROLLER;
use holo_pack::{make_pack, merge_palettes, NoUpgrade, Normalizer, PackConfig, PackError};
use holo_pack_common::content::AnimationController;
use holo_pack_common::{Block, RawBlock, RawStructure, StructureSize, NO_BLOCK};
use packscript::eval::Evaluator;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn structure(size: StructureSize, palette: &[&str], layers: Vec<Vec<i32>>) -> RawStructure {
    RawStructure {
        name: format!("{}x{}x{}", size.width, size.height, size.depth),
        size,
        palette: palette.iter().map(|name| RawBlock::new(*name)).collect(),
        block_indices: layers,
        ..Default::default()
    }
}

fn random_structure(rng: &mut StdRng, names: &[&str]) -> RawStructure {
    let size = StructureSize::new(rng.gen_range(1..4), rng.gen_range(1..4), rng.gen_range(1..4));
    let mut palette: Vec<&str> = names.to_vec();
    // shuffle by rotation so local slots differ between structures
    palette.rotate_left(rng.gen_range(0..names.len()));
    palette.truncate(rng.gen_range(1..=names.len()));
    let layers = (0..2)
        .map(|_| {
            (0..size.voxel_count())
                .map(|_| rng.gen_range(-1..palette.len() as i32))
                .collect()
        })
        .collect();
    structure(size, &palette, layers)
}

#[test]
fn two_structures_share_one_palette() {
    let size = StructureSize::new(2, 1, 2);
    let pack = make_pack(
        vec![
            structure(size, &["stone", "dirt"], vec![vec![0, 1, 0, 1]]),
            structure(size, &["dirt", "stone"], vec![vec![0, 1, 0, 1]]),
        ],
        &PackConfig::default(),
        &NoUpgrade,
    )
    .unwrap();
    assert_eq!(pack.palette.len(), 2);
    assert_eq!(pack.palette.get(0), Some(&Block::new("stone")));
    assert_eq!(pack.palette.get(1), Some(&Block::new("dirt")));
    assert_eq!(pack.structure_indices[0], vec![vec![0, 1, 0, 1]]);
    assert_eq!(pack.structure_indices[1], vec![vec![1, 0, 1, 0]]);
    assert!(pack.dangling_entries.is_empty());
}

#[test]
fn merged_indices_resolve_to_the_original_blocks() {
    let config = PackConfig::default();
    let normalizer = Normalizer::new(&config, &NoUpgrade);
    let mut rng = StdRng::seed_from_u64(7);
    let names = ["stone", "dirt", "air", "glass", "oak_planks"];
    for _ in 0..50 {
        let count = rng.gen_range(1..4);
        let normalized: Vec<_> = (0..count)
            .map(|_| normalizer.normalize(random_structure(&mut rng, &names)).unwrap())
            .collect();
        let merged = merge_palettes(&normalized);
        for (original, remapped) in normalized.iter().zip(&merged.structures) {
            for (layer, remapped_layer) in original.layers.iter().zip(remapped) {
                for (local, global) in layer.iter().zip(remapped_layer) {
                    let block = original.palette.get(*local);
                    assert_eq!(block, merged.palette.get(*global));
                    if block.is_none() {
                        assert_eq!(*global, NO_BLOCK);
                    }
                }
            }
        }
        // air never survives normalization
        assert!(merged
            .palette
            .iter_live()
            .all(|(_, block)| block.name != "air"));
    }
}

#[test]
fn normalizing_output_again_is_stable() {
    let config = PackConfig::default();
    let normalizer = Normalizer::new(&config, &NoUpgrade);
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..20 {
        let once = normalizer
            .normalize(random_structure(&mut rng, &["minecraft:stone", "minecraft:air", "dirt"]))
            .unwrap();
        let twice = normalizer.normalize(once.to_raw()).unwrap();
        let thrice = normalizer.normalize(twice.to_raw()).unwrap();
        assert_eq!(thrice.palette, twice.palette);
        assert_eq!(thrice.layers, twice.layers);
    }
}

/// Follows the first transition whose guard holds until none does.
fn settle(controller: &AnimationController, evaluator: &mut Evaluator) -> String {
    let mut current = controller.initial_state.clone();
    for _ in 0..=controller.states.len() {
        let state = controller.state(&current).unwrap();
        let next = state
            .transitions
            .iter()
            .find(|transition| evaluator.evaluate_source(&transition.guard).unwrap().is_truthy());
        match next {
            Some(transition) => current = transition.target.clone(),
            None => return current,
        }
    }
    panic!("validation controller does not settle");
}

#[test]
fn validation_falls_back_to_default_on_empty_layers() {
    // layer 1 of the first structure only holds air
    let pack = make_pack(
        vec![
            structure(
                StructureSize::new(1, 3, 1),
                &["stone", "air"],
                vec![vec![0, 1, 0]],
            ),
            structure(StructureSize::new(1, 1, 1), &["glass"], vec![vec![0]]),
        ],
        &PackConfig::default(),
        &NoUpgrade,
    )
    .unwrap();
    let controller = &pack.animation_controllers.animation_controllers[VALIDATION_CONTROLLER];
    let mut evaluator = Evaluator::new();
    evaluator.set_number("v.hologram.validating", 1.0);
    let mut expect = |structure: f64, layer: f64, state: &str| {
        evaluator.set_number("v.hologram.structure_index", structure);
        evaluator.set_number("v.hologram.layer", layer);
        assert_eq!(settle(controller, &mut evaluator), state, "structure {structure} layer {layer}");
    };
    expect(0.0, -1.0, "validate_0");
    expect(0.0, 0.0, "validate_0_l_0");
    expect(0.0, 1.0, "default");
    expect(0.0, 2.0, "validate_0_l_2");
    expect(1.0, 0.0, "validate_1_l_0");
    expect(1.0, 1.0, "default");
}

#[test]
fn entity_scripts_see_every_structure() {
    let pack = make_pack(
        vec![
            structure(StructureSize::new(2, 1, 1), &["stone"], vec![vec![0, 0]]),
            structure(StructureSize::new(3, 2, 1), &["dirt"], vec![vec![0, -1, 0, -1, 0, 0]]),
        ],
        &PackConfig::default(),
        &NoUpgrade,
    )
    .unwrap();
    let mut evaluator = Evaluator::new();
    evaluator.execute_source(&pack.scripts.initialize).unwrap();
    evaluator.set_number("v.hologram.structure_index", 1.0);
    evaluator.execute_source(&pack.scripts.pre_animation).unwrap();
    assert_eq!(evaluator.number("v.hologram.structure_w"), 3.0);
    assert_eq!(evaluator.number("v.hologram.total_blocks_to_validate"), 4.0);
}

#[test]
fn empty_input_is_a_user_error() {
    let air = structure(StructureSize::new(1, 1, 1), &["minecraft:air"], vec![vec![0]]);
    let error = make_pack(vec![air], &PackConfig::default(), &NoUpgrade).unwrap_err();
    assert!(matches!(error, PackError::User(_)));
    assert_eq!(error.to_string(), "Structure is empty! No blocks are inside the structure.");
}
