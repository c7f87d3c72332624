use crate::animation::{animation_short_name, BlockToValidate, ValidationList, HOLOGRAM_ROOT_BONE};
use crate::error::PackResult;
use holo_pack_common::content::{AnimationController, AnimationState, ParticleEffect, Transition};
use holo_pack_common::StructureSize;
use packscript::ast::{BinaryOperator, Expression, UnaryOperator};
use packscript::emit::emit_expression;
use packscript::Bindings;

pub const VALIDATION_CONTROLLER: &str = "controller.animation.armor_stand.hologram.block_validation";
pub const BOUNDING_BOX_CONTROLLER: &str = "controller.animation.armor_stand.hologram.bounding_box";
pub const STRUCTURES_CONTROLLER: &str = "controller.animation.armor_stand.hologram.structures";

/// Short particle names the entity maps to full identifiers.
pub const BOUNDING_BOX_PARTICLE: &str = "bounding_box_outline";
pub const SAVING_BACKUP_PARTICLE: &str = "saving_backup";

const VALIDATION_DEFAULT_STATE: &str = "default";
const BOUNDING_BOX_HIDDEN_STATE: &str = "hidden";

const VALIDATING: &str = "v.hologram.validating";
const RENDERING: &str = "v.hologram.rendering";
const STRUCTURE_INDEX: &str = "v.hologram.structure_index";
const LAYER: &str = "v.hologram.layer";

/// Edge outlines of the bounding box: the three colored axes from the
/// origin, then the nine white edges.
const OUTLINE_SETTINGS: [&str; 12] = [
    "v.size = $[size[0]/2]; v.dir = 0; v.r = 1; v.g = 0; v.b = 0;",
    "v.size = $[size[1]/2]; v.dir = 1; v.r = 1 / 255; v.g = 1; v.b = 0;",
    "v.size = $[size[2]/2]; v.dir = 2; v.r = 0; v.g = 162 / 255; v.b = 1;",
    "v.size = $[size[0]/2]; v.dir = 0; v.y = $[size[1]]; v.r = 1; v.g = 1; v.b = 1;",
    "v.size = $[size[0]/2]; v.dir = 0; v.z = $[size[2]]; v.r = 1; v.g = 1; v.b = 1;",
    "v.size = $[size[0]/2]; v.dir = 0; v.y = $[size[1]]; v.z = $[size[2]]; v.r = 1; v.g = 1; v.b = 1;",
    "v.size = $[size[1]/2]; v.dir = 1; v.x = $[size[0]]; v.r = 1; v.g = 1; v.b = 1;",
    "v.size = $[size[1]/2]; v.dir = 1; v.z = $[size[2]]; v.r = 1; v.g = 1; v.b = 1;",
    "v.size = $[size[1]/2]; v.dir = 1; v.x = $[size[0]]; v.z = $[size[2]]; v.r = 1; v.g = 1; v.b = 1;",
    "v.size = $[size[2]/2]; v.dir = 2; v.x = $[size[0]]; v.r = 1; v.g = 1; v.b = 1;",
    "v.size = $[size[2]/2]; v.dir = 2; v.y = $[size[1]]; v.r = 1; v.g = 1; v.b = 1;",
    "v.size = $[size[2]/2]; v.dir = 2; v.x = $[size[0]]; v.y = $[size[1]]; v.r = 1; v.g = 1; v.b = 1;",
];

fn variable(name: &str) -> Expression {
    Expression::Variable(name.into())
}
fn compare(operator: BinaryOperator, name: &str, value: i64) -> Expression {
    Expression::binary(operator, variable(name), Expression::Int(value))
}
fn not(name: &str) -> Expression {
    Expression::Unary {
        operator: UnaryOperator::Not,
        expression: Box::new(variable(name)),
    }
}
/// Left-associated chain of `operator`. `terms` must not be empty.
fn chain<I: IntoIterator<Item = Expression>>(operator: BinaryOperator, terms: I) -> Expression {
    terms
        .into_iter()
        .reduce(|first, second| Expression::binary(operator, first, second))
        .unwrap_or(Expression::Bool(false))
}

pub fn validate_all_state_name(structure: usize) -> String {
    format!("validate_{structure}")
}
pub fn validate_layer_state_name(structure: usize, y: u32) -> String {
    format!("validate_{structure}_l_{y}")
}
pub fn visible_state_name(structure: usize) -> String {
    format!("visible_{structure}")
}

/// Guard entering a validation state of `structure`. A `layer` of -1 means
/// every layer.
fn validation_guard(structure: usize, layer: i64) -> String {
    emit_expression(&chain(
        BinaryOperator::And,
        [
            variable(VALIDATING),
            compare(BinaryOperator::Equals, STRUCTURE_INDEX, structure as i64),
            compare(BinaryOperator::Equals, LAYER, layer),
        ],
    ))
}

/// Guard leaving the validation states of a structure: validation is off,
/// another structure is selected, or the selected layer has nothing to check.
fn validation_return_guard(structure: usize, height: u32, empty_layers: &[u32]) -> String {
    let mut terms = vec![
        not(VALIDATING),
        compare(BinaryOperator::NotEquals, STRUCTURE_INDEX, structure as i64),
    ];
    terms.extend(
        empty_layers
            .iter()
            .map(|y| compare(BinaryOperator::Equals, LAYER, *y as i64)),
    );
    terms.push(compare(BinaryOperator::Less, LAYER, -1));
    terms.push(compare(BinaryOperator::GreaterEquals, LAYER, height as i64));
    emit_expression(&chain(BinaryOperator::Or, terms))
}

pub fn validation_particle_short_name(block: &str) -> String {
    format!("validate_{}", block.replace(':', "."))
}
pub fn validation_particle_name(namespace: &str, block: &str) -> String {
    format!("{namespace}:{}", validation_particle_short_name(block))
}

/// Builds the block validation controller. Its `default` state shows
/// nothing; each structure gets a state validating every layer plus one
/// state per layer that has blocks to validate.
pub fn build_validation_controller(
    namespace: &str,
    structures: &[(StructureSize, &ValidationList)],
) -> AnimationController {
    let mut controller = AnimationController::new(VALIDATION_DEFAULT_STATE);
    for (structure, (size, validation)) in structures.iter().enumerate() {
        let height = size.height;
        let (filled, empty): (Vec<u32>, Vec<u32>) = (0..height)
            .partition(|y| validation.counts_by_layer.get(*y as usize).is_some_and(|count| *count > 0));
        let return_guard = validation_return_guard(structure, height, &empty);
        let all_name = validate_all_state_name(structure);
        let layer_transitions: Vec<(u32, Transition)> = filled
            .iter()
            .map(|y| {
                (
                    *y,
                    Transition::new(
                        validate_layer_state_name(structure, *y),
                        validation_guard(structure, *y as i64),
                    ),
                )
            })
            .collect();
        let all_transition = Transition::new(all_name.clone(), validation_guard(structure, -1));

        if let Some(default) = controller.state_mut(VALIDATION_DEFAULT_STATE) {
            default.transitions.push(all_transition.clone());
            default
                .transitions
                .extend(layer_transitions.iter().map(|(_, transition)| transition.clone()));
        }

        let particle = |block: &BlockToValidate| ParticleEffect {
            effect: validation_particle_name(namespace, &block.block),
            locator: block.locator.clone(),
            pre_effect_script: format!(
                "v.x={};v.y={};v.z={};",
                block.position.x, block.position.y, block.position.z
            ),
        };
        let mut all_state = AnimationState {
            particle_effects: validation.blocks.iter().map(particle).collect(),
            ..Default::default()
        };
        all_state
            .transitions
            .push(Transition::new(VALIDATION_DEFAULT_STATE, return_guard.clone()));
        all_state
            .transitions
            .extend(layer_transitions.iter().map(|(_, transition)| transition.clone()));
        controller.states.insert(all_name, all_state);

        for y in &filled {
            let mut layer_state = AnimationState {
                particle_effects: validation
                    .blocks
                    .iter()
                    .filter(|block| block.position.y == *y as i32)
                    .map(particle)
                    .collect(),
                ..Default::default()
            };
            layer_state
                .transitions
                .push(Transition::new(VALIDATION_DEFAULT_STATE, return_guard.clone()));
            layer_state.transitions.push(all_transition.clone());
            layer_state.transitions.extend(
                layer_transitions
                    .iter()
                    .filter(|(other, _)| other != y)
                    .map(|(_, transition)| transition.clone()),
            );
            controller
                .states
                .insert(validate_layer_state_name(structure, *y), layer_state);
        }
    }
    controller
}

/// Builds the bounding box controller: `hidden`, plus a `visible_i` state
/// per structure drawing its twelve edges.
pub fn build_bounding_box_controller(
    sizes: &[StructureSize],
) -> PackResult<AnimationController> {
    let mut controller = AnimationController::new(BOUNDING_BOX_HIDDEN_STATE);
    for (structure, size) in sizes.iter().enumerate() {
        let name = visible_state_name(structure);
        let show = chain(
            BinaryOperator::And,
            [
                variable(RENDERING),
                compare(BinaryOperator::Equals, STRUCTURE_INDEX, structure as i64),
            ],
        );
        let hide = chain(
            BinaryOperator::Or,
            [
                not(RENDERING),
                compare(BinaryOperator::NotEquals, STRUCTURE_INDEX, structure as i64),
            ],
        );
        if let Some(hidden) = controller.state_mut(BOUNDING_BOX_HIDDEN_STATE) {
            hidden
                .transitions
                .push(Transition::new(name.clone(), emit_expression(&show)));
        }
        let bindings = Bindings::new().with("size", size.as_array());
        let particle_effects = OUTLINE_SETTINGS
            .iter()
            .map(|settings| {
                Ok(ParticleEffect {
                    effect: BOUNDING_BOX_PARTICLE.to_string(),
                    locator: HOLOGRAM_ROOT_BONE.to_string(),
                    pre_effect_script: packscript::compile(settings, &bindings)?,
                })
            })
            .collect::<PackResult<Vec<_>>>()?;
        controller.states.insert(
            name,
            AnimationState {
                particle_effects,
                transitions: vec![Transition::new(
                    BOUNDING_BOX_HIDDEN_STATE,
                    emit_expression(&hide),
                )],
                ..Default::default()
            },
        );
    }
    Ok(controller)
}

pub fn structure_state_name(structure: usize) -> String {
    format!("s_{structure}")
}

/// Cycles through the structure animations, one state per structure that
/// steps forward while the selected index differs.
pub fn build_structures_controller(structure_count: usize) -> AnimationController {
    let mut controller = AnimationController::new(structure_state_name(0));
    for structure in 0..structure_count {
        let mut state = AnimationState {
            animations: vec![animation_short_name(structure)],
            ..Default::default()
        };
        if structure_count > 1 {
            state.transitions.push(Transition::new(
                structure_state_name((structure + 1) % structure_count),
                emit_expression(&compare(
                    BinaryOperator::NotEquals,
                    STRUCTURE_INDEX,
                    structure as i64,
                )),
            ));
        }
        controller.states.insert(structure_state_name(structure), state);
    }
    controller
}
