use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{AsRefStr, Display, EnumIter};

/// Block names skipped in every structure, on top of the configured ones.
pub const IGNORED_BLOCKS: [&str; 3] = ["air", "piston_arm_collision", "sticky_piston_arm_collision"];

pub const DEFAULT_IGNORED_BLOCK_ENTITIES: [&str; 20] = [
    "Beacon",
    "Beehive",
    "Bell",
    "BrewingStand",
    "ChiseledBookshelf",
    "CommandBlock",
    "Comparator",
    "Conduit",
    "EnchantTable",
    "EndGateway",
    "JigsawBlock",
    "Lodestone",
    "SculkCatalyst",
    "SculkShrieker",
    "SculkSensor",
    "CalibratedSculkSensor",
    "StructureBlock",
    "BrushableBlock",
    "TrialSpawner",
    "Vault",
];

pub const HELD_ITEM_SLOT: &str = "slot.weapon.mainhand";

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerControl {
    ToggleRendering,
    ChangeOpacity,
    ToggleTint,
    ToggleValidating,
    ChangeLayer,
    DecreaseLayer,
    ChangeLayerMode,
    MoveHologram,
    RotateHologram,
    ChangeStructure,
    DisablePlayerControls,
    BackupHologram,
}

/// How layers other than the selected one are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerMode {
    Single = 0,
    AllBelow = 1,
}

/// Items that trigger a control: any of `names`, or anything carrying one
/// of `tags`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCriteria {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}
impl ItemCriteria {
    pub fn named<N: Into<String>>(name: N) -> Self {
        ItemCriteria {
            names: vec![name.into()],
            tags: Vec::new(),
        }
    }
    /// Query on the held item. Un-namespaced names and tags get
    /// `minecraft:`; empty criteria never match.
    pub fn to_expression(&self, slot: &str) -> String {
        let query = |function: &str, values: &[String]| {
            if values.is_empty() {
                return None;
            }
            let arguments: Vec<String> = values
                .iter()
                .map(|value| {
                    if value.contains(':') {
                        format!("'{value}'")
                    } else {
                        format!("'minecraft:{value}'")
                    }
                })
                .collect();
            Some(format!("{function}('{slot}',{})", arguments.join(",")))
        };
        let queries: Vec<String> = [
            query("q.is_item_name_any", &self.names),
            query("q.equipped_item_any_tag", &self.tags),
        ]
        .into_iter()
        .flatten()
        .collect();
        if queries.is_empty() {
            "false".to_string()
        } else {
            queries.join("||")
        }
    }
}

pub static DEFAULT_CONTROLS: Lazy<BTreeMap<PlayerControl, ItemCriteria>> = Lazy::new(|| {
    BTreeMap::from([
        (PlayerControl::ToggleRendering, ItemCriteria::named("brick")),
        (PlayerControl::ChangeOpacity, ItemCriteria::named("amethyst_shard")),
        (PlayerControl::ToggleTint, ItemCriteria::named("white_dye")),
        (PlayerControl::ToggleValidating, ItemCriteria::named("iron_ingot")),
        (PlayerControl::ChangeLayer, ItemCriteria::named("leather")),
        (PlayerControl::DecreaseLayer, ItemCriteria::named("feather")),
        (PlayerControl::ChangeLayerMode, ItemCriteria::named("flint")),
        (PlayerControl::MoveHologram, ItemCriteria::named("stick")),
        (PlayerControl::RotateHologram, ItemCriteria::named("copper_ingot")),
        (PlayerControl::ChangeStructure, ItemCriteria::named("arrow")),
        (PlayerControl::DisablePlayerControls, ItemCriteria::named("bone")),
        (PlayerControl::BackupHologram, ItemCriteria::named("paper")),
    ])
});

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    /// Extra block names to skip, added to [`IGNORED_BLOCKS`].
    pub ignored_blocks: Vec<String>,
    pub ignored_block_entities: Vec<String>,
    pub mini_scale: f64,
    pub initial_offset: [i32; 3],
    pub backup_slot_count: u32,
    pub array_split_threshold: usize,
    /// Overrides on top of [`DEFAULT_CONTROLS`].
    pub controls: BTreeMap<PlayerControl, ItemCriteria>,
    pub validation_particle_namespace: String,
}
impl Default for PackConfig {
    fn default() -> Self {
        PackConfig {
            ignored_blocks: Vec::new(),
            ignored_block_entities: DEFAULT_IGNORED_BLOCK_ENTITIES
                .iter()
                .map(|id| id.to_string())
                .collect(),
            mini_scale: 0.125,
            initial_offset: [0, 0, 0],
            backup_slot_count: 10,
            array_split_threshold: packscript::SPLITTING_THRESHOLD,
            controls: BTreeMap::new(),
            validation_particle_namespace: "hololab".to_string(),
        }
    }
}
impl PackConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
    pub fn is_block_ignored(&self, name: &str) -> bool {
        IGNORED_BLOCKS.contains(&name) || self.ignored_blocks.iter().any(|ignored| ignored == name)
    }
    pub fn is_block_entity_ignored(&self, id: &str) -> bool {
        self.ignored_block_entities.iter().any(|ignored| ignored == id)
    }
    pub fn control(&self, control: PlayerControl) -> ItemCriteria {
        self.controls
            .get(&control)
            .or_else(|| DEFAULT_CONTROLS.get(&control))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn criteria_expressions() {
        assert_eq!(
            ItemCriteria::named("stick").to_expression(HELD_ITEM_SLOT),
            "q.is_item_name_any('slot.weapon.mainhand','minecraft:stick')"
        );
        let criteria = ItemCriteria {
            names: vec!["mod:wand".to_string(), "bone".to_string()],
            tags: vec!["planks".to_string()],
        };
        assert_eq!(
            criteria.to_expression(HELD_ITEM_SLOT),
            "q.is_item_name_any('slot.weapon.mainhand','mod:wand','minecraft:bone')||q.equipped_item_any_tag('slot.weapon.mainhand','minecraft:planks')"
        );
        assert_eq!(ItemCriteria::default().to_expression(HELD_ITEM_SLOT), "false");
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config = PackConfig::from_json(
            r#"{"ignored_blocks": ["glass"], "controls": {"MOVE_HOLOGRAM": {"names": ["blaze_rod"]}}}"#,
        )
        .unwrap();
        assert!(config.is_block_ignored("glass"));
        assert!(config.is_block_ignored("air"));
        assert!(config.is_block_entity_ignored("Beehive"));
        assert_eq!(config.mini_scale, 0.125);
        assert_eq!(
            config.control(PlayerControl::MoveHologram),
            ItemCriteria::named("blaze_rod")
        );
        assert_eq!(
            config.control(PlayerControl::BackupHologram),
            ItemCriteria::named("paper")
        );
    }

    #[test]
    fn every_control_has_a_default() {
        for control in PlayerControl::iter() {
            assert!(DEFAULT_CONTROLS.contains_key(&control), "{control}");
        }
        assert_eq!(PlayerControl::ToggleRendering.as_ref(), "TOGGLE_RENDERING");
    }
}
