use crate::{Block, StructureSize};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A structure as handed over by the structure-file decoder.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawStructure {
    #[serde(default)]
    pub name: String,
    pub size: StructureSize,
    pub palette: Vec<RawBlock>,
    /// One flat index array per layer, layer 0 being the primary layer.
    pub block_indices: Vec<Vec<i32>>,
    /// Side channel keyed by flat voxel offset.
    #[serde(default)]
    pub block_position_data: BTreeMap<usize, PositionData>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    pub name: String,
    #[serde(default)]
    pub states: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_entity_data: Option<Map<String, Value>>,
}
impl RawBlock {
    pub fn new<N: Into<String>>(name: N) -> Self {
        RawBlock {
            name: name.into(),
            ..Default::default()
        }
    }
    pub fn with_version(mut self, version: i32) -> Self {
        self.version = Some(version);
        self
    }
    pub fn with_state<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.states.insert(key.into(), value.into());
        self
    }
}
impl From<&Block> for RawBlock {
    fn from(block: &Block) -> Self {
        RawBlock {
            name: block.name.clone(),
            states: block.states.clone(),
            version: None,
            block_entity_data: block.block_entity_data.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_entity_data: Option<Map<String, Value>>,
}
