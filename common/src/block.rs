use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// A palette entry. Equality and hashing go through [`BlockKey`], so the order
/// in which `states` or `block_entity_data` keys were inserted never matters.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub states: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_entity_data: Option<Map<String, Value>>,
}

impl Block {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Block {
            name: name.into(),
            states: Map::new(),
            block_entity_data: None,
        }
    }
    pub fn with_state<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.states.insert(key.into(), value.into());
        self
    }
    pub fn with_block_entity_data(mut self, data: Map<String, Value>) -> Self {
        self.block_entity_data = Some(data);
        self
    }
    pub fn key(&self) -> BlockKey {
        let mut encoded = String::with_capacity(self.name.len() + 16);
        encoded.push_str("{\"name\":");
        encoded.push_str(&Value::String(self.name.clone()).to_string());
        if !self.states.is_empty() {
            encoded.push_str(",\"states\":");
            write_canonical_map(&self.states, &mut encoded);
        }
        if let Some(data) = &self.block_entity_data {
            encoded.push_str(",\"block_entity_data\":");
            write_canonical_map(data, &mut encoded);
        }
        encoded.push('}');
        BlockKey(encoded)
    }
}
impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.key() == other.key()
    }
}
impl Eq for Block {}
impl Hash for Block {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}
impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key().0)
    }
}

/// Deterministic, key-sorted JSON encoding of a [`Block`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey(String);
impl BlockKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn write_canonical_map(map: &Map<String, Value>, out: &mut String) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    out.push('{');
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&Value::String(key.clone()).to_string());
        out.push(':');
        if let Some(value) = map.get(key) {
            write_canonical(value, out);
        }
    }
    out.push('}');
}
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => write_canonical_map(map, out),
        Value::Array(values) => {
            out.push('[');
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(value, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn state_order_does_not_affect_identity() {
        let first = Block::new("oak_stairs")
            .with_state("upside_down_bit", false)
            .with_state("weirdo_direction", 2);
        let second = Block::new("oak_stairs")
            .with_state("weirdo_direction", 2)
            .with_state("upside_down_bit", false);
        assert_eq!(first, second);
        assert_eq!(first.key(), second.key());
        let set: HashSet<Block> = [first, second].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn nested_entity_data_is_sorted() {
        let Value::Object(first) = json!({"id": "Chest", "Items": [{"b": 1, "a": 2}]}) else {
            unreachable!()
        };
        let Value::Object(second) = json!({"Items": [{"a": 2, "b": 1}], "id": "Chest"}) else {
            unreachable!()
        };
        let first = Block::new("chest").with_block_entity_data(first);
        let second = Block::new("chest").with_block_entity_data(second);
        assert_eq!(first, second);
        assert_eq!(
            first.key().as_str(),
            r#"{"name":"chest","block_entity_data":{"Items":[{"a":2,"b":1}],"id":"Chest"}}"#
        );
    }

    #[test]
    fn differing_fields_are_distinct() {
        let plain = Block::new("chest");
        let Value::Object(data) = json!({"id": "Chest"}) else {
            unreachable!()
        };
        let with_data = Block::new("chest").with_block_entity_data(data);
        let with_state = Block::new("chest").with_state("facing_direction", 3);
        assert_ne!(plain, with_data);
        assert_ne!(plain, with_state);
        assert_ne!(Block::new("stone"), Block::new("dirt"));
    }
}
