use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

pub const ANIMATION_FORMAT_VERSION: &str = "1.8.0";
pub const CONTROLLER_FORMAT_VERSION: &str = "1.10.0";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnimationControllerFile {
    pub format_version: String,
    pub animation_controllers: BTreeMap<String, AnimationController>,
}
impl AnimationControllerFile {
    pub fn new() -> Self {
        AnimationControllerFile {
            format_version: CONTROLLER_FORMAT_VERSION.to_string(),
            animation_controllers: BTreeMap::new(),
        }
    }
}
impl Default for AnimationControllerFile {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnimationController {
    pub initial_state: String,
    pub states: BTreeMap<String, AnimationState>,
}
impl AnimationController {
    pub fn new<N: Into<String>>(initial_state: N) -> Self {
        let initial_state = initial_state.into();
        let mut states = BTreeMap::new();
        states.insert(initial_state.clone(), AnimationState::default());
        AnimationController {
            initial_state,
            states,
        }
    }
    pub fn initial(&self) -> Option<&AnimationState> {
        self.states.get(&self.initial_state)
    }
    pub fn state(&self, name: &str) -> Option<&AnimationState> {
        self.states.get(name)
    }
    pub fn state_mut(&mut self, name: &str) -> Option<&mut AnimationState> {
        self.states.get_mut(name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AnimationState {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub animations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub particle_effects: Vec<ParticleEffect>,
    pub transitions: Vec<Transition>,
}

/// Guarded edge to another state. The runtime evaluates transitions in order
/// and takes the first whose guard holds.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub target: String,
    pub guard: String,
}
impl Transition {
    pub fn new<T: Into<String>, G: Into<String>>(target: T, guard: G) -> Self {
        Transition {
            target: target.into(),
            guard: guard.into(),
        }
    }
}
impl Serialize for Transition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.target, &self.guard)?;
        map.end()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParticleEffect {
    pub effect: String,
    pub locator: String,
    pub pre_effect_script: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnimationDocument {
    pub format_version: String,
    pub animations: BTreeMap<String, Animation>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Animation {
    #[serde(rename = "loop")]
    pub looping: bool,
    pub bones: BTreeMap<String, BoneAnimation>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoneAnimation {
    pub position: [f64; 3],
    pub scale: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GeometryBone {
    pub name: String,
    pub parent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot: Option<[f64; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}
