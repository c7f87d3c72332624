use crate::error::{PackError, PackResult};
use fxhash::FxHashMap;
use holo_pack_common::RawBlock;
use serde::Deserialize;

/// Block version of 1.21.60.33, the newest format this crate emits.
pub const LATEST_BLOCK_VERSION: i32 = 18_168_865;

/// Brings blocks saved by older game versions up to date.
pub trait BlockUpgrader {
    fn needs_updating(&self, block: &RawBlock) -> bool;
    fn update(&self, block: &mut RawBlock) -> PackResult<()>;
    fn latest_version(&self) -> i32;
}

/// Leaves every block untouched.
pub struct NoUpgrade;
impl BlockUpgrader for NoUpgrade {
    fn needs_updating(&self, _block: &RawBlock) -> bool {
        false
    }
    fn update(&self, _block: &mut RawBlock) -> PackResult<()> {
        Ok(())
    }
    fn latest_version(&self) -> i32 {
        LATEST_BLOCK_VERSION
    }
}

/// Upgrades outdated blocks by renaming them, for example
/// `{"latest_version": 18168865, "renames": {"grass": "grass_block"}}`.
#[derive(Clone, Debug, Deserialize)]
pub struct RenameTable {
    latest_version: i32,
    #[serde(default)]
    renames: FxHashMap<String, String>,
}
impl RenameTable {
    pub fn new(latest_version: i32) -> Self {
        RenameTable {
            latest_version,
            renames: FxHashMap::default(),
        }
    }
    pub fn with_rename<O: Into<String>, N: Into<String>>(mut self, old: O, new: N) -> Self {
        self.renames.insert(old.into(), new.into());
        self
    }
    pub fn from_json(text: &str) -> PackResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
impl BlockUpgrader for RenameTable {
    fn needs_updating(&self, block: &RawBlock) -> bool {
        block
            .version
            .is_some_and(|version| version < self.latest_version)
    }
    fn update(&self, block: &mut RawBlock) -> PackResult<()> {
        let (namespace, mut name) = match block.name.split_once(':') {
            Some((namespace, name)) => (Some(namespace), name),
            None => (None, block.name.as_str()),
        };
        let mut hops = 0;
        while let Some(renamed) = self.renames.get(name) {
            hops += 1;
            if hops > self.renames.len() {
                return Err(PackError::Upgrade {
                    name: block.name.clone(),
                    reason: "rename table contains a cycle".to_string(),
                });
            }
            name = renamed.as_str();
        }
        block.name = match namespace {
            Some(namespace) => format!("{namespace}:{name}"),
            None => name.to_string(),
        };
        block.version = Some(self.latest_version);
        Ok(())
    }
    fn latest_version(&self) -> i32 {
        self.latest_version
    }
}

/// Renders a packed block version, one byte per component, as `1.20.10.32`.
pub fn format_block_version(version: i32) -> String {
    version
        .to_be_bytes()
        .iter()
        .map(|byte| byte.to_string())
        .collect::<Vec<_>>()
        .join(".")
}
