pub mod animation;
pub mod config;
pub mod controllers;
pub mod error;
pub mod merge;
pub mod normalize;
pub mod pack;
pub mod scripts;
pub mod upgrade;

pub use config::{ItemCriteria, LayerMode, PackConfig, PlayerControl};
pub use error::{PackError, PackResult};
pub use merge::{merge_palettes, MergedPalette};
pub use normalize::{NormalizedStructure, Normalizer};
pub use pack::{make_pack, HologramPack};
pub use upgrade::{BlockUpgrader, NoUpgrade, RenameTable};
