use anyhow::{bail, Context};
use holo_pack::{make_pack, BlockUpgrader, NoUpgrade, PackConfig, RenameTable};
use holo_pack_common::RawStructure;
use log::info;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const USAGE: &str =
    "usage: holo_pack <structures.json> [config.json] [-o out_dir] [--upgrades renames.json]";

/// A structure file holds either one decoded structure or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum StructureInput {
    Many(Vec<RawStructure>),
    One(RawStructure),
}

struct Arguments {
    structures: PathBuf,
    config: Option<PathBuf>,
    output: PathBuf,
    upgrades: Option<PathBuf>,
}
impl Arguments {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> anyhow::Result<Self> {
        let mut positional = Vec::new();
        let mut output = PathBuf::from("pack");
        let mut upgrades = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-o" | "--output" => {
                    output = args.next().map(PathBuf::from).context(USAGE)?;
                }
                "--upgrades" => {
                    upgrades = Some(args.next().map(PathBuf::from).context(USAGE)?);
                }
                _ => positional.push(PathBuf::from(arg)),
            }
        }
        let mut positional = positional.into_iter();
        let Some(structures) = positional.next() else {
            bail!(USAGE);
        };
        let config = positional.next();
        if positional.next().is_some() {
            bail!(USAGE);
        }
        Ok(Arguments {
            structures,
            config,
            output,
            upgrades,
        })
    }
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let arguments = Arguments::parse(std::env::args().skip(1))?;

    let structures = match serde_json::from_str::<StructureInput>(&read(&arguments.structures)?)
        .with_context(|| format!("malformed structure file {}", arguments.structures.display()))?
    {
        StructureInput::Many(structures) => structures,
        StructureInput::One(structure) => vec![structure],
    };
    let config = match &arguments.config {
        Some(path) => PackConfig::from_json(&read(path)?)
            .with_context(|| format!("malformed config file {}", path.display()))?,
        None => PackConfig::default(),
    };
    let upgrader: Box<dyn BlockUpgrader> = match &arguments.upgrades {
        Some(path) => Box::new(
            RenameTable::from_json(&read(path)?)
                .with_context(|| format!("malformed rename table {}", path.display()))?,
        ),
        None => Box::new(NoUpgrade),
    };

    let pack = make_pack(structures, &config, upgrader.as_ref())?;
    let files = pack.files()?;
    for (path, contents) in &files {
        let path = arguments.output.join(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    info!("wrote {} files to {}", files.len(), arguments.output.display());
    Ok(())
}
