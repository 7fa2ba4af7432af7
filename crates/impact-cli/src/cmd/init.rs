use anyhow::Context;
use impact_core::config::Config;
use impact_core::store::Store;
use impact_core::{io, paths};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InitReport {
    root: String,
    config_created: bool,
    store: String,
}

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let dir = paths::impact_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let config_created = !paths::config_path(root).exists();
    let config = if config_created {
        let cfg = Config::default();
        cfg.save(root).context("failed to write config.yaml")?;
        cfg
    } else {
        Config::load(root).context("failed to load existing config.yaml")?
    };

    // Opening the store creates its tables.
    let store_path = config.store_path(root);
    Store::open(&store_path)
        .with_context(|| format!("failed to create store at {}", store_path.display()))?;

    if json {
        return crate::output::print_json(&InitReport {
            root: root.display().to_string(),
            config_created,
            store: store_path.display().to_string(),
        });
    }

    println!("Initializing impact assessment in: {}", root.display());
    if config_created {
        println!("  created: .impact/config.yaml");
    } else {
        println!("  exists:  .impact/config.yaml");
    }
    println!("  store:   {}", store_path.display());
    Ok(())
}
