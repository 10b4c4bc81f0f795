use anyhow::Context;
use daybook_core::{config::Config, paths, store::FileStore};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    let program_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "program".to_string());

    println!("Initializing daybook in: {}", root.display());

    FileStore::init(root)
        .with_context(|| format!("failed to create {}", paths::daybook_dir(root).display()))?;

    if Config::init(root, &program_name).context("failed to write config.yaml")? {
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    for dir in [
        paths::COHORTS_DIR,
        paths::USERS_DIR,
        paths::PLAN_DIR,
        paths::CONTENT_DIR,
        paths::PROGRESS_DIR,
    ] {
        println!("  ready:   {dir}/");
    }
    Ok(())
}
