use crate::output::print_json;
use daybook_core::audit::audit;
use daybook_core::config::WarnLevel;
use daybook_core::view::Stores;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let (store, config) = super::open(root)?;
    let report = audit(Stores::uniform(&store), &config)?;

    if json {
        print_json(&report)?;
    } else if report.findings.is_empty() {
        println!("No consistency problems found.");
    } else {
        for f in &report.findings {
            let prefix = match f.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}: {}", f.subject, f.message);
        }
    }

    if report.has_errors() {
        anyhow::bail!("consistency check found errors");
    }
    Ok(())
}
