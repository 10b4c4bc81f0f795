use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use daybook_core::content::{ContentRef, ContentResolver};
use std::path::Path;

#[derive(Subcommand)]
pub enum ContentSubcommand {
    /// Resolve a content reference the way a day view does
    Resolve {
        /// Content type, e.g. VIDEO or DOCUMENT
        content_type: String,
        id: String,
        /// Probe this collection first
        #[arg(long)]
        collection: Option<String>,
    },

    /// List every collection holding an id
    Locate { id: String },
}

pub fn run(root: &Path, subcmd: ContentSubcommand, json: bool) -> anyhow::Result<()> {
    let (store, config) = super::open(root)?;
    let resolver = ContentResolver::new(&store, &config.content);

    match subcmd {
        ContentSubcommand::Resolve {
            content_type,
            id,
            collection,
        } => {
            let mut r = ContentRef::new(content_type, id);
            if let Some(c) = collection {
                r = r.in_collection(c);
            }
            let item = resolver
                .resolve(&r)
                .with_context(|| format!("probed: {}", resolver.probe_order(&r).join(", ")))?;
            if json {
                return print_json(&item);
            }
            println!("{} [{}]", item.title, item.collection);
            println!("  type:     {}", item.content_type);
            println!("  url:      {}", item.url.as_deref().unwrap_or("-"));
            if let Some(min) = item.duration_minutes {
                println!("  duration: {min} min");
            }
        }
        ContentSubcommand::Locate { id } => {
            let found = resolver.locate_all(&id)?;
            if json {
                return print_json(&found);
            }
            if found.is_empty() {
                println!("'{id}' is not in any known collection.");
                return Ok(());
            }
            let rows = found
                .iter()
                .map(|i| {
                    vec![
                        i.collection.clone(),
                        i.title.clone(),
                        i.url.clone().unwrap_or_default(),
                    ]
                })
                .collect();
            print_table(&["COLLECTION", "TITLE", "URL"], rows);
        }
    }
    Ok(())
}
