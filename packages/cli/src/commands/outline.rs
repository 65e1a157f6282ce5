use crate::commands::{open_editor, read_document};
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use reprose_features::{section_anchor, SECTION, SECTION_HEADER};
use reprose_model::Node;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct OutlineArgs {
    /// Document to outline
    pub document: PathBuf,
}

/// One section heading in the outline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub depth: usize,
    pub title: String,
    pub anchor: String,
}

/// Sections of `node` in document order, nested sections one level deeper
pub fn collect_outline(node: &Node, depth: usize, out: &mut Vec<OutlineEntry>) {
    for child in node.content().iter() {
        if child.type_name() == SECTION {
            let title = child
                .child(0)
                .filter(|header| header.type_name() == SECTION_HEADER)
                .map(Node::text_content)
                .unwrap_or_default();
            out.push(OutlineEntry {
                depth,
                title,
                anchor: section_anchor(child),
            });
            collect_outline(child, depth + 1, out);
        } else if !child.is_leaf() {
            collect_outline(child, depth, out);
        }
    }
}

pub fn outline(args: OutlineArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let editor = open_editor(&config, &read_document(&args.document)?)?;
    let state = editor.state().ok_or_else(|| {
        anyhow!(
            "{} does not fit the schema; run `reprose check` for details",
            args.document.display()
        )
    })?;

    let mut entries = Vec::new();
    collect_outline(state.doc(), 0, &mut entries);
    if entries.is_empty() {
        println!("{}", "(no sections)".dimmed());
    }
    for entry in entries {
        let title = if entry.title.trim().is_empty() {
            "(untitled)".dimmed().to_string()
        } else {
            entry.title
        };
        println!(
            "{}{} {}",
            "  ".repeat(entry.depth),
            title,
            format!("#{}", entry.anchor).cyan()
        );
    }
    Ok(())
}
