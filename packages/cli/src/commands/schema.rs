use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use reprose_author::features_to_schema;
use std::path::Path;

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub fn schema(args: SchemaArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let features = config.build_features()?;
    let aggregated = features_to_schema(&features, config.editor.schema_policy)?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&aggregated.descriptor)?);
        return Ok(());
    }

    if aggregated.degraded {
        println!(
            "{} features yield no usable schema; showing the paragraph fallback",
            "warning:".yellow().bold()
        );
        println!();
    }

    println!("{}", "Nodes".bold());
    for (name, spec) in &aggregated.descriptor.nodes {
        let mut details = Vec::new();
        if let Some(content) = &spec.content {
            details.push(format!("content: {}", content));
        }
        if let Some(group) = &spec.group {
            details.push(format!("group: {}", group));
        }
        if spec.inline {
            details.push("inline".to_string());
        }
        if spec.atom {
            details.push("atom".to_string());
        }
        if !spec.attrs.is_empty() {
            let attrs: Vec<_> = spec
                .attrs
                .iter()
                .map(|(attr, attr_spec)| match &attr_spec.default {
                    Some(default) => format!("{}={}", attr, default),
                    None => attr.clone(),
                })
                .collect();
            details.push(format!("attrs: {}", attrs.join(" ")));
        }
        println!("  {} {}", name.cyan(), details.join("; ").dimmed());
    }

    println!();
    println!("{}", "Marks".bold());
    if aggregated.descriptor.marks.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for name in aggregated.descriptor.marks.keys() {
        println!("  {}", name.cyan());
    }

    Ok(())
}
