use crate::commands::{open_editor, read_document};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use reprose_author::Editor;
use reprose_features::{check_links, default_link_schemas, LinkIssue};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Document files to check
    #[arg(required = true)]
    pub documents: Vec<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// Findings for one document
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    path: String,
    /// Parse or validation errors that put the editor into recovery
    errors: Vec<String>,
    links: Vec<LinkIssue>,
}

fn report(path: &Path, editor: &Editor) -> Report {
    let mut report = Report {
        path: path.display().to_string(),
        errors: Vec::new(),
        links: Vec::new(),
    };
    if let Some(recovery) = editor.recovery() {
        report.errors = recovery.errors().into_iter().map(String::from).collect();
    }
    if let Some(state) = editor.state() {
        report.links = check_links(state.doc(), &default_link_schemas());
    }
    report
}

fn check_file(path: &Path, config: &Config) -> Result<Report> {
    let document = match read_document(path) {
        Ok(document) => document,
        Err(err) => {
            return Ok(Report {
                path: path.display().to_string(),
                errors: vec![format!("{:#}", err)],
                links: Vec::new(),
            })
        }
    };
    let editor = open_editor(config, &document)?;
    Ok(report(path, &editor))
}

fn print_report(report: &Report) {
    if report.errors.is_empty() && report.links.is_empty() {
        println!("{} {}", "✓".green(), report.path);
        return;
    }

    println!("{}", report.path);
    for error in &report.errors {
        println!("  {} {}", "error".red().bold(), error);
    }
    for issue in &report.links {
        println!(
            "  {} [link@{}] {} {}",
            "warning".yellow().bold(),
            issue.pos,
            issue.message,
            format!("({})", issue.reference).dimmed()
        );
    }
}

pub fn check(args: CheckArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;

    let reports = args
        .documents
        .iter()
        .map(|path| check_file(path, &config))
        .collect::<Result<Vec<_>>>()?;

    let total_errors: usize = reports.iter().map(|report| report.errors.len()).sum();
    let total_warnings: usize = reports.iter().map(|report| report.links.len()).sum();

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
        println!();
        println!("   Documents checked: {}", reports.len());
        if total_errors > 0 {
            println!("   {} {}", "Errors:".red(), total_errors);
        }
        if total_warnings > 0 {
            println!("   {} {}", "Warnings:".yellow(), total_warnings);
        }
        if total_errors == 0 && total_warnings == 0 {
            println!("   {} No issues found!", "✓".green());
        }
    }

    // Exit with error code if there are errors
    if total_errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_valid_document_with_insecure_link() {
        let dir = tempfile::tempdir().unwrap();
        let document = json!({
            "type": "doc",
            "content": [{
                "type": "paragraph",
                "content": [{
                    "type": "link",
                    "attrs": { "reference": "http://example.com" },
                    "content": [{ "type": "text", "text": "site" }]
                }]
            }]
        });
        let path = write(dir.path(), "doc.json", &document.to_string());

        let report = check_file(&path, &Config::default()).unwrap();
        assert!(report.errors.is_empty());
        assert_eq!(report.links.len(), 1);
        assert_eq!(report.links[0].message, "Link is not using secure protocol");
    }

    #[test]
    fn test_schema_violation_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "doc.json",
            r#"{ "type": "doc", "content": [{ "type": "heading" }] }"#,
        );

        let report = check_file(&path, &Config::default()).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(report.links.is_empty());
    }

    #[test]
    fn test_unparseable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "doc.json", "{ not json");

        let report = check_file(&path, &Config::default()).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("parsing"));
    }
}
