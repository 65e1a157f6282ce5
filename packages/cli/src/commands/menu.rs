use crate::commands::{open_editor, read_document};
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use reprose_author::{features_to_schema, merge_menus, MenuGroups, MenuState};
use reprose_model::Selection;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct MenuArgs {
    /// Document to evaluate option states against
    pub document: Option<PathBuf>,

    /// Cursor position or selection (`from` or `from..to`)
    #[arg(short, long)]
    pub selection: Option<String>,
}

fn parse_selection(spec: &str) -> Result<Selection> {
    let parse = |value: &str| {
        value
            .trim()
            .parse::<usize>()
            .map_err(|_| anyhow!("invalid position \"{}\"", value))
    };
    match spec.split_once("..") {
        Some((from, to)) => Ok(Selection::text(parse(from)?, parse(to)?)),
        None => Ok(Selection::cursor(parse(spec)?)),
    }
}

fn print_menu(menu: &MenuGroups, state_of: impl Fn(&str, &str) -> Option<MenuState>) {
    for (group, options) in menu {
        println!("{}", group.bold());
        for (id, option) in options {
            let kind = if option.is_async() { " (async)" } else { "" };
            let line = format!("  {:<20} {}{}", id, option.label, kind);
            match state_of(group, id) {
                None => println!("{}", line),
                Some(MenuState { enabled: false, .. }) => println!("{}", line.dimmed()),
                Some(MenuState { active: true, .. }) => {
                    println!("{} {}", line.green(), "●".green())
                }
                Some(_) => println!("{}", line),
            }
        }
    }
}

pub fn menu(args: MenuArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;

    let Some(path) = &args.document else {
        let features = config.build_features()?;
        let aggregated = features_to_schema(&features, config.editor.schema_policy)?;
        print_menu(&merge_menus(&features, &aggregated.schema), |_, _| None);
        return Ok(());
    };

    let mut editor = open_editor(&config, &read_document(path)?)?;
    if editor.is_recovering() {
        return Err(anyhow!(
            "{} does not fit the schema; run `reprose check` for details",
            path.display()
        ));
    }
    if let Some(spec) = &args.selection {
        editor.set_selection(parse_selection(spec)?)?;
    }

    let states = editor.menu_states()?;
    print_menu(editor.menu(), |group, id| {
        states.get(group).and_then(|options| options.get(id)).copied()
    });
    Ok(())
}
