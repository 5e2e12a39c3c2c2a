mod bootstrap;
mod cli;
mod paths;
mod run;
mod state;
mod watcher;

use std::path::Path;

use anyhow::{bail, Context, Result};
use bus::NotificationBus;
use catalog::Catalog;
use renderer::PipelineInput;
use session::SessionCoordinator;

use bootstrap::Workspace;
use cli::{Command, ListArgs};
use paths::AppPaths;
use state::UserExample;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command.unwrap_or(Command::Run(cli.run)) {
        Command::Run(args) => run::run(args),
        Command::List(args) => run_list(&load_workspace()?.catalog(), &args),
        Command::Check { title } => run_check(&load_workspace()?.catalog(), &title),
        Command::Add { section, file } => run_add(&mut load_workspace()?, &section, &file),
        Command::Remove { title } => run_remove(&mut load_workspace()?, &title),
        Command::Where => run_where(&load_workspace()?),
    }
}

fn load_workspace() -> Result<Workspace> {
    Workspace::load(AppPaths::discover()?)
}

fn run_list(catalog: &Catalog, args: &ListArgs) -> Result<()> {
    if args.json {
        let rendered =
            serde_json::to_string_pretty(catalog).context("failed to serialize catalog")?;
        println!("{rendered}");
        return Ok(());
    }

    for section in catalog.sections() {
        println!("{}", section.title());
        if section.is_empty() {
            println!("  (empty)");
        }
        for example in section.examples() {
            match example.backing() {
                Some(path) => println!("  {:<24} {}", example.title(), path.display()),
                None => println!("  {}", example.title()),
            }
        }
    }
    Ok(())
}

fn run_check(catalog: &Catalog, title: &str) -> Result<()> {
    match run::check_example(catalog, title)? {
        None => {
            println!("{title}: ok");
            Ok(())
        }
        Some(message) => {
            println!("{title}: compile failed");
            println!("{message}");
            bail!("example '{title}' failed to compile")
        }
    }
}

fn run_add(workspace: &mut Workspace, section: &str, file: &Path) -> Result<()> {
    let section = section.trim();
    if section.is_empty() {
        bail!("section title must not be empty");
    }
    let path = paths::expand_from_cwd(&file.to_string_lossy())?;

    let mut session = SessionCoordinator::new(
        workspace.catalog(),
        workspace.resolver(),
        PipelineInput::new(),
        &NotificationBus::new(),
    );
    let title = session.add_from_file(section, &path)?;

    workspace.state.remember_section(section);
    workspace.state.user_examples.push(UserExample {
        section: section.to_string(),
        path: path.clone(),
    });
    workspace.save_state()?;

    println!("Added '{title}' to {section} ({})", path.display());
    Ok(())
}

fn run_remove(workspace: &mut Workspace, title: &str) -> Result<()> {
    let mut session = SessionCoordinator::new(
        workspace.catalog(),
        workspace.resolver(),
        PipelineInput::new(),
        &NotificationBus::new(),
    );
    if session.remove(title).is_none() {
        bail!("no example titled '{title}'");
    }

    if !workspace.state.remove_user_example(title) {
        workspace.state.removed.push(title.to_string());
    }
    if workspace.state.last_example.as_deref() == Some(title) {
        workspace.state.last_example = None;
    }
    workspace.save_state()?;

    println!("Removed '{title}'");
    Ok(())
}

fn run_where(workspace: &Workspace) -> Result<()> {
    let paths = &workspace.paths;
    println!("Configuration directories:");
    println!("  config:     {}", paths.config_dir().display());
    println!("  data:       {}", paths.data_dir().display());
    println!("  cache:      {}", paths.cache_dir().display());
    println!("  shaders:    {}", paths.shader_dir().display());
    println!("  settings:   {}", paths.config_file().display());
    println!("  state:      {}", paths.state_file().display());
    if let Some(title) = &workspace.state.last_example {
        println!("Last example: {title}");
    }
    Ok(())
}
