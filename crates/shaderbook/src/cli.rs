use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "shaderbook",
    author,
    version,
    about = "Live fragment shader playground",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default, Clone)]
pub struct RunArgs {
    /// Example to open; defaults to the last one used, then the first in the catalog.
    #[arg(long, value_name = "TITLE")]
    pub example: Option<String>,

    /// Preview window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size_arg)]
    pub size: Option<(u32, u32)>,

    /// Optional FPS cap for the preview (0=uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Build shaders on the frame thread instead of a worker thread.
    #[arg(long)]
    pub inline_compile: bool,

    /// Print every compile outcome to stdout as one JSON object per line.
    #[arg(long)]
    pub json_events: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the preview window (the default when no subcommand is given).
    Run(RunArgs),
    /// Print every section and example in the catalog.
    List(ListArgs),
    /// Compile an example without opening a window and report the result.
    Check {
        #[arg(value_name = "TITLE")]
        title: String,
    },
    /// Add a shader file to the catalog, creating it when missing.
    Add {
        /// Section to add the example to; created when missing.
        #[arg(long, value_name = "SECTION", default_value = "My Shaders")]
        section: String,
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Remove an example from the catalog.
    Remove {
        #[arg(value_name = "TITLE")]
        title: String,
    },
    /// Print resolved directories for config, data, cache, and state.
    Where,
}

#[derive(Parser, Debug, Default)]
pub struct ListArgs {
    /// Emit the catalog as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

fn parse_size_arg(value: &str) -> Result<(u32, u32), String> {
    shaderconfig::parse_size(value)
}
