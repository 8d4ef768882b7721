mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mhfjmp_core::nls::Encoding;
use mhfjmp_core::{ProjectConfig, SchemaVersion};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mhfjmp", version)]
#[command(about = "Extract and re-inject the menu and area tables of mhfjmp.bin.")]
struct Cli {
    /// Working directory holding the input and output folders.
    #[arg(long, global = true, default_value = ".")]
    dir: PathBuf,

    /// Project file. Defaults to <dir>/mhfjmp.toml when it exists.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Record layout of the container (v1, v2).
    #[arg(long, global = true)]
    schema: Option<SchemaVersion>,

    /// Text encoding of the container strings (sjis, utf8, gb18030).
    #[arg(long, global = true)]
    lang: Option<Encoding>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the input and output folders.
    #[command(visible_alias = "gf")]
    GenerateFolders,
    /// Decode the input container into the menu and area CSV files.
    #[command(visible_alias = "e")]
    Extract,
    /// Encode the CSV files into a patched container.
    #[command(visible_alias = "i")]
    Inject,
}

fn load_config(cli: &Cli) -> Result<ProjectConfig> {
    let mut config = match &cli.config {
        Some(path) => ProjectConfig::load(path).with_context(|| format!("loading config: {}", path.display()))?,
        None => ProjectConfig::discover(&cli.dir).with_context(|| format!("loading config from {}", cli.dir.display()))?,
    };
    if let Some(schema) = cli.schema {
        config.schema = schema;
    }
    if let Some(nls) = cli.lang {
        config.nls = nls;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logger.level_filter.to_string()))
        .init();
    log::debug!("schema {}, nls {}", config.schema, config.nls);

    match cli.command {
        Command::GenerateFolders => commands::generate_folders(&config, &cli.dir),
        Command::Extract => commands::extract(&config, &cli.dir),
        Command::Inject => commands::inject(&config, &cli.dir),
    }
}
