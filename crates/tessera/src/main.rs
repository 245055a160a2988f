use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info};

use tessera_core::kernel::constants::APP_NAME;
use tessera_core::{LoaderConfig, ManifestLoader, ModuleLoader, ModuleValue, Result};

/// Tessera: start and stop a graph of interdependent modules
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List module names in registration order
    List {
        /// A manifest file or a directory of manifests
        path: PathBuf,
        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },
    /// Print the start order as "rank name" lines
    Plan {
        path: PathBuf,
        #[arg(short, long)]
        recursive: bool,
    },
    /// Start every module, print the resolved values, then stop them
    Run {
        path: PathBuf,
        #[arg(short, long)]
        recursive: bool,
        /// Loader configuration file (JSON, TOML or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    if let Err(e) =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).try_init()
    {
        eprintln!("Failed to initialize env_logger: {}", e);
    }

    match execute(args.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{} failed: {}", APP_NAME, e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::List { path, recursive } => {
            let loader = load(&path, recursive, LoaderConfig::default())?;
            for name in loader.list() {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Plan { path, recursive } => {
            let loader = load(&path, recursive, LoaderConfig::default())?;
            for (name, rank) in loader.plan()? {
                println!("{} {}", rank, name);
            }
            Ok(())
        }
        Commands::Run {
            path,
            recursive,
            config,
        } => {
            let config = match config {
                Some(config_path) => LoaderConfig::from_path(&config_path)?,
                None => LoaderConfig::default(),
            };
            let loader = load(&path, recursive, config)?;
            run(&loader).await
        }
    }
}

fn load(path: &Path, recursive: bool, config: LoaderConfig) -> Result<ModuleLoader> {
    let loader = ModuleLoader::with_config(config);
    let manifests = ManifestLoader::with_builtin_factories();
    if path.is_dir() {
        manifests.register_directory(&loader, path, recursive)?;
    } else {
        manifests.register_file(&loader, path)?;
    }
    info!("Loaded {} modules from {}", loader.len(), path.display());
    Ok(loader)
}

async fn run(loader: &ModuleLoader) -> Result<()> {
    let started = loader.start().await;
    if started.is_ok() {
        for name in loader.list() {
            let value = loader.resolve(&name)?.await?;
            println!("{} = {}", name, render(value.as_ref()));
        }
    }

    // Stop even after a failed start so started modules are torn down.
    let stopped = loader.stop()?.await;
    started?;
    stopped
}

fn render(value: Option<&ModuleValue>) -> String {
    match value {
        None => "null".to_string(),
        Some(value) => match value.downcast_ref::<serde_json::Value>() {
            Some(json) => json.to_string(),
            None => "<opaque>".to_string(),
        },
    }
}
