//! Resources CLI - packer for the embedded asset store

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use resources::config::{self, ResourcesConfig};
use resources::ui::{self, Icons};
use resources::{AccessMode, AssetStore, ConsolePrompt, ImageFileLoader, TypePolicy};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "resources")]
#[command(version)]
#[command(about = "Embedded asset store - pack textures and shaders into a single SQLite file")]
#[command(long_about = r#"
Packs named, zlib-compressed resources into a single SQLite store that a
graphics application reads back at runtime.

Example usage:
  resources store texture ./brick.png brick
  resources store shader ./basic.vert basic_vertex vertex
  resources show texture brick
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the store file (overrides config and the platform default)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file into the store under a unique name
    Store {
        #[command(subcommand)]
        resource: StoreCommand,
    },

    /// Read a resource back from the store
    Show {
        #[command(subcommand)]
        resource: ShowCommand,
    },
}

#[derive(Subcommand)]
enum StoreCommand {
    /// Store an image file as a texture
    Texture {
        /// Image file (png, jpeg, bmp, tga)
        file: PathBuf,
        /// Unique texture name
        name: String,
    },

    /// Store a shader source file
    Shader {
        /// Shader source file
        file: PathBuf,
        /// Unique shader name
        name: String,
        /// Shader type, e.g. vertex or fragment
        #[arg(value_name = "TYPE")]
        shader_type: String,
        /// Create unknown shader types without asking
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ShowCommand {
    /// Print a texture's metadata
    Texture {
        /// Texture name
        name: String,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print a shader's source
    Shader {
        /// Shader name
        name: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let Some(command) = cli.command else {
        if Cli::command().print_help().is_ok() {
            println!();
        }
        return ExitCode::SUCCESS;
    };

    match run(command, cli.database.as_deref(), cli.config.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let declined = err
                .downcast_ref::<resources::Error>()
                .is_some_and(resources::Error::is_declined);
            if declined {
                ui::warn(&format!("Aborted: {:#}", err));
            } else {
                ui::error(&format!("Bad usage! Reason: {:#}", err));
            }
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, database: Option<&Path>, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = config::load_config(config_path)?.unwrap_or_default();
    let db_path = config.database_path(database);

    match command {
        Commands::Store { resource } => store(resource, &db_path, &config),
        Commands::Show { resource } => show(resource, &db_path),
    }
}

fn store(resource: StoreCommand, db_path: &Path, config: &ResourcesConfig) -> anyhow::Result<()> {
    ui::header(Icons::PACKAGE, &format!("Packing into {}", db_path.display()));

    match resource {
        StoreCommand::Texture { file, name } => {
            let store = AssetStore::open(db_path, AccessMode::Packer)?;
            tracing::info!("Storing texture {} as '{}'", file.display(), name);

            store
                .store_texture_file(&file, &name, &ImageFileLoader)
                .with_context(|| format!("storing texture '{}'", name))?;

            ui::success(&format!("Stored texture '{}'", name));
        }

        StoreCommand::Shader {
            file,
            name,
            shader_type,
            yes,
        } => {
            let policy = TypePolicy::from_confirm_all(yes || config.confirm_all_types);
            let store = AssetStore::open(db_path, AccessMode::Packer)?.with_type_policy(policy);
            tracing::info!(
                "Storing {} shader {} as '{}'",
                shader_type,
                file.display(),
                name
            );

            let mut prompt = ConsolePrompt::new();
            store
                .shaders()
                .store(&name, &file, &shader_type, &mut prompt)
                .with_context(|| format!("storing shader '{}'", name))?;

            ui::success(&format!("Stored {} shader '{}'", shader_type, name));
            ui::info("Shader types", &store.shaders().types()?.len().to_string());
        }
    }
    Ok(())
}

fn show(resource: ShowCommand, db_path: &Path) -> anyhow::Result<()> {
    let store = AssetStore::open(db_path, AccessMode::Reader)?;

    match resource {
        ShowCommand::Texture { name, format } => {
            let Some(texture) = store.textures().get(&name)? else {
                anyhow::bail!("no texture named '{}'", name);
            };

            if format == OutputFormat::Json {
                let data = serde_json::json!({
                    "name": name,
                    "width": texture.width,
                    "height": texture.height,
                    "components": texture.components,
                    "bytes": texture.pixels.len(),
                });
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                ui::header(Icons::IMAGE, &format!("Texture '{}'", name));
                println!(
                    "{}",
                    ui::metadata_table(&[
                        ("Width", texture.width.to_string()),
                        ("Height", texture.height.to_string()),
                        ("Components", texture.components.to_string()),
                        ("Size", ui::human_bytes(texture.pixels.len() as u64)),
                    ])
                );
            }
        }

        ShowCommand::Shader { name } => {
            let Some(source) = store.shaders().get(&name)? else {
                anyhow::bail!("no shader named '{}'", name);
            };
            print!("{}", source);
        }
    }
    Ok(())
}
