mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use itemshelf_core::config::{self, ShelfConfig};
use itemshelf_core::error::{Error, ErrorClass};
use itemshelf_core::Shelf;
use tracing_subscriber::EnvFilter;

/// itemshelf: a small catalog of named, categorized items with images
#[derive(Parser)]
#[command(name = "itemshelf", version, about)]
struct Cli {
    /// Path to a TOML config file (default: $ITEMSHELF_HOME/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the catalog database (overrides the config file)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Path to the image directory (overrides the config file)
    #[arg(long, global = true)]
    images: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the catalog and image directory, optionally installing the default image
    Init {
        /// Image served when a requested image is missing
        #[arg(long)]
        default_image: Option<PathBuf>,
    },
    /// Add an item with its image
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: String,
        /// Path to the image file
        #[arg(long)]
        image: PathBuf,
    },
    /// List all items
    Items {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one item
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Find items whose name contains a keyword (case-sensitive)
    Search {
        keyword: String,
        #[arg(long)]
        json: bool,
    },
    /// Fetch an image by name, falling back to the default image
    Image {
        /// `<sha256>.jpg`, or `<item-id>.jpg` with --item
        name: String,
        /// Treat the name's stem as an item id
        #[arg(long)]
        item: bool,
        /// Output file, or `-` for stdout
        #[arg(long, short)]
        out: PathBuf,
    },
    /// Show catalog status summary
    Status,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "itemshelf=debug,itemshelf_core=debug"
    } else {
        "itemshelf=info,itemshelf_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<ShelfConfig> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| config::default_home().join("config.toml"));
    let mut config = if cli.config.is_some() {
        ShelfConfig::load(&path)?
    } else {
        ShelfConfig::load_or_default(Some(&path))?
    };
    if let Some(catalog) = &cli.catalog {
        config.database_path = catalog.clone();
    }
    if let Some(images) = &cli.images {
        config.image_dir = images.clone();
    }
    Ok(config)
}

/// Map a failure to a process exit code so callers can tell bad input,
/// missing data, and transient conflicts apart.
fn exit_code(err: &anyhow::Error) -> u8 {
    let Some(err) = err.downcast_ref::<Error>() else {
        return 1;
    };
    match err.class() {
        ErrorClass::Validation | ErrorClass::InvalidArgument => 2,
        ErrorClass::NotFound => 3,
        ErrorClass::Timeout => 4,
        ErrorClass::Storage if err.is_retryable() => 75,
        ErrorClass::Storage | ErrorClass::Blob | ErrorClass::Config => 1,
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    tracing::debug!(
        catalog = %config.database_path.display(),
        images = %config.image_dir.display(),
        "opening shelf"
    );
    let shelf = Shelf::open(&config)?;

    match cli.command {
        Commands::Init { default_image } => commands::init::run(&shelf, default_image)?,
        Commands::Add {
            name,
            category,
            image,
        } => commands::add::run(&shelf, &name, &category, &image)?,
        Commands::Items { json } => commands::items::list(&shelf, json)?,
        Commands::Show { id, json } => commands::items::show(&shelf, id, json)?,
        Commands::Search { keyword, json } => commands::items::search(&shelf, &keyword, json)?,
        Commands::Image { name, item, out } => commands::image::run(&shelf, &name, item, &out)?,
        Commands::Status => commands::status::run(&shelf)?,
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}
