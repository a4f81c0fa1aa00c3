use addonkit::*;
use clap::{Parser, Subcommand};
use tracing::Level;

mod commands;

use commands::settings::{GetArgs, InitArgs, ListArgs, SetArgs};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.addonkit/addonkit.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty, json-line, psv
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show configuration and settings database status
    Config,

    /// Print the stored value of a setting
    Get(GetArgs),

    /// Save a setting
    Set(SetArgs),

    /// Seed a setting unless it already has a value
    Init(InitArgs),

    /// List stored settings
    List(ListArgs),

    /// Show the recorded versions of setup units
    SetupStatus,
}

fn main() {
    let cli = Cli::parse();

    let config = match AddonkitConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    if cli.debug {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Config => commands::config::run(&config, cli.format),
        Commands::Get(args) => commands::settings::run_get(&config, args, cli.format),
        Commands::Set(args) => commands::settings::run_set(&config, args),
        Commands::Init(args) => commands::settings::run_init(&config, args),
        Commands::List(args) => commands::settings::run_list(&config, args, cli.format),
        Commands::SetupStatus => commands::setup::run(&config, cli.format),
    };

    if let Err(e) = result {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}
