//! `photon`: the thin binary wiring `photon-core` to a `clap` CLI. All
//! engine logic lives in the library; this crate only parses arguments,
//! initializes logging, dispatches to `photon_core::cli::commands`, and
//! maps the result to an exit code.

use clap::Parser;

use photon_core::cli::{Cli, Commands};
use photon_core::config::Settings;
use photon_core::logging;

fn main() {
    let cli = Cli::parse();

    let root = cli
        .path
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    let settings = Settings::load(&root).unwrap_or_default();
    logging::init(&settings.logging);

    let result = dispatch(cli);
    logging::shutdown();

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
    std::process::exit(0);
}

fn dispatch(cli: Cli) -> anyhow::Result<()> {
    use photon_core::cli::commands;

    let global_path = cli.path;
    match cli.command {
        Commands::Init => commands::init(global_path),
        Commands::Index { path } => commands::index(path.or(global_path)),
        Commands::Watch { path } => commands::watch(path.or(global_path)),
        Commands::Retrieve { query } => commands::retrieve(global_path, query),
        Commands::Run { goal } => commands::run(global_path, goal),
        Commands::Undo => commands::undo(global_path),
        Commands::Patches => commands::patches(global_path),
        Commands::Memory { action } => commands::memory(global_path, action),
        Commands::Attempt { action } => commands::attempt(global_path, action),
        Commands::Config => commands::config(global_path),
    }
}
