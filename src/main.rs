use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::rc::Rc;
use todo_lists::{App, Config, Profile, SqliteStore, cli::{self, Cli, Commands}};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev {
        Profile::Dev
    } else {
        Profile::Prod
    };

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_path(&PathBuf::from(path), profile)?,
        None => Config::load_with_profile(profile)?,
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let store = SqliteStore::open(&config.get_storage_path())?;
    let mut app = App::open(Rc::new(store))?;

    let command = cli.command.unwrap_or(Commands::Show { list: None });
    cli::run(command, &mut app, &config)?;

    Ok(())
}
