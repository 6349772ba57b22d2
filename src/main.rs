//! nodeprep - main entry point

use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, prelude::*};

use nodeprep::cli::Cli;
use nodeprep::{BuildConfig, BuildError, Builder, NpmInstaller, run_rules};

/// Initialize logging: stderr, no timestamps, `RUST_LOG` overrides `info`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .try_init();
}

fn main() {
    init_tracing();

    // Ensures an interrupted install does not leave npm running
    if let Err(e) = nodeprep::process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed: {:?}", cli);

    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        std::process::exit(e.exit_code());
    }

    println!("Done.");
}

fn run(cli: Cli) -> Result<(), BuildError> {
    let platform = cli.platform.resolve();
    let config = BuildConfig::discover(&cli.root, cli.config.as_deref())
        .map_err(|e| BuildError::config(format!("{:#}", e)))?;

    let path_list = std::env::var("PATH").ok();
    let installer = NpmInstaller::from_config(&config, platform, path_list.as_deref());

    let mut builder = Builder::new(&cli.root, platform, config, installer).dry_run(cli.dry_run);
    run_rules(&mut builder, &cli.rules)?;
    Ok(())
}
