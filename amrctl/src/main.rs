use std::io;
use std::io::Write;

use clap::Parser;
use eyre::Result;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{filter::EnvFilter, fmt};

use amrctl::{download_all_results, Config, Opts};
use irida_client::{compute_bounds, IridaClient, Session};

fn main() {
    let opts = Opts::parse();

    // Initialise logging.
    //
    let fmt = fmt::layer().with_target(false).compact();

    // -v/-vv raise the default level, the environment still wins.
    //
    let default = match opts.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry().with(filter).with(fmt).init();

    // All fatal classes (config, auth, unknown project, bad date range)
    // land here and exit 1.
    //
    if let Err(err) = run(&opts) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(opts: &Opts) -> Result<()> {
    let cfg = Config::load(&opts.config)?;

    // Validate the date window before asking for credentials.
    //
    let (from_ms, to_ms) = compute_bounds(opts.from_date.as_deref(), opts.to_date.as_deref())?;

    let username = match &opts.username {
        Some(username) => username.clone(),
        None => prompt("Enter your IRIDA username: ")?,
    };
    let password = match &opts.password {
        Some(password) => password.clone(),
        None => rpassword::prompt_password("Enter your IRIDA password: ")?,
    };

    info!("Connecting to IRIDA API...");
    let session = Session::new(
        &cfg.base_url,
        &cfg.client_id,
        &cfg.client_secret,
        &username,
        &password,
    )?;
    info!("Successfully connected to IRIDA API.");

    let mut client = IridaClient::new(session);
    download_all_results(&mut client, opts, from_ms, to_ms)
}

fn prompt(msg: &str) -> Result<String> {
    print!("{msg}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
