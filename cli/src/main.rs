use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use reminders_cli::{render_listing, web};
use reminders_core::{
    remind, CredentialProvider, OAuthProvider, RemindersClient, RemindersConfig,
    StaticTokenProvider,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reminders")]
#[command(about = "Create, list and delete reminders from the command line")]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use this bearer token instead of the stored OAuth credentials
    #[arg(long, global = true, env = "REMINDERS_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Send requests to another host, e.g. a local mock service
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a reminder
    Add {
        /// What to be reminded of
        title: String,
        /// When, in plain English ("tomorrow 8am", "next friday 18:00")
        #[arg(required = true, num_args = 1..)]
        time: Vec<String>,
    },
    /// Show a single reminder
    Get {
        id: String,
    },
    /// Delete a reminder
    Delete {
        id: String,
    },
    /// List recently created reminders, earliest due first
    List {
        /// How many reminders to fetch
        #[arg(short = 'n', long, default_value_t = 20)]
        count: u32,
        /// Only reminders created before this Unix time in milliseconds
        #[arg(long, default_value_t = 0)]
        before: i64,
    },
    /// Serve the web front end
    Serve {
        #[arg(long, default_value = "localhost")]
        host: String,
        #[arg(short, long, default_value_t = 5000)]
        port: u16,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Quiet logging by default, use RUST_LOG=info for verbose
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config_path = args.config.unwrap_or_else(RemindersConfig::default_path);
    let mut config = RemindersConfig::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    if let Some(base_url) = &args.base_url {
        config = config.with_base_url(base_url);
    }
    let config = Arc::new(config);

    let provider: Arc<dyn CredentialProvider> = match args.access_token {
        Some(token) => Arc::new(StaticTokenProvider::new(token)),
        None => Arc::new(OAuthProvider::new(config.clone())),
    };

    let connect = || RemindersClient::connect(config.clone(), provider.as_ref());
    match args.command {
        Command::Add { title, time } => {
            let reminder = remind(&connect()?, &title, &time.join(" "), Local::now())?;
            println!("Reminder set successfully:");
            println!("{reminder}");
        }
        Command::Get { id } => {
            println!("{}", connect()?.get(&id)?);
        }
        Command::Delete { id } => {
            connect()?.delete(&id)?;
            println!("Deleted reminder {id}");
        }
        Command::List { count, before } => {
            print!("{}", render_listing(connect()?.list(count, before)?));
        }
        Command::Serve { host, port } => {
            let addr = resolve(&host, port)?;
            let state = web::AppState::new(config.clone(), provider.clone());
            let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
            runtime
                .block_on(web::serve(addr, state))
                .context("web server failed")?;
        }
    }
    Ok(())
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("resolving {host}:{port}"))?
        .next()
        .with_context(|| format!("no address for {host}:{port}"))
}
