use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use vigil::{
    api::{ApiConfig, ApiState, spawn_api_server},
    client::{ControlClient, format_table},
    config::parse_definitions,
    monitor::MonitorId,
    plugins::Registries,
    supervisor::Supervisor,
    util::{get_config_dir, get_listen_addr, get_token},
};

#[derive(Debug, Clone, Parser)]
#[command(name = "vigil")]
#[command(about = "Health-check supervisor with pluggable probes, filters and actions", long_about = None)]
struct Args {
    /// Control plane address [env: VIGIL_LISTEN]
    #[arg(short = 's', long, value_name = "ADDR")]
    listen: Option<SocketAddr>,

    /// Directory of monitor definition files [env: VIGIL_CONFIG_DIR]
    #[arg(short, long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// More log output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the supervisor and its control plane
    Server,
    /// List registered monitors
    List,
    /// Register and start the monitors of a definitions file ("-" reads stdin)
    Register { file: String },
    /// Show details of a monitor
    Show { id: MonitorId },
    /// Start a stopped monitor
    Start { id: MonitorId },
    /// Stop a running monitor
    Stop { id: MonitorId },
    /// Stop and remove a monitor
    Unregister { id: MonitorId },
}

fn init(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let filter = filter::Targets::new().with_targets(vec![
        ("vigil", level),
        ("tower_http", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let listen = args.listen.unwrap_or_else(get_listen_addr);

    match args.command {
        Command::Server => {
            let config_dir = args.config_dir.unwrap_or_else(get_config_dir);
            serve(listen, config_dir).await
        }
        command => run_client(listen, command).await,
    }
}

async fn serve(listen: SocketAddr, config_dir: PathBuf) -> anyhow::Result<()> {
    let registries = Registries::with_builtins().context("failed to register plugins")?;
    let supervisor = Arc::new(Supervisor::new(registries));

    if config_dir.is_dir() {
        let count = supervisor.load_dir(&config_dir).await?;
        info!("{count} monitors loaded from {}", config_dir.display());
    } else {
        info!("{} does not exist, starting without monitors", config_dir.display());
    }

    let config = ApiConfig {
        bind_addr: listen,
        auth_token: get_token(),
        enable_cors: true,
    };
    spawn_api_server(config, ApiState::new(Arc::clone(&supervisor))).await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    info!("shutting down");
    supervisor.shutdown().await;
    Ok(())
}

fn read_source(file: &str) -> anyhow::Result<String> {
    if file == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("failed to read stdin")?;
        return Ok(content);
    }

    std::fs::read_to_string(file).with_context(|| format!("failed to read {file}"))
}

async fn run_client(listen: SocketAddr, command: Command) -> anyhow::Result<()> {
    let client = ControlClient::new(format!("http://{listen}"), get_token())?;

    match command {
        Command::Server => anyhow::bail!("server is not a client command"),
        Command::List => {
            let monitors = client.list().await?;
            print!("{}", format_table(&monitors));
        }
        Command::Register { file } => {
            let defs = parse_definitions(&read_source(&file)?)?;
            for def in &defs {
                let registered = client.register(def).await?;
                println!(
                    "{} is registered and started as monitor id={}",
                    registered.name, registered.id
                );
            }
        }
        Command::Show { id } => {
            let monitor = client.show(id).await?;
            println!("{}", serde_json::to_string_pretty(&monitor)?);
        }
        Command::Start { id } => {
            client.start(id).await?;
            println!("monitor {id} started");
        }
        Command::Stop { id } => {
            client.stop(id).await?;
            println!("monitor {id} stopped");
        }
        Command::Unregister { id } => {
            client.unregister(id).await?;
            println!("monitor {id} unregistered");
        }
    }

    Ok(())
}
