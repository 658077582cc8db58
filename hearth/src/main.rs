use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use hearth::log_store::{JsonLinesLogStore, LogStore, MemoryLogStore};
use hearth::modules::site;
use hearth::{Config, Server, StaticFiles};

#[derive(Parser)]
#[command(name = "hearth")]
#[command(about = "Serves a static site and a handful of admin pages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run {
        #[arg(short, long, default_value_t = 8888)]
        port: u16,

        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,

        /// Where request logs are appended
        #[arg(long, default_value = "hearth-log.jsonl")]
        log_store: PathBuf,
    },
    /// Print every registered route
    Routes {
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("hearth=info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            port,
            config,
            log_store,
        } => {
            let config = Config::load_or_default(&config);
            info!("Starting hearth {} ({})", config.version, config.environment);

            let store: Arc<dyn LogStore> = match JsonLinesLogStore::open(&log_store) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    error!("{}; request logs will not outlive this process", e);
                    Arc::new(MemoryLogStore::new())
                }
            };

            let files = StaticFiles::from_env();
            info!("Serving files from {}", files.root().display());

            let (app, writer) = site(config, files, store);
            let server = Server::new(app).with_background(writer.run());

            if let Err(e) = server.start("0.0.0.0", port) {
                error!("{}", e);
                process::exit(1);
            }
        }
        Commands::Routes { config } => {
            let config = Config::load_or_default(&config);
            let (app, _writer) = site(config, StaticFiles::from_env(), Arc::new(MemoryLogStore::new()));

            for line in app.route_listing() {
                println!("{}", line);
            }
        }
    }
}
