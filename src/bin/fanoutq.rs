//! fanoutq broker daemon.
//!
//!  $ fanoutq                      # defaults, listens on 127.0.0.1:3000
//!  $ FANOUTQ_CONFIG=my.toml fanoutq

use std::path::Path;
use std::process;

use fanoutq::logging::init_logging;
use fanoutq::{load_config, start_broker, Config};

#[tokio::main]
async fn main() {
    init_logging();

    let path = std::env::var("FANOUTQ_CONFIG").unwrap_or_else(|_| "fanoutq.toml".to_string());
    let config: Config = if Path::new(&path).exists() {
        match load_config(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("[FATAL] Failed to load config {path}: {e}");
                process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    if let Err(e) = start_broker(config).await {
        eprintln!("[FATAL] Broker crashed: {e}");
        process::exit(1);
    }
}
