//! cli

use std::{path::PathBuf, sync::Arc};

use structopt::StructOpt;

use basalt_config::{config::Config, loaders::toml};
use basalt_node::actors::node;

use super::json_rpc_client;

/// Default configuration file looked up in the working directory
pub const CONFIG_DEFAULT_FILENAME: &str = "basalt.toml";

/// Basalt network
#[derive(Debug, StructOpt)]
pub struct Cli {
    /// `basalt cmd ...`
    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    #[structopt(name = "node", about = "Node operations")]
    Node {
        /// Path to the configuration file
        #[structopt(name = "config", long = "config", short = "c")]
        #[structopt(parse(from_os_str))]
        config: Option<PathBuf>,

        #[structopt(subcommand)]
        cmd: NodeCommand,
    },
}

#[derive(Debug, StructOpt)]
pub enum NodeCommand {
    #[structopt(name = "server", about = "Run the Basalt node server")]
    Server,
    #[structopt(name = "stats", about = "Print node status counters")]
    Stats,
    #[structopt(name = "mempool", about = "List the unconfirmed transaction pool")]
    Mempool,
    #[structopt(
        name = "submit",
        about = "Submit a transaction set from a JSON file to a running node"
    )]
    Submit {
        /// Path to a JSON file with an array of transactions
        #[structopt(name = "file", parse(from_os_str))]
        file: PathBuf,
    },
    #[structopt(
        name = "raw",
        about = "Forward JSON-RPC requests from stdin to a running node"
    )]
    Raw,
}

/// Dispatch a parsed command
pub fn exec(cmd: Command) -> Result<(), anyhow::Error> {
    match cmd {
        Command::Node { config, cmd } => {
            let config = Arc::new(load_config(config)?);
            match cmd {
                NodeCommand::Server => {
                    node::run(config, || {
                        ctrlc::set_handler(move || {
                            node::close();
                        })
                        .expect(
                            "Error setting handler for both SIGINT (Ctrl+C) and SIGTERM (kill)",
                        );
                    })?;

                    Ok(())
                }
                NodeCommand::Stats => json_rpc_client::stats(&config),
                NodeCommand::Mempool => json_rpc_client::mempool(&config),
                NodeCommand::Submit { file } => json_rpc_client::submit(&config, &file),
                NodeCommand::Raw => json_rpc_client::raw(&config),
            }
        }
    }
}

/// Load the configuration: the explicit `-c` path, the default file if
/// it exists, or the built-in defaults.
fn load_config(path: Option<PathBuf>) -> Result<Config, anyhow::Error> {
    match path {
        Some(path) => {
            log::info!("Reading configuration from {}", path.display());

            Ok(toml::from_file(path)?)
        }
        None => {
            let default = PathBuf::from(CONFIG_DEFAULT_FILENAME);
            if default.exists() {
                log::info!("Reading configuration from {}", default.display());

                Ok(toml::from_file(default)?)
            } else {
                Ok(Config::default())
            }
        }
    }
}
