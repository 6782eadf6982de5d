#![deny(rust_2018_idioms)]
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]

use std::process::exit;

use structopt::StructOpt;

mod cli;
mod json_rpc_client;

fn main() {
    // Init app logger. `RUST_LOG=debug` for the full actor chatter.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = cli::Cli::from_args();
    if let Err(e) = cli::exec(args.cmd) {
        log::error!("{}", e);
        exit(1);
    }
}
