// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the storefront project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the storefront web frontend

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use storefront::config::{output_config_schema, Config};
use storefront::web::start_server;

/// Web storefront with OIDC sign-in and admin monitoring
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Web server port, overrides the configuration file
    #[arg(short = 'p', long)]
    web_port: Option<u16>,

    /// Web server address, overrides the configuration file
    #[arg(short, long)]
    web_address: Option<String>,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    show_config_schema: bool,
}

#[rocket::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.show_config_schema {
        return output_config_schema();
    }

    let mut config = Config::from_file(&args.config)?;
    config.apply_args(args.web_port, args.web_address);

    println!(
        "Storefront listening on {}:{}",
        config.server.address, config.server.port
    );
    start_server(&config).await
}
