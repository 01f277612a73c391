// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod input;
mod logger;

use std::env;
use std::str::FromStr;

use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use cloudwatch_logger::{config::LoggerConfig, Level, LoggerService};

#[tokio::main]
pub async fn main() {
    let log_level = env::var("CWL_AGENT_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());
    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .event_format(logger::Formatter)
        .with_writer(std::io::stderr)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match LoggerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let default_level = match env::var("CWL_PIPE_LEVEL") {
        Ok(level) => Level::from_str(&level).unwrap_or_else(|e| {
            error!("{}, using {}", e, Level::Info);
            Level::Info
        }),
        Err(_) => Level::Info,
    };

    let (service, handle) = match LoggerService::new(config) {
        Ok(pair) => pair,
        Err(e) => {
            error!("Unable to start logger service: {}", e);
            std::process::exit(1);
        }
    };
    let service_task = tokio::spawn(service.run());

    info!("Forwarding standard input, default level {}", default_level);

    let mut lines = BufReader::new(io::stdin()).lines();
    let mut line_number: u32 = 0;
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                line_number = line_number.saturating_add(1);
                if let Some(record) = input::parse_line(&line, line_number, default_level) {
                    handle.submit(record);
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read standard input: {}", e);
                break;
            }
        }
    }

    match handle.shutdown().await {
        Ok(outcome) => debug!("Final flush: {:?}", outcome),
        Err(e) => error!("Final flush failed: {}", e),
    }
    if let Err(e) = service_task.await {
        error!("Logger service task failed: {}", e);
    }
    info!("Forwarded {} lines", line_number);
}
