// Copyright 2025 Fanout Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Fanout CLI Entry Point
//!
//! Starts the three Fanout roles and submits builds.
//!
//! ## Usage
//!
//! ```bash
//! # Start two workers
//! fanout worker -b 0.0.0.0:9001
//! fanout worker -b 0.0.0.0:9002 --compiler clang
//!
//! # Start a coordinator in front of them
//! fanout coordinator -b 0.0.0.0:9000 -w 127.0.0.1:9001 -w 127.0.0.1:9002
//!
//! # Submit a build (prints the compiler output)
//! fanout build 127.0.0.1:9000 src/main.c -l C
//!
//! # Balance HTTP traffic over three backends
//! fanout balancer -b 0.0.0.0:8080 \
//!   -B http://10.0.0.1:80 \
//!   -B http://10.0.0.2:80 \
//!   -B http://10.0.0.3:80
//!
//! # Dispatch counters of a coordinator, as JSON
//! fanout stats 127.0.0.1:9000
//! ```

use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;
use fanout_balancer::{Balancer, BalancerConfig};
use fanout_client::BuildClient;
use fanout_common::transport::TcpServer;
use fanout_common::{BuildTask, INFO_METHOD, METRICS_METHOD};
use fanout_coordinator::{BuildCoordinator, CoordinatorConfig};
use fanout_pool::HealthCheckConfig;
use fanout_worker::{CommandCompiler, CompilerConfig, Worker};

#[derive(FromArgs)]
/// Fanout - round-robin build dispatch and HTTP load balancing
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Worker(WorkerArgs),
    Coordinator(CoordinatorArgs),
    Balancer(BalancerArgs),
    Build(BuildArgs),
    Stats(StatsArgs),
}

/// Arguments for starting a build worker.
#[derive(FromArgs)]
#[argh(subcommand, name = "worker")]
/// start a build worker
struct WorkerArgs {
    /// address to bind the worker's RPC server to
    #[argh(option, short = 'b', default = "\"0.0.0.0:9001\".into()")]
    bind: String,

    /// compiler to run for every language
    ///
    /// By default the compiler is chosen by language: gcc for C, g++ for
    /// C++, clang for Objective-C, and gcc for anything else.
    #[argh(option)]
    compiler: Option<String>,
}

/// Arguments for starting a build coordinator.
///
/// # Example
///
/// ```bash
/// fanout coordinator -b 0.0.0.0:9000 \
///   -w 127.0.0.1:9001 \
///   -w 127.0.0.1:9002 \
///   --connect-timeout-ms 2000
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "coordinator")]
/// start a build coordinator
struct CoordinatorArgs {
    /// address to bind the coordinator's RPC server to
    #[argh(option, short = 'b', default = "\"0.0.0.0:9000\".into()")]
    bind: String,

    /// worker address, repeat for each worker in rotation order
    #[argh(option, short = 'w', long = "worker")]
    workers: Vec<String>,

    /// bound on connecting to a worker, in milliseconds
    #[argh(option, long = "connect-timeout-ms", default = "5000")]
    connect_timeout_ms: u64,

    /// bound on a whole worker call, in milliseconds (unbounded if unset)
    #[argh(option, long = "call-timeout-ms")]
    call_timeout_ms: Option<u64>,
}

/// Arguments for starting the HTTP balancer.
///
/// # Health Checking
///
/// Every backend is probed with `GET <health path>` on a fixed interval.
/// A refused connection, a timeout or a 5xx status takes the backend out of
/// rotation until a later probe succeeds.
#[derive(FromArgs)]
#[argh(subcommand, name = "balancer")]
/// start the HTTP balancer
struct BalancerArgs {
    /// address to bind the balancer's HTTP server to
    #[argh(option, short = 'b', default = "\"0.0.0.0:8080\".into()")]
    bind: String,

    /// backend URL, repeat for each backend in rotation order
    #[argh(option, short = 'B', long = "backend")]
    backends: Vec<String>,

    /// interval between health check rounds, in milliseconds
    #[argh(option, long = "health-check-interval-ms", default = "1000")]
    health_check_interval_ms: u64,

    /// timeout for each health probe, in milliseconds
    #[argh(option, long = "health-check-timeout-ms", default = "2000")]
    health_check_timeout_ms: u64,

    /// path requested by the health probe
    #[argh(option, long = "health-path", default = "\"/\".into()")]
    health_path: String,

    /// treat every backend as healthy instead of probing
    #[argh(switch, long = "noop-health-check")]
    noop_health_check: bool,
}

/// Arguments for submitting one build.
///
/// Prints the output text (compiler output and marker line) to stdout.
#[derive(FromArgs)]
#[argh(subcommand, name = "build")]
/// submit a build task to a coordinator or worker
struct BuildArgs {
    /// coordinator or worker address
    #[argh(positional)]
    server_address: String,

    /// source file or directory, as seen by the worker
    #[argh(positional)]
    source: String,

    /// language tag of the source
    #[argh(option, short = 'l', long = "language", default = "\"C\".into()")]
    language: String,
}

/// Arguments for reading server counters.
#[derive(FromArgs)]
#[argh(subcommand, name = "stats")]
/// print a coordinator's dispatch counters as JSON
struct StatsArgs {
    /// coordinator or worker address
    #[argh(positional)]
    server_address: String,

    /// print server type, version and uptime instead
    #[argh(switch)]
    info: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // build and stats print to stdout; keep it clean
    if !matches!(cli.command, Commands::Build(_) | Commands::Stats(_)) {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Commands::Worker(args) => run_worker(args).await,
        Commands::Coordinator(args) => run_coordinator(args).await,
        Commands::Balancer(args) => run_balancer(args).await,
        Commands::Build(args) => run_build(args).await,
        Commands::Stats(args) => run_stats(args).await,
    }
}

async fn run_worker(args: WorkerArgs) -> Result<()> {
    let config = match args.compiler {
        Some(program) => {
            tracing::info!("Compiling every language with {}", program);
            CompilerConfig::single(program)
        }
        None => CompilerConfig::default(),
    };

    let server = TcpServer::new(&args.bind).await?;
    Worker::new(CommandCompiler::new(config)).serve(server).await?;
    Ok(())
}

async fn run_coordinator(args: CoordinatorArgs) -> Result<()> {
    tracing::info!("Workers: {:?}", args.workers);

    let config = CoordinatorConfig {
        connect_timeout: Duration::from_millis(args.connect_timeout_ms),
        call_timeout: args.call_timeout_ms.map(Duration::from_millis),
    };
    let coordinator = BuildCoordinator::new(args.workers, config)?;

    let server = TcpServer::new(&args.bind).await?;
    std::sync::Arc::new(coordinator).serve(server).await?;
    Ok(())
}

async fn run_balancer(args: BalancerArgs) -> Result<()> {
    tracing::info!("Backends: {:?}", args.backends);

    if args.noop_health_check {
        tracing::info!("Health probing disabled, all backends stay in rotation");
    }

    let config = BalancerConfig {
        health: HealthCheckConfig {
            interval: Duration::from_millis(args.health_check_interval_ms),
            timeout: Duration::from_millis(args.health_check_timeout_ms),
        },
        health_path: args.health_path,
        noop_health_check: args.noop_health_check,
        ..BalancerConfig::default()
    };
    let balancer = Balancer::new(&args.backends, config)?;

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", args.bind, e))?;
    balancer.run(listener).await?;
    Ok(())
}

async fn run_build(args: BuildArgs) -> Result<()> {
    let client = BuildClient::new(&args.server_address);
    let response = client
        .build(&BuildTask::new(args.language, args.source))
        .await?;

    println!("{}", response.output);
    Ok(())
}

async fn run_stats(args: StatsArgs) -> Result<()> {
    let method = if args.info { INFO_METHOD } else { METRICS_METHOD };
    let client = BuildClient::new(&args.server_address);
    let result = client.call(method, serde_json::json!({})).await?;

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
