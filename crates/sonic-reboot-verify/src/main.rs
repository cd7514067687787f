//! reboot-verify - per-component reboot verifier
//!
//! Entry point: loads the configuration, runs the selected reboot cases
//! against the device and exits non-zero if any case failed.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sonic_reboot_verify::{
    ExpectedCount, RebootCase, RebootVerifier, ShellDevice, ShellTrafficGenerator, VerifyConfig,
};

/// Per-component reboot verifier
#[derive(Parser, Debug)]
#[command(name = "reboot-verify")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Case to run (repeatable): standby-controller-card, linecard, fabric.
    /// Runs all cases when omitted.
    #[arg(long = "case")]
    cases: Vec<RebootCase>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Expected number of controller cards (negative disables the check)
    #[arg(long, allow_negative_numbers = true)]
    num_controller_cards: Option<i32>,

    /// Expected number of line cards (negative disables the check)
    #[arg(long, allow_negative_numbers = true)]
    num_linecards: Option<i32>,

    /// Expected number of fabric components (negative disables the check)
    #[arg(long, allow_negative_numbers = true)]
    num_fabrics: Option<i32>,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<VerifyConfig> {
    let mut config = match &args.config {
        Some(path) => VerifyConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => VerifyConfig::default(),
    };
    let topology = &mut config.topology;
    if let Some(n) = args.num_controller_cards {
        topology.controller_cards = ExpectedCount(n);
    }
    if let Some(n) = args.num_linecards {
        topology.linecards = ExpectedCount(n);
    }
    if let Some(n) = args.num_fabrics {
        topology.fabrics = ExpectedCount(n);
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let config = load_config(&args)?;
    info!(
        address = %config.target.address,
        vendor = ?config.vendor,
        controller_cards = config.topology.controller_cards.0,
        linecards = config.topology.linecards.0,
        fabrics = config.topology.fabrics.0,
        "Starting reboot verification"
    );

    let cases = if args.cases.is_empty() {
        RebootCase::ALL.to_vec()
    } else {
        args.cases
    };

    let device = ShellDevice::new(config.target.clone());
    let traffic = ShellTrafficGenerator::from_config(&config.traffic);
    let mut verifier = RebootVerifier::new(&device, &config);
    if let Some(generator) = &traffic {
        verifier = verifier.with_traffic(generator);
    }

    let reports = verifier.run_cases(&cases).await;
    let mut all_passed = true;
    for report in &reports {
        println!("{}", report);
        all_passed &= !report.outcome.is_failed();
    }
    Ok(all_passed)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            error!("One or more reboot cases failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("reboot-verify failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
