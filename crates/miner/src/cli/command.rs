use crate::acquisition::{ExecutableSource, LocalExecutable, XmrigInstaller};
use crate::checks::hardware::RequirementsChecker;
use crate::checks::issue::IssueReport;
use crate::checks::privilege::check_elevation;
use crate::cli::prompt;
use crate::console::Console;
use crate::device::usb::UsbEntry;
use crate::device::DeviceDetector;
use crate::error::MinerError;
use crate::operations::mining::{print_troubleshooting, MiningOperations};
use crate::state::MinerEnvironment;
use crate::supervisor::{LogSink, ProcessSupervisor};
use clap::{Parser, Subcommand};
use log::info;
use shared::models::{find_coin, COIN_CATALOG};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const APP_VERSION: &str = match option_env!("MIDAS_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

#[derive(Parser)]
#[command(author, version = APP_VERSION, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect the dongle and start mining
    Run {
        /// Coin to mine (prompted when omitted)
        #[arg(long)]
        coin: Option<String>,

        /// Wallet address that receives the payouts (prompted when omitted)
        #[arg(long, env = "MIDAS_WALLET")]
        wallet: Option<String>,

        /// Pool endpoint overriding the coin's default pool
        #[arg(long, env = "MIDAS_POOL_URL")]
        pool_url: Option<String>,

        /// Directory holding logs/, config/, data/ and the miner configuration
        #[arg(long, default_value = ".")]
        work_dir: PathBuf,

        /// Use this XMRig binary instead of downloading one
        #[arg(long)]
        xmrig_path: Option<PathBuf>,

        /// Seconds the miner gets to exit after SIGTERM before it is killed
        #[arg(long, default_value = "10")]
        grace_period_secs: u64,

        /// Skip system requirement checks (for development/testing)
        #[arg(long, default_value = "false")]
        skip_system_checks: bool,

        /// Do not require Administrator/root privileges
        #[arg(long, default_value = "false")]
        skip_privilege_check: bool,

        /// Log level
        #[arg(long)]
        log_level: Option<String>,
    },

    /// Run the system and device checks without mining
    Check {
        #[arg(long, default_value = ".")]
        work_dir: PathBuf,
    },

    /// List the supported coins
    Coins {},

    /// List every USB device, marking the Midas dongle
    Devices {},
}

impl Cli {
    pub async fn run(&self, cancellation_token: CancellationToken) -> Result<(), MinerError> {
        let result = execute_command(&self.command, cancellation_token).await;
        if let Err(err) = &result {
            Console::user_error(&err.to_string());
            if let Some(hint) = err.remediation() {
                Console::warning(hint);
            }
        }
        result
    }
}

/// Runs a blocking prompt; `None` when cancelled while waiting for input.
async fn ask<T, F>(cancellation_token: &CancellationToken, prompt: F) -> Result<Option<T>, MinerError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, MinerError> + Send + 'static,
{
    let answer = tokio::task::spawn_blocking(prompt);
    tokio::select! {
        answer = answer => answer
            .map_err(|e| MinerError::InvalidInput(e.to_string()))?
            .map(Some),
        _ = cancellation_token.cancelled() => Ok(None),
    }
}

fn run_preflight_checks(
    work_dir: &Path,
    skip_system_checks: bool,
    skip_privilege_check: bool,
) -> Result<(), MinerError> {
    let issues = IssueReport::new();

    if skip_privilege_check {
        Console::warning("Skipping privilege check");
    } else if !check_elevation(&issues) {
        issues.print_issues();
        return Err(MinerError::NotElevated(
            "raw USB access requires elevated privileges".to_string(),
        ));
    }

    if skip_system_checks {
        Console::warning("Skipping system requirement checks");
        return Ok(());
    }

    let checker = RequirementsChecker::new(work_dir, Some(issues.clone()));
    if !checker.meets_minimum() {
        issues.print_issues();
        return Err(MinerError::RequirementsNotMet);
    }
    Ok(())
}

pub async fn execute_command(
    command: &Commands,
    cancellation_token: CancellationToken,
) -> Result<(), MinerError> {
    match command {
        Commands::Run {
            coin,
            wallet,
            pool_url,
            work_dir,
            xmrig_path,
            grace_period_secs,
            skip_system_checks,
            skip_privilege_check,
            log_level: _,
        } => {
            // An unknown coin must fail before anything is written to work_dir.
            let preselected = coin.as_deref().map(find_coin).transpose()?;

            Console::section("MIDAS MINING SYSTEM");
            Console::info("Version", APP_VERSION);

            run_preflight_checks(work_dir, *skip_system_checks, *skip_privilege_check)?;

            let environment = MinerEnvironment::prepare(work_dir)?;
            let settings = environment.load_settings()?;
            settings.print();

            let supervisor = ProcessSupervisor::new(cancellation_token.clone())
                .with_grace_period(Duration::from_secs(*grace_period_secs));
            let mut operations =
                MiningOperations::new(DeviceDetector::for_platform(), environment, supervisor);

            let device = operations.detect_device()?;

            let coin = match preselected {
                Some(coin) => coin,
                None => {
                    let select = || prompt::select_coin(&mut io::stdin().lock(), &mut io::stdout());
                    match ask(&cancellation_token, select).await? {
                        Some(coin) => coin,
                        None => return Ok(()),
                    }
                }
            };

            let wallet = match wallet.as_deref().map(str::trim) {
                Some(wallet) if !wallet.is_empty() => wallet.to_string(),
                Some(_) => {
                    return Err(MinerError::InvalidInput(
                        "Wallet address cannot be empty".to_string(),
                    ))
                }
                None => {
                    let read = || prompt::read_wallet(&mut io::stdin().lock(), &mut io::stdout());
                    match ask(&cancellation_token, read).await? {
                        Some(wallet) => wallet,
                        None => return Ok(()),
                    }
                }
            };

            let config = operations.prepare(coin.id, &wallet, pool_url.as_deref())?;

            // Mining never touches the dongle.
            drop(device);

            let source: Box<dyn ExecutableSource> = match xmrig_path {
                Some(path) => Box::new(LocalExecutable::new(path)),
                None => Box::new(XmrigInstaller::new(operations.environment().install_dir())?),
            };

            let session = tokio::select! {
                session = operations.launch(coin.id, &wallet, &config, source.as_ref(), Arc::new(LogSink)) => session?,
                _ = cancellation_token.cancelled() => {
                    info!("Cancelled before the miner started");
                    return Ok(());
                }
            };

            if let Some(pid) = session.pid() {
                Console::info("Miner PID", &pid.to_string());
            }
            Console::success("Mining started. Press Ctrl-C to stop.");

            operations.supervise(session).await
        }
        Commands::Check { work_dir } => {
            Console::section("MIDAS SYSTEM CHECK");
            let issues = IssueReport::new();

            check_elevation(&issues);
            RequirementsChecker::new(work_dir, Some(issues.clone())).check();

            Console::title("Device Detection:");
            let mut detector = DeviceDetector::for_platform();
            let detection = detector.detect();
            // The error itself is reported once by `Cli::run`.
            match &detection {
                Ok(_) => Console::success("Midas dongle detected and responding"),
                Err(_) => print_troubleshooting(),
            }

            issues.print_issues();
            detection?;

            if issues.has_critical_issues() {
                return Err(MinerError::RequirementsNotMet);
            }
            Ok(())
        }
        Commands::Coins {} => {
            Console::title("Supported coins:");
            for (idx, coin) in COIN_CATALOG.iter().enumerate() {
                println!(
                    "{}. {} ({}) - {} - default pool {}",
                    idx + 1,
                    coin.id,
                    coin.symbol,
                    coin.family,
                    coin.default_pool()
                );
            }
            Ok(())
        }
        Commands::Devices {} => {
            let mut detector = DeviceDetector::for_platform();
            let target = detector.target();
            let devices = detector.enumerate();
            if let Some(err) = devices.error().cloned() {
                return Err(err.into());
            }

            Console::title("USB devices:");
            let mut found = false;
            for entry in devices {
                let id = entry.id();
                if id == target {
                    found = true;
                    Console::success(&format!("{id}  <- Midas dongle"));
                } else {
                    println!("  {id}");
                }
            }
            if !found {
                Console::warning(&format!("Midas dongle ({target}) not connected"));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_defaults() {
        let cli = Cli::try_parse_from(["midas-miner", "run", "--coin", "haven"]).unwrap();
        match cli.command {
            Commands::Run {
                coin,
                work_dir,
                grace_period_secs,
                skip_system_checks,
                xmrig_path,
                ..
            } => {
                assert_eq!(coin.as_deref(), Some("haven"));
                assert_eq!(work_dir, PathBuf::from("."));
                assert_eq!(grace_period_secs, 10);
                assert!(!skip_system_checks);
                assert!(xmrig_path.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_subcommands() {
        assert!(matches!(
            Cli::try_parse_from(["midas-miner", "coins"]).unwrap().command,
            Commands::Coins {}
        ));
        assert!(matches!(
            Cli::try_parse_from(["midas-miner", "devices"]).unwrap().command,
            Commands::Devices {}
        ));
        assert!(Cli::try_parse_from(["midas-miner", "run", "--grace-period-secs", "soon"]).is_err());
    }

    #[tokio::test]
    async fn test_run_rejects_unknown_coin_before_touching_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let work_dir = dir.path().to_str().unwrap();
        let cli = Cli::try_parse_from([
            "midas-miner",
            "run",
            "--coin",
            "DOGE",
            "--wallet",
            "w",
            "--skip-system-checks",
            "--skip-privilege-check",
            "--work-dir",
            work_dir,
        ])
        .unwrap();

        let result = execute_command(&cli.command, CancellationToken::new()).await;
        assert!(matches!(result, Err(MinerError::UnsupportedCoin(_))));
        assert!(!dir.path().join("config").exists());
        assert!(!dir.path().join("logs").exists());
        assert!(!dir.path().join("data").exists());
    }
}
