use crate::acquisition::ExecutableSource;
use crate::console::Console;
use crate::device::usb::UsbBus;
use crate::device::{DetectedDevice, DeviceDetector};
use crate::error::MinerError;
use crate::state::MinerEnvironment;
use crate::supervisor::{LaunchRequest, MiningSession, OutputSink, ProcessSupervisor};
use log::debug;
use shared::models::{synthesize, MiningConfig};
use std::sync::Arc;

pub fn print_troubleshooting() {
    Console::title("Device initialization failed. Troubleshooting steps:");
    println!("1. Ensure device is properly connected");
    println!("2. Check Windows Device Manager");
    println!("3. Reinstall WinUSB driver using Zadig");
    println!("4. Run program as Administrator");
}

pub struct MiningOperations<B: UsbBus> {
    detector: DeviceDetector<B>,
    environment: MinerEnvironment,
    supervisor: ProcessSupervisor,
}

impl<B: UsbBus> MiningOperations<B> {
    pub fn new(
        detector: DeviceDetector<B>,
        environment: MinerEnvironment,
        supervisor: ProcessSupervisor,
    ) -> Self {
        Self {
            detector,
            environment,
            supervisor,
        }
    }

    pub fn environment(&self) -> &MinerEnvironment {
        &self.environment
    }

    pub fn detect_device(&mut self) -> Result<DetectedDevice<B>, MinerError> {
        Console::title("Device Detection:");

        match self.detector.detect() {
            Ok(device) => {
                Console::success("Midas device successfully initialized");
                if !self.detector.driver_verification_supported() {
                    Console::warning("Driver binding cannot be verified on this platform");
                }
                Console::info("Vendor ID", &format!("0x{:04X}", device.vendor_id()));
                Console::info("Product ID", &format!("0x{:04X}", device.product_id()));
                Ok(device)
            }
            Err(err) => {
                Console::user_error(&err.to_string());
                print_troubleshooting();
                Err(err.into())
            }
        }
    }

    /// Builds the miner configuration. Nothing is written or downloaded, so
    /// an unsupported coin fails here without side effects.
    pub fn prepare(
        &self,
        coin: &str,
        wallet: &str,
        pool_url: Option<&str>,
    ) -> Result<MiningConfig, MinerError> {
        let config = synthesize(coin, wallet, pool_url)?;
        debug!(
            "Prepared {coin} configuration for pool {}",
            config.pool_url().unwrap_or_default()
        );
        Ok(config)
    }

    /// Resolves the miner binary, writes the configuration artifact and
    /// starts the miner process.
    pub async fn launch(
        &self,
        coin: &str,
        wallet: &str,
        config: &MiningConfig,
        source: &dyn ExecutableSource,
        sink: Arc<dyn OutputSink>,
    ) -> Result<MiningSession, MinerError> {
        if self.supervisor.is_active() {
            return Err(MinerError::SessionAlreadyActive);
        }

        let executable = source.resolved_executable_path().await?;
        let config_artifact = self.environment.write_config_artifact(config)?;
        let pool_url = config.pool_url().unwrap_or_default().to_string();

        Console::progress(&format!("Starting {coin} mining on {pool_url}..."));
        self.supervisor.start(
            LaunchRequest {
                executable,
                config_artifact,
                coin: coin.to_string(),
                wallet: wallet.to_string(),
                pool_url,
            },
            sink,
        )
    }

    /// Waits for the session to end and reports how it ended.
    pub async fn supervise(&self, session: MiningSession) -> Result<(), MinerError> {
        match session.wait().await {
            Ok(()) => {
                Console::success("Mining stopped");
                Ok(())
            }
            Err(err) => {
                Console::user_error(&err.to_string());
                if !err.tail().is_empty() {
                    Console::title("Last miner output:");
                    for line in err.tail() {
                        println!("  {line}");
                    }
                }
                Err(err.into())
            }
        }
    }
}
