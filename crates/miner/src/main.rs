use clap::Parser;
use shared::utils::signal::trigger_cancellation_on_signal;
use std::panic;
use tokio_util::sync::CancellationToken;

use midas_miner::{setup_logging, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(Some(&cli)) {
        eprintln!("Warning: Failed to initialize logging: {e}. Using default logging.");
    }

    panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .unwrap_or_else(|| panic::Location::caller());
        let message = match panic_info.payload().downcast_ref::<&str>() {
            Some(s) => *s,
            None => match panic_info.payload().downcast_ref::<String>() {
                Some(s) => s.as_str(),
                None => "Unknown panic payload",
            },
        };

        log::error!(
            "PANIC: '{}' at {}:{}",
            message,
            location.file(),
            location.line()
        );
    }));

    let cancellation_token = CancellationToken::new();
    let signal_handle = match trigger_cancellation_on_signal(cancellation_token.clone()) {
        Ok(handle) => handle,
        Err(e) => {
            log::error!("Failed to install signal handlers: {e}");
            std::process::exit(1);
        }
    };

    // The command owns the miner process and stops it itself on
    // cancellation, so it is awaited to completion rather than raced.
    let exit_code = match cli.run(cancellation_token).await {
        Ok(()) => 0,
        Err(e) => {
            log::error!("Command execution error: {e}");
            1
        }
    };

    signal_handle.abort();

    // A prompt may still be blocked on stdin; do not wait for it.
    std::process::exit(exit_code);
}
