use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use console::Term;

/// Install the Ctrl+C handler and return the flag it sets.
///
/// The first Ctrl+C asks running syncs to finish the accounts already in
/// flight; the second exits immediately with status 130.
pub(crate) fn setup_shutdown_handler() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let requested = Arc::clone(&flag);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            return;
        }

        let is_tty = Term::stdout().is_term();
        if is_tty {
            eprintln!("\n\nShutdown requested, finishing accounts in flight...");
            eprintln!("Press Ctrl+C again to force quit.");
        } else {
            tracing::warn!("Shutdown requested, finishing accounts in flight");
        }

        requested.store(true, Ordering::SeqCst);

        // Wait for second Ctrl+C for force quit
        if tokio::signal::ctrl_c().await.is_ok() {
            if is_tty {
                eprintln!("Force quit!");
            }
            std::process::exit(130);
        }
    });

    flag
}
