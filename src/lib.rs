pub mod config;
pub mod service;
pub mod vocabulary;
pub mod classifier;
pub mod llm;
pub mod extraction;
pub mod discriminator;
pub mod session;
pub mod knowledge;
pub mod resources;
pub mod console;

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() {
    init_tracing();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    if let Err(e) = console::launch() {
        tracing::error!(error = %e, "Symptom triage exited with error");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
