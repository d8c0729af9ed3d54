//! `parley talk`: run the conversation until interrupted.

use std::path::Path;
use std::sync::Arc;

use parley_agent::ConversationLoop;
use parley_core::sink::StdoutSink;
use parley_providers::OllamaProvider;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::TalkArgs;

pub async fn run(config_path: &Path, args: TalkArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path, &args.target)?;
    if let Some(model) = args.model {
        config.model = model;
        config.validate()?;
    }
    debug!(endpoint = %config.endpoint, model = %config.model, "Configuration resolved");

    let provider = OllamaProvider::new(
        &config.endpoint,
        config.connect_timeout(),
        config.read_timeout(),
    )?;
    let conversation = ConversationLoop::from_config(&config, Arc::new(provider))?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let mut sink = StdoutSink::new();
    let exit = conversation.run(&cancel, &mut sink).await;
    debug!(turns = exit.turns, "Exiting");

    Ok(())
}

/// Cancel `token` on Ctrl+C (or SIGTERM on unix). Does nothing else.
async fn cancel_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Could not register SIGTERM handler");
                wait_for_ctrl_c().await;
                token.cancel();
                return;
            }
        };

        tokio::select! {
            () = wait_for_ctrl_c() => info!("Received Ctrl+C, stopping"),
            _ = sigterm.recv() => info!("Received SIGTERM, stopping"),
        }
    }

    #[cfg(not(unix))]
    {
        wait_for_ctrl_c().await;
        info!("Received Ctrl+C, stopping");
    }

    token.cancel();
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
