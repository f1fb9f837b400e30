//! `mindhaven serve` — start the HTTP gateway.

use crate::runtime;
use mindhaven_config::AppConfig;
use mindhaven_gateway::GatewayState;
use std::sync::Arc;
use tracing::info;

pub async fn run(config: AppConfig, port_override: Option<u16>) -> anyhow::Result<()> {
    let port = port_override.unwrap_or(config.gateway.port);
    let host = config.gateway.host.clone();

    let runtime = runtime::build(&config);
    info!(
        personas = runtime.personas.len(),
        "Starting Mindhaven gateway"
    );

    let state = Arc::new(GatewayState {
        orchestrator: runtime.orchestrator,
        store: runtime.store,
        examples: runtime.examples.clone(),
        curator: runtime.examples,
        audit: runtime.audit,
        personas: runtime.personas,
        bearer_tokens: config.gateway.bearer_tokens.clone(),
    });

    mindhaven_gateway::serve(state, &host, port)
        .await
        .map_err(|e| anyhow::anyhow!("gateway failed: {e}"))?;
    Ok(())
}
