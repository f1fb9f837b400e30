//! `mindhaven status` — configuration summary.

use mindhaven_config::AppConfig;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    println!("Mindhaven {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Chat provider:");
    println!("  url:    {}", config.chat.api_url);
    println!("  model:  {}", config.chat.model);
    println!("  key:    {}", key_status(&config.chat.api_key));
    println!("Triage provider:");
    println!("  url:    {}", config.triage.api_url);
    println!("  model:  {}", config.triage.model);
    println!("  key:    {}", key_status(&config.triage.api_key));
    println!("Guard:");
    println!("  max message chars: {}", config.guard.max_message_chars);
    println!("Retrieval:");
    println!("  ttl:    {}s", config.retrieval.ttl_secs);
    println!("  top_k:  {}", config.retrieval.top_k);
    println!("Gateway:");
    println!("  listen: {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "  auth:   {}",
        if config.gateway.bearer_tokens.is_empty() {
            "disabled (no tokens configured)"
        } else {
            "bearer tokens"
        }
    );
    println!(
        "Personas: {}",
        if config.personas.is_empty() {
            "built-in default only".to_string()
        } else {
            config
                .personas
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        }
    );
    Ok(())
}

fn key_status(key: &Option<String>) -> &'static str {
    match key {
        Some(k) if !k.is_empty() => "configured",
        _ => "missing (triage degrades to default; chat requests will fail)",
    }
}
