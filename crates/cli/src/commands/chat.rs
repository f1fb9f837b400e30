//! `mindhaven chat` — one message through the pipeline, reply to stdout.

use crate::runtime;
use mindhaven_config::AppConfig;
use mindhaven_pipeline::{ChatStreamEvent, TurnRequest, TurnResponse};
use std::io::Write;

pub async fn run(
    config: AppConfig,
    message: String,
    persona_id: Option<String>,
) -> anyhow::Result<()> {
    let runtime = runtime::build(&config);

    let persona = match persona_id.as_deref() {
        Some(id) => runtime
            .personas
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown persona: {id}"))?,
        None => mindhaven_core::persona::Persona::default_counselor(),
    };

    let request = TurnRequest {
        conversation_id: None,
        user_id: "cli".into(),
        persona,
        message,
        history: Vec::new(),
    };

    match runtime.orchestrator.handle_turn(request).await? {
        TurnResponse::Blocked { content, reason } => {
            println!("{content}");
            eprintln!("(blocked: {reason})");
        }
        TurnResponse::Stream { mut rx, .. } => {
            let mut stdout = std::io::stdout();
            while let Some(event) = rx.recv().await {
                match event {
                    ChatStreamEvent::Chunk { content } => {
                        print!("{content}");
                        stdout.flush().ok();
                    }
                    ChatStreamEvent::Done { metadata, .. } => {
                        println!();
                        eprintln!(
                            "(route: {}, safety: {}, emotion: {} {})",
                            metadata.route.as_str(),
                            metadata.safety.label.as_str(),
                            metadata.emotion.label.as_str(),
                            metadata.emotion.score,
                        );
                    }
                    ChatStreamEvent::Error { message } => {
                        anyhow::bail!("turn failed: {message}");
                    }
                }
            }
        }
    }

    Ok(())
}
