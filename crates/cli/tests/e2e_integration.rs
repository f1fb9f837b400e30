//! End-to-end tests for the Mindhaven safety-and-routing pipeline.
//!
//! These exercise the full turn flow — guard, triage, retrieval, prompt
//! composition, generation, output guard, persistence — against scripted
//! providers, asserting the externally observable contract.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use mindhaven_core::error::ProviderError;
use mindhaven_core::guard::InputBlockReason;
use mindhaven_core::message::Role;
use mindhaven_core::persona::Persona;
use mindhaven_core::provider::{
    ChatProvider, ChatRequest, TriageProvider, TriageRequest,
};
use mindhaven_core::store::MessageStore;
use mindhaven_core::triage::Route;
use mindhaven_guard::{GuardAudit, InputGuard, OutputGuard};
use mindhaven_memory::{InMemoryExampleStore, InMemoryMessageStore, KeywordMemoryManager};
use mindhaven_pipeline::{ChatStreamEvent, TurnOrchestrator, TurnRequest, TurnResponse};
use mindhaven_retrieval::{ExampleCache, SystemClock};
use mindhaven_triage::TriageClassifier;

// ── Scripted providers ───────────────────────────────────────────────────

/// Chat provider returning a fixed reply and counting calls.
struct ScriptedChat {
    reply: String,
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl ChatProvider for ScriptedChat {
    fn name(&self) -> &str {
        "e2e-chat"
    }

    async fn complete(&self, _request: ChatRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

/// Triage provider returning scripted JSON and counting calls.
struct ScriptedTriage {
    response: String,
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl TriageProvider for ScriptedTriage {
    fn name(&self) -> &str {
        "e2e-triage"
    }

    async fn classify(&self, _request: TriageRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

struct Stack {
    orchestrator: TurnOrchestrator,
    store: Arc<InMemoryMessageStore>,
    examples: Arc<InMemoryExampleStore>,
    chat_calls: Arc<AtomicUsize>,
    triage_calls: Arc<AtomicUsize>,
    audit: Arc<GuardAudit>,
}

fn stack(triage_json: &str, chat_reply: &str) -> Stack {
    let chat_calls = Arc::new(AtomicUsize::new(0));
    let triage_calls = Arc::new(AtomicUsize::new(0));
    let store = Arc::new(InMemoryMessageStore::new());
    let examples = Arc::new(InMemoryExampleStore::new());
    let audit = Arc::new(GuardAudit::new());

    let orchestrator = TurnOrchestrator::new(
        Arc::new(InputGuard::new(2000)),
        Arc::new(OutputGuard::new()),
        audit.clone(),
        Arc::new(TriageClassifier::new(
            Arc::new(ScriptedTriage {
                response: triage_json.into(),
                calls: triage_calls.clone(),
            }),
            512,
            6,
        )),
        Arc::new(ExampleCache::new(examples.clone(), 600, Arc::new(SystemClock))),
        Arc::new(KeywordMemoryManager::new()),
        store.clone(),
        Arc::new(ScriptedChat {
            reply: chat_reply.into(),
            calls: chat_calls.clone(),
        }),
    )
    .with_top_k(3);

    Stack {
        orchestrator,
        store,
        examples,
        chat_calls,
        triage_calls,
        audit,
    }
}

fn turn(message: &str) -> TurnRequest {
    TurnRequest {
        conversation_id: None,
        user_id: "e2e-user".into(),
        persona: Persona::default_counselor(),
        message: message.into(),
        history: Vec::new(),
    }
}

async fn run_to_completion(
    response: TurnResponse,
) -> (String, Vec<ChatStreamEvent>, String) {
    let TurnResponse::Stream {
        conversation_id,
        mut rx,
    } = response
    else {
        panic!("Expected a streamed turn");
    };

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    let text: String = events
        .iter()
        .filter_map(|e| match e {
            ChatStreamEvent::Chunk { content } => Some(content.as_str()),
            _ => None,
        })
        .collect();
    (conversation_id, events, text)
}

const CRISIS_TRIAGE: &str = r#"{"safety_level":"crisis","safety_reasoning":"明确表达意图且已准备手段","emotion":{"label":"悲伤","score":9},"route":"crisis","state_reasoning":"危机状态","assessment_stage":null}"#;

const CRISIS_REPLY: &str = "我现在非常担心你的安全。你并不孤单，请立刻拨打心理援助热线 400-161-9995（24小时），\
或者联系你信任的人陪在你身边。如果情况紧急，请直接前往最近的医院急诊。";

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn crisis_turn_end_to_end() {
    // "我想结束自己的生命，已经准备好了药" → guard passes, triage crisis,
    // reply carries a crisis referral, metadata.route persisted as crisis.
    let stack = stack(CRISIS_TRIAGE, CRISIS_REPLY);

    let response = stack
        .orchestrator
        .handle_turn(turn("我想结束自己的生命，已经准备好了药"))
        .await
        .unwrap();

    let (conversation_id, events, text) = run_to_completion(response).await;

    // crisis referral reached the client
    assert!(text.contains("400-161-9995"));

    // metadata packet closes the stream with the crisis route
    match events.last() {
        Some(ChatStreamEvent::Done { metadata, .. }) => {
            assert_eq!(metadata.route, Route::Crisis);
            assert_eq!(metadata.safety.label.as_str(), "crisis");
            assert!(!metadata.triage_fallback);
        }
        other => panic!("Expected done event, got {other:?}"),
    }

    // persisted assistant metadata carries route = crisis
    let conversation = stack
        .store
        .get_conversation(&conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.messages.len(), 2);
    let assistant = &conversation.messages[1];
    assert_eq!(assistant.role, Role::Assistant);
    assert_eq!(assistant.metadata["route"], "crisis");
    assert_eq!(assistant.metadata["safety_level"], "crisis");

    assert_eq!(stack.triage_calls.load(Ordering::SeqCst), 1);
    assert_eq!(stack.chat_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn over_length_message_makes_no_provider_calls() {
    let stack = stack(CRISIS_TRIAGE, "should never be generated");

    let long_message = "我".repeat(2001);
    let response = stack
        .orchestrator
        .handle_turn(turn(&long_message))
        .await
        .unwrap();

    match response {
        TurnResponse::Blocked { content, reason } => {
            assert_eq!(reason, InputBlockReason::MessageTooLong);
            assert_eq!(content, InputBlockReason::MessageTooLong.canned_response());
        }
        _ => panic!("Expected a blocked turn"),
    }

    // the fixed rejection, with zero provider calls
    assert_eq!(stack.triage_calls.load(Ordering::SeqCst), 0);
    assert_eq!(stack.chat_calls.load(Ordering::SeqCst), 0);
    // the attempt is auditable
    assert_eq!(stack.audit.len(), 1);
    assert_eq!(
        stack.audit.recent(1)[0].reason,
        InputBlockReason::MessageTooLong
    );
}

#[tokio::test]
async fn triage_outage_is_invisible_to_the_user() {
    // triage returns garbage; the turn still completes on the default route
    let stack = stack("<<not json at all>>", "我在，想和我聊聊今天发生了什么吗？");

    let response = stack
        .orchestrator
        .handle_turn(turn("最近心情不太好"))
        .await
        .unwrap();
    let (_, events, text) = run_to_completion(response).await;

    assert!(!text.is_empty());
    assert!(!events.iter().any(|e| matches!(e, ChatStreamEvent::Error { .. })));
    match events.last() {
        Some(ChatStreamEvent::Done { metadata, .. }) => {
            assert!(metadata.triage_fallback);
            assert_eq!(metadata.route, Route::Support);
            assert_eq!(metadata.emotion.label.as_str(), "平静");
            assert_eq!(metadata.emotion.score, 5);
        }
        other => panic!("Expected done event, got {other:?}"),
    }
}

#[tokio::test]
async fn golden_examples_surface_in_retrieval_after_curation() {
    let stack = stack(
        r#"{"safety_level":"normal","safety_reasoning":"日常","emotion":{"label":"疲惫","score":6},"route":"assessment","state_reasoning":"求助","assessment_stage":"初始"}"#,
        "我们可以先从睡前的状态聊起。",
    );

    // curate an example, then run a matching turn
    stack
        .examples
        .seed(vec![(
            "晚上总是睡不着怎么办".into(),
            "我们先聊聊你白天的状态好吗".into(),
        )])
        .await;

    let response = stack
        .orchestrator
        .handle_turn(turn("晚上总是睡不着"))
        .await
        .unwrap();
    let (_, events, _) = run_to_completion(response).await;

    // assessment stage from triage flows through to the metadata packet
    match events.last() {
        Some(ChatStreamEvent::Done { metadata, .. }) => {
            assert_eq!(metadata.assessment_stage.as_deref(), Some("初始"));
            assert_eq!(metadata.route, Route::Assessment);
        }
        other => panic!("Expected done event, got {other:?}"),
    }
}

#[tokio::test]
async fn second_turn_appends_to_same_conversation() {
    let stack = stack(
        r#"{"safety_level":"normal","safety_reasoning":"日常","emotion":{"label":"平静","score":5},"route":"support","state_reasoning":"闲聊","assessment_stage":null}"#,
        "嗯，我在听。",
    );

    let response = stack
        .orchestrator
        .handle_turn(turn("第一次发消息"))
        .await
        .unwrap();
    let (conversation_id, _, _) = run_to_completion(response).await;

    let mut second = turn("第二次发消息");
    second.conversation_id = Some(conversation_id.clone());
    let response = stack.orchestrator.handle_turn(second).await.unwrap();
    let (second_id, _, _) = run_to_completion(response).await;

    assert_eq!(conversation_id, second_id);
    let conversation = stack
        .store
        .get_conversation(&conversation_id)
        .await
        .unwrap()
        .unwrap();
    // title derives from the first user message only
    assert_eq!(conversation.title.as_deref(), Some("第一次发消息"));
    assert_eq!(conversation.messages.len(), 4);
    // arrival order: user, assistant, user, assistant
    let roles: Vec<Role> = conversation.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
}
