//! The triage classifier implementation.

use mindhaven_core::error::ProviderError;
use mindhaven_core::message::{Message, Role};
use mindhaven_core::provider::{TriageProvider, TriageRequest};
use mindhaven_core::triage::{
    Emotion, EmotionLabel, Route, SafetyLevel, TriageFallback, TriageOutcome, TriageResult,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Classification instructions. Strict JSON output, with the safety-level
/// rules spelled out so the model does not over-infer crisis from
/// ambiguous language.
const CLASSIFY_SYSTEM_PROMPT: &str = r#"你是一个心理对话分诊器。对用户的最新消息做快速分类，只输出一个JSON对象，不要输出任何其他文字。

JSON格式（字段全部必填，assessment_stage可为null）：
{"safety_level":"normal|urgent|crisis","safety_reasoning":"一句话说明","emotion":{"label":"平静|开心|悲伤|焦虑|愤怒|恐惧|疲惫","score":1到10的整数},"route":"support|assessment|crisis","state_reasoning":"一句话说明","assessment_stage":null}

safety_level判定规则（严格执行，不要过度推断）：
- crisis：仅当用户明确、无歧义地表达了自杀/自伤/伤人意图，并且提到了具体计划（方式、时间或已做的准备）。
- urgent：用户明确表达了自杀/自伤意念，但没有具体计划。
- normal：其余所有情况。睡眠问题、压力大、情绪低落、难过哭泣都属于normal，不要因为语气消极就升级。

route判定规则：
- safety_level是urgent或crisis时，route必须是crisis。
- 用户明确寻求帮助、带着未解决的负面情绪、需要深入梳理时，route是assessment。
- 问候、闲聊、积极或中性内容，route是support。

如果对话历史显示用户是在回答此前的提问，结合历史理解语义，不要当作新话题。"#;

/// A fast, fail-open triage classifier.
pub struct TriageClassifier {
    provider: Arc<dyn TriageProvider>,
    max_tokens: u32,
    history_turns: usize,
}

impl TriageClassifier {
    pub fn new(provider: Arc<dyn TriageProvider>, max_tokens: u32, history_turns: usize) -> Self {
        Self {
            provider,
            max_tokens,
            history_turns,
        }
    }

    /// Classify a message. Never fails: any degradation returns the
    /// default safe result tagged with the reason.
    pub async fn analyze(&self, message: &str, recent_history: &[Message]) -> TriageOutcome {
        let request = TriageRequest {
            system_prompt: CLASSIFY_SYSTEM_PROMPT.into(),
            user_prompt: Self::build_user_prompt(message, recent_history, self.history_turns),
            max_tokens: self.max_tokens,
        };

        let raw = match self.provider.classify(request).await {
            Ok(text) => text,
            Err(ProviderError::NotConfigured(msg)) => {
                warn!(error = %msg, "Triage provider not configured, using default result");
                return fallback(TriageFallback::MissingCredentials);
            }
            Err(e) => {
                warn!(error = %e, "Triage provider failed, using default result");
                return fallback(TriageFallback::Transport);
            }
        };

        match Self::parse(&raw) {
            Ok(result) => {
                debug!(
                    safety = result.safety_level.as_str(),
                    route = result.route.as_str(),
                    emotion = result.emotion.label.as_str(),
                    "Triage classified"
                );
                TriageOutcome::Classified(result)
            }
            Err(reason) => {
                warn!(reason = %reason, raw = %raw, "Unusable triage output, using default result");
                fallback(reason)
            }
        }
    }

    /// The message plus role-tagged recent history, so the classifier can
    /// tell "answering a prior question" from "new topic".
    fn build_user_prompt(message: &str, recent_history: &[Message], history_turns: usize) -> String {
        let mut prompt = String::new();

        let tail: Vec<&Message> = recent_history
            .iter()
            .rev()
            .take(history_turns)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        if !tail.is_empty() {
            prompt.push_str("对话历史：\n");
            for m in tail {
                let tag = match m.role {
                    Role::User => "用户",
                    Role::Assistant => "助手",
                    Role::System => continue,
                };
                prompt.push_str(&format!("{tag}: {}\n", m.content));
            }
            prompt.push('\n');
        }

        prompt.push_str("需要分类的最新消息：\n");
        prompt.push_str(message);
        prompt
    }

    /// Parse the model's output into a normalized [`TriageResult`].
    fn parse(raw: &str) -> Result<TriageResult, TriageFallback> {
        let stripped = strip_code_fences(raw);

        let parsed: RawTriage =
            serde_json::from_str(stripped.trim()).map_err(|_| TriageFallback::Parse)?;

        let safety_level = match parsed.safety_level.as_deref() {
            Some("normal") => SafetyLevel::Normal,
            Some("urgent") => SafetyLevel::Urgent,
            Some("crisis") => SafetyLevel::Crisis,
            _ => return Err(TriageFallback::MissingFields),
        };

        let route = match parsed.route.as_deref() {
            Some("support") => Route::Support,
            Some("assessment") => Route::Assessment,
            Some("crisis") => Route::Crisis,
            _ => return Err(TriageFallback::MissingFields),
        };

        let raw_emotion = parsed.emotion.ok_or(TriageFallback::MissingFields)?;
        let label = match raw_emotion.label.as_deref() {
            Some("平静") => EmotionLabel::Calm,
            Some("开心") => EmotionLabel::Happy,
            Some("悲伤") => EmotionLabel::Sad,
            Some("焦虑") => EmotionLabel::Anxious,
            Some("愤怒") => EmotionLabel::Angry,
            Some("恐惧") => EmotionLabel::Fearful,
            Some("疲惫") => EmotionLabel::Tired,
            _ => return Err(TriageFallback::MissingFields),
        };
        let score = raw_emotion
            .score
            .map(|s| s.round().clamp(1.0, 10.0) as u8)
            .unwrap_or(5);

        Ok(TriageResult {
            safety_level,
            safety_reasoning: parsed.safety_reasoning.unwrap_or_default(),
            emotion: Emotion { label, score },
            route,
            state_reasoning: parsed.state_reasoning.unwrap_or_default(),
            assessment_stage: parsed.assessment_stage,
        }
        .normalize())
    }
}

fn fallback(reason: TriageFallback) -> TriageOutcome {
    TriageOutcome::Fallback {
        result: TriageResult::default_safe(),
        reason,
    }
}

/// Strip a Markdown code fence (```json ... ``` or ``` ... ```) if the
/// model wrapped its output in one.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the language tag on the opening fence line
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Loosely-typed mirror of the expected JSON, so unknown enum values are a
/// missing-fields fallback rather than a parse failure.
#[derive(Debug, Deserialize)]
struct RawTriage {
    safety_level: Option<String>,
    safety_reasoning: Option<String>,
    emotion: Option<RawEmotion>,
    route: Option<String>,
    state_reasoning: Option<String>,
    assessment_stage: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEmotion {
    label: Option<String>,
    score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A mock triage provider returning a scripted response.
    struct ScriptedProvider {
        response: Result<String, ProviderError>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(text.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn err(e: ProviderError) -> Arc<Self> {
            Arc::new(Self {
                response: Err(e),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TriageProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn classify(&self, _request: TriageRequest) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    fn classifier(provider: Arc<ScriptedProvider>) -> TriageClassifier {
        TriageClassifier::new(provider, 512, 6)
    }

    const CRISIS_JSON: &str = r#"{"safety_level":"crisis","safety_reasoning":"明确计划","emotion":{"label":"悲伤","score":9},"route":"crisis","state_reasoning":"危机","assessment_stage":null}"#;

    #[tokio::test]
    async fn crisis_with_plan_classified() {
        let provider = ScriptedProvider::ok(CRISIS_JSON);
        let outcome = classifier(provider)
            .analyze("我想用药物结束自己的生命，计划今晚执行", &[])
            .await;

        assert!(!outcome.is_fallback());
        let result = outcome.result();
        assert_eq!(result.safety_level, SafetyLevel::Crisis);
        assert_eq!(result.route, Route::Crisis);
        assert_eq!(result.emotion.label, EmotionLabel::Sad);
    }

    #[tokio::test]
    async fn everyday_distress_stays_normal() {
        let provider = ScriptedProvider::ok(
            r#"{"safety_level":"normal","safety_reasoning":"日常压力","emotion":{"label":"疲惫","score":6},"route":"assessment","state_reasoning":"寻求帮助","assessment_stage":"初始"}"#,
        );
        let outcome = classifier(provider)
            .analyze("晚上总是睡不好觉，压力很大", &[])
            .await;

        let result = outcome.result();
        assert_eq!(result.safety_level, SafetyLevel::Normal);
        assert_eq!(result.route, Route::Assessment);
        assert_eq!(result.assessment_stage.as_deref(), Some("初始"));
    }

    #[tokio::test]
    async fn code_fenced_json_accepted() {
        let fenced = format!("```json\n{CRISIS_JSON}\n```");
        let provider = ScriptedProvider::ok(&fenced);
        let outcome = classifier(provider).analyze("消息", &[]).await;
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.result().safety_level, SafetyLevel::Crisis);
    }

    #[tokio::test]
    async fn malformed_json_falls_back_to_default() {
        let provider = ScriptedProvider::ok("I think the user seems fine.");
        let outcome = classifier(provider).analyze("你好", &[]).await;

        match &outcome {
            TriageOutcome::Fallback { result, reason } => {
                assert_eq!(*reason, TriageFallback::Parse);
                assert_eq!(*result, TriageResult::default_safe());
            }
            _ => panic!("Expected fallback"),
        }
        // the exact default: normal / 平静 5 / support
        let result = outcome.result();
        assert_eq!(result.safety_level, SafetyLevel::Normal);
        assert_eq!(result.emotion.label, EmotionLabel::Calm);
        assert_eq!(result.emotion.score, 5);
        assert_eq!(result.route, Route::Support);
    }

    #[tokio::test]
    async fn missing_fields_fall_back() {
        let provider = ScriptedProvider::ok(r#"{"safety_level":"normal"}"#);
        let outcome = classifier(provider).analyze("你好", &[]).await;
        assert!(matches!(
            outcome,
            TriageOutcome::Fallback {
                reason: TriageFallback::MissingFields,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unknown_emotion_label_falls_back() {
        let provider = ScriptedProvider::ok(
            r#"{"safety_level":"normal","emotion":{"label":"沮丧","score":5},"route":"support"}"#,
        );
        let outcome = classifier(provider).analyze("你好", &[]).await;
        assert!(outcome.is_fallback());
    }

    #[tokio::test]
    async fn transport_error_falls_back() {
        let provider = ScriptedProvider::err(ProviderError::Network("connection refused".into()));
        let outcome = classifier(provider).analyze("你好", &[]).await;
        assert!(matches!(
            outcome,
            TriageOutcome::Fallback {
                reason: TriageFallback::Transport,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_credentials_fall_back() {
        let provider = ScriptedProvider::err(ProviderError::NotConfigured("no key".into()));
        let outcome = classifier(provider).analyze("你好", &[]).await;
        assert!(matches!(
            outcome,
            TriageOutcome::Fallback {
                reason: TriageFallback::MissingCredentials,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn urgent_safety_forces_crisis_route() {
        // Model contradicted the invariant; normalization must fix it
        let provider = ScriptedProvider::ok(
            r#"{"safety_level":"urgent","safety_reasoning":"意念无计划","emotion":{"label":"悲伤","score":8},"route":"assessment","state_reasoning":"x","assessment_stage":null}"#,
        );
        let outcome = classifier(provider).analyze("有时候真想消失", &[]).await;
        assert_eq!(outcome.result().route, Route::Crisis);
    }

    #[test]
    fn user_prompt_includes_role_tagged_history() {
        let history = vec![
            Message::user("最近怎么样都睡不着"),
            Message::assistant("听起来很辛苦，持续多久了？"),
        ];
        let prompt = TriageClassifier::build_user_prompt("大概两周了", &history, 6);
        assert!(prompt.contains("用户: 最近怎么样都睡不着"));
        assert!(prompt.contains("助手: 听起来很辛苦"));
        assert!(prompt.contains("需要分类的最新消息"));
        assert!(prompt.ends_with("大概两周了"));
    }

    #[test]
    fn user_prompt_limits_history() {
        let history: Vec<Message> = (0..10).map(|i| Message::user(format!("消息{i}"))).collect();
        let prompt = TriageClassifier::build_user_prompt("最新", &history, 3);
        assert!(!prompt.contains("消息6"));
        assert!(prompt.contains("消息7"));
        assert!(prompt.contains("消息9"));
    }

    #[test]
    fn strip_fences_variants() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  ```json\n{}\n```  "), "{}");
    }

    #[test]
    fn score_clamped_to_range() {
        let result = TriageClassifier::parse(
            r#"{"safety_level":"normal","emotion":{"label":"平静","score":99},"route":"support"}"#,
        )
        .unwrap();
        assert_eq!(result.emotion.score, 10);
    }
}
