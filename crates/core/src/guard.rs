//! Guard decision types — the contract between the guardrail layer and the
//! turn orchestrator.
//!
//! An input block is not an error: the pipeline answers with a fixed,
//! reason-specific message over a normal transport status. The enums here
//! carry those canned responses so callers never re-invent them.

use serde::{Deserialize, Serialize};

/// Why an incoming message was blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputBlockReason {
    PromptInjection,
    MessageTooLong,
    SuspiciousPattern,
}

impl InputBlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PromptInjection => "prompt_injection",
            Self::MessageTooLong => "message_too_long",
            Self::SuspiciousPattern => "suspicious_pattern",
        }
    }

    /// The fixed user-facing reply for this block reason.
    pub fn canned_response(&self) -> &'static str {
        match self {
            Self::PromptInjection => {
                "我注意到这条消息里包含了一些指令性的内容。我在这里是想和你聊聊你的感受，\
                 我们换个话题继续好吗？"
            }
            Self::MessageTooLong => {
                "这条消息有点长，我可能没办法完整理解。可以分成几段发给我吗？\
                 我们慢慢聊。"
            }
            Self::SuspiciousPattern => {
                "这条消息的格式我没办法处理。换种方式告诉我你想说的，好吗？"
            }
        }
    }
}

impl std::fmt::Display for InputBlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The input guard's verdict, computed synchronously before any LLM call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDecision {
    pub safe: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<InputBlockReason>,
}

impl InputDecision {
    pub fn safe() -> Self {
        Self {
            safe: true,
            reason: None,
        }
    }

    pub fn blocked(reason: InputBlockReason) -> Self {
        Self {
            safe: false,
            reason: Some(reason),
        }
    }
}

/// Issues the output guard can flag on generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputIssue {
    PiiDetected,
    HarmfulContent,
    SystemLeak,
}

impl OutputIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PiiDetected => "pii_detected",
            Self::HarmfulContent => "harmful_content",
            Self::SystemLeak => "system_leak",
        }
    }
}

/// The output guard's verdict on a completed generation.
///
/// `redacted` always holds the text the caller should use: PII replaced and
/// leaked instructions stripped. When `safe` is false the caller must
/// substitute a safe fallback instead of delivering the text at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDecision {
    pub safe: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<OutputIssue>,
    pub redacted: String,
}

impl OutputDecision {
    pub fn clean(text: impl Into<String>) -> Self {
        Self {
            safe: true,
            issues: Vec::new(),
            redacted: text.into(),
        }
    }

    pub fn has_issue(&self, issue: OutputIssue) -> bool {
        self.issues.contains(&issue)
    }
}
