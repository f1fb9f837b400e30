//! Output guard — post-generation checks on the completed response text.
//!
//! Three passes, in order:
//! 1. PII redaction (CN resident IDs before phone numbers, since an ID
//!    contains a phone-shaped digit run; then emails). Placeholders contain
//!    no digits or `@`, so a second pass finds nothing — idempotent.
//! 2. System-leak stripping: lines carrying leak markers are removed.
//! 3. Harmful-content detection: sets `safe=false`; the caller substitutes
//!    [`OutputGuard::safe_fallback`] instead of delivering the text.

use mindhaven_core::guard::{OutputDecision, OutputIssue};
use regex::Regex;
use tracing::warn;

const PHONE_PLACEHOLDER: &str = "[手机号已隐藏]";
const ID_PLACEHOLDER: &str = "[身份证号已隐藏]";
const EMAIL_PLACEHOLDER: &str = "[邮箱已隐藏]";

/// Markers that indicate the model is echoing internal instructions.
const LEAK_MARKERS: &[&str] = &[
    "系统提示词",
    "我的系统指令",
    "system prompt:",
    "my instructions are",
    "【安全与风格约束】",
];

/// Phrases facilitating self-harm or illegal activity. Detection is
/// deliberately narrow: instructions and methods, not mentions of distress.
const HARMFUL_PHRASES: &[&str] = &[
    // self-harm instruction phrasing
    "自杀的方法",
    "自杀方法",
    "如何自杀",
    "怎么自杀",
    "怎样自杀",
    "结束生命的方法",
    "自残的方法",
    "割腕的步骤",
    "how to kill yourself",
    "ways to kill yourself",
    "how to end your life",
    // illegal facilitation
    "如何制作炸弹",
    "制作毒品",
    "how to make a bomb",
    "how to buy a gun illegally",
];

/// Inspects completed generations before delivery and persistence.
pub struct OutputGuard {
    phone: Regex,
    resident_id: Regex,
    email: Regex,
}

impl Default for OutputGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputGuard {
    pub fn new() -> Self {
        Self {
            phone: Regex::new(r"1[3-9][0-9]{9}").expect("valid regex"),
            resident_id: Regex::new(r"[0-9]{17}[0-9Xx]").expect("valid regex"),
            email: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
                .expect("valid regex"),
        }
    }

    /// Evaluate a completed generation. Idempotent: running on already
    /// redacted text yields the same result.
    pub fn evaluate(&self, generated: &str) -> OutputDecision {
        let mut issues = Vec::new();
        let mut text = generated.to_string();

        // 1. PII — resident IDs first, they contain phone-shaped runs
        let before = text.clone();
        text = self
            .resident_id
            .replace_all(&text, ID_PLACEHOLDER)
            .into_owned();
        text = self.phone.replace_all(&text, PHONE_PLACEHOLDER).into_owned();
        text = self.email.replace_all(&text, EMAIL_PLACEHOLDER).into_owned();
        if text != before {
            issues.push(OutputIssue::PiiDetected);
        }

        // 2. System leak — drop whole lines carrying a marker
        if Self::has_leak(&text) {
            issues.push(OutputIssue::SystemLeak);
            text = text
                .lines()
                .filter(|line| {
                    let lower = line.to_lowercase();
                    !LEAK_MARKERS.iter().any(|m| lower.contains(&m.to_lowercase()))
                })
                .collect::<Vec<_>>()
                .join("\n");
        }

        // 3. Harmful content — flag only; the caller substitutes
        let lower = text.to_lowercase();
        let harmful = HARMFUL_PHRASES.iter().any(|p| lower.contains(p));
        if harmful {
            issues.push(OutputIssue::HarmfulContent);
            warn!("Output guard flagged harmful content");
        }

        OutputDecision {
            safe: !harmful,
            issues,
            redacted: text,
        }
    }

    fn has_leak(text: &str) -> bool {
        let lower = text.to_lowercase();
        LEAK_MARKERS.iter().any(|m| lower.contains(&m.to_lowercase()))
    }

    /// The fixed substitute used when a generation is flagged harmful.
    pub fn safe_fallback() -> &'static str {
        "我可能没办法用合适的方式回应刚才的内容。你的感受很重要，如果你正处在危机中，\
         请拨打心理援助热线 400-161-9995（24小时），或前往最近的医院急诊。\
         我会一直在这里陪你聊聊别的。"
    }
}
