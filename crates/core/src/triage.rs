//! Triage domain types — the per-turn classification result.
//!
//! A [`TriageResult`] is produced fresh for every turn by the fast
//! classifier and embedded into the assistant message metadata. It is never
//! persisted on its own.
//!
//! The classifier returns a [`TriageOutcome`] so callers can distinguish a
//! real classification from the availability fallback, even though both
//! carry the same shape.

use serde::{Deserialize, Serialize};

/// How dangerous the current message is.
///
/// `Crisis` is reserved for explicit, unambiguous suicidal/self-harm/violent
/// intent *with a plan*; `Urgent` for explicit ideation *without* a concrete
/// plan. Everyday distress (sleep problems, stress, sadness) is `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Normal,
    Urgent,
    Crisis,
}

impl SafetyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Urgent => "urgent",
            Self::Crisis => "crisis",
        }
    }
}

/// The conversational mode selected for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// Casual / positive / greeting content
    Support,
    /// Explicit help-seeking with unresolved negative affect
    Assessment,
    /// Safety level is urgent or crisis
    Crisis,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Support => "support",
            Self::Assessment => "assessment",
            Self::Crisis => "crisis",
        }
    }
}

/// The seven emotion categories the classifier may assign.
///
/// Serialized with the Chinese labels the classification model is
/// instructed to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmotionLabel {
    #[serde(rename = "平静")]
    Calm,
    #[serde(rename = "开心")]
    Happy,
    #[serde(rename = "悲伤")]
    Sad,
    #[serde(rename = "焦虑")]
    Anxious,
    #[serde(rename = "愤怒")]
    Angry,
    #[serde(rename = "恐惧")]
    Fearful,
    #[serde(rename = "疲惫")]
    Tired,
}

impl EmotionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calm => "平静",
            Self::Happy => "开心",
            Self::Sad => "悲伤",
            Self::Anxious => "焦虑",
            Self::Angry => "愤怒",
            Self::Fearful => "恐惧",
            Self::Tired => "疲惫",
        }
    }
}

/// An emotion label with an intensity score (1–10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emotion {
    pub label: EmotionLabel,
    pub score: u8,
}

/// The full per-turn classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    pub safety_level: SafetyLevel,
    pub safety_reasoning: String,
    pub emotion: Emotion,
    pub route: Route,
    pub state_reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_stage: Option<String>,
}

impl TriageResult {
    /// The hard-coded safe default used when the classifier is unavailable
    /// or returns unusable output. Fail-open: availability over caution.
    pub fn default_safe() -> Self {
        Self {
            safety_level: SafetyLevel::Normal,
            safety_reasoning: "分类服务不可用，使用默认安全评估".into(),
            emotion: Emotion {
                label: EmotionLabel::Calm,
                score: 5,
            },
            route: Route::Support,
            state_reasoning: "分类服务不可用，默认进入支持模式".into(),
            assessment_stage: None,
        }
    }

    /// Enforce the route invariant: route must be `Crisis` whenever the
    /// safety level is urgent or crisis, no matter what the model said.
    pub fn normalize(mut self) -> Self {
        if matches!(self.safety_level, SafetyLevel::Urgent | SafetyLevel::Crisis) {
            self.route = Route::Crisis;
        }
        self
    }

    /// Flatten into message metadata for persistence.
    pub fn to_metadata(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert("safety_level".into(), serde_json::json!(self.safety_level));
        map.insert(
            "safety_reasoning".into(),
            serde_json::json!(self.safety_reasoning),
        );
        map.insert("emotion".into(), serde_json::json!(self.emotion));
        map.insert("route".into(), serde_json::json!(self.route));
        map.insert(
            "state_reasoning".into(),
            serde_json::json!(self.state_reasoning),
        );
        if let Some(stage) = &self.assessment_stage {
            map.insert("assessment_stage".into(), serde_json::json!(stage));
        }
        map
    }
}

/// Why the classifier fell back to the default result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageFallback {
    /// No API credentials configured for the triage provider
    MissingCredentials,
    /// Transport or upstream failure
    Transport,
    /// The response was not parseable JSON
    Parse,
    /// Parsed, but required fields were missing or unrecognized
    MissingFields,
}

impl std::fmt::Display for TriageFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MissingCredentials => "missing_credentials",
            Self::Transport => "transport",
            Self::Parse => "parse",
            Self::MissingFields => "missing_fields",
        };
        write!(f, "{s}")
    }
}

/// The classifier's return value: a real classification, or the fail-open
/// default tagged with the reason it was used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriageOutcome {
    Classified(TriageResult),
    Fallback {
        result: TriageResult,
        reason: TriageFallback,
    },
}

impl TriageOutcome {
    /// The classification, regardless of how it was obtained.
    pub fn result(&self) -> &TriageResult {
        match self {
            Self::Classified(r) => r,
            Self::Fallback { result, .. } => result,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_safe_shape() {
        let r = TriageResult::default_safe();
        assert_eq!(r.safety_level, SafetyLevel::Normal);
        assert_eq!(r.emotion.label, EmotionLabel::Calm);
        assert_eq!(r.emotion.score, 5);
        assert_eq!(r.route, Route::Support);
        assert!(r.assessment_stage.is_none());
    }

    #[test]
    fn normalize_forces_crisis_route() {
        let r = TriageResult {
            safety_level: SafetyLevel::Urgent,
            route: Route::Support,
            ..TriageResult::default_safe()
        }
        .normalize();
        assert_eq!(r.route, Route::Crisis);

        let r = TriageResult {
            safety_level: SafetyLevel::Crisis,
            route: Route::Assessment,
            ..TriageResult::default_safe()
        }
        .normalize();
        assert_eq!(r.route, Route::Crisis);
    }

    #[test]
    fn normalize_leaves_normal_alone() {
        let r = TriageResult {
            route: Route::Assessment,
            ..TriageResult::default_safe()
        }
        .normalize();
        assert_eq!(r.route, Route::Assessment);
    }

    #[test]
    fn emotion_label_chinese_serde() {
        let e = Emotion {
            label: EmotionLabel::Anxious,
            score: 7,
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("焦虑"));

        let back: Emotion = serde_json::from_str(r#"{"label":"平静","score":5}"#).unwrap();
        assert_eq!(back.label, EmotionLabel::Calm);
    }

    #[test]
    fn metadata_carries_route() {
        let meta = TriageResult::default_safe().to_metadata();
        assert_eq!(meta["route"], "support");
        assert_eq!(meta["safety_level"], "normal");
        assert!(!meta.contains_key("assessment_stage"));
    }

    #[test]
    fn outcome_accessors() {
        let outcome = TriageOutcome::Fallback {
            result: TriageResult::default_safe(),
            reason: TriageFallback::Parse,
        };
        assert!(outcome.is_fallback());
        assert_eq!(outcome.result().route, Route::Support);

        let outcome = TriageOutcome::Classified(TriageResult::default_safe());
        assert!(!outcome.is_fallback());
    }
}
