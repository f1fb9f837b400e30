//! Persona — a named system-prompt template defining the assistant's
//! conversational character.
//!
//! Personas are configuration data: the prompt composer combines a persona's
//! base instructions with retrieved memory, golden examples, and the fixed
//! safety suffix. Missing template fields are a configuration error caught
//! at load time, not a runtime failure.

use serde::{Deserialize, Serialize};

/// A conversational persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// Stable identifier used in requests (e.g. "wenxin")
    pub id: String,

    /// Display name
    pub name: String,

    /// The persona's base system instructions
    pub base_prompt: String,
}

impl Persona {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        base_prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_prompt: base_prompt.into(),
        }
    }

    /// The built-in default counselor persona, used when no personas are
    /// configured.
    pub fn default_counselor() -> Self {
        Self {
            id: "wenxin".into(),
            name: "温心".into(),
            base_prompt: concat!(
                "你是温心，一位温暖、耐心的心理支持伙伴。你认真倾听，不评判，",
                "用自然的口吻回应。你不是医生，不做诊断，不开处方；",
                "当用户需要专业帮助时，温和地建议寻求线下心理咨询。",
                "回复保持简短自然，一次只关注一个话题。",
            )
            .into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_counselor_is_populated() {
        let p = Persona::default_counselor();
        assert_eq!(p.id, "wenxin");
        assert!(p.base_prompt.contains("倾听"));
    }

    #[test]
    fn persona_roundtrip() {
        let p = Persona::new("calm-guide", "静语", "你是一位安静的倾听者。");
        let json = serde_json::to_string(&p).unwrap();
        let back: Persona = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "calm-guide");
        assert_eq!(back.base_prompt, p.base_prompt);
    }
}
