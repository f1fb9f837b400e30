//! Persona/prompt composition — deterministic string assembly.
//!
//! Section order: persona base instructions, memory context (omitted
//! entirely when empty), numbered golden-example pairs (when any), the
//! fixed safety/style suffix. The crisis route prepends its directive
//! before the suffix so the referral instruction cannot be diluted by
//! few-shot examples.

use mindhaven_core::persona::Persona;
use mindhaven_core::store::GoldenExample;
use mindhaven_core::triage::Route;

/// Fixed safety/style constraints appended to every system prompt.
const SAFETY_SUFFIX: &str = "【安全与风格约束】\n\
始终保持角色设定和自然的对话风格。唯一的例外：当用户表达出危机级别的自伤或伤人意图时，\
立即跳出角色，明确表达关心，并提供危机求助资源：\
心理援助热线 400-161-9995（24小时）、北京心理危机研究与干预中心 010-82951332，\
并建议用户联系信任的人或前往医院急诊。不提供诊断，不开处方。";

/// Extra directive when triage already routed this turn to crisis mode.
const CRISIS_DIRECTIVE: &str = "【当前状态：危机应对】\n\
本轮对话已被判定为危机状态。优先确认用户当下的安全，回应必须包含上面列出的\
危机求助热线，语气平静、直接、不评判。不使用示例对话的风格。";

/// Build the final system prompt for one turn.
pub fn compose(
    persona: &Persona,
    memory_context: &str,
    examples: &[GoldenExample],
    route: Route,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(&persona.base_prompt);

    if !memory_context.trim().is_empty() {
        prompt.push_str("\n\n【用户长期记忆】\n");
        prompt.push_str(memory_context.trim());
    }

    if !examples.is_empty() {
        prompt.push_str("\n\n【优质对话示例】\n以下是一些高质量回应的示例，参考其风格：\n");
        for (i, example) in examples.iter().enumerate() {
            prompt.push_str(&format!(
                "示例{}\n用户: {}\n助手: {}\n",
                i + 1,
                example.user_message,
                example.assistant_message
            ));
        }
    }

    if route == Route::Crisis {
        prompt.push_str("\n\n");
        prompt.push_str(CRISIS_DIRECTIVE);
    }

    prompt.push_str("\n\n");
    prompt.push_str(SAFETY_SUFFIX);
    prompt
}
