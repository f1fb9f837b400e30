//! Keyword extraction and coverage scoring.

use std::collections::HashSet;

/// The fixed separator set: whitespace plus Chinese and Western punctuation.
const SEPARATORS: &[char] = &[
    '，', '。', '！', '？', '、', '；', '：', '“', '”', '‘', '’', '（', '）', '【', '】', '《',
    '》', '…', '—', '·', ',', '.', '!', '?', ';', ':', '(', ')', '[', ']', '{', '}', '"', '\'',
    '~', '-', '/', '\\',
];

/// Tokens carrying no retrieval signal.
const STOPWORDS: &[&str] = &[
    // Chinese function words and fillers
    "的", "了", "是", "我", "你", "他", "她", "它", "我们", "你们", "他们", "这", "那", "这个",
    "那个", "什么", "怎么", "为什么", "怎么办", "吗", "呢", "吧", "啊", "呀", "哦", "嗯", "和",
    "也", "都", "很", "在", "有", "就", "不", "没", "没有", "一个", "一些", "可以", "但是",
    "因为", "所以", "如果", "还是", "就是", "觉得", "感觉", "自己", "现在", "知道", "真的",
    "非常", "有点", "一直", "时候", "然后", "或者", "而且", "已经", "应该",
    // English function words
    "the", "a", "an", "is", "are", "am", "was", "were", "be", "been", "i", "you", "he", "she",
    "it", "we", "they", "to", "of", "and", "or", "in", "on", "at", "for", "with", "that", "this",
    "my", "me", "your", "so", "do", "not", "but", "have", "has", "had", "what", "how", "why",
];

/// Extract the keyword list from a text: lowercase, split on the fixed
/// separator set and whitespace, drop tokens shorter than 2 characters or
/// in the stopword list. Order of first occurrence is preserved;
/// duplicates are dropped.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();

    for token in lower.split(|c: char| c.is_whitespace() || SEPARATORS.contains(&c)) {
        if token.chars().count() < 2 {
            continue;
        }
        if STOPWORDS.contains(&token) {
            continue;
        }
        if seen.insert(token.to_string()) {
            keywords.push(token.to_string());
        }
    }

    keywords
}

/// Coverage of the query's keywords by a candidate: |Q ∩ T| / |Q|.
///
/// Asymmetric by design — a candidate covering all of the query's intent
/// words scores 1.0 no matter how much else it contains. Returns 0.0 for an
/// empty query set.
pub fn coverage_score(query: &HashSet<String>, candidate: &HashSet<String>) -> f32 {
    if query.is_empty() {
        return 0.0;
    }
    let overlap = query.intersection(candidate).count();
    overlap as f32 / query.len() as f32
}
