//! Prompt assembly for grounded answers.
//!
//! Retrieved records are rendered in their canonical labeled form and joined
//! in rank order. The context block always precedes the question.

use super::store::SearchHit;
use crate::llm::ChatMessage;

pub const DEFAULT_SYSTEM_PROMPT: &str = "你是一个政务领域的智能助手，擅长回答政策问题。";

/// Stands in for the context block when retrieval returned nothing.
pub const EMPTY_CONTEXT_PLACEHOLDER: &str = "（未检索到相关政策信息）";

/// Newline-joined canonical renderings, best hit first. Empty when `hits` is empty.
pub fn render_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| hit.entry.record.canonical_text())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_user_prompt(context: &str, query: &str) -> String {
    let context = if context.trim().is_empty() {
        EMPTY_CONTEXT_PLACEHOLDER
    } else {
        context
    };
    format!(
        "以下是政务领域的相关信息：\n{}\n\n用户的问题是：{}\n请仅基于上述内容提供准确、简洁的回答。",
        context, query
    )
}

pub fn build_messages(system_prompt: &str, hits: &[SearchHit], query: &str) -> Vec<ChatMessage> {
    let context = render_context(hits);
    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(build_user_prompt(&context, query)),
    ]
}
