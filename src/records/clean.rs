use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::{KnowledgeRecord, MIN_CONTENT_CHARS, MIN_TITLE_CHARS, TIME_FORMAT};

const MIN_SOURCE_CHARS: usize = 3;

// Values the scraper writes when extraction fails.
const PLACEHOLDERS: [(&str, &str); 4] = [
    ("title", "Unknown Title"),
    ("time", "Unknown Time"),
    ("source", "Unknown Source"),
    ("content", "Failed to extract content"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("placeholder value")]
    Placeholder,
    #[error("title too short or marked invalid")]
    InvalidTitle,
    #[error("time does not match {}", TIME_FORMAT)]
    InvalidTime,
    #[error("source missing or too short")]
    InvalidSource,
    #[error("content shorter than {} characters", MIN_CONTENT_CHARS)]
    ContentTooShort,
    #[error("{0}")]
    Invalid(String),
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn share_widget_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"分享到.*$").expect("static regex"))
}

fn invalid_title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(无效|错误|测试)").expect("static regex"))
}

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    whitespace_re().replace_all(text, " ").trim().to_string()
}

/// Applies the staging cleaning rules to one raw JSON object.
pub fn clean_record(raw: &Value) -> Result<KnowledgeRecord, RejectReason> {
    let mut fields = [""; 4];
    for (slot, (name, placeholder)) in fields.iter_mut().zip(PLACEHOLDERS.iter()) {
        let value = raw
            .get(*name)
            .and_then(|v| v.as_str())
            .ok_or(RejectReason::MissingField(*name))?;
        if value == *placeholder {
            return Err(RejectReason::Placeholder);
        }
        *slot = value;
    }
    let [title, time, source, content] = fields;

    let title = title.trim();
    if title.chars().count() < MIN_TITLE_CHARS || invalid_title_re().is_match(title) {
        return Err(RejectReason::InvalidTitle);
    }

    let time = time.trim();
    if chrono::NaiveDateTime::parse_from_str(time, TIME_FORMAT).is_err() {
        return Err(RejectReason::InvalidTime);
    }

    let source = source.trim();
    if source.chars().count() < MIN_SOURCE_CHARS {
        return Err(RejectReason::InvalidSource);
    }

    let content = normalize_whitespace(content);
    let content = share_widget_re().replace(&content, "").trim().to_string();
    if content.chars().count() < MIN_CONTENT_CHARS {
        return Err(RejectReason::ContentTooShort);
    }

    Ok(KnowledgeRecord::new(title, time, source, content))
}
