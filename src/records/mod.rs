//! Knowledge records and the staged-record loader.
//!
//! Records arrive as a JSON array of `{title, time, source, content}` objects
//! written by the scraping/cleaning collaborators. Loading re-applies the
//! cleaning rules so that only well-formed records reach ingestion.

mod clean;

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::RagError;

pub use clean::{clean_record, normalize_whitespace, RejectReason};

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const MIN_TITLE_CHARS: usize = 5;
pub const MIN_CONTENT_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub title: String,
    #[serde(rename = "time")]
    pub timestamp: String,
    pub source: String,
    pub content: String,
}

impl KnowledgeRecord {
    pub fn new(
        title: impl Into<String>,
        timestamp: impl Into<String>,
        source: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            timestamp: timestamp.into(),
            source: source.into(),
            content: content.into(),
        }
    }

    /// Natural key used for replace-on-reingest.
    pub fn key(&self) -> &str {
        &self.title
    }

    pub fn parsed_time(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(self.timestamp.trim(), TIME_FORMAT).ok()
    }

    /// Labeled text surface used both for embedding and for prompt context.
    pub fn canonical_text(&self) -> String {
        format!(
            "标题: {}\n时间: {}\n来源: {}\n内容: {}",
            self.title, self.timestamp, self.source, self.content
        )
    }

    /// Checks the data-model invariants of a cleaned record.
    pub fn validate(&self) -> Result<(), RagError> {
        for (name, value) in [
            ("title", &self.title),
            ("time", &self.timestamp),
            ("source", &self.source),
            ("content", &self.content),
        ] {
            if value.trim().is_empty() {
                return Err(RagError::InvalidRecord(format!("{} is empty", name)));
            }
        }
        if self.title.chars().count() < MIN_TITLE_CHARS {
            return Err(RagError::InvalidRecord(format!(
                "title '{}' is shorter than {} characters",
                self.title, MIN_TITLE_CHARS
            )));
        }
        if self.parsed_time().is_none() {
            return Err(RagError::InvalidRecord(format!(
                "time '{}' does not match {}",
                self.timestamp, TIME_FORMAT
            )));
        }
        if normalize_whitespace(&self.content).chars().count() < MIN_CONTENT_CHARS {
            return Err(RagError::InvalidRecord(format!(
                "content of '{}' is shorter than {} characters",
                self.title, MIN_CONTENT_CHARS
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    pub position: usize,
    pub title: Option<String>,
    pub reason: RejectReason,
}

/// Cleaned, title-deduplicated records loaded from a staging file.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<KnowledgeRecord>,
    rejected: Vec<Rejection>,
    duplicates: usize,
}

impl RecordStore {
    pub fn from_path(path: &Path) -> Result<Self, RagError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            RagError::InvalidRecord(format!("failed to read {}: {}", path.display(), err))
        })?;
        let store = Self::from_json_str(&contents)?;
        tracing::info!(
            path = %path.display(),
            accepted = store.records.len(),
            rejected = store.rejected.len(),
            duplicates = store.duplicates,
            "Loaded staged records"
        );
        Ok(store)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, RagError> {
        let value: Value = serde_json::from_str(contents)
            .map_err(|err| RagError::InvalidRecord(format!("staging file is not JSON: {}", err)))?;
        let Value::Array(items) = value else {
            return Err(RagError::InvalidRecord(
                "staging file must contain a JSON array".to_string(),
            ));
        };
        Ok(Self::from_values(&items))
    }

    pub fn from_values(items: &[Value]) -> Self {
        let mut store = RecordStore::default();
        let mut seen_titles = std::collections::HashSet::new();

        for (position, item) in items.iter().enumerate() {
            let cleaned = clean_record(item).and_then(|record| {
                record
                    .validate()
                    .map(|_| record)
                    .map_err(|err| RejectReason::Invalid(err.to_string()))
            });
            match cleaned {
                Ok(record) => {
                    if seen_titles.insert(record.title.clone()) {
                        store.records.push(record);
                    } else {
                        tracing::debug!(title = %record.title, "Dropping duplicate title");
                        store.duplicates += 1;
                    }
                }
                Err(reason) => {
                    let title = item
                        .get("title")
                        .and_then(|t| t.as_str())
                        .map(|t| t.to_string());
                    tracing::debug!(position, ?title, %reason, "Rejected staged record");
                    store.rejected.push(Rejection {
                        position,
                        title,
                        reason,
                    });
                }
            }
        }

        store
    }

    pub fn records(&self) -> &[KnowledgeRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<KnowledgeRecord> {
        self.records
    }

    pub fn rejected(&self) -> &[Rejection] {
        &self.rejected
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn long_content() -> String {
        "广东省科学技术厅关于组织申报二〇二四年度省科技计划项目的通知，请各单位按要求认真组织申报工作并按时提交材料。".repeat(2)
    }

    #[test]
    fn canonical_text_labels_every_field() {
        let record = KnowledgeRecord::new("广东省科技计划", "2024-01-01 00:00:00", "省科技厅", "正文");
        assert_eq!(
            record.canonical_text(),
            "标题: 广东省科技计划\n时间: 2024-01-01 00:00:00\n来源: 省科技厅\n内容: 正文"
        );
    }

    #[test]
    fn record_serializes_timestamp_as_time() {
        let record = KnowledgeRecord::new("标题标题标题", "2024-01-01 00:00:00", "来源来源", "c");
        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["time"], json!("2024-01-01 00:00:00"));
        assert!(value.get("timestamp").is_none());
    }

    #[test]
    fn validate_enforces_invariants() {
        let ok = KnowledgeRecord::new("广东省科技计划", "2024-01-01 00:00:00", "省科技厅", long_content());
        assert!(ok.validate().is_ok());

        let short_title = KnowledgeRecord { title: "科技".into(), ..ok.clone() };
        assert!(matches!(short_title.validate(), Err(RagError::InvalidRecord(_))));

        let bad_time = KnowledgeRecord { timestamp: "2024/01/01".into(), ..ok.clone() };
        assert!(bad_time.validate().is_err());

        let short_content = KnowledgeRecord { content: "太短".into(), ..ok };
        assert!(short_content.validate().is_err());
    }

    #[test]
    fn loader_rejects_and_deduplicates() {
        let contents = json!([
            { "title": "广东省科技计划", "time": "2024-01-01 00:00:00", "source": "省科技厅", "content": long_content() },
            { "title": "广东省科技计划", "time": "2024-01-02 00:00:00", "source": "省科技厅", "content": long_content() },
            { "title": "Unknown Title", "time": "2024-01-01 00:00:00", "source": "省科技厅", "content": long_content() },
            { "title": "缺少正文的记录", "time": "2024-01-01 00:00:00", "source": "省科技厅" }
        ])
        .to_string();

        let store = RecordStore::from_json_str(&contents).expect("valid json");

        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].timestamp, "2024-01-01 00:00:00");
        assert_eq!(store.duplicates(), 1);
        assert_eq!(store.rejected().len(), 2);
        assert_eq!(store.rejected()[0].reason, RejectReason::Placeholder);
        assert_eq!(store.rejected()[1].reason, RejectReason::MissingField("content"));
    }

    #[test]
    fn loaded_records_satisfy_invariants_after_share_text_is_removed() {
        let padded = format!("{}分享到：微信 微博 QQ空间 人人网 豆瓣网 腾讯微博", "短正文".repeat(10));
        let store = RecordStore::from_values(&[
            json!({ "title": "广东省科技计划", "time": "2024-01-01 00:00:00", "source": "省科技厅", "content": padded }),
            json!({ "title": "深圳市人才引进办法", "time": "2024-01-01 00:00:00", "source": "深圳市人社局", "content": long_content() }),
        ]);

        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].title, "深圳市人才引进办法");
        assert!(store.records().iter().all(|record| record.validate().is_ok()));
        assert_eq!(store.rejected()[0].title.as_deref(), Some("广东省科技计划"));
        assert_eq!(store.rejected()[0].reason, RejectReason::ContentTooShort);
    }

    #[test]
    fn loader_requires_array() {
        let err = RecordStore::from_json_str("{\"title\": \"x\"}").expect_err("object");
        assert!(matches!(err, RagError::InvalidRecord(_)));
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cleaned_policy.json");
        let contents = json!([
            { "title": "广东省科技计划", "time": "2024-01-01 00:00:00", "source": "省科技厅", "content": long_content() }
        ]);
        fs::write(&path, contents.to_string()).expect("write");

        let store = RecordStore::from_path(&path).expect("load");
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }
}
