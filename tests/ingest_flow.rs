use std::sync::Arc;
use std::time::Duration;

use policy_rag::embedding::{EmbeddingProvider, HashEmbedder};
use policy_rag::rag::{IngestionPipeline, Retriever, SqliteVectorIndex, VectorIndex};
use policy_rag::records::RecordStore;
use serde_json::json;

const DIMENSION: usize = 256;

fn staged_records() -> String {
    let body = "为深入实施创新驱动发展战略，现就2024年度省科技计划项目申报工作通知如下，请各单位按照指南要求认真组织申报，确保材料真实完整。";
    json!([
        {
            "title": "广东省科技计划项目申报通知",
            "time": "2024-03-01 09:00:00",
            "source": "广东省科学技术厅",
            "content": format!("{}分享到：微信 微博", body),
        },
        {
            "title": "深圳市高层次人才认定办法",
            "time": "2024-02-15 14:30:00",
            "source": "深圳市人力资源和社会保障局",
            "content": "为加快建设人才强市，进一步完善高层次人才认定工作，根据有关规定，结合本市实际，制定本办法，符合条件的人才可按程序申请认定。",
        },
        {
            "title": "广东省科技计划项目申报通知",
            "time": "2024-03-02 09:00:00",
            "source": "广东省科学技术厅",
            "content": body,
        },
        {
            "title": "Unknown Title",
            "time": "2024-03-01 09:00:00",
            "source": "广东省科学技术厅",
            "content": body,
        },
        {
            "title": "测试页面请忽略该条",
            "time": "2024-03-01 09:00:00",
            "source": "广东省科学技术厅",
            "content": body,
        },
        {
            "title": "时间格式错乱的政策",
            "time": "2024/03/01",
            "source": "广东省科学技术厅",
            "content": body,
        }
    ])
    .to_string()
}

#[tokio::test]
async fn staged_file_is_cleaned_indexed_and_searchable() {
    let store = RecordStore::from_json_str(&staged_records()).expect("parse staged records");
    assert_eq!(store.len(), 2);
    assert_eq!(store.duplicates(), 1);
    assert_eq!(store.rejected().len(), 3);
    assert!(!store.records()[0].content.contains("分享到"));

    let dir = tempfile::tempdir().expect("tempdir");
    let index = Arc::new(
        SqliteVectorIndex::open(dir.path().join("policy_index.db"), DIMENSION)
            .await
            .expect("open index"),
    );
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder::new(DIMENSION));

    let report = IngestionPipeline::new(index.clone(), embedder.clone())
        .ingest(store.records())
        .await;
    assert_eq!(report.indexed, 2);
    assert!(report.is_complete());
    assert_eq!(index.count().await.expect("count"), 2);

    let retriever = Retriever::new(index.clone(), embedder, Duration::from_secs(5));
    let hits = retriever.retrieve("科技计划项目申报", 5).await.expect("retrieve");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].entry.record.title, "广东省科技计划项目申报通知");
    assert!(hits[0].score > hits[1].score);
}

#[tokio::test]
async fn index_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("policy_index.db");
    let store = RecordStore::from_json_str(&staged_records()).expect("parse staged records");
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder::new(DIMENSION));

    {
        let index = Arc::new(SqliteVectorIndex::open(&path, DIMENSION).await.expect("open"));
        IngestionPipeline::new(index.clone(), embedder.clone())
            .ingest(store.records())
            .await;
        index.close().await;
    }

    let index = Arc::new(SqliteVectorIndex::open(&path, DIMENSION).await.expect("reopen"));
    let retriever = Retriever::new(index, embedder, Duration::from_secs(5));
    let hits = retriever.retrieve("人才认定", 1).await.expect("retrieve");
    assert_eq!(hits[0].entry.record.title, "深圳市高层次人才认定办法");
}

#[tokio::test]
async fn failed_reindex_leaves_existing_entries_in_place() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("policy_index.db");
    let store = RecordStore::from_json_str(&staged_records()).expect("parse staged records");
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder::new(DIMENSION));

    {
        let index = Arc::new(SqliteVectorIndex::open(&path, DIMENSION).await.expect("open"));
        IngestionPipeline::new(index.clone(), embedder.clone())
            .ingest(store.records())
            .await;
        index.close().await;
    }

    // a truncated replacement file is refused by the loader
    assert!(RecordStore::from_json_str("[{\"title\": \"截断").is_err());

    let index = Arc::new(
        SqliteVectorIndex::open_for_reindex(&path, 128)
            .await
            .expect("open for reindex"),
    );
    assert_eq!(index.dimension(), DIMENSION);
    assert_eq!(index.count().await.expect("count"), 2);

    // the new embedder does not produce the requested dimension
    let pipeline = IngestionPipeline::new(index.clone(), embedder.clone());
    assert!(pipeline.reindex(store.records(), 128).await.is_err());
    assert!(pipeline.reindex(&[], DIMENSION).await.is_err());
    assert_eq!(index.count().await.expect("count"), 2);
    assert!(index
        .get("深圳市高层次人才认定办法")
        .await
        .expect("get")
        .is_some());
}
