use super::*;
use tempfile::TempDir;

#[tokio::test]
async fn test_source_name() {
    let source = SqliteConfigSource::in_memory(DEFAULT_TABLE).await.unwrap();
    assert_eq!(source.name(), "sqlite");
    assert_eq!(source.table(), "data_config");
}

#[tokio::test]
async fn test_empty_table_fetches_nothing() {
    let source = SqliteConfigSource::in_memory(DEFAULT_TABLE).await.unwrap();
    assert!(source.fetch_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_set_and_fetch() {
    let source = SqliteConfigSource::in_memory(DEFAULT_TABLE).await.unwrap();
    source.set("job1_cron", "*/5 * * * * *").await.unwrap();
    source.set("job1_enable", "true").await.unwrap();

    let values = source.fetch_all().await.unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values["job1_cron"], "*/5 * * * * *");
    assert_eq!(values["job1_enable"], "true");
}

#[tokio::test]
async fn test_set_overwrites() {
    let source = SqliteConfigSource::in_memory(DEFAULT_TABLE).await.unwrap();
    source.set("job1_enable", "true").await.unwrap();
    source.set("job1_enable", "false").await.unwrap();

    let rows = source.list().await.unwrap();
    assert_eq!(rows, vec![("job1_enable".to_string(), "false".to_string())]);
}

#[tokio::test]
async fn test_remove() {
    let source = SqliteConfigSource::in_memory(DEFAULT_TABLE).await.unwrap();
    source.set("k", "v").await.unwrap();

    assert!(source.remove("k").await.unwrap());
    assert!(!source.remove("k").await.unwrap());
    assert!(source.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_is_sorted() {
    let source = SqliteConfigSource::in_memory(DEFAULT_TABLE).await.unwrap();
    source.set("job2_cron", "0 * * * * *").await.unwrap();
    source.set("job1_cron", "0 0 * * * *").await.unwrap();

    let keys: Vec<String> = source.list().await.unwrap().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["job1_cron", "job2_cron"]);
}

#[tokio::test]
async fn test_null_value_reads_as_empty() {
    let source = SqliteConfigSource::in_memory(DEFAULT_TABLE).await.unwrap();
    source
        .conn
        .call(|conn| {
            conn.execute(
                "INSERT INTO data_config (config_key, config_value) VALUES ('job1_cron', NULL)",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();

    let values = source.fetch_all().await.unwrap();
    assert_eq!(values["job1_cron"], "");
}

#[tokio::test]
async fn test_custom_table() {
    let source = SqliteConfigSource::in_memory("schedule_values").await.unwrap();
    source.set("rate", "1000").await.unwrap();
    assert_eq!(source.fetch_all().await.unwrap()["rate"], "1000");
}

#[tokio::test]
async fn test_invalid_table_rejected() {
    let result = SqliteConfigSource::in_memory("data_config; DROP TABLE x").await;
    assert!(matches!(result, Err(SourceError::Query(_))));
}

#[tokio::test]
async fn test_file_backed_persists() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.db");

    {
        let source = SqliteConfigSource::open(&path, DEFAULT_TABLE).await.unwrap();
        source.set("job2_enable", "off").await.unwrap();
    }

    let reopened = SqliteConfigSource::open(&path, DEFAULT_TABLE).await.unwrap();
    let values = reopened.fetch_all().await.unwrap();
    assert_eq!(values["job2_enable"], "off");
}
