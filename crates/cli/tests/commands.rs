use idoc::commands::{preload, save};
use idoc_core::{IdocConfig, IdocConfigBuilder};
use idoc_download::DownloadStatus;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_save_writes_every_file() {
    let input = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let first = input.path().join("lease.pdf");
    let second = input.path().join("notes.txt");
    std::fs::write(&first, b"lease").unwrap();
    std::fs::write(&second, b"notes").unwrap();

    let tasks = save::save_files(&IdocConfig::default(), out.path(), &[first, second])
        .await
        .unwrap();

    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| t.status == DownloadStatus::Completed));
    assert_eq!(std::fs::read(out.path().join("lease.pdf")).unwrap(), b"lease");
    assert_eq!(std::fs::read(out.path().join("notes.txt")).unwrap(), b"notes");
}

#[tokio::test]
async fn test_save_fails_on_missing_input() {
    let out = TempDir::new().unwrap();
    let missing = out.path().join("does-not-exist.pdf");

    let err = save::save_files(&IdocConfig::default(), out.path(), &[missing])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("failed to read"));
}

#[tokio::test]
async fn test_preload_reports_cached_data() {
    let data = TempDir::new().unwrap();
    std::fs::write(
        data.path().join("templates.json"),
        r#"[{"id": "nda", "name": "Mutual NDA"}, {"id": "will", "name": "Last Will"}]"#,
    )
    .unwrap();
    std::fs::write(
        data.path().join("profiles.json"),
        r#"[{"id": "u1", "email": "ada@example.com"}]"#,
    )
    .unwrap();

    let report = preload::preload_user(IdocConfig::default(), data.path().to_path_buf(), "u1")
        .await
        .unwrap();

    assert_eq!(report["templates"], 2);
    assert_eq!(report["profile"], "ada@example.com");
    assert!(report["recent_documents"].is_null());
    assert_eq!(report["keys"], serde_json::json!(["profile_u1", "templates"]));
    assert_eq!(report["statistics"]["loads"], 2);
}

#[tokio::test]
async fn test_save_reports_failures_removed_by_short_grace() {
    let input = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let good = input.path().join("good.txt");
    let blocked = input.path().join("blocked.txt");
    std::fs::write(&good, b"good").unwrap();
    std::fs::write(&blocked, b"blocked").unwrap();
    // A directory in the way makes the final rename fail
    std::fs::create_dir(out.path().join("blocked.txt")).unwrap();

    let config = IdocConfigBuilder::new()
        .with_success_grace(Duration::from_millis(1))
        .with_error_grace(Duration::from_millis(1))
        .build()
        .unwrap();

    let tasks = save::save_files(&config, out.path(), &[blocked, good])
        .await
        .unwrap();

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].status, DownloadStatus::Error);
    assert!(tasks[0].error.is_some());
    assert_eq!(tasks[1].status, DownloadStatus::Completed);
}
