use bytes::Bytes;
use eyre::WrapErr;
use idoc_core::IdocConfig;
use idoc_download::{
    DirectorySaveTarget, DownloadId, DownloadStatus, DownloadTask, DownloadTracker,
    MemoryHandleRegistry,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub async fn execute(config: IdocConfig, out: PathBuf, files: Vec<PathBuf>) -> eyre::Result<()> {
    let tasks = save_files(&config, &out, &files).await?;

    let failed = tasks
        .iter()
        .filter(|t| t.status == DownloadStatus::Error)
        .count();
    tracing::info!(
        saved = tasks.len() - failed,
        failed,
        out = %out.display(),
        "save finished"
    );

    if failed > 0 {
        eyre::bail!("{failed} of {} files could not be saved", tasks.len());
    }
    Ok(())
}

/// Save every file into `out` through a download tracker and return the
/// final state of each task, in input order
pub async fn save_files(
    config: &IdocConfig,
    out: &Path,
    files: &[PathBuf],
) -> eyre::Result<Vec<DownloadTask>> {
    tokio::fs::create_dir_all(out)
        .await
        .wrap_err_with(|| format!("failed to create output directory {}", out.display()))?;

    let mut items = Vec::with_capacity(files.len());
    for path in files {
        let content = tokio::fs::read(path)
            .await
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| eyre::eyre!("{} has no file name", path.display()))?;
        items.push((Bytes::from(content), filename));
    }

    let tracker = DownloadTracker::new(
        Arc::new(MemoryHandleRegistry::new()),
        Arc::new(DirectorySaveTarget::new(out)),
        config.download.clone(),
    );

    // Terminal states are captured as they are reported; with a short grace
    // period a finished task may be gone before the whole batch is done.
    let finished: Arc<Mutex<HashMap<DownloadId, DownloadTask>>> = Arc::default();
    let sink = Arc::clone(&finished);
    let last_seen: Mutex<HashMap<DownloadId, DownloadStatus>> = Mutex::new(HashMap::new());
    let subscription = tracker.subscribe(move |tasks| {
        let mut last_seen = last_seen.lock();
        for task in tasks {
            if last_seen.insert(task.id, task.status) == Some(task.status) {
                continue;
            }
            match &task.error {
                Some(error) => println!("{}: {} ({error})", task.filename, task.status),
                None => println!("{}: {}", task.filename, task.status),
            }
            if task.status.is_terminal() {
                sink.lock().insert(task.id, task.clone());
            }
        }
    });

    let ids = tracker.download_multiple(items).await;
    subscription.unsubscribe();

    let mut finished = finished.lock();
    let tasks = ids
        .iter()
        .map(|id| {
            finished
                .remove(id)
                .ok_or_else(|| eyre::eyre!("download {id} never reported a terminal state"))
        })
        .collect::<eyre::Result<Vec<_>>>();
    tasks
}
