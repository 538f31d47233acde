use idoc_core::IdocConfig;
use idoc_download::DirectorySaveTarget;
use idoc_preload::{AppContext, JsonDirBackend};
use idoc_queue::Immediate;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

pub async fn execute(config: IdocConfig, data: PathBuf, user: String) -> eyre::Result<()> {
    let report = preload_user(config, data, &user).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Prefetch `user`'s data from the fixtures in `data` and describe what
/// ended up in the cache
pub async fn preload_user(
    config: IdocConfig,
    data: PathBuf,
    user: &str,
) -> eyre::Result<serde_json::Value> {
    // Nothing is saved here; the target only satisfies the context.
    let save_dir = data.clone();
    let context = AppContext::builder(config)
        .backend(Arc::new(JsonDirBackend::new(data)))
        .save_target(Arc::new(DirectorySaveTarget::new(save_dir)))
        .idle_scheduler(Arc::new(Immediate))
        .build()?;

    context.preloader.prefetch_user_data(user);
    context.queue.wait_idle().await;

    let preloader = &context.preloader;
    let cache = preloader.cache();
    let mut keys = cache.keys();
    keys.sort();

    Ok(json!({
        "user": user,
        "keys": keys,
        "templates": preloader.templates().map(|t| t.len()),
        "profile": preloader.profile(user).map(|p| p.email.clone()),
        "recent_documents": preloader.recent_documents(user).map(|d| d.len()),
        "statistics": cache.statistics(),
    }))
}
