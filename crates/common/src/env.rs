//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use tracing::{info, warn};

/// Ensure the data directory exists, creating it when missing.
/// An empty path means the store runs in memory and nothing is created.
pub async fn ensure_env(data_dir: &str) -> anyhow::Result<()> {
    if data_dir.trim().is_empty() {
        warn!("no data directory configured; documents will not survive a restart");
        return Ok(());
    }
    if tokio::fs::metadata(data_dir).await.is_err() {
        info!(%data_dir, "creating data directory");
    }
    tokio::fs::create_dir_all(data_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {data_dir}: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_env_creates_nested_dir() -> anyhow::Result<()> {
        let dir = std::env::temp_dir()
            .join(format!("fixo_env_{}", uuid::Uuid::new_v4()))
            .join("data");
        let path = dir.to_string_lossy().to_string();
        ensure_env(&path).await?;
        assert!(tokio::fs::metadata(&dir).await?.is_dir());
        let _ = tokio::fs::remove_dir_all(dir.parent().unwrap_or(&dir)).await;
        Ok(())
    }

    #[tokio::test]
    async fn ensure_env_accepts_empty_path() -> anyhow::Result<()> {
        ensure_env("  ").await
    }
}
