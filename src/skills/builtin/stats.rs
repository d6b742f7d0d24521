//! Session-level skills: transfer statistics and free disk space.

use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::format::format_size;
use crate::skills::{ParamType, Skill, SkillArgs, SkillParameter};
use crate::transmission::TorrentApi;

pub struct GetStatsSkill {
    api: Arc<dyn TorrentApi>,
}

impl GetStatsSkill {
    pub fn new(api: Arc<dyn TorrentApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Skill for GetStatsSkill {
    fn name(&self) -> &str {
        "get_stats"
    }

    fn description(&self) -> &str {
        "Get session statistics: total download/upload speed (bytes/s) and torrent counts"
    }

    fn parameters(&self) -> Vec<SkillParameter> {
        vec![]
    }

    async fn execute(&self, _args: SkillArgs) -> anyhow::Result<Value> {
        let stats = self.api.session_stats().await?;
        Ok(json!({
            "downloadSpeed": stats.download_speed,
            "uploadSpeed": stats.upload_speed,
            "activeTorrentCount": stats.active_torrent_count,
            "pausedTorrentCount": stats.paused_torrent_count,
            "torrentCount": stats.torrent_count,
        }))
    }
}

pub struct GetFreeSpaceSkill {
    api: Arc<dyn TorrentApi>,
}

impl GetFreeSpaceSkill {
    pub fn new(api: Arc<dyn TorrentApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Skill for GetFreeSpaceSkill {
    fn name(&self) -> &str {
        "get_free_space"
    }

    fn description(&self) -> &str {
        "Get free disk space of a directory on the torrent host. \
         Defaults to the default download directory."
    }

    fn parameters(&self) -> Vec<SkillParameter> {
        vec![SkillParameter::optional(
            "path",
            ParamType::String,
            "Directory to check (default: the download directory)",
        )]
    }

    async fn execute(&self, args: SkillArgs) -> anyhow::Result<Value> {
        let path = match args.str("path").filter(|p| !p.trim().is_empty()) {
            Some(path) => path.to_string(),
            None => {
                let session = self.api.session_get().await?;
                session
                    .get("download-dir")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("Session has no download directory"))?
            }
        };

        let space = self.api.free_space(&path).await?;
        let bytes = u64::try_from(space.size_bytes)
            .map_err(|_| anyhow!("Free space unavailable for {path}"))?;

        Ok(json!({
            "path": space.path,
            "freeSpace": format_size(bytes),
            "freeBytes": bytes,
        }))
    }
}
