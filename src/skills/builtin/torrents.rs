//! Listing and lifecycle skills: list, add, start/stop/verify/reannounce,
//! remove, move, speed limits.

use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::format::{
    effective_limit, format_progress, format_size, format_speed, truncate_name,
};
use crate::skills::{ParamType, Skill, SkillArgs, SkillParameter};
use crate::transmission::{AddTorrent, Torrent, TorrentApi, TorrentIds, TorrentStatus};

fn ids_parameter(action: &str) -> SkillParameter {
    SkillParameter::required(
        "ids",
        ParamType::Array,
        &format!("Array of torrent IDs to {action}"),
    )
}

// ── get_torrents ─────────────────────────────────────────

pub struct GetTorrentsSkill {
    api: Arc<dyn TorrentApi>,
}

impl GetTorrentsSkill {
    pub fn new(api: Arc<dyn TorrentApi>) -> Self {
        Self { api }
    }
}

fn status_filter(status: &str) -> Option<TorrentStatus> {
    match status {
        "downloading" => Some(TorrentStatus::Download),
        "seeding" => Some(TorrentStatus::Seed),
        "paused" => Some(TorrentStatus::Stopped),
        "checking" => Some(TorrentStatus::Check),
        _ => None,
    }
}

fn sort_torrents(torrents: &mut [Torrent], sort_by: &str) {
    match sort_by {
        "size" => torrents.sort_by(|a, b| b.total_size.cmp(&a.total_size)),
        "progress" => torrents.sort_by(|a, b| b.percent_done.total_cmp(&a.percent_done)),
        "uploadSpeed" => torrents.sort_by(|a, b| b.rate_upload.cmp(&a.rate_upload)),
        "downloadSpeed" => torrents.sort_by(|a, b| b.rate_download.cmp(&a.rate_download)),
        _ => torrents.sort_by_cached_key(|t| t.name.to_lowercase()),
    }
}

fn summarize(torrent: &Torrent) -> Value {
    json!({
        "id": torrent.id,
        "name": truncate_name(&torrent.name),
        "status": torrent.status().map_or("UNKNOWN", TorrentStatus::label),
        "size": format_size(torrent.total_size),
        "progress": format_progress(torrent.percent_done),
        "downloadSpeed": format_speed(torrent.rate_download),
        "uploadSpeed": format_speed(torrent.rate_upload),
    })
}

#[async_trait]
impl Skill for GetTorrentsSkill {
    fn name(&self) -> &str {
        "get_torrents"
    }

    fn description(&self) -> &str {
        "List torrents. Supports filtering by status and name keyword, sorting, and a \
         result limit. Returns compact torrent summaries."
    }

    fn parameters(&self) -> Vec<SkillParameter> {
        vec![
            SkillParameter::optional(
                "status",
                ParamType::String,
                "Status filter: all, downloading, seeding, paused, checking",
            )
            .with_default(json!("all")),
            SkillParameter::optional(
                "keyword",
                ParamType::String,
                "Case-insensitive substring of the torrent name",
            ),
            SkillParameter::optional(
                "limit",
                ParamType::Number,
                "Maximum number of torrents to return (default 20, max 100). \
                 Prefer small values when there are many torrents",
            )
            .with_default(json!(20)),
            SkillParameter::optional(
                "sortBy",
                ParamType::String,
                "Sort key: name, size, progress, uploadSpeed, downloadSpeed",
            )
            .with_default(json!("name")),
        ]
    }

    async fn execute(&self, args: SkillArgs) -> anyhow::Result<Value> {
        let mut torrents = self.api.get_torrents(None).await?;

        if let Some(status) = args.str("status").and_then(status_filter) {
            torrents.retain(|t| t.status() == Some(status));
        }

        if let Some(keyword) = args.str("keyword").filter(|k| !k.is_empty()) {
            let keyword = keyword.to_lowercase();
            torrents.retain(|t| t.name.to_lowercase().contains(&keyword));
        }

        sort_torrents(&mut torrents, args.str("sortBy").unwrap_or("name"));

        let limit = effective_limit(args.int("limit"), 20);
        let total = torrents.len();
        let listed: Vec<Value> = torrents.iter().take(limit).map(summarize).collect();

        Ok(json!({
            "total": total,
            "returned": listed.len(),
            "hasMore": total > limit,
            "torrents": listed,
        }))
    }
}

// ── add_torrent ──────────────────────────────────────────

pub struct AddTorrentSkill {
    api: Arc<dyn TorrentApi>,
}

impl AddTorrentSkill {
    pub fn new(api: Arc<dyn TorrentApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Skill for AddTorrentSkill {
    fn name(&self) -> &str {
        "add_torrent"
    }

    fn description(&self) -> &str {
        "Add a new torrent from a magnet link"
    }

    fn parameters(&self) -> Vec<SkillParameter> {
        vec![
            SkillParameter::required(
                "magnet",
                ParamType::String,
                "Magnet link, starting with magnet:?xt=urn:btih:",
            ),
            SkillParameter::optional(
                "paused",
                ParamType::Boolean,
                "Add in paused state instead of starting immediately",
            )
            .with_default(json!(false)),
        ]
    }

    async fn execute(&self, args: SkillArgs) -> anyhow::Result<Value> {
        let magnet = args.require_str("magnet")?;
        let result = self
            .api
            .add_torrent(AddTorrent {
                filename: Some(magnet.to_string()),
                paused: args.bool("paused").unwrap_or(false),
                ..AddTorrent::default()
            })
            .await?;

        let (message, added) = match result.get("torrent-duplicate") {
            Some(dup) => ("Torrent already exists", dup.clone()),
            None => (
                "Torrent added",
                result.get("torrent-added").cloned().unwrap_or_default(),
            ),
        };

        Ok(json!({
            "success": true,
            "message": message,
            "torrent": {
                "id": added.get("id"),
                "name": added.get("name"),
            },
        }))
    }
}

// ── start / stop / verify / reannounce ───────────────────

/// Id-only operations that share one shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAction {
    Start,
    Stop,
    Verify,
    Reannounce,
}

impl BatchAction {
    fn skill_name(self) -> &'static str {
        match self {
            Self::Start => "start_torrents",
            Self::Stop => "stop_torrents",
            Self::Verify => "verify_torrents",
            Self::Reannounce => "reannounce_torrents",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Start => "Start (resume) the given torrents, downloading or seeding",
            Self::Stop => "Pause the given torrents",
            Self::Verify => "Verify local data integrity of the given torrents",
            Self::Reannounce => "Ask trackers for more peers for the given torrents now",
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "pause",
            Self::Verify => "verify",
            Self::Reannounce => "reannounce",
        }
    }
}

pub struct BatchActionSkill {
    api: Arc<dyn TorrentApi>,
    action: BatchAction,
}

impl BatchActionSkill {
    pub fn new(api: Arc<dyn TorrentApi>, action: BatchAction) -> Self {
        Self { api, action }
    }
}

#[async_trait]
impl Skill for BatchActionSkill {
    fn name(&self) -> &str {
        self.action.skill_name()
    }

    fn description(&self) -> &str {
        self.action.description()
    }

    fn parameters(&self) -> Vec<SkillParameter> {
        vec![ids_parameter(self.action.verb())]
    }

    async fn execute(&self, args: SkillArgs) -> anyhow::Result<Value> {
        let ids = args.ids("ids")?;
        let count = ids.len();
        let ids: TorrentIds = ids.into();
        match self.action {
            BatchAction::Start => self.api.start_torrents(ids).await?,
            BatchAction::Stop => self.api.stop_torrents(ids).await?,
            BatchAction::Verify => self.api.verify_torrents(ids).await?,
            BatchAction::Reannounce => self.api.reannounce_torrents(ids).await?,
        }

        let message = match self.action {
            BatchAction::Start => format!("Started {count} torrent(s)"),
            BatchAction::Stop => format!("Paused {count} torrent(s)"),
            BatchAction::Verify => format!("Verification started for {count} torrent(s)"),
            BatchAction::Reannounce => format!("Reannounce requested for {count} torrent(s)"),
        };
        Ok(json!({ "success": true, "message": message }))
    }
}

// ── remove_torrents ──────────────────────────────────────

pub struct RemoveTorrentsSkill {
    api: Arc<dyn TorrentApi>,
}

impl RemoveTorrentsSkill {
    pub fn new(api: Arc<dyn TorrentApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Skill for RemoveTorrentsSkill {
    fn name(&self) -> &str {
        "remove_torrents"
    }

    fn description(&self) -> &str {
        "Remove the given torrents, optionally deleting their downloaded data"
    }

    fn parameters(&self) -> Vec<SkillParameter> {
        vec![
            ids_parameter("remove"),
            SkillParameter::optional(
                "deleteLocalData",
                ParamType::Boolean,
                "Also delete the downloaded files",
            )
            .with_default(json!(false)),
        ]
    }

    async fn execute(&self, args: SkillArgs) -> anyhow::Result<Value> {
        let ids = args.ids("ids")?;
        let delete = args.bool("deleteLocalData").unwrap_or(false);
        let count = ids.len();
        self.api.remove_torrents(ids.into(), delete).await?;

        let suffix = if delete { " (including local data)" } else { "" };
        Ok(json!({
            "success": true,
            "message": format!("Removed {count} torrent(s){suffix}"),
        }))
    }
}

// ── set_speed_limit ──────────────────────────────────────

pub struct SetSpeedLimitSkill {
    api: Arc<dyn TorrentApi>,
}

impl SetSpeedLimitSkill {
    pub fn new(api: Arc<dyn TorrentApi>) -> Self {
        Self { api }
    }
}

/// Negative limits lift the cap and leave the stored value alone.
fn insert_limit(fields: &mut Map<String, Value>, key: &str, limit: i64) {
    fields.insert(format!("{key}Limited"), json!(limit >= 0));
    if limit >= 0 {
        fields.insert(format!("{key}Limit"), json!(limit));
    }
}

#[async_trait]
impl Skill for SetSpeedLimitSkill {
    fn name(&self) -> &str {
        "set_speed_limit"
    }

    fn description(&self) -> &str {
        "Set per-torrent download/upload speed limits"
    }

    fn parameters(&self) -> Vec<SkillParameter> {
        vec![
            ids_parameter("limit"),
            SkillParameter::optional(
                "downloadLimit",
                ParamType::Number,
                "Download limit in KB/s, -1 for unlimited",
            ),
            SkillParameter::optional(
                "uploadLimit",
                ParamType::Number,
                "Upload limit in KB/s, -1 for unlimited",
            ),
        ]
    }

    async fn execute(&self, args: SkillArgs) -> anyhow::Result<Value> {
        let ids = args.ids("ids")?;
        let download = args.int("downloadLimit");
        let upload = args.int("uploadLimit");
        if download.is_none() && upload.is_none() {
            bail!("Specify downloadLimit and/or uploadLimit");
        }

        let mut fields = Map::new();
        if let Some(limit) = download {
            insert_limit(&mut fields, "download", limit);
        }
        if let Some(limit) = upload {
            insert_limit(&mut fields, "upload", limit);
        }

        let count = ids.len();
        self.api.set_torrents(ids.into(), fields).await?;
        Ok(json!({
            "success": true,
            "message": format!("Updated speed limits for {count} torrent(s)"),
        }))
    }
}

// ── move_torrents ────────────────────────────────────────

pub struct MoveTorrentsSkill {
    api: Arc<dyn TorrentApi>,
}

impl MoveTorrentsSkill {
    pub fn new(api: Arc<dyn TorrentApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Skill for MoveTorrentsSkill {
    fn name(&self) -> &str {
        "move_torrents"
    }

    fn description(&self) -> &str {
        "Change the download directory of the given torrents"
    }

    fn parameters(&self) -> Vec<SkillParameter> {
        vec![
            ids_parameter("move"),
            SkillParameter::required("location", ParamType::String, "New download directory"),
            SkillParameter::optional(
                "move",
                ParamType::Boolean,
                "Move existing data to the new location (false: only look for it there)",
            )
            .with_default(json!(true)),
        ]
    }

    async fn execute(&self, args: SkillArgs) -> anyhow::Result<Value> {
        let ids = args.ids("ids")?;
        let location = args.require_str("location")?;
        let move_data = args.bool("move").unwrap_or(true);
        let count = ids.len();
        self.api
            .set_location(ids.into(), location, move_data)
            .await?;

        Ok(json!({
            "success": true,
            "message": format!("Set location of {count} torrent(s) to {location}"),
        }))
    }
}
