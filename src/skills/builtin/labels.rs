//! Label management: add, remove, replace, and query by label.
//!
//! Transmission stores labels as an ordered list and `torrent-set` replaces
//! it wholesale, so add/remove read the current labels first.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::format::{effective_limit, format_size, truncate_name};
use crate::skills::{ParamType, Skill, SkillArgs, SkillParameter};
use crate::transmission::{TorrentApi, TorrentIds};

fn label_parameters(ids_desc: &str, labels_desc: &str) -> Vec<SkillParameter> {
    vec![
        SkillParameter::required("ids", ParamType::Array, ids_desc),
        SkillParameter::required("labels", ParamType::Array, labels_desc),
    ]
}

/// Order-preserving de-duplication.
fn dedup(labels: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for label in labels {
        if !out.contains(&label) {
            out.push(label);
        }
    }
    out
}

async fn set_labels(api: &dyn TorrentApi, ids: TorrentIds, labels: Vec<String>) -> anyhow::Result<()> {
    let mut fields = Map::new();
    fields.insert("labels".to_string(), json!(labels));
    api.set_torrents(ids, fields).await
}

/// Fetches the given torrents and rewrites each one's labels with `edit`.
/// Returns how many torrents were updated.
async fn edit_labels(
    api: &dyn TorrentApi,
    ids: Vec<i64>,
    edit: impl Fn(&[String]) -> Vec<String> + Send + Sync,
) -> anyhow::Result<usize> {
    let torrents = api.get_torrents(Some(ids.into())).await?;
    for torrent in &torrents {
        set_labels(api, TorrentIds::Single(torrent.id), edit(&torrent.labels)).await?;
    }
    Ok(torrents.len())
}

// ── add_labels ───────────────────────────────────────────

pub struct AddLabelsSkill {
    api: Arc<dyn TorrentApi>,
}

impl AddLabelsSkill {
    pub fn new(api: Arc<dyn TorrentApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Skill for AddLabelsSkill {
    fn name(&self) -> &str {
        "add_labels"
    }

    fn description(&self) -> &str {
        "Add labels to the given torrents, keeping their existing labels. Labels are \
         useful for categorising or marking cross-seeds (torrents of the same content \
         on several trackers)."
    }

    fn parameters(&self) -> Vec<SkillParameter> {
        label_parameters(
            "Array of torrent IDs to label",
            "Labels to add, e.g. [\"movies\", \"cross-seed\"]",
        )
    }

    async fn execute(&self, args: SkillArgs) -> anyhow::Result<Value> {
        let ids = args.ids("ids")?;
        let labels = args.strings("labels")?;

        let updated = edit_labels(self.api.as_ref(), ids, |current| {
            dedup(current.iter().chain(&labels).cloned())
        })
        .await?;

        Ok(json!({
            "success": true,
            "message": format!("Added labels to {updated} torrent(s): {}", labels.join(", ")),
        }))
    }
}

// ── remove_labels ────────────────────────────────────────

pub struct RemoveLabelsSkill {
    api: Arc<dyn TorrentApi>,
}

impl RemoveLabelsSkill {
    pub fn new(api: Arc<dyn TorrentApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Skill for RemoveLabelsSkill {
    fn name(&self) -> &str {
        "remove_labels"
    }

    fn description(&self) -> &str {
        "Remove labels from the given torrents"
    }

    fn parameters(&self) -> Vec<SkillParameter> {
        label_parameters("Array of torrent IDs", "Labels to remove")
    }

    async fn execute(&self, args: SkillArgs) -> anyhow::Result<Value> {
        let ids = args.ids("ids")?;
        let labels = args.strings("labels")?;

        let updated = edit_labels(self.api.as_ref(), ids, |current| {
            current
                .iter()
                .filter(|l| !labels.contains(l))
                .cloned()
                .collect()
        })
        .await?;

        Ok(json!({
            "success": true,
            "message": format!("Removed labels from {updated} torrent(s): {}", labels.join(", ")),
        }))
    }
}

// ── replace_labels ───────────────────────────────────────

pub struct ReplaceLabelsSkill {
    api: Arc<dyn TorrentApi>,
}

impl ReplaceLabelsSkill {
    pub fn new(api: Arc<dyn TorrentApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Skill for ReplaceLabelsSkill {
    fn name(&self) -> &str {
        "replace_labels"
    }

    fn description(&self) -> &str {
        "Replace all labels of the given torrents with a new set (an empty array clears them)"
    }

    fn parameters(&self) -> Vec<SkillParameter> {
        label_parameters("Array of torrent IDs", "New labels")
    }

    async fn execute(&self, args: SkillArgs) -> anyhow::Result<Value> {
        let ids = args.ids("ids")?;
        let labels = dedup(args.strings("labels")?);
        let count = ids.len();

        set_labels(self.api.as_ref(), ids.into(), labels.clone()).await?;

        Ok(json!({
            "success": true,
            "message": format!("Replaced labels of {count} torrent(s) with: {}", labels.join(", ")),
        }))
    }
}

// ── get_torrents_by_label ────────────────────────────────

pub struct GetTorrentsByLabelSkill {
    api: Arc<dyn TorrentApi>,
}

impl GetTorrentsByLabelSkill {
    pub fn new(api: Arc<dyn TorrentApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Skill for GetTorrentsByLabelSkill {
    fn name(&self) -> &str {
        "get_torrents_by_label"
    }

    fn description(&self) -> &str {
        "List torrents carrying a given label"
    }

    fn parameters(&self) -> Vec<SkillParameter> {
        vec![
            SkillParameter::required("label", ParamType::String, "Label to look for"),
            SkillParameter::optional(
                "limit",
                ParamType::Number,
                "Maximum number of torrents to return (default 20)",
            )
            .with_default(json!(20)),
        ]
    }

    async fn execute(&self, args: SkillArgs) -> anyhow::Result<Value> {
        let label = args.require_str("label")?;
        let torrents = self.api.get_torrents(None).await?;

        let matching: Vec<_> = torrents
            .iter()
            .filter(|t| t.labels.iter().any(|l| l == label))
            .collect();

        let limit = effective_limit(args.int("limit"), 20);
        let listed: Vec<Value> = matching
            .iter()
            .take(limit)
            .map(|t| {
                json!({
                    "id": t.id,
                    "name": truncate_name(&t.name),
                    "size": format_size(t.total_size),
                    "labels": t.labels,
                })
            })
            .collect();

        Ok(json!({
            "total": matching.len(),
            "returned": listed.len(),
            "hasMore": matching.len() > limit,
            "torrents": listed,
        }))
    }
}
