//! Reseed (cross-seed) discovery.
//!
//! Torrents with identical name and total size are treated as the same
//! content seeded on several trackers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use url::Url;

use super::format::{effective_limit, format_progress, format_ratio, format_size, truncate_name};
use crate::skills::{ParamType, Skill, SkillArgs, SkillParameter};
use crate::transmission::{Torrent, TorrentApi};

pub struct GetReseedInfoSkill {
    api: Arc<dyn TorrentApi>,
}

impl GetReseedInfoSkill {
    pub fn new(api: Arc<dyn TorrentApi>) -> Self {
        Self { api }
    }
}

/// Groups torrents by `(name, total_size)`, in order of first appearance.
fn group_by_content(torrents: &[Torrent]) -> Vec<Vec<&Torrent>> {
    let mut index: HashMap<(&str, u64), usize> = HashMap::new();
    let mut groups: Vec<Vec<&Torrent>> = Vec::new();
    for torrent in torrents {
        let key = (torrent.name.as_str(), torrent.total_size);
        match index.get(&key) {
            Some(&i) => groups[i].push(torrent),
            None => {
                index.insert(key, groups.len());
                groups.push(vec![torrent]);
            }
        }
    }
    groups
}

/// Host of the first tracker's announce URL.
fn tracker_name(torrent: &Torrent) -> String {
    let Some(stat) = torrent.tracker_stats.first() else {
        return "Unknown".to_string();
    };
    Url::parse(&stat.announce)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| stat.announce.clone())
}

fn describe_group(group: &[&Torrent]) -> Value {
    let first = group[0];

    let members: Vec<Value> = group
        .iter()
        .map(|t| {
            json!({
                "id": t.id,
                "tracker": tracker_name(t),
                "status": if t.error_string.is_empty() { "Normal" } else { "Error" },
                "progress": format_progress(t.percent_done),
                "ratio": format_ratio(t.upload_ratio),
                "uploaded": format_size(t.uploaded_ever),
            })
        })
        .collect();

    let total_uploaded: u64 = group.iter().map(|t| t.uploaded_ever).sum();
    let ratio_sum: f64 = group.iter().map(|t| t.upload_ratio.max(0.0)).sum();
    let avg_ratio = ratio_sum / group.len() as f64;

    json!({
        "fileName": truncate_name(&first.name),
        "fileSize": format_size(first.total_size),
        "reseedCount": group.len(),
        "trackers": members,
        "totalUploaded": format_size(total_uploaded),
        "avgRatio": format_ratio(avg_ratio),
    })
}

#[async_trait]
impl Skill for GetReseedInfoSkill {
    fn name(&self) -> &str {
        "get_reseed_info"
    }

    fn description(&self) -> &str {
        "Find reseeded content: torrents with the same name and size on different \
         trackers. Shows which files are reseeded and on which trackers, with upload \
         totals and ratios."
    }

    fn parameters(&self) -> Vec<SkillParameter> {
        vec![
            SkillParameter::optional(
                "keyword",
                ParamType::String,
                "Case-insensitive substring of the file name",
            ),
            SkillParameter::optional(
                "minReseedCount",
                ParamType::Number,
                "Only return files with at least this many torrents (default 2)",
            )
            .with_default(json!(2)),
            SkillParameter::optional(
                "limit",
                ParamType::Number,
                "Maximum number of files to return (default 20)",
            )
            .with_default(json!(20)),
        ]
    }

    async fn execute(&self, args: SkillArgs) -> anyhow::Result<Value> {
        let torrents = self.api.get_torrents(None).await?;

        let min_count = match args.int("minReseedCount") {
            Some(n) if n > 0 => n as usize,
            _ => 2,
        };
        let keyword = args
            .str("keyword")
            .filter(|k| !k.is_empty())
            .map(str::to_lowercase);

        let mut groups: Vec<Vec<&Torrent>> = group_by_content(&torrents)
            .into_iter()
            .filter(|g| g.len() >= min_count)
            .filter(|g| {
                keyword
                    .as_ref()
                    .map_or(true, |k| g[0].name.to_lowercase().contains(k))
            })
            .collect();

        // Stable: equal-sized groups keep first-appearance order
        groups.sort_by(|a, b| b.len().cmp(&a.len()));

        let limit = effective_limit(args.int("limit"), 20);
        let reseeds: Vec<Value> = groups.iter().take(limit).map(|g| describe_group(g)).collect();

        Ok(json!({
            "total": groups.len(),
            "returned": reseeds.len(),
            "hasMore": groups.len() > limit,
            "reseeds": reseeds,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::builtin::run;
    use crate::transmission::testing::{torrent, FakeTorrentApi};
    use crate::transmission::TrackerStat;

    fn seeded(id: i64, name: &str, size: u64, announce: &str, ratio: f64, uploaded: u64) -> Torrent {
        let mut t = torrent(id, name);
        t.total_size = size;
        t.percent_done = 1.0;
        t.upload_ratio = ratio;
        t.uploaded_ever = uploaded;
        t.tracker_stats = vec![TrackerStat {
            announce: announce.to_string(),
            ..TrackerStat::default()
        }];
        t
    }

    fn fixture() -> Arc<FakeTorrentApi> {
        Arc::new(FakeTorrentApi::with_torrents(vec![
            seeded(1, "Movie.2024", 4096, "https://tracker-a.example/announce?pk=1", 1.5, 2048),
            seeded(2, "Movie.2024", 4096, "udp://tracker-b.example:6969", 0.5, 1024),
            seeded(3, "Movie.2024", 4097, "https://tracker-c.example/announce", 1.0, 0),
            seeded(4, "Album", 1024, "https://tracker-a.example/announce", -1.0, 0),
            seeded(5, "Album", 1024, "not a url", 2.0, 512),
            seeded(6, "Album", 1024, "https://tracker-c.example/announce", 1.0, 0),
            seeded(7, "Lonely", 10, "https://tracker-a.example/announce", 0.0, 0),
        ]))
    }

    #[tokio::test]
    async fn test_groups_by_name_and_size() {
        let skill = GetReseedInfoSkill::new(fixture());
        let result = run(&skill, json!({})).await.unwrap();

        assert_eq!(result["total"], 2);
        let reseeds = result["reseeds"].as_array().unwrap();
        // Album (3 members) sorts before Movie.2024 (2 members, size 4097 is separate)
        assert_eq!(reseeds[0]["fileName"], "Album");
        assert_eq!(reseeds[0]["reseedCount"], 3);
        assert_eq!(reseeds[1]["fileName"], "Movie.2024");
        assert_eq!(reseeds[1]["reseedCount"], 2);
    }

    #[tokio::test]
    async fn test_group_details() {
        let skill = GetReseedInfoSkill::new(fixture());
        let result = run(&skill, json!({"keyword": "movie"})).await.unwrap();
        let group = &result["reseeds"][0];

        assert_eq!(group["fileSize"], "4.0KB");
        assert_eq!(group["totalUploaded"], "3.0KB");
        assert_eq!(group["avgRatio"], "1.00");
        assert_eq!(
            group["trackers"][0],
            json!({
                "id": 1,
                "tracker": "tracker-a.example",
                "status": "Normal",
                "progress": "100%",
                "ratio": "1.50",
                "uploaded": "2.0KB",
            })
        );
        assert_eq!(group["trackers"][1]["tracker"], "tracker-b.example");
    }

    #[tokio::test]
    async fn test_negative_ratio_and_unparseable_tracker() {
        let skill = GetReseedInfoSkill::new(fixture());
        let result = run(&skill, json!({"keyword": "album"})).await.unwrap();
        let group = &result["reseeds"][0];

        assert_eq!(group["trackers"][0]["ratio"], "0.00");
        assert_eq!(group["trackers"][1]["tracker"], "not a url");
        // (0 + 2 + 1) / 3
        assert_eq!(group["avgRatio"], "1.00");
    }

    #[tokio::test]
    async fn test_min_reseed_count_and_limit() {
        let skill = GetReseedInfoSkill::new(fixture());
        let result = run(&skill, json!({"minReseedCount": 3})).await.unwrap();
        assert_eq!(result["total"], 1);

        let result = run(&skill, json!({"minReseedCount": 1, "limit": 2}))
            .await
            .unwrap();
        assert_eq!(result["total"], 4);
        assert_eq!(result["returned"], 2);
        assert_eq!(result["hasMore"], true);
    }

    #[tokio::test]
    async fn test_error_status_and_missing_tracker() {
        let mut broken = torrent(1, "X");
        broken.error_string = "Tracker gave HTTP response code 404".to_string();
        let api = Arc::new(FakeTorrentApi::with_torrents(vec![broken, torrent(2, "X")]));
        let result = run(&GetReseedInfoSkill::new(api), json!({})).await.unwrap();

        let members = &result["reseeds"][0]["trackers"];
        assert_eq!(members[0]["status"], "Error");
        assert_eq!(members[1]["status"], "Normal");
        assert_eq!(members[1]["tracker"], "Unknown");
    }
}
