//! Torrent-management API consumed by the builtin skills.
//!
//! The contract is Transmission's JSON-RPC method set. Implementations
//! only provide the raw [`TorrentApi::call`]; the typed operations are
//! built on top of it.

pub mod client;
pub mod types;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Map, Value};

pub use client::TransmissionClient;
pub use types::{
    AddTorrent, FreeSpace, SessionStats, Torrent, TorrentIds, TorrentStatus, TrackerStat,
};

/// Fields requested by [`TorrentApi::get_torrents`].
pub const DEFAULT_TORRENT_FIELDS: &[&str] = &[
    "id",
    "name",
    "status",
    "totalSize",
    "percentDone",
    "rateDownload",
    "rateUpload",
    "uploadRatio",
    "eta",
    "error",
    "errorString",
    "downloadDir",
    "hashString",
    "trackerStats",
    "uploadedEver",
    "downloadedEver",
    "addedDate",
    "labels",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcMethod {
    TorrentGet,
    TorrentAdd,
    TorrentStart,
    TorrentStop,
    TorrentRemove,
    TorrentVerify,
    TorrentReannounce,
    TorrentSetLocation,
    TorrentSet,
    SessionStats,
    SessionGet,
    SessionSet,
    PortTest,
    FreeSpace,
}

impl RpcMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TorrentGet => "torrent-get",
            Self::TorrentAdd => "torrent-add",
            Self::TorrentStart => "torrent-start",
            Self::TorrentStop => "torrent-stop",
            Self::TorrentRemove => "torrent-remove",
            Self::TorrentVerify => "torrent-verify",
            Self::TorrentReannounce => "torrent-reannounce",
            Self::TorrentSetLocation => "torrent-set-location",
            Self::TorrentSet => "torrent-set",
            Self::SessionStats => "session-stats",
            Self::SessionGet => "session-get",
            Self::SessionSet => "session-set",
            Self::PortTest => "port-test",
            Self::FreeSpace => "free-space",
        }
    }
}

impl std::fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait TorrentApi: Send + Sync {
    /// Invokes one RPC method and returns its `arguments` object.
    async fn call(&self, method: RpcMethod, arguments: Value) -> anyhow::Result<Value>;

    async fn get_torrents(&self, ids: Option<TorrentIds>) -> anyhow::Result<Vec<Torrent>> {
        let mut args = json!({ "fields": DEFAULT_TORRENT_FIELDS });
        if let Some(ids) = ids {
            args["ids"] = serde_json::to_value(ids)?;
        }
        let mut result = self.call(RpcMethod::TorrentGet, args).await?;
        let torrents = result
            .get_mut("torrents")
            .map(Value::take)
            .unwrap_or_else(|| json!([]));
        serde_json::from_value(torrents).context("Failed to decode torrent-get response")
    }

    /// Adds a torrent. The result holds `torrent-added` or `torrent-duplicate`.
    async fn add_torrent(&self, request: AddTorrent) -> anyhow::Result<Value> {
        self.call(RpcMethod::TorrentAdd, serde_json::to_value(request)?)
            .await
    }

    async fn start_torrents(&self, ids: TorrentIds) -> anyhow::Result<()> {
        self.call(RpcMethod::TorrentStart, json!({ "ids": ids_value(ids)? }))
            .await?;
        Ok(())
    }

    async fn stop_torrents(&self, ids: TorrentIds) -> anyhow::Result<()> {
        self.call(RpcMethod::TorrentStop, json!({ "ids": ids_value(ids)? }))
            .await?;
        Ok(())
    }

    async fn remove_torrents(&self, ids: TorrentIds, delete_local_data: bool) -> anyhow::Result<()> {
        self.call(
            RpcMethod::TorrentRemove,
            json!({ "ids": ids_value(ids)?, "delete-local-data": delete_local_data }),
        )
        .await?;
        Ok(())
    }

    async fn verify_torrents(&self, ids: TorrentIds) -> anyhow::Result<()> {
        self.call(RpcMethod::TorrentVerify, json!({ "ids": ids_value(ids)? }))
            .await?;
        Ok(())
    }

    async fn reannounce_torrents(&self, ids: TorrentIds) -> anyhow::Result<()> {
        self.call(RpcMethod::TorrentReannounce, json!({ "ids": ids_value(ids)? }))
            .await?;
        Ok(())
    }

    async fn set_location(
        &self,
        ids: TorrentIds,
        location: &str,
        move_data: bool,
    ) -> anyhow::Result<()> {
        self.call(
            RpcMethod::TorrentSetLocation,
            json!({ "ids": ids_value(ids)?, "location": location, "move": move_data }),
        )
        .await?;
        Ok(())
    }

    /// `torrent-set` with arbitrary mutator fields (limits, labels, ...).
    async fn set_torrents(&self, ids: TorrentIds, fields: Map<String, Value>) -> anyhow::Result<()> {
        let mut args = fields;
        args.insert("ids".to_string(), ids_value(ids)?);
        self.call(RpcMethod::TorrentSet, Value::Object(args)).await?;
        Ok(())
    }

    async fn session_stats(&self) -> anyhow::Result<SessionStats> {
        let result = self.call(RpcMethod::SessionStats, json!({})).await?;
        serde_json::from_value(result).context("Failed to decode session-stats response")
    }

    async fn session_get(&self) -> anyhow::Result<Value> {
        self.call(RpcMethod::SessionGet, json!({})).await
    }

    async fn session_set(&self, fields: Map<String, Value>) -> anyhow::Result<()> {
        self.call(RpcMethod::SessionSet, Value::Object(fields))
            .await?;
        Ok(())
    }

    /// Whether the peer port is reachable from the internet.
    async fn port_test(&self) -> anyhow::Result<bool> {
        let result = self.call(RpcMethod::PortTest, json!({})).await?;
        Ok(result
            .get("port-is-open")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    async fn free_space(&self, path: &str) -> anyhow::Result<FreeSpace> {
        let result = self
            .call(RpcMethod::FreeSpace, json!({ "path": path }))
            .await?;
        serde_json::from_value(result).context("Failed to decode free-space response")
    }
}

fn ids_value(ids: TorrentIds) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(ids)?)
}

/// In-memory `TorrentApi` used by skill tests: records every call and
/// answers from canned torrents.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct FakeTorrentApi {
        pub torrents: Vec<Torrent>,
        pub stats: SessionStats,
        pub fail_with: Option<String>,
        calls: Mutex<Vec<(RpcMethod, Value)>>,
    }

    impl FakeTorrentApi {
        pub fn with_torrents(torrents: Vec<Torrent>) -> Self {
            Self {
                torrents,
                ..Self::default()
            }
        }

        pub fn with_stats(stats: SessionStats) -> Self {
            Self {
                stats,
                ..Self::default()
            }
        }

        /// Every call records its arguments, then fails with `message`.
        pub fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<(RpcMethod, Value)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_to(&self, method: RpcMethod) -> Vec<Value> {
            self.calls()
                .into_iter()
                .filter(|(m, _)| *m == method)
                .map(|(_, args)| args)
                .collect()
        }
    }

    pub fn torrent(id: i64, name: &str) -> Torrent {
        Torrent {
            id,
            name: name.to_string(),
            ..Torrent::default()
        }
    }

    #[async_trait]
    impl TorrentApi for FakeTorrentApi {
        async fn call(&self, method: RpcMethod, arguments: Value) -> anyhow::Result<Value> {
            self.calls.lock().unwrap().push((method, arguments.clone()));
            if let Some(message) = &self.fail_with {
                anyhow::bail!("{message}");
            }

            match method {
                RpcMethod::TorrentGet => {
                    let wanted: Option<Vec<i64>> = arguments
                        .get("ids")
                        .and_then(|ids| serde_json::from_value(ids.clone()).ok());
                    let torrents: Vec<&Torrent> = self
                        .torrents
                        .iter()
                        .filter(|t| wanted.as_ref().map_or(true, |ids| ids.contains(&t.id)))
                        .collect();
                    Ok(json!({ "torrents": torrents }))
                }
                RpcMethod::SessionStats => Ok(serde_json::to_value(&self.stats)?),
                RpcMethod::SessionGet => Ok(json!({ "download-dir": "/downloads" })),
                RpcMethod::FreeSpace => Ok(json!({
                    "path": arguments["path"],
                    "size-bytes": 5_368_709_120_i64
                })),
                RpcMethod::PortTest => Ok(json!({ "port-is-open": true })),
                RpcMethod::TorrentAdd => Ok(json!({
                    "torrent-added": { "id": 99, "name": "new", "hashString": "abc" }
                })),
                _ => Ok(json!({})),
            }
        }
    }
}
