//! Typed views of the Transmission RPC payloads we consume.
//!
//! Every field is defaulted: servers omit fields that were not requested
//! and older daemons lack newer ones (e.g. `labels` before 3.0).

use serde::{Deserialize, Serialize};

/// Torrent selector accepted by most `torrent-*` methods.
#[derive(Debug, Clone, PartialEq)]
pub enum TorrentIds {
    Single(i64),
    List(Vec<i64>),
    RecentlyActive,
}

impl Serialize for TorrentIds {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Single(id) => serializer.serialize_i64(*id),
            Self::List(ids) => ids.serialize(serializer),
            Self::RecentlyActive => serializer.serialize_str("recently-active"),
        }
    }
}

impl From<Vec<i64>> for TorrentIds {
    fn from(ids: Vec<i64>) -> Self {
        Self::List(ids)
    }
}

/// Transmission's numeric torrent status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorrentStatus {
    Stopped,
    CheckWait,
    Check,
    DownloadWait,
    Download,
    SeedWait,
    Seed,
}

impl TorrentStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Stopped),
            1 => Some(Self::CheckWait),
            2 => Some(Self::Check),
            3 => Some(Self::DownloadWait),
            4 => Some(Self::Download),
            5 => Some(Self::SeedWait),
            6 => Some(Self::Seed),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Stopped => 0,
            Self::CheckWait => 1,
            Self::Check => 2,
            Self::DownloadWait => 3,
            Self::Download => 4,
            Self::SeedWait => 5,
            Self::Seed => 6,
        }
    }

    /// Upper-case label shown to the model.
    pub fn label(self) -> &'static str {
        match self {
            Self::Stopped => "STOPPED",
            Self::CheckWait => "CHECK_WAIT",
            Self::Check => "CHECK",
            Self::DownloadWait => "DOWNLOAD_WAIT",
            Self::Download => "DOWNLOAD",
            Self::SeedWait => "SEED_WAIT",
            Self::Seed => "SEED",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerStat {
    pub announce: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Torrent {
    pub id: i64,
    pub name: String,
    pub status: i64,
    pub total_size: u64,
    pub percent_done: f64,
    pub rate_download: u64,
    pub rate_upload: u64,
    pub upload_ratio: f64,
    pub eta: i64,
    pub error: i64,
    pub error_string: String,
    pub download_dir: String,
    pub hash_string: String,
    pub tracker_stats: Vec<TrackerStat>,
    pub uploaded_ever: u64,
    pub downloaded_ever: u64,
    pub added_date: i64,
    pub labels: Vec<String>,
}

impl Torrent {
    pub fn status(&self) -> Option<TorrentStatus> {
        TorrentStatus::from_code(self.status)
    }

    pub fn has_error(&self) -> bool {
        self.error != 0 || !self.error_string.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionStats {
    pub active_torrent_count: u64,
    pub download_speed: u64,
    pub paused_torrent_count: u64,
    pub torrent_count: u64,
    pub upload_speed: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FreeSpace {
    pub path: String,
    pub size_bytes: i64,
}

/// Arguments of `torrent-add`. Exactly one of `filename`/`metainfo` is set.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddTorrent {
    /// Magnet link or URL of a .torrent file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Base64-encoded .torrent content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metainfo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<String>,
    pub paused: bool,
}
