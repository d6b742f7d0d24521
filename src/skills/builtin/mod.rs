//! Pre-built skills operating on a [`TorrentApi`].

pub mod format;
pub mod labels;
pub mod reseed;
pub mod stats;
pub mod torrents;

use std::sync::Arc;

use crate::skills::Skill;
use crate::transmission::TorrentApi;

pub use labels::{AddLabelsSkill, GetTorrentsByLabelSkill, RemoveLabelsSkill, ReplaceLabelsSkill};
pub use reseed::GetReseedInfoSkill;
pub use stats::{GetFreeSpaceSkill, GetStatsSkill};
pub use torrents::{
    AddTorrentSkill, BatchAction, BatchActionSkill, GetTorrentsSkill, MoveTorrentsSkill,
    RemoveTorrentsSkill, SetSpeedLimitSkill,
};

/// The full torrent-management catalogue, all bound to `api`.
pub fn predefined_skills(api: Arc<dyn TorrentApi>) -> Vec<Arc<dyn Skill>> {
    vec![
        Arc::new(GetTorrentsSkill::new(api.clone())),
        Arc::new(AddTorrentSkill::new(api.clone())),
        Arc::new(BatchActionSkill::new(api.clone(), BatchAction::Start)),
        Arc::new(BatchActionSkill::new(api.clone(), BatchAction::Stop)),
        Arc::new(RemoveTorrentsSkill::new(api.clone())),
        Arc::new(GetStatsSkill::new(api.clone())),
        Arc::new(SetSpeedLimitSkill::new(api.clone())),
        Arc::new(BatchActionSkill::new(api.clone(), BatchAction::Verify)),
        Arc::new(AddLabelsSkill::new(api.clone())),
        Arc::new(RemoveLabelsSkill::new(api.clone())),
        Arc::new(ReplaceLabelsSkill::new(api.clone())),
        Arc::new(GetTorrentsByLabelSkill::new(api.clone())),
        Arc::new(GetReseedInfoSkill::new(api.clone())),
        Arc::new(BatchActionSkill::new(api.clone(), BatchAction::Reannounce)),
        Arc::new(MoveTorrentsSkill::new(api.clone())),
        Arc::new(GetFreeSpaceSkill::new(api)),
    ]
}

/// Validates `args` against the skill's parameters and executes it, the
/// way the scheduler does.
#[cfg(test)]
pub(crate) async fn run(skill: &dyn Skill, args: serde_json::Value) -> anyhow::Result<serde_json::Value> {
    let args = crate::skills::schema::validate(&skill.parameters(), args)?;
    skill.execute(args).await
}
