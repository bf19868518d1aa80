//! Presence records as delivered by a presence source.

use beacon_ipc::Activity;
use serde::{Deserialize, Serialize};

/// One snapshot from the presence source.
///
/// `client_id` identifies the application reporting the activity; an empty
/// id means nothing is being reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceUpdate {
    pub client_id: String,
    pub activity: PresenceActivity,
}

/// Activity as reported by the source, with nested assets and timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceActivity {
    pub details: String,
    pub state: String,
    pub assets: Assets,
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Assets {
    pub large_image: String,
    pub large_text: String,
    pub small_image: String,
    pub small_text: String,
}

/// Unix epoch seconds; zero when unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Timestamps {
    pub start: i64,
    pub end: i64,
}

impl From<&PresenceActivity> for Activity {
    fn from(activity: &PresenceActivity) -> Self {
        Self {
            details: activity.details.clone(),
            state: activity.state.clone(),
            large_text: activity.assets.large_text.clone(),
            small_text: activity.assets.small_text.clone(),
            large_image: activity.assets.large_image.clone(),
            small_image: activity.assets.small_image.clone(),
            start_time: activity.timestamps.start,
            end_time: activity.timestamps.end,
        }
    }
}
