//! Deduplicating forwarder from presence updates to the activity sink.

use beacon_common::IpcError;
use beacon_ipc::{Activity, ActivitySink};
use tracing::debug;

use crate::types::PresenceUpdate;

/// What the forwarder did with an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Forward,
    /// The update carried no client id.
    SkipNoIdentity,
    /// Same client id and activity as the last forwarded update.
    SkipUnchanged,
}

/// Remembers the last forwarded update so unchanged presence is sent once.
#[derive(Debug, Default)]
pub struct PresenceForwarder {
    last: Option<PresenceUpdate>,
}

impl PresenceForwarder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_forwarded(&self) -> Option<&PresenceUpdate> {
        self.last.as_ref()
    }

    /// Decide whether `update` should go out, recording it if so.
    pub fn admit(&mut self, update: &PresenceUpdate) -> Decision {
        if update.client_id.is_empty() {
            return Decision::SkipNoIdentity;
        }

        if let Some(last) = &self.last {
            if last.client_id == update.client_id && last.activity == update.activity {
                return Decision::SkipUnchanged;
            }
        }

        self.last = Some(update.clone());
        Decision::Forward
    }

    /// Admit `update` and, if it is new, send its activity to `sink`.
    ///
    /// The update counts as forwarded even when the send fails, so the same
    /// content is not retried.
    pub async fn forward<S>(
        &mut self,
        update: &PresenceUpdate,
        sink: &mut S,
    ) -> Result<Decision, IpcError>
    where
        S: ActivitySink + ?Sized,
    {
        let decision = self.admit(update);
        if decision == Decision::Forward {
            debug!(client_id = %update.client_id, activity = ?update.activity, "forwarding presence update");
            sink.send_activity(&Activity::from(&update.activity))
                .await?;
        }
        Ok(decision)
    }
}
