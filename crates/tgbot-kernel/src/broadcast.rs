//! Send one message to every known user.
//!
//! Recipients are read fresh from the `User` table on every call. Sends run
//! concurrently up to a fixed limit; a failed send is logged and counted and
//! never stops the others.

use futures::StreamExt;
use serde::Serialize;
use tgbot_adapters::Messenger;
use tgbot_store::{Recipient, UserStore};
use tracing::{info, warn};

/// Sends in flight at once when no limit is configured.
pub const DEFAULT_BROADCAST_CONCURRENCY: usize = 8;

/// Tally of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
    /// Recipients left out because they were excluded.
    pub skipped: usize,
}

impl BroadcastReport {
    /// Recipients a send was attempted for.
    pub fn attempted(&self) -> usize {
        self.sent + self.failed
    }
}

/// Send `text` to every stored user except `exclude`.
///
/// A failure to list recipients is logged and yields an empty report.
pub async fn broadcast(
    users: &UserStore,
    messenger: &dyn Messenger,
    text: &str,
    exclude: Option<i64>,
    concurrency: usize,
) -> BroadcastReport {
    let recipients = match users.all().await {
        Ok(recipients) => recipients,
        Err(e) => {
            warn!(error = %e, "could not list broadcast recipients");
            return BroadcastReport::default();
        }
    };

    let (targets, excluded): (Vec<Recipient>, Vec<Recipient>) = recipients
        .into_iter()
        .partition(|r| Some(r.user_id) != exclude);

    let mut report = BroadcastReport {
        skipped: excluded.len(),
        ..BroadcastReport::default()
    };

    let mut sends = futures::stream::iter(targets)
        .map(|recipient| async move {
            let result = messenger.send_message(recipient.chat_id, text, None).await;
            (recipient, result)
        })
        .buffer_unordered(concurrency.max(1));

    while let Some((recipient, result)) = sends.next().await {
        match result {
            Ok(()) => report.sent += 1,
            Err(e) => {
                warn!(
                    user_id = recipient.user_id,
                    chat_id = recipient.chat_id,
                    error = %e,
                    "broadcast send failed"
                );
                report.failed += 1;
            }
        }
    }

    info!(
        sent = report.sent,
        failed = report.failed,
        skipped = report.skipped,
        "broadcast finished"
    );
    report
}
