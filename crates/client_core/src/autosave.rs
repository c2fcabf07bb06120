//! Background draft checkpointing.
//!
//! The editor publishes every change of the authoring state on a watch
//! channel. The autosaver writes the latest value to the draft store at most
//! once per interval and flushes whatever is pending when it is shut down or
//! the editor side goes away.

use std::{sync::Arc, time::Duration};

use shared::domain::DraftInput;
use tokio::{
    sync::{oneshot, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use crate::draft_store::DraftStore;

pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(2);
const MIN_AUTOSAVE_INTERVAL: Duration = Duration::from_millis(1);

pub struct DraftAutosaver {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl DraftAutosaver {
    /// Intervals shorter than a millisecond are raised to one millisecond.
    pub fn spawn(
        drafts: Arc<DraftStore>,
        updates: watch::Receiver<DraftInput>,
        interval: Duration,
    ) -> Self {
        let interval = interval.max(MIN_AUTOSAVE_INTERVAL);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let baseline = updates.borrow().clone();
        info!(
            interval_ms = interval.as_millis() as u64,
            "draft: autosave started"
        );
        let task = tokio::spawn(run(drafts, updates, baseline, interval, shutdown_rx));
        Self { shutdown, task }
    }

    /// Stops the background task after writing any unsaved change.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(err) = self.task.await {
            warn!("draft: autosave task ended abnormally: {err}");
        }
    }
}

async fn run(
    drafts: Arc<DraftStore>,
    mut updates: watch::Receiver<DraftInput>,
    mut last_saved: DraftInput,
    interval: Duration,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut dirty = false;
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            changed = updates.changed() => match changed {
                Ok(()) => dirty = true,
                Err(_) => break,
            },
            _ = ticker.tick(), if dirty => {
                dirty = false;
                let latest = updates.borrow_and_update().clone();
                if latest != last_saved {
                    drafts.save(latest.clone()).await;
                    last_saved = latest;
                }
            }
        }
    }

    let latest = updates.borrow().clone();
    if latest != last_saved {
        debug!("draft: flushing pending change before autosave stops");
        drafts.save(latest).await;
    }
    info!("draft: autosave stopped");
}
