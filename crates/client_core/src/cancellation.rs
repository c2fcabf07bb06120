//! Per-channel single-flight cancellation.
//!
//! Each logical channel owns at most one live [`OperationToken`]. Beginning a
//! new operation on a channel revokes the previous token before the new one is
//! handed out, so a slow stale response can always be recognised and dropped.

use std::{
    collections::HashMap,
    fmt,
    future::Future,
    sync::{Mutex, PoisonError},
};

use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Analyze,
    Generate,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Analyze, Channel::Generate];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Analyze => "analyze",
            Channel::Generate => "generate",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Revocable handle for one operation attempt on a channel.
#[derive(Debug, Clone)]
pub struct OperationToken {
    id: Uuid,
    channel: Channel,
    cancellation: CancellationToken,
}

impl OperationToken {
    fn new(channel: Channel) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Runs `call` until it finishes or this token is revoked, whichever comes
    /// first. A revoked token always yields [`ClientError::Cancelled`], even
    /// when the response had already arrived.
    pub async fn run<T, E, F>(&self, call: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<ClientError>,
    {
        let outcome = tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => return Err(ClientError::Cancelled),
            outcome = call => outcome,
        };
        if self.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        outcome.map_err(Into::into)
    }
}

#[derive(Default)]
pub struct CancellationCoordinator {
    active: Mutex<HashMap<Channel, OperationToken>>,
}

impl CancellationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revokes the channel's current token, if any, then registers a fresh one.
    pub fn begin(&self, channel: Channel) -> OperationToken {
        let token = OperationToken::new(channel);
        let mut active = self.lock();
        if let Some(previous) = active.insert(channel, token.clone()) {
            previous.cancellation.cancel();
            debug!(
                channel = channel.as_str(),
                superseded = %previous.id,
                attempt = %token.id,
                "cancellation: superseded in-flight operation"
            );
        }
        token
    }

    pub fn cancel(&self, channel: Channel) {
        if let Some(previous) = self.lock().remove(&channel) {
            previous.cancellation.cancel();
            debug!(
                channel = channel.as_str(),
                attempt = %previous.id,
                "cancellation: cancelled in-flight operation"
            );
        }
    }

    pub fn cancel_all(&self) {
        for channel in Channel::ALL {
            self.cancel(channel);
        }
    }

    pub fn is_cancelled(&self, token: &OperationToken) -> bool {
        token.is_cancelled()
    }

    /// Whether `channel` currently has a live operation.
    pub fn is_active(&self, channel: Channel) -> bool {
        self.lock()
            .get(&channel)
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Unregisters `token` if it is still the channel's live operation.
    /// Returns `false` when the token was superseded or cancelled, in which
    /// case its outcome must be discarded.
    pub fn complete(&self, token: &OperationToken) -> bool {
        let mut active = self.lock();
        let is_current = active
            .get(&token.channel)
            .is_some_and(|current| current.id == token.id && !current.is_cancelled());
        if is_current {
            active.remove(&token.channel);
        }
        is_current
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Channel, OperationToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
