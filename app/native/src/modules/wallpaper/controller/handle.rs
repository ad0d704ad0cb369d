//! Handle for communicating with the selection controller.
//!
//! The `ControllerHandle` is cheap to clone and can be shared across tasks.
//! State-changing calls are queued; replies and queries observe every message
//! sent before them.

use std::sync::Arc;
use std::time::Duration;

use eyeball::{SharedObservable, Subscriber};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use super::messages::{ApplyOutcome, ControllerMessage};
use super::state::SelectionState;
use crate::modules::wallpaper::library::{LibrarySnapshot, ScanError, WallpaperImage};

/// Error types for actor communication.
#[derive(Debug, Error)]
pub enum ActorError {
    /// Failed to send message to actor.
    #[error("Failed to send message to controller: channel closed")]
    SendFailed,

    /// The controller is alive but its queue has no free slot.
    #[error("Controller queue is full")]
    QueueFull,

    /// Failed to receive response from actor.
    #[error("Failed to receive response from controller: channel closed")]
    ReceiveFailed,

    /// Query timed out.
    #[error("Controller query timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors returned by [`ControllerHandle::rescan`].
#[derive(Debug, Error)]
pub enum RescanError {
    #[error(transparent)]
    Actor(#[from] ActorError),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Handle for communicating with the selection controller.
#[derive(Clone)]
pub struct ControllerHandle {
    sender: mpsc::Sender<ControllerMessage>,
    state: SharedObservable<SelectionState>,
}

impl ControllerHandle {
    pub(crate) const fn new(
        sender: mpsc::Sender<ControllerMessage>,
        state: SharedObservable<SelectionState>,
    ) -> Self {
        Self { sender, state }
    }

    /// Returns `true` while the controller is running.
    #[must_use]
    pub fn is_alive(&self) -> bool { !self.sender.is_closed() }

    // ========================================================================
    // Sending
    // ========================================================================

    /// Queue a message without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::QueueFull`] if the queue has no free slot, or
    /// [`ActorError::SendFailed`] if the channel is closed.
    pub fn send(&self, msg: ControllerMessage) -> Result<(), ActorError> {
        self.sender.try_send(msg).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => ActorError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => ActorError::SendFailed,
        })
    }

    /// Queue a message, waiting for buffer space.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed.
    pub async fn send_async(&self, msg: ControllerMessage) -> Result<(), ActorError> {
        self.sender.send(msg).await.map_err(|_| ActorError::SendFailed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ControllerMessage,
    ) -> Result<T, ActorError> {
        let (tx, rx) = oneshot::channel();
        self.send_async(build(tx)).await?;
        rx.await.map_err(|_| ActorError::ReceiveFailed)
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the controller has stopped.
    pub async fn select_category(&self, category: &str) -> Result<(), ActorError> {
        self.send_async(ControllerMessage::SelectCategory { category: category.to_string() })
            .await
    }

    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the controller has stopped.
    pub async fn select_image(&self, image: WallpaperImage) -> Result<(), ActorError> {
        self.send_async(ControllerMessage::SelectImage { image }).await
    }

    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the controller has stopped.
    pub async fn close_preview(&self) -> Result<(), ActorError> {
        self.send_async(ControllerMessage::ClosePreview).await
    }

    /// Applies `image` and waits for the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error only if the controller cannot be reached; pipeline
    /// failures are reported through [`ApplyOutcome`].
    pub async fn apply(&self, image: WallpaperImage) -> Result<ApplyOutcome, ActorError> {
        self.request(|respond_to| ControllerMessage::Apply { image, respond_to }).await
    }

    /// Rescans the library and waits for the new snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RescanError::Scan`] if the library cannot be read, or
    /// [`RescanError::Actor`] if the controller cannot be reached.
    pub async fn rescan(&self) -> Result<Arc<LibrarySnapshot>, RescanError> {
        let result = self
            .request(|respond_to| ControllerMessage::Rescan { respond_to: Some(respond_to) })
            .await?;
        Ok(result?)
    }

    /// Requests a rescan without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::QueueFull`] if the queue has no free slot, or
    /// [`ActorError::SendFailed`] if the channel is closed.
    pub fn request_rescan(&self) -> Result<(), ActorError> {
        self.send(ControllerMessage::Rescan { respond_to: None })
    }

    /// Queues a rescan without waiting for it, waiting for buffer space if the
    /// controller is busy.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the controller has stopped.
    pub async fn queue_rescan(&self) -> Result<(), ActorError> {
        self.send_async(ControllerMessage::Rescan { respond_to: None }).await
    }

    /// Stops the controller after the messages already queued.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the controller already stopped.
    pub async fn shutdown(&self) -> Result<(), ActorError> {
        self.send_async(ControllerMessage::Shutdown).await
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Returns the state after every previously sent message was handled.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller cannot be reached.
    pub async fn state(&self) -> Result<SelectionState, ActorError> {
        self.request(|respond_to| ControllerMessage::Query { respond_to }).await
    }

    /// Like [`Self::state`], giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::Timeout`] if the controller does not answer in time.
    pub async fn state_timeout(&self, timeout: Duration) -> Result<SelectionState, ActorError> {
        tokio::time::timeout(timeout, self.state()).await.map_err(|_| ActorError::Timeout(timeout))?
    }

    /// The last published state, without waiting for queued messages.
    #[must_use]
    pub fn current(&self) -> SelectionState { self.state.get() }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> Subscriber<SelectionState> { self.state.subscribe() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle_with_receiver() -> (ControllerHandle, mpsc::Receiver<ControllerMessage>) {
        let (tx, rx) = mpsc::channel(16);
        (ControllerHandle::new(tx, SharedObservable::new(SelectionState::default())), rx)
    }

    #[tokio::test]
    async fn test_handle_closed_detection() {
        let (handle, rx) = handle_with_receiver();
        assert!(handle.is_alive());

        drop(rx);
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn test_send_to_closed_channel() {
        let (handle, rx) = handle_with_receiver();
        drop(rx);

        assert!(matches!(handle.send(ControllerMessage::Shutdown), Err(ActorError::SendFailed)));
        assert!(matches!(handle.state().await, Err(ActorError::SendFailed)));
    }

    #[tokio::test]
    async fn test_send_to_full_channel_is_distinct_from_closed() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ControllerHandle::new(tx, SharedObservable::new(SelectionState::default()));

        handle.send(ControllerMessage::ClosePreview).unwrap();
        assert!(matches!(handle.request_rescan(), Err(ActorError::QueueFull)));
        assert!(handle.is_alive());
    }

    #[tokio::test]
    async fn test_dropped_reply_is_receive_failure() {
        let (handle, mut rx) = handle_with_receiver();
        tokio::spawn(async move {
            // Drop every responder without answering.
            while let Some(msg) = rx.recv().await {
                drop(msg);
            }
        });

        assert!(matches!(handle.state().await, Err(ActorError::ReceiveFailed)));
    }

    #[tokio::test]
    async fn test_state_timeout() {
        let (handle, _rx) = handle_with_receiver();
        let result = handle.state_timeout(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(ActorError::Timeout(_))));
    }
}
