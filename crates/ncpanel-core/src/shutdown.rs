//! Cooperative stop flag shared by the long-running loops

use tokio::sync::watch;

/// Sender half: flip to `true` to ask every loop to wind down
pub type StopSender = watch::Sender<bool>;
/// Receiver half observed at the top of each loop iteration
pub type StopReceiver = watch::Receiver<bool>;

pub fn stop_channel() -> (StopSender, StopReceiver) {
    watch::channel(false)
}

/// Whether a stop has already been requested
pub fn is_stopped(stop: &StopReceiver) -> bool {
    *stop.borrow()
}

/// Resolve once a stop is requested. Never resolves if the sender is gone.
pub async fn stopped(stop: &mut StopReceiver) {
    if stop.wait_for(|s| *s).await.is_err() {
        std::future::pending::<()>().await;
    }
}
