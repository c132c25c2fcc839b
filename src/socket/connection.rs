/// Background ownership of the event channel
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::logging::StationLog;
use crate::socket::transport::{EventHandler, EventTransport};

/// Lifecycle of an opened connection. Before `EventConnection::open` there
/// is no connection value at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    /// The background task is running; the handshake may still be in flight
    Connected,
    Disconnected,
}

/// Owns the task that services one event channel.
///
/// The task is detached: `disconnect` only signals it, and dropping the
/// connection signals and abandons it. Runtime shutdown kills it outright.
pub struct EventConnection {
    state: Arc<Mutex<ConnectionState>>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
    log: Arc<dyn StationLog>,
}

impl EventConnection {
    /// Spawn the servicing task and wait until it is running.
    ///
    /// Connection failures are not reported here. They are logged by the
    /// task and show up only as events that never arrive.
    pub async fn open(
        mut transport: Box<dyn EventTransport>,
        handler: EventHandler,
        log: Arc<dyn StationLog>,
    ) -> Self {
        let state = Arc::new(Mutex::new(ConnectionState::Connecting));
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (started_tx, started_rx) = oneshot::channel();

        let task_state = Arc::clone(&state);
        let task_log = Arc::clone(&log);
        let task = tokio::spawn(async move {
            {
                let mut state = task_state.lock();
                if *state == ConnectionState::Connecting {
                    *state = ConnectionState::Connected;
                }
            }
            let _ = started_tx.send(());

            match transport.serve(&handler, &mut shutdown_rx).await {
                Ok(()) => task_log.info("Event channel closed"),
                Err(e) => task_log.error(&format!("Event channel failed: {}", e)),
            }
            *task_state.lock() = ConnectionState::Disconnected;
        });

        // The sender only vanishes if the task panicked before starting
        let _ = started_rx.await;

        EventConnection {
            state,
            shutdown: shutdown_tx,
            task: Mutex::new(Some(task)),
            log,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Ask the transport to close. Does not wait for the task to finish.
    pub fn disconnect(&self) {
        let mut state = self.state.lock();
        if *state == ConnectionState::Disconnected {
            return;
        }
        *state = ConnectionState::Disconnected;
        drop(state);

        self.log.info("Disconnecting from station bridge");
        let _ = self.shutdown.send(true);
    }

    /// Wait up to `timeout` for the task to finish. Returns false if it is
    /// still running, in which case it is left detached.
    pub async fn join(&self, timeout: Duration) -> bool {
        let Some(task) = self.task.lock().take() else {
            return true;
        };
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                self.log.error(&format!("Event task ended abnormally: {}", e));
                true
            }
            Err(_) => false,
        }
    }
}

impl Drop for EventConnection {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
