//! Observable screen state.
//!
//! [`UiState`] is what a screen renders; [`StateCell`] publishes it. A cell
//! behaves like a behavior subject: new subscribers first see the current
//! value, then every later publication in order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

/// Publications buffered per subscriber before it starts skipping ahead.
const SUBSCRIBER_CAPACITY: usize = 64;

/// Display state of a paged screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiState<T> {
    Loading,
    Success(T),
    Error(String),
}

impl<T> UiState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, UiState::Loading)
    }

    /// The payload, when in `Success`.
    pub fn data(&self) -> Option<&T> {
        match self {
            UiState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            UiState::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// A shared, observable value.
///
/// Cloning a cell yields another handle to the same value.
#[derive(Debug, Clone)]
pub struct StateCell<T> {
    inner: Arc<CellInner<T>>,
}

#[derive(Debug)]
struct CellInner<T> {
    value: Mutex<T>,
    tx: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> StateCell<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        Self {
            inner: Arc::new(CellInner {
                value: Mutex::new(initial),
                tx,
            }),
        }
    }

    /// Returns a copy of the current value.
    pub fn get(&self) -> T {
        self.lock().clone()
    }

    /// Replaces the current value and delivers it to every subscriber.
    pub fn publish(&self, value: T) {
        let mut current = self.lock();
        *current = value.clone();
        // No subscribers is fine; the value is still retained for `get`.
        let _ = self.inner.tx.send(value);
    }

    /// Publishes `value` only if it differs from the current one.
    pub fn publish_if_changed(&self, value: T)
    where
        T: PartialEq,
    {
        let mut current = self.lock();
        if *current != value {
            *current = value.clone();
            let _ = self.inner.tx.send(value);
        }
    }

    /// Subscribes to the cell. The first item received is the current value.
    pub fn subscribe(&self) -> Subscription<T> {
        // Holding the value lock orders this against `publish`, so no
        // publication is both missed and absent from `current`.
        let current = self.lock();
        Subscription {
            pending: Some(current.clone()),
            rx: self.inner.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        // A panic while holding the lock cannot leave a half-written `T`
        // (assignment is the only mutation), so poisoning is ignored.
        self.inner.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Receiving end of a [`StateCell`].
#[derive(Debug)]
pub struct Subscription<T> {
    pending: Option<T>,
    rx: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Waits for the next value. Returns `None` once every cell handle is gone.
    pub async fn recv(&mut self) -> Option<T> {
        if let Some(value) = self.pending.take() {
            return Some(value);
        }
        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "State subscriber lagged, skipping ahead");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next value if one is already available.
    pub fn try_recv(&mut self) -> Option<T> {
        if let Some(value) = self.pending.take() {
            return Some(value);
        }
        loop {
            match self.rx.try_recv() {
                Ok(value) => return Some(value),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "State subscriber lagged, skipping ahead");
                }
                Err(_) => return None,
            }
        }
    }

    /// Drains everything already published.
    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
