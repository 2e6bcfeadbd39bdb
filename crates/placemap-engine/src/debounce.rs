//! Cancel-and-reschedule timers.
//!
//! The pending value stays with the `Debouncer`; the timer task only posts a
//! `Due` ticket back to the owner's inbox. A ticket from a timer that was
//! rescheduled in the meantime no longer matches and `fire` ignores it.

use std::time::Duration;

use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::task::JoinHandle;

/// Ticket posted when a quiet window elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Due(u64);

pub struct Debouncer<T, E> {
    window: Duration,
    generation: u64,
    pending: Option<(T, JoinHandle<()>)>,
    inbox: WeakUnboundedSender<E>,
    wrap: fn(Due) -> E,
}

impl<T, E: Send + 'static> Debouncer<T, E> {
    pub fn new(window: Duration, inbox: WeakUnboundedSender<E>, wrap: fn(Due) -> E) -> Self {
        Self { window, generation: 0, pending: None, inbox, wrap }
    }

    pub fn window(&self) -> Duration { self.window }

    /// Replace any pending value and restart the quiet window.
    pub fn schedule(&mut self, value: T) {
        self.cancel();
        self.generation += 1;
        let due = Due(self.generation);
        let inbox = self.inbox.clone();
        let wrap = self.wrap;
        let window = self.window;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(inbox) = inbox.upgrade() {
                let _ = inbox.send(wrap(due));
            }
        });
        self.pending = Some((value, timer));
    }

    /// Take the pending value if `due` belongs to the latest schedule.
    pub fn fire(&mut self, due: Due) -> Option<T> {
        if due != Due(self.generation) { return None; }
        self.pending.take().map(|(value, _)| value)
    }

    pub fn cancel(&mut self) {
        if let Some((_, timer)) = self.pending.take() { timer.abort(); }
    }

    pub fn is_scheduled(&self) -> bool { self.pending.is_some() }
}

impl<T, E> Drop for Debouncer<T, E> {
    fn drop(&mut self) {
        if let Some((_, timer)) = self.pending.take() { timer.abort(); }
    }
}
