use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, PoisonError};

use bitflags::bitflags;
use minifb::Key;

bitflags! {
    /// Modifier keys held at the moment a key press was captured.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const ALT = 1 << 2;
        const SUPER = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub mods: Modifiers,
}

struct QueueState {
    events: VecDeque<KeyEvent>,
    open: bool,
}

/// Unbounded FIFO of captured key presses between the render-loop producer
/// and the game-thread consumer.
///
/// `wait` parks on a condvar rather than polling; `close` is the cooperative
/// shutdown signal that wakes every waiter. `None` from `read`/`wait` is the
/// designated "nothing there" result, so a real key press is never
/// confusable with the empty case.
pub struct KeyQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl KeyQueue {
    pub fn new() -> Self {
        KeyQueue {
            state: Mutex::new(QueueState {
                events: VecDeque::new(),
                open: true,
            }),
            ready: Condvar::new(),
        }
    }

    // A poisoned lock only means another thread panicked mid-access; the
    // deque itself is still coherent, so keep serving it.
    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a captured press. Ignored once the queue is closed.
    pub fn push(&self, event: KeyEvent) {
        let mut state = self.lock();
        if !state.open {
            return;
        }
        state.events.push_back(event);
        self.ready.notify_one();
    }

    /// Non-blocking pop of the oldest press, if any. Still drains whatever
    /// was queued before `close`.
    pub fn read(&self) -> Option<KeyEvent> {
        self.lock().events.pop_front()
    }

    /// Pop the oldest press, blocking until one arrives or the queue closes.
    pub fn wait(&self) -> Option<KeyEvent> {
        let mut state = self.lock();
        loop {
            if let Some(event) = state.events.pop_front() {
                return Some(event);
            }
            if !state.open {
                return None;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Shut the queue down and wake every blocked `wait`.
    pub fn close(&self) {
        self.lock().open = false;
        self.ready.notify_all();
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }
}

impl Default for KeyQueue {
    fn default() -> Self {
        Self::new()
    }
}
