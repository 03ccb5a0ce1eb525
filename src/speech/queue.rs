//! Speech queue
//!
//! Serializes all utterances through one worker thread that owns the
//! synthesizer, guaranteeing that audio never overlaps and playback
//! order matches enqueue order. Cancellation always wins: `cancel_all`
//! clears the queue under the same mutex that guards dequeueing, so an
//! utterance enqueued before a cancel can never start after it, and an
//! in-flight utterance is stopped within one worker poll tick.
//!
//! Per-utterance lifecycle: Queued → Playing → {Completed | Cancelled |
//! Failed}. Terminal states are final.

use crate::speech::Synth;
use log::{debug, warn};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Worker poll interval while an utterance is playing
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// How many terminal utterance states are kept for `status` queries
///
/// Older terminal entries are evicted so the status map stays bounded
/// over a long session; an evicted handle reads as Cancelled.
const MAX_TERMINAL_STATUSES: usize = 64;

/// Utterance priority class
///
/// High dequeues ahead of Normal; order within a class is strictly
/// FIFO. The engine uses High only for short feedback interjections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Normal,
    High,
}

/// One request to the external synthesizer
#[derive(Debug, Clone)]
pub struct Utterance {
    pub text: String,
    pub priority: Priority,
}

impl Utterance {
    /// A normal-priority utterance
    pub fn normal<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            priority: Priority::Normal,
        }
    }

    /// A high-priority utterance (feedback interjections)
    pub fn high<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            priority: Priority::High,
        }
    }
}

/// Utterance lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceState {
    Queued,
    Playing,
    Completed,
    Cancelled,
    Failed,
}

impl UtteranceState {
    /// Whether this state is final
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            UtteranceState::Completed | UtteranceState::Cancelled | UtteranceState::Failed
        )
    }
}

/// Cancellable handle returned by `enqueue`
#[derive(Debug, Clone)]
pub struct UtteranceHandle {
    id: u64,
}

struct PendingUtterance {
    id: u64,
    text: String,
    priority: Priority,
}

struct QueueState {
    pending: VecDeque<PendingUtterance>,
    statuses: HashMap<u64, UtteranceState>,
    /// Terminal ids in finish order, oldest first, for eviction
    terminal_order: VecDeque<u64>,
    playing: Option<u64>,
    /// Tells the worker to stop the in-flight utterance
    stop_current: bool,
    failures: u64,
    shutdown: bool,
    next_id: u64,
}

impl QueueState {
    /// Record a terminal state, evicting the oldest beyond the bound
    fn finish(&mut self, id: u64, state: UtteranceState) {
        self.statuses.insert(id, state);
        self.terminal_order.push_back(id);
        while self.terminal_order.len() > MAX_TERMINAL_STATUSES {
            if let Some(old) = self.terminal_order.pop_front() {
                self.statuses.remove(&old);
            }
        }
    }
}

struct Shared {
    state: Mutex<QueueState>,
    cv: Condvar,
}

/// FIFO speech queue with preemptive cancellation
///
/// Enqueue and cancel may be called from any thread at any time; all
/// queue state sits behind a single mutex.
pub struct SpeechQueue {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl SpeechQueue {
    /// Create a queue and spawn its worker thread owning the synthesizer
    pub fn new(synth: Box<dyn Synth>) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                statuses: HashMap::new(),
                terminal_order: VecDeque::new(),
                playing: None,
                stop_current: false,
                failures: 0,
                shutdown: false,
                next_id: 0,
            }),
            cv: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("speech-queue".to_string())
            .spawn(move || worker_loop(worker_shared, synth))
            .ok();

        if worker.is_none() {
            warn!("Failed to spawn speech worker; utterances will never play");
        }

        Self { shared, worker }
    }

    /// Append an utterance; returns a cancellable handle immediately
    pub fn enqueue(&self, utterance: Utterance) -> UtteranceHandle {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;

        debug!("Enqueue #{} ({:?}): {}", id, utterance.priority, utterance.text);
        state.statuses.insert(id, UtteranceState::Queued);
        state.pending.push_back(PendingUtterance {
            id,
            text: utterance.text,
            priority: utterance.priority,
        });
        self.shared.cv.notify_all();
        UtteranceHandle { id }
    }

    /// Cancel one utterance
    ///
    /// Removes it if not yet started; stops it if currently playing;
    /// no-op once terminal.
    pub fn cancel(&self, handle: &UtteranceHandle) {
        let mut state = self.lock();
        match state.statuses.get(&handle.id).copied() {
            Some(UtteranceState::Queued) => {
                state.pending.retain(|p| p.id != handle.id);
                state.finish(handle.id, UtteranceState::Cancelled);
                debug!("Cancelled queued utterance #{}", handle.id);
            }
            Some(UtteranceState::Playing) => {
                state.stop_current = true;
                debug!("Stopping in-flight utterance #{}", handle.id);
            }
            _ => {} // terminal or unknown: no-op
        }
        self.shared.cv.notify_all();
    }

    /// Clear the queue and stop any in-flight utterance
    ///
    /// Used on exercise item change so the most recent request always
    /// wins.
    pub fn cancel_all(&self) {
        let mut state = self.lock();
        let dropped = state.pending.len();
        while let Some(p) = state.pending.pop_front() {
            state.finish(p.id, UtteranceState::Cancelled);
        }
        if state.playing.is_some() {
            state.stop_current = true;
        }
        if dropped > 0 || state.playing.is_some() {
            debug!("cancel_all: dropped {} queued utterances", dropped);
        }
        self.shared.cv.notify_all();
    }

    /// Current state of an utterance
    pub fn status(&self, handle: &UtteranceHandle) -> UtteranceState {
        self.lock()
            .statuses
            .get(&handle.id)
            .copied()
            .unwrap_or(UtteranceState::Cancelled)
    }

    /// Block until an utterance reaches a terminal state
    ///
    /// For tests and embedding; UI-facing callers poll `status` instead.
    pub fn wait(&self, handle: &UtteranceHandle) -> UtteranceState {
        let mut state = self.lock();
        loop {
            let current = state
                .statuses
                .get(&handle.id)
                .copied()
                .unwrap_or(UtteranceState::Cancelled);
            if current.is_terminal() || state.shutdown {
                return current;
            }
            state = self.shared.cv.wait(state).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Block until nothing is queued or playing
    pub fn wait_idle(&self) {
        let mut state = self.lock();
        while !state.shutdown && (state.playing.is_some() || !state.pending.is_empty()) {
            state = self.shared.cv.wait(state).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Whether nothing is queued or playing
    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        state.playing.is_none() && state.pending.is_empty()
    }

    /// Synthesis failures since the last call, clearing the count
    ///
    /// The session controller polls this to detect degraded
    /// (visual-only) operation.
    pub fn take_failures(&self) -> u64 {
        let mut state = self.lock();
        std::mem::take(&mut state.failures)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for SpeechQueue {
    fn drop(&mut self) {
        {
            let mut state = self.lock();
            state.shutdown = true;
        }
        self.shared.cv.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Next utterance to play: first High, else front of the queue
fn pop_next(state: &mut QueueState) -> Option<PendingUtterance> {
    if let Some(idx) = state.pending.iter().position(|p| p.priority == Priority::High) {
        return state.pending.remove(idx);
    }
    state.pending.pop_front()
}

fn worker_loop(shared: Arc<Shared>, mut synth: Box<dyn Synth>) {
    loop {
        // Wait for something to play
        let (id, text) = {
            let mut state = shared.state.lock().unwrap_or_else(|e| e.into_inner());
            loop {
                if state.shutdown {
                    synth.stop();
                    return;
                }
                if let Some(next) = pop_next(&mut state) {
                    state.statuses.insert(next.id, UtteranceState::Playing);
                    state.playing = Some(next.id);
                    state.stop_current = false;
                    break (next.id, next.text);
                }
                state = shared.cv.wait(state).unwrap_or_else(|e| e.into_inner());
            }
        };
        shared.cv.notify_all();

        // Begin playback outside the lock; a failure poisons only this
        // utterance, the queue keeps going.
        if let Err(e) = synth.speak(&text) {
            warn!("Utterance #{} failed: {}", id, e);
            let mut state = shared.state.lock().unwrap_or_else(|e| e.into_inner());
            state.finish(id, UtteranceState::Failed);
            state.playing = None;
            state.failures += 1;
            shared.cv.notify_all();
            continue;
        }

        // Poll playback until it finishes or a cancel arrives
        let final_state = loop {
            {
                let mut state = shared.state.lock().unwrap_or_else(|e| e.into_inner());
                if state.shutdown || state.stop_current {
                    state.stop_current = false;
                    break UtteranceState::Cancelled;
                }
            }
            if !synth.is_speaking() {
                break UtteranceState::Completed;
            }
            thread::sleep(POLL_INTERVAL);
        };

        if final_state == UtteranceState::Cancelled {
            synth.stop();
        }

        let quit = {
            let mut state = shared.state.lock().unwrap_or_else(|e| e.into_inner());
            state.finish(id, final_state);
            state.playing = None;
            shared.cv.notify_all();
            state.shutdown
        };
        debug!("Utterance #{} finished: {:?}", id, final_state);
        if quit {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::backends::null::NullSynth;

    #[test]
    fn test_enqueue_completes() {
        let queue = SpeechQueue::new(Box::new(NullSynth::instant()));
        let handle = queue.enqueue(Utterance::normal("hej"));
        assert_eq!(queue.wait(&handle), UtteranceState::Completed);
    }

    #[test]
    fn test_cancel_completed_is_noop() {
        let queue = SpeechQueue::new(Box::new(NullSynth::instant()));
        let handle = queue.enqueue(Utterance::normal("hej"));
        queue.wait(&handle);
        queue.cancel(&handle);
        assert_eq!(queue.status(&handle), UtteranceState::Completed);
    }

    #[test]
    fn test_wait_idle() {
        let queue = SpeechQueue::new(Box::new(NullSynth::instant()));
        for _ in 0..5 {
            queue.enqueue(Utterance::normal("x"));
        }
        queue.wait_idle();
        assert!(queue.is_idle());
    }

    #[test]
    fn test_terminal_statuses_stay_bounded() {
        let queue = SpeechQueue::new(Box::new(NullSynth::instant()));
        let oldest = queue.enqueue(Utterance::normal("x"));
        let mut newest = oldest.clone();
        for _ in 0..MAX_TERMINAL_STATUSES * 2 {
            newest = queue.enqueue(Utterance::normal("x"));
        }
        queue.wait(&newest);
        queue.wait_idle();

        let state = queue.lock();
        assert!(state.statuses.len() <= MAX_TERMINAL_STATUSES);
        drop(state);

        // The oldest handle was evicted and reads as cancelled
        assert_eq!(queue.status(&oldest), UtteranceState::Cancelled);
        assert_eq!(queue.status(&newest), UtteranceState::Completed);
    }
}
