//! Scripted command sequences.
//!
//! The drone handles one motion command at a time and rejects commands sent
//! too densely, so each step is sent only after the reply to the previous
//! one, followed by the step's settle delay.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Instant};
use tokio::{spawn, task};
use tracing::debug;

use crate::control::CommandChannel;
use crate::logger::EventLog;

/// How long to wait after the triggering reply before a step is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostDelay {
    Millis(u64),
    /// Send the step, then stop advancing automatically.
    NoAutoAdvance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStep {
    pub text: String,
    pub post_delay: PostDelay,
}

impl CommandStep {
    pub fn new(text: impl Into<String>, delay_ms: u64) -> Self {
        Self { text: text.into(), post_delay: PostDelay::Millis(delay_ms) }
    }

    /// A final step, typically a status query, with nothing chained after it.
    pub fn last(text: impl Into<String>) -> Self {
        Self { text: text.into(), post_delay: PostDelay::NoAutoAdvance }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencerPhase {
    #[default]
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScriptProgress {
    pub phase: SequencerPhase,
    /// steps not yet sent, including one waiting out its delay
    pub remaining: usize,
}

/// A step to send once `delay` has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub text: String,
    pub delay: Duration,
}

/// The step queue, without any I/O or timers.
#[derive(Debug, Default)]
pub struct CommandSequencer {
    queue: VecDeque<CommandStep>,
}

impl CommandSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever script is running and dispatches its first step.
    pub fn enqueue(&mut self, steps: impl IntoIterator<Item = CommandStep>) -> Option<Dispatch> {
        self.queue = steps.into_iter().collect();
        self.advance()
    }

    /// Called for each reply from the drone. No-op once the queue is empty.
    pub fn advance(&mut self) -> Option<Dispatch> {
        let step = self.queue.pop_front()?;

        let delay = match step.post_delay {
            PostDelay::Millis(ms) => Duration::from_millis(ms),
            PostDelay::NoAutoAdvance => {
                self.queue.clear();
                Duration::ZERO
            }
        };

        Some(Dispatch { text: step.text, delay })
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn phase(&self) -> SequencerPhase {
        if self.queue.is_empty() {
            SequencerPhase::Idle
        } else {
            SequencerPhase::Running
        }
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn progress(&self) -> ScriptProgress {
        ScriptProgress { phase: self.phase(), remaining: self.remaining() }
    }
}

#[derive(Debug)]
pub(crate) enum SequencerEvent {
    Enqueue(Vec<CommandStep>),
    Reply,
}

#[derive(Debug, Clone)]
pub(crate) struct SequencerHandle {
    tx: mpsc::UnboundedSender<SequencerEvent>,
}

impl SequencerHandle {
    pub(crate) fn enqueue(&self, steps: Vec<CommandStep>) {
        // the task only goes away when the session is closed
        let _ = self.tx.send(SequencerEvent::Enqueue(steps));
    }

    pub(crate) fn advance(&self) {
        let _ = self.tx.send(SequencerEvent::Reply);
    }
}

/// Owns the sequencer and is the only place steps are sent from.
#[derive(Debug)]
pub(crate) struct SequencerTask {
    task: task::JoinHandle<()>,
}

impl SequencerTask {
    pub(crate) fn start(
        channel: CommandChannel,
        log: EventLog,
        progress: watch::Sender<ScriptProgress>,
    ) -> (Self, SequencerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = spawn(run(rx, channel, log, progress));
        (Self { task }, SequencerHandle { tx })
    }

    pub(crate) fn stop(&self) {
        self.task.abort();
    }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<SequencerEvent>,
    channel: CommandChannel,
    log: EventLog,
    progress: watch::Sender<ScriptProgress>,
) {
    let mut sequencer = CommandSequencer::new();

    // the settle timer, armed only after a reply or an enqueue
    let settle = sleep(Duration::ZERO);
    tokio::pin!(settle);
    let mut pending: Option<String> = None;

    loop {
        let ready = tokio::select! {
            () = &mut settle, if pending.is_some() => pending.take(),

            event = rx.recv() => {
                let dispatch = match event {
                    None => break,
                    Some(SequencerEvent::Enqueue(steps)) => {
                        if let Some(dropped) = pending.take() {
                            debug!("[Sequencer] replaced, dropping {dropped:?}");
                        }
                        sequencer.enqueue(steps)
                    }
                    // still settling after the previous reply
                    Some(SequencerEvent::Reply) if pending.is_some() => None,
                    Some(SequencerEvent::Reply) => sequencer.advance(),
                };

                match dispatch {
                    Some(Dispatch { text, delay }) if delay.is_zero() => Some(text),
                    Some(Dispatch { text, delay }) => {
                        settle.as_mut().reset(Instant::now() + delay);
                        pending = Some(text);
                        None
                    }
                    None => None,
                }
            }
        };

        if let Some(text) = ready {
            if let Err(err) = channel.send(&text).await {
                log.log(format!("[Sequencer] step {text:?} failed ({err}), script abandoned"));
                sequencer.clear();
            }
        }

        // a step waiting out its settle delay is not sent yet
        let mut current = sequencer.progress();
        if pending.is_some() {
            current.phase = SequencerPhase::Running;
            current.remaining += 1;
        }
        progress.send_replace(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(dispatches: &[Option<Dispatch>]) -> Vec<&str> {
        dispatches.iter().flatten().map(|d| d.text.as_str()).collect()
    }

    #[test]
    fn test_starts_idle() {
        let mut sequencer = CommandSequencer::new();
        assert_eq!(sequencer.phase(), SequencerPhase::Idle);
        assert_eq!(sequencer.advance(), None);
    }

    #[test]
    fn test_steps_dispatched_in_order() {
        let mut sequencer = CommandSequencer::new();

        let first = sequencer.enqueue(vec![
            CommandStep::new("takeoff", 0),
            CommandStep::new("up 100", 0),
            CommandStep::new("land", 500),
        ]);
        assert_eq!(sequencer.phase(), SequencerPhase::Running);

        // one reply per sent step
        let dispatches = vec![first, sequencer.advance(), sequencer.advance(), sequencer.advance()];

        assert_eq!(texts(&dispatches), vec!["takeoff", "up 100", "land"]);
        assert_eq!(dispatches[2].as_ref().unwrap().delay, Duration::from_millis(500));
        assert_eq!(dispatches[3], None);
        assert_eq!(sequencer.phase(), SequencerPhase::Idle);
    }

    #[test]
    fn test_enqueue_replaces_running_script() {
        let mut sequencer = CommandSequencer::new();

        sequencer.enqueue(vec![CommandStep::new("a1", 0), CommandStep::new("a2", 0)]);
        let first = sequencer.enqueue(vec![CommandStep::new("b1", 0), CommandStep::new("b2", 0)]);

        assert_eq!(first.unwrap().text, "b1");
        assert_eq!(sequencer.advance().unwrap().text, "b2");
        assert_eq!(sequencer.advance(), None);
    }

    #[test]
    fn test_no_auto_advance_stops_script() {
        let mut sequencer = CommandSequencer::new();

        sequencer.enqueue(vec![
            CommandStep::new("land", 0),
            CommandStep::last("battery?"),
            CommandStep::new("never", 0),
        ]);

        let query = sequencer.advance().unwrap();
        assert_eq!(query, Dispatch { text: "battery?".into(), delay: Duration::ZERO });
        assert_eq!(sequencer.phase(), SequencerPhase::Idle);
        assert_eq!(sequencer.advance(), None);
    }

    #[test]
    fn test_progress_counts_remaining() {
        let mut sequencer = CommandSequencer::new();
        sequencer.enqueue(vec![CommandStep::new("a", 0), CommandStep::new("b", 0)]);

        assert_eq!(
            sequencer.progress(),
            ScriptProgress { phase: SequencerPhase::Running, remaining: 1 }
        );

        sequencer.clear();
        assert_eq!(sequencer.progress(), ScriptProgress::default());
    }
}
