//! Per-player action queue.
//!
//! A player has at most one active action. `Always` actions wait their turn
//! in FIFO order behind it; `Never` actions stop it and take its place.
//! Actions count down in engine ticks, so they only ever advance inside a
//! [`TickTask`](crate::task::TickTask).

use crate::model::Player;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Most actions a player may have waiting behind the active one.
pub const MAX_WAITING: usize = 28;

pub type ActionId = u64;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePolicy {
    /// Wait behind the active action.
    Always,
    /// Replace the active action immediately.
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Running,
    Stopped,
}

/// What a behaviour wants after it has fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Fire again after another `delay` ticks.
    Continue,
    Stop,
}

/// Outcome of [`ActionQueue::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Started,
    Queued,
    Rejected,
}

type Behaviour = Box<dyn FnMut(&mut Player) -> Step + Send>;
type StopHook = Box<dyn FnOnce(&mut Player) + Send>;

pub struct Action {
    id: ActionId,
    policy: QueuePolicy,
    delay: u32,
    countdown: u32,
    state: ActionState,
    behaviour: Behaviour,
    on_stop: Option<StopHook>,
}

impl Action {
    /// An action that fires every `delay` ticks. A delay of zero fires on
    /// every tick.
    pub fn new<F>(policy: QueuePolicy, delay: u32, behaviour: F) -> Self
    where
        F: FnMut(&mut Player) -> Step + Send + 'static,
    {
        let delay = delay.max(1);
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            policy,
            delay,
            countdown: delay,
            state: ActionState::Running,
            behaviour: Box::new(behaviour),
            on_stop: None,
        }
    }

    /// Runs once when the action stops, however it stops.
    pub fn on_stop<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&mut Player) + Send + 'static,
    {
        self.on_stop = Some(Box::new(hook));
        self
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    pub fn delay(&self) -> u32 {
        self.delay
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ActionState::Running
    }

    pub(crate) fn fire(&mut self, player: &mut Player) -> Step {
        (self.behaviour)(player)
    }

    fn stop(&mut self) {
        self.state = ActionState::Stopped;
    }

    /// Runs the stop hook, if any. Only called once the action is stopped.
    pub(crate) fn finish(mut self, player: &mut Player) {
        if let Some(hook) = self.on_stop.take() {
            hook(player);
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.id)
            .field("policy", &self.policy)
            .field("delay", &self.delay)
            .field("countdown", &self.countdown)
            .field("state", &self.state)
            .finish()
    }
}

/// The Idle/Active state machine plus the FIFO waiting list.
///
/// While an action's behaviour runs it is taken out of the queue (it needs
/// `&mut Player`, which owns the queue). Enqueues and stops issued during
/// that window are recorded and applied by [`ActionQueue::finish_firing`].
#[derive(Debug, Default)]
pub struct ActionQueue {
    active: Option<Action>,
    waiting: VecDeque<Action>,
    firing: Option<ActionId>,
    firing_interrupted: bool,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.firing.is_none()
    }

    pub fn active_id(&self) -> Option<ActionId> {
        self.active.as_ref().map(Action::id)
    }

    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    /// Admits `action`. A `Never` action that displaces the active one
    /// hands the displaced, now stopped, action back so its stop hook can
    /// run.
    pub fn enqueue(&mut self, action: Action) -> (Admission, Option<Action>) {
        match action.policy {
            QueuePolicy::Never => {
                if self.firing.is_some() {
                    self.firing_interrupted = true;
                }
                let mut displaced = self.active.replace(action);
                if let Some(old) = displaced.as_mut() {
                    old.stop();
                }
                (Admission::Started, displaced)
            }
            QueuePolicy::Always => {
                if self.active.is_none() && self.firing.is_none() {
                    self.active = Some(action);
                    (Admission::Started, None)
                } else if self.waiting.len() >= MAX_WAITING {
                    (Admission::Rejected, None)
                } else {
                    self.waiting.push_back(action);
                    (Admission::Queued, None)
                }
            }
        }
    }

    /// Stops the active action and promotes the next waiting one. Stopping
    /// anything that is not active is a no-op.
    pub fn stop(&mut self, id: ActionId) -> Option<Action> {
        if self.active_id() == Some(id) {
            let mut stopped = self.active.take()?;
            stopped.stop();
            if self.firing.is_none() {
                self.promote();
            }
            return Some(stopped);
        }
        if self.firing == Some(id) {
            self.firing_interrupted = true;
        }
        None
    }

    /// Stops the active action and drops everything waiting.
    pub fn clear(&mut self) -> Option<Action> {
        self.waiting.clear();
        if self.firing.is_some() {
            self.firing_interrupted = true;
        }
        let mut stopped = self.active.take()?;
        stopped.stop();
        Some(stopped)
    }

    /// Advances the active action's countdown by one tick and takes it out
    /// of the queue if it is due to fire.
    pub fn take_due(&mut self) -> Option<Action> {
        if self.firing.is_some() {
            return None;
        }
        let active = self.active.as_mut()?;
        active.countdown = active.countdown.saturating_sub(1);
        if active.countdown > 0 {
            return None;
        }
        let mut due = self.active.take()?;
        due.countdown = due.delay;
        self.firing = Some(due.id);
        self.firing_interrupted = false;
        Some(due)
    }

    /// Puts a fired action back, or retires it when it asked to stop or was
    /// stopped while firing. Returns the retired action.
    pub fn finish_firing(&mut self, mut action: Action, step: Step) -> Option<Action> {
        self.firing = None;
        let interrupted = std::mem::take(&mut self.firing_interrupted);

        if step == Step::Continue && !interrupted && self.active.is_none() {
            self.active = Some(action);
            return None;
        }

        action.stop();
        if self.active.is_none() {
            self.promote();
        }
        Some(action)
    }

    fn promote(&mut self) {
        self.active = self.waiting.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Location;
    use crate::net::Session;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn idle(policy: QueuePolicy) -> Action {
        Action::new(policy, 1, |_| Step::Continue)
    }

    fn player() -> Player {
        let (session, _io) = Session::new(1, "127.0.0.1:1".parse().unwrap());
        Player::new(session, "tester", Location::DEFAULT)
    }

    #[test]
    fn test_always_actions_are_fifo() {
        let mut queue = ActionQueue::new();
        let first = idle(QueuePolicy::Always);
        let a = idle(QueuePolicy::Always);
        let b = idle(QueuePolicy::Always);
        let (first_id, a_id, b_id) = (first.id(), a.id(), b.id());

        assert_eq!(queue.enqueue(first).0, Admission::Started);
        assert_eq!(queue.enqueue(a).0, Admission::Queued);
        assert_eq!(queue.enqueue(b).0, Admission::Queued);

        assert!(queue.stop(first_id).is_some());
        assert_eq!(queue.active_id(), Some(a_id));
        assert!(queue.stop(a_id).is_some());
        assert_eq!(queue.active_id(), Some(b_id));
        assert!(queue.stop(b_id).is_some());
        assert!(queue.is_idle());
    }

    #[test]
    fn test_never_replaces_active() {
        let mut queue = ActionQueue::new();
        let first = idle(QueuePolicy::Always);
        let waiting = idle(QueuePolicy::Always);
        let urgent = idle(QueuePolicy::Never);
        let (first_id, urgent_id) = (first.id(), urgent.id());

        queue.enqueue(first);
        queue.enqueue(waiting);
        let (admission, displaced) = queue.enqueue(urgent);

        assert_eq!(admission, Admission::Started);
        let displaced = displaced.unwrap();
        assert_eq!(displaced.id(), first_id);
        assert_eq!(displaced.state(), ActionState::Stopped);
        assert_eq!(queue.active_id(), Some(urgent_id));
        assert_eq!(queue.waiting_len(), 1);
    }

    #[test]
    fn test_stop_of_inactive_action_is_noop() {
        let mut queue = ActionQueue::new();
        let first = idle(QueuePolicy::Always);
        let waiting = idle(QueuePolicy::Always);
        let (first_id, waiting_id) = (first.id(), waiting.id());
        queue.enqueue(first);
        queue.enqueue(waiting);

        assert!(queue.stop(waiting_id).is_none());
        assert!(queue.stop(9_999_999).is_none());
        assert_eq!(queue.active_id(), Some(first_id));
        assert_eq!(queue.waiting_len(), 1);
    }

    #[test]
    fn test_waiting_list_is_bounded() {
        let mut queue = ActionQueue::new();
        queue.enqueue(idle(QueuePolicy::Always));
        for _ in 0..MAX_WAITING {
            assert_eq!(queue.enqueue(idle(QueuePolicy::Always)).0, Admission::Queued);
        }
        assert_eq!(queue.enqueue(idle(QueuePolicy::Always)).0, Admission::Rejected);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut queue = ActionQueue::new();
        queue.enqueue(idle(QueuePolicy::Always));
        queue.enqueue(idle(QueuePolicy::Always));
        let stopped = queue.clear().unwrap();
        assert!(!stopped.is_running());
        assert!(queue.is_idle());
        assert_eq!(queue.waiting_len(), 0);
    }

    #[test]
    fn test_countdown_fires_every_delay_ticks() {
        let mut queue = ActionQueue::new();
        queue.enqueue(Action::new(QueuePolicy::Always, 3, |_| Step::Continue));

        assert!(queue.take_due().is_none());
        assert!(queue.take_due().is_none());
        let due = queue.take_due().unwrap();
        assert!(queue.finish_firing(due, Step::Continue).is_none());

        assert!(queue.take_due().is_none());
        assert!(queue.take_due().is_none());
        assert!(queue.take_due().is_some());
    }

    #[test]
    fn test_finishing_with_stop_promotes_next() {
        let mut queue = ActionQueue::new();
        queue.enqueue(idle(QueuePolicy::Always));
        let next = idle(QueuePolicy::Always);
        let next_id = next.id();
        queue.enqueue(next);

        let due = queue.take_due().unwrap();
        let retired = queue.finish_firing(due, Step::Stop).unwrap();
        assert_eq!(retired.state(), ActionState::Stopped);
        assert_eq!(queue.active_id(), Some(next_id));
    }

    #[test]
    fn test_stop_while_firing_is_applied_after() {
        let mut queue = ActionQueue::new();
        let action = idle(QueuePolicy::Always);
        let id = action.id();
        queue.enqueue(action);

        let due = queue.take_due().unwrap();
        assert!(queue.stop(id).is_none());
        assert!(queue.finish_firing(due, Step::Continue).is_some());
        assert!(queue.is_idle());
    }

    #[test]
    fn test_never_enqueued_while_firing_wins() {
        let mut queue = ActionQueue::new();
        queue.enqueue(idle(QueuePolicy::Always));
        let due = queue.take_due().unwrap();

        let urgent = idle(QueuePolicy::Never);
        let urgent_id = urgent.id();
        let (admission, displaced) = queue.enqueue(urgent);
        assert_eq!(admission, Admission::Started);
        assert!(displaced.is_none());

        assert!(queue.finish_firing(due, Step::Continue).is_some());
        assert_eq!(queue.active_id(), Some(urgent_id));
    }

    #[test]
    fn test_player_runs_behaviour_and_stop_hook() {
        let mut player = player();
        let fired = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        let hook = Arc::clone(&stopped);
        let action = Action::new(QueuePolicy::Always, 1, move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                Step::Stop
            } else {
                Step::Continue
            }
        })
        .on_stop(move |_| {
            hook.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(player.queue_action(action), Admission::Started);

        for _ in 0..5 {
            player.process_actions();
        }
        assert_eq!(fired.load(Ordering::SeqCst), 3);
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
        assert!(player.action_queue().is_idle());
    }

    #[test]
    fn test_behaviour_can_queue_follow_up() {
        let mut player = player();
        let follow_up_ran = Arc::new(AtomicUsize::new(0));
        let ran = Arc::clone(&follow_up_ran);

        let mut follow_up = Some(Action::new(QueuePolicy::Always, 1, move |_| {
            ran.fetch_add(1, Ordering::SeqCst);
            Step::Stop
        }));
        player.queue_action(Action::new(QueuePolicy::Always, 1, move |p| {
            if let Some(next) = follow_up.take() {
                p.queue_action(next);
            }
            Step::Stop
        }));

        player.process_actions();
        player.process_actions();
        assert_eq!(follow_up_ran.load(Ordering::SeqCst), 1);
    }
}
