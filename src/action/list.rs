//! Sequential, resumable execution of an ordered action sequence
//!
//! ```text
//!   actions:  [ done ][ done ][ current ][ not started ][ not started ]
//!                               ▲
//!                        cursor.index
//! ```
//!
//! Only the action under the cursor runs. When it is no longer ongoing the cursor
//! advances and the next action starts in the same call, so a list of synchronous
//! actions completes within one tick.

use super::context::{ActionContext, ActionEvent};
use super::{Action, Lifecycle};
use crate::control::Reason;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Cursor {
    index: usize,
    /// The action at `index` has been started
    started: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionList {
    reason: Reason,
    #[serde(default)]
    pub actions: Vec<Action>,

    #[serde(skip)]
    cursor: Cursor,
    #[serde(skip)]
    ongoing: bool,
    /// Event that started the current run, replayed to every later action
    #[serde(skip)]
    current_event: Option<ActionEvent>,
}

impl ActionList {
    pub fn new(reason: Reason, actions: Vec<Action>) -> Self {
        Self {
            reason,
            actions,
            cursor: Cursor::default(),
            ongoing: false,
            current_event: None,
        }
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    pub(crate) fn set_reason(&mut self, reason: Reason) {
        self.reason = reason;
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn is_ongoing(&self) -> bool {
        self.ongoing
    }

    pub fn current_event(&self) -> Option<&ActionEvent> {
        self.current_event.as_ref()
    }

    /// Starts a new run from the first action, abandoning any previous run
    pub fn start(&mut self, ctx: &mut ActionContext<'_>, event: &ActionEvent) {
        self.ongoing = false;
        self.current_event = Some(event.clone());
        self.cursor = Cursor::default();
        self.run(ctx);
    }

    /// Continues the current run. Does nothing if the list is not ongoing.
    pub fn resume(&mut self, ctx: &mut ActionContext<'_>) {
        if !self.ongoing {
            return;
        }
        self.run(ctx);
    }

    fn run(&mut self, ctx: &mut ActionContext<'_>) {
        let Some(event) = self.current_event.clone() else {
            self.ongoing = false;
            return;
        };

        while let Some(action) = self.actions.get_mut(self.cursor.index) {
            if self.cursor.started {
                action.resume(ctx, &event);
            } else {
                action.start(ctx, &event);
                self.cursor.started = true;
            }

            if action.is_ongoing() {
                self.ongoing = true;
                return;
            }
            self.cursor = Cursor {
                index: self.cursor.index + 1,
                started: false,
            };
        }

        debug!("{} list finished after {} actions", self.reason, self.actions.len());
        self.ongoing = false;
        self.cursor = Cursor::default();
    }

    /// Forwards to every action regardless of the cursor
    pub fn activate(&mut self, ctx: &mut ActionContext<'_>, event: &ActionEvent) {
        self.reset();
        for action in &mut self.actions {
            action.activate(ctx, event);
        }
    }

    /// Releases whatever every action holds and cancels the current run
    pub fn deactivate(&mut self, ctx: &mut ActionContext<'_>, event: &ActionEvent) {
        for action in &mut self.actions {
            action.deactivate(ctx, event);
        }
        self.reset();
    }

    /// Stops the current run without touching effects
    pub fn cancel(&mut self) {
        for action in &mut self.actions {
            action.cancel();
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.ongoing = false;
        self.cursor = Cursor::default();
        self.current_event = None;
    }

    /// Keeps the first `max` actions, returns how many were dropped
    pub(crate) fn truncate(&mut self, max: usize) -> usize {
        let dropped = self.actions.len().saturating_sub(max);
        self.actions.truncate(max);
        dropped
    }

    /// Keeps actions matching `keep`, returns how many were dropped
    pub(crate) fn retain(&mut self, keep: impl FnMut(&Action) -> bool) -> usize {
        let before = self.actions.len();
        self.actions.retain(keep);
        before - self.actions.len()
    }

    pub fn describe(&self) -> String {
        self.actions
            .iter()
            .map(|action| action.describe().text)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::effects::testing::{Recorded, RecordingEffects};
    use crate::action::effects::KeyCode;
    use crate::action::mouse::MouseWheelAction;
    use crate::action::testing::Harness;
    use crate::action::{KeyAction, PressMode, WaitAction};

    fn wheels(effects: &RecordingEffects) -> Vec<i32> {
        effects
            .calls
            .iter()
            .filter_map(|call| match call {
                Recorded::Wheel(delta) => Some(*delta),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn second_action_waits_for_the_first() {
        let mut harness = Harness::new();
        let event = harness.event();
        let mut effects = RecordingEffects::default();
        // Wait spans ticks 1 and 2 (0 ms and 10 ms), finishes on tick 3 (20 ms)
        let mut list = ActionList::new(
            Reason::Pressed,
            vec![
                Action::Wait(WaitAction::new(20)),
                Action::MouseWheel(MouseWheelAction { delta: 1 }),
                Action::MouseWheel(MouseWheelAction { delta: 2 }),
            ],
        );

        list.start(&mut harness.context(&mut effects, 0), &event);
        assert!(list.is_ongoing());
        assert!(wheels(&effects).is_empty());

        list.resume(&mut harness.context(&mut effects, 10));
        assert!(list.is_ongoing());
        assert!(wheels(&effects).is_empty());

        list.resume(&mut harness.context(&mut effects, 20));
        assert!(!list.is_ongoing());
        assert_eq!(wheels(&effects), vec![1, 2]);
    }

    #[test]
    fn synchronous_list_completes_in_one_call() {
        let mut harness = Harness::new();
        let event = harness.event();
        let mut effects = RecordingEffects::default();
        let mut list = ActionList::new(
            Reason::Released,
            vec![
                Action::MouseWheel(MouseWheelAction { delta: -1 }),
                Action::MouseWheel(MouseWheelAction { delta: -2 }),
            ],
        );

        list.start(&mut harness.context(&mut effects, 0), &event);
        assert!(!list.is_ongoing());
        assert_eq!(wheels(&effects), vec![-1, -2]);

        // Not ongoing, so resume is a no-op
        list.resume(&mut harness.context(&mut effects, 10));
        assert_eq!(wheels(&effects).len(), 2);
    }

    #[test]
    fn deactivate_cancels_run_and_releases() {
        let mut harness = Harness::new();
        let event = harness.event();
        let mut effects = RecordingEffects::default();
        let mut list = ActionList::new(
            Reason::Pressed,
            vec![
                Action::Key(KeyAction::new(KeyCode::Shift, PressMode::Press)),
                Action::Wait(WaitAction::new(1000)),
                Action::MouseWheel(MouseWheelAction { delta: 5 }),
            ],
        );

        list.start(&mut harness.context(&mut effects, 0), &event);
        assert!(list.is_ongoing());

        list.deactivate(&mut harness.context(&mut effects, 10), &event);
        assert!(!list.is_ongoing());
        assert_eq!(
            effects.keys(),
            vec![(KeyCode::Shift, true), (KeyCode::Shift, false)]
        );

        list.resume(&mut harness.context(&mut effects, 2000));
        assert!(wheels(&effects).is_empty());
    }

    #[test]
    fn restart_begins_from_first_action() {
        let mut harness = Harness::new();
        let event = harness.event();
        let mut effects = RecordingEffects::default();
        let mut list = ActionList::new(
            Reason::Pressed,
            vec![
                Action::MouseWheel(MouseWheelAction { delta: 1 }),
                Action::Wait(WaitAction::new(100)),
                Action::MouseWheel(MouseWheelAction { delta: 2 }),
            ],
        );

        list.start(&mut harness.context(&mut effects, 0), &event);
        list.start(&mut harness.context(&mut effects, 50), &event);
        list.resume(&mut harness.context(&mut effects, 150));

        assert_eq!(wheels(&effects), vec![1, 1, 2]);
        assert!(!list.is_ongoing());
    }
}
