//! Single-threaded driver of one action set collection
//!
//! The dispatcher owns the current state and everything the actions need to run. A
//! host feeds it [`ControlInput`]s as they arrive and calls [`Dispatcher::tick`] at a
//! fixed interval.
//!
//! ```text
//! ControlInput ──► handle_input ──► resolve ──► ActionList::start ──┐
//!                                                                  ▼
//!       tick ──► resume ongoing lists                         ongoing
//!            └─► long press / auto-repeat of held controls ──► resolve ...
//!
//! state requested by an action ──► enter_state (deactivate old, activate new)
//! ```

use super::input::ControlInput;
use crate::action::{
    ActionContext, ActionEvent, Deflection, EffectSink, PassiveSettings, RepeatTiming,
};
use crate::config::TimingSettings;
use crate::control::{
    ControlDefinitions, ControlId, ControlLayout, Direction, DirectionMode, InputControl, Reason,
    SettingKind, TriggeringControl,
};
use crate::mapping::{ActionSetCollection, ActionSetId};
use crate::state::{StateTree, StateVector};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// State changes applied in one call before the dispatcher gives up
const MAX_STATE_HOPS: usize = 8;

/// A button held down or a pad held in one direction
#[derive(Clone, Copy, Debug)]
struct Held {
    control: InputControl,
    setting: SettingKind,
    since: Instant,
    long_fired: bool,
    next_repeat: Option<Instant>,
}

pub struct Dispatcher<E: EffectSink> {
    collection: ActionSetCollection,
    states: StateTree,
    controls: ControlLayout,
    timing: TimingSettings,
    passive: PassiveSettings,
    current: StateVector,
    ongoing: Vec<(ActionSetId, Reason)>,
    held: HashMap<ControlId, Held>,
    effects: E,
}

impl<E: EffectSink> Dispatcher<E> {
    pub fn new(
        collection: ActionSetCollection,
        states: StateTree,
        controls: ControlLayout,
        timing: TimingSettings,
        effects: E,
    ) -> Self {
        Self {
            collection,
            states,
            controls,
            timing,
            passive: PassiveSettings::default(),
            current: StateVector::GLOBAL,
            ongoing: Vec::new(),
            held: HashMap::new(),
            effects,
        }
    }

    pub fn current_state(&self) -> StateVector {
        self.current
    }

    pub fn collection(&self) -> &ActionSetCollection {
        &self.collection
    }

    pub fn collection_mut(&mut self) -> &mut ActionSetCollection {
        &mut self.collection
    }

    pub fn states(&self) -> &StateTree {
        &self.states
    }

    pub fn controls(&self) -> &ControlLayout {
        &self.controls
    }

    pub fn passive(&self) -> &PassiveSettings {
        &self.passive
    }

    pub fn effects(&self) -> &E {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut E {
        &mut self.effects
    }

    /// Number of lists still running
    pub fn ongoing(&self) -> usize {
        self.ongoing.len()
    }

    /// Enters the initial state
    pub fn start(&mut self, initial: StateVector, now: Instant) -> bool {
        info!("Starting dispatcher in {}", initial);
        self.enter_state(initial, now)
    }

    /// Switches to `target`, settling wildcard axes on the first existing child.
    ///
    /// Every active set is deactivated first, so held keys and buttons are released
    /// and passive settings withdrawn. Then every set whose state contains the new
    /// state is activated. Returns false if `target` does not exist.
    pub fn enter_state(&mut self, target: StateVector, now: Instant) -> bool {
        let mut target = target;
        for _ in 0..MAX_STATE_HOPS {
            let Some(settled) = self.states.settle(&target) else {
                warn!("Cannot enter state {}: it does not exist", target);
                return false;
            };
            match self.switch_to(settled, now) {
                Some(requested) => target = requested,
                None => return true,
            }
        }
        warn!(
            "Stopped following state requests after {} hops, staying in {}",
            MAX_STATE_HOPS, self.current
        );
        true
    }

    fn switch_to(&mut self, state: StateVector, now: Instant) -> Option<StateVector> {
        let previous = self.current;
        debug!("Switching state {} -> {}", previous, state);

        let Self {
            collection,
            states,
            timing,
            effects,
            passive,
            ongoing,
            current,
            ..
        } = self;
        let mut ctx = ActionContext::new(now, &*timing, &*states, &mut *effects, &mut *passive);

        for id in collection.ids() {
            if let Some(set) = collection.action_set_mut(id) {
                if set.is_active() {
                    set.deactivate(&mut ctx, previous);
                }
            }
        }
        ongoing.clear();
        *current = state;

        let entering = collection.sets_containing(&state);
        for id in &entering {
            if let Some(set) = collection.action_set_mut(*id) {
                set.mark_activation_pending();
            }
        }
        for id in &entering {
            if let Some(set) = collection.action_set_mut(*id) {
                if set.is_activation_pending() {
                    set.activate(&mut ctx, state);
                }
            }
        }
        debug!("Activated {} action sets in {}", entering.len(), state);

        ctx.take_requested_state()
    }

    /// Direction mode of a control in the current state, passive overrides first
    pub fn direction_mode(&self, id: ControlId) -> Option<DirectionMode> {
        self.passive
            .direction_mode(id)
            .or_else(|| self.controls.direction_mode(&self.current, id))
    }

    /// Handles one normalized input event
    pub fn handle_input(&mut self, input: ControlInput, now: Instant) {
        let id = input.control.id;
        let Some(mode) = self.direction_mode(id) else {
            warn!("Ignoring input from unknown control {}", id);
            return;
        };
        if !mode.supports(input.reason) || !mode.allows(input.control.direction) {
            debug!("Ignoring {}: not reported by {:?} controls", input, mode);
            return;
        }
        let setting = mode.setting_kind();

        let control = match input.reason {
            Reason::Pressed | Reason::Directed => {
                self.held.insert(
                    id,
                    Held {
                        control: input.control,
                        setting,
                        since: now,
                        long_fired: false,
                        next_repeat: None,
                    },
                );
                input.control
            }
            Reason::Released | Reason::Undirected => match self.held.remove(&id) {
                // Centering a pad fires on the direction that was held
                Some(held) if input.control.direction == Direction::None => {
                    held.control
                }
                _ => input.control,
            },
            _ => input.control,
        };
        // A centred stick ends whatever its updates started, such as pointer steering
        if input.reason == Reason::Undirected && setting == SettingKind::Continuous {
            self.cancel_ongoing(id, Reason::Updated);
        }

        let triggering = TriggeringControl {
            id,
            direction: control.direction,
            setting,
        };
        self.fire(triggering, input.reason, input.deflection, now);
    }

    /// Stops ongoing `reason` lists of sets bound to control `id`
    fn cancel_ongoing(&mut self, id: ControlId, reason: Reason) {
        let Self {
            collection,
            ongoing,
            ..
        } = self;
        ongoing.retain(|(set_id, list_reason)| {
            if *list_reason != reason {
                return true;
            }
            let Some(set) = collection.action_set_mut(*set_id) else {
                return false;
            };
            if set.triggering().id != id {
                return true;
            }
            if let Some(list) = set.actions_mut(reason) {
                list.cancel();
            }
            debug!("Cancelled ongoing {} list of action set {}", reason, set_id);
            false
        });
    }

    fn fire(
        &mut self,
        triggering: TriggeringControl,
        reason: Reason,
        deflection: Deflection,
        now: Instant,
    ) {
        let current = self.current;
        let Some(set_id) = self
            .collection
            .get_actions_for_input_control(&current, &triggering, true)
        else {
            debug!("No binding for {} in {}", triggering, current);
            return;
        };

        let requested = {
            let Self {
                collection,
                states,
                timing,
                effects,
                passive,
                ongoing,
                ..
            } = self;
            let Some(list) = collection
                .action_set_mut(set_id)
                .and_then(|set| set.actions_mut(reason))
            else {
                debug!("Action set {} has no {} list", set_id, reason);
                return;
            };
            if list.is_empty() {
                return;
            }

            debug!("{} {} runs action set {}", triggering, reason, set_id);
            let event = ActionEvent::new(current, triggering, reason).with_deflection(deflection);
            let mut ctx = ActionContext::new(now, &*timing, &*states, &mut *effects, &mut *passive);
            list.start(&mut ctx, &event);
            if list.is_ongoing() && !ongoing.contains(&(set_id, reason)) {
                ongoing.push((set_id, reason));
            }
            ctx.take_requested_state()
        };

        if let Some(state) = requested {
            self.enter_state(state, now);
        }
    }

    /// Advances ongoing lists and fires timer-driven reasons of held controls
    pub fn tick(&mut self, now: Instant) {
        let requested = {
            let Self {
                collection,
                states,
                timing,
                effects,
                passive,
                ongoing,
                ..
            } = self;
            let mut ctx = ActionContext::new(now, &*timing, &*states, &mut *effects, &mut *passive);
            ongoing.retain(|(id, reason)| {
                let Some(list) = collection
                    .action_set_mut(*id)
                    .and_then(|set| set.actions_mut(*reason))
                else {
                    return false;
                };
                list.resume(&mut ctx);
                list.is_ongoing()
            });
            ctx.take_requested_state()
        };
        if let Some(state) = requested {
            self.enter_state(state, now);
        }

        for (triggering, reason) in self.due_holds(now) {
            self.fire(triggering, reason, Deflection::CENTER, now);
        }
    }

    fn due_holds(&mut self, now: Instant) -> Vec<(TriggeringControl, Reason)> {
        let mut due = Vec::new();
        for (id, held) in self.held.iter_mut() {
            let triggering = TriggeringControl {
                id: *id,
                direction: held.control.direction,
                setting: held.setting,
            };
            let elapsed = now.saturating_duration_since(held.since);

            if held.setting == SettingKind::Button
                && !held.long_fired
                && elapsed >= self.timing.long_press()
            {
                held.long_fired = true;
                due.push((triggering, Reason::PressedLong));
            }

            let repeat = self.passive.repeat(*id).unwrap_or(RepeatTiming {
                delay: self.timing.repeat_delay(),
                interval: self.timing.repeat_interval(),
            });
            let next = held.next_repeat.unwrap_or(held.since + repeat.delay);
            if now >= next {
                held.next_repeat = Some(now + repeat.interval);
                let reason = match held.setting {
                    SettingKind::Button => Reason::PressRepeated,
                    _ => Reason::DirectionRepeated,
                };
                due.push((triggering, reason));
            }
        }
        due.sort_by_key(|(triggering, _)| triggering.id);
        due
    }

    /// Deactivates every active set and forgets held controls
    pub fn shutdown(&mut self, now: Instant) {
        info!("Shutting down dispatcher in {}", self.current);
        let current = self.current;
        let Self {
            collection,
            states,
            timing,
            effects,
            passive,
            ongoing,
            held,
            ..
        } = self;
        let mut ctx = ActionContext::new(now, &*timing, &*states, &mut *effects, &mut *passive);
        for id in collection.ids() {
            if let Some(set) = collection.action_set_mut(id) {
                if set.is_active() || set.is_ongoing() {
                    set.deactivate(&mut ctx, current);
                }
            }
        }
        ongoing.clear();
        held.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::effects::testing::{Recorded, RecordingEffects};
    use crate::action::effects::KeyCode;
    use crate::action::{
        Action, CellStep, ChangeSituationAction, DirectionModeAction, KeyAction,
        MouseWheelAction, NavigateCellsAction, PressMode, SteerPointerAction, WaitAction,
    };
    use std::time::Duration;

    fn dispatcher(collection: ActionSetCollection) -> Dispatcher<RecordingEffects> {
        Dispatcher::new(
            collection,
            StateTree::grid(2, 3, 4),
            ControlLayout::standard_gamepad(),
            TimingSettings::default(),
            RecordingEffects::default(),
        )
    }

    fn wheels(dispatcher: &Dispatcher<RecordingEffects>) -> Vec<i32> {
        dispatcher
            .effects()
            .calls
            .iter()
            .filter_map(|call| match call {
                Recorded::Wheel(delta) => Some(*delta),
                _ => None,
            })
            .collect()
    }

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn start_settles_the_initial_state() {
        let mut dispatcher = dispatcher(ActionSetCollection::new());
        assert!(dispatcher.start(StateVector::GLOBAL, Instant::now()));
        assert_eq!(dispatcher.current_state(), StateVector::new(1, 1, 1));
        assert!(!dispatcher.enter_state(StateVector::mode_level(5), Instant::now()));
        assert_eq!(dispatcher.current_state(), StateVector::new(1, 1, 1));
    }

    #[test]
    fn holding_a_button_repeats_navigation() {
        let mut collection = ActionSetCollection::new();
        let button = TriggeringControl::button(ControlId::Button1);
        collection.bind(
            StateVector::GLOBAL,
            button,
            Reason::PressRepeated,
            vec![Action::NavigateCells(NavigateCellsAction {
                step: CellStep::Next,
            })],
        );
        let mut dispatcher = dispatcher(collection);
        let base = Instant::now();
        dispatcher.start(StateVector::GLOBAL, base);

        dispatcher.handle_input(ControlInput::pressed(ControlId::Button1), base);
        dispatcher.tick(at(base, 100));
        assert_eq!(dispatcher.current_state(), StateVector::new(1, 1, 1));

        dispatcher.tick(at(base, 500));
        assert_eq!(dispatcher.current_state(), StateVector::new(1, 1, 2));
        dispatcher.tick(at(base, 600));
        assert_eq!(dispatcher.current_state(), StateVector::new(1, 1, 2));
        dispatcher.tick(at(base, 650));
        assert_eq!(dispatcher.current_state(), StateVector::new(1, 1, 3));

        dispatcher.handle_input(ControlInput::released(ControlId::Button1), at(base, 700));
        dispatcher.tick(at(base, 900));
        assert_eq!(dispatcher.current_state(), StateVector::new(1, 1, 3));
    }

    #[test]
    fn long_press_fires_once() {
        let mut collection = ActionSetCollection::new();
        collection.bind(
            StateVector::GLOBAL,
            TriggeringControl::button(ControlId::Button2),
            Reason::PressedLong,
            vec![Action::MouseWheel(MouseWheelAction { delta: 3 })],
        );
        let mut dispatcher = dispatcher(collection);
        let base = Instant::now();
        dispatcher.start(StateVector::GLOBAL, base);

        dispatcher.handle_input(ControlInput::pressed(ControlId::Button2), base);
        dispatcher.tick(at(base, 599));
        assert!(wheels(&dispatcher).is_empty());
        dispatcher.tick(at(base, 600));
        dispatcher.tick(at(base, 1200));
        assert_eq!(wheels(&dispatcher), vec![3]);
    }

    #[test]
    fn multi_tick_lists_resume_on_tick() {
        let mut collection = ActionSetCollection::new();
        collection.bind(
            StateVector::GLOBAL,
            TriggeringControl::button(ControlId::Start),
            Reason::Pressed,
            vec![
                Action::Wait(WaitAction::new(20)),
                Action::MouseWheel(MouseWheelAction { delta: 1 }),
            ],
        );
        let mut dispatcher = dispatcher(collection);
        let base = Instant::now();
        dispatcher.start(StateVector::GLOBAL, base);

        dispatcher.handle_input(ControlInput::pressed(ControlId::Start), base);
        assert_eq!(dispatcher.ongoing(), 1);
        dispatcher.tick(at(base, 10));
        assert!(wheels(&dispatcher).is_empty());
        dispatcher.tick(at(base, 20));
        assert_eq!(wheels(&dispatcher), vec![1]);
        assert_eq!(dispatcher.ongoing(), 0);
    }

    #[test]
    fn leaving_a_state_releases_held_keys() {
        let mut collection = ActionSetCollection::new();
        collection.bind(
            StateVector::page_level(1, 1),
            TriggeringControl::button(ControlId::Button2),
            Reason::Pressed,
            vec![Action::Key(KeyAction::new(KeyCode::Shift, PressMode::Press))],
        );
        collection.bind(
            StateVector::GLOBAL,
            TriggeringControl::button(ControlId::Button3),
            Reason::Pressed,
            vec![Action::ChangeSituation(ChangeSituationAction::new(
                StateVector::new(2, 1, 1),
            ))],
        );
        let mut dispatcher = dispatcher(collection);
        let base = Instant::now();
        dispatcher.start(StateVector::GLOBAL, base);

        dispatcher.handle_input(ControlInput::pressed(ControlId::Button2), base);
        assert_eq!(dispatcher.effects().keys(), vec![(KeyCode::Shift, true)]);

        dispatcher.handle_input(ControlInput::pressed(ControlId::Button3), at(base, 10));
        assert_eq!(dispatcher.current_state(), StateVector::new(2, 1, 1));
        assert_eq!(
            dispatcher.effects().keys(),
            vec![(KeyCode::Shift, true), (KeyCode::Shift, false)]
        );
    }

    #[test]
    fn passive_direction_mode_follows_the_state() {
        let mut collection = ActionSetCollection::new();
        collection.bind(
            StateVector::mode_level(2),
            TriggeringControl::discrete(ControlId::DPad, Direction::Up),
            Reason::Directed,
            vec![Action::DirectionMode(DirectionModeAction {
                mode: DirectionMode::EightWay,
            })],
        );
        let mut dispatcher = dispatcher(collection);
        let base = Instant::now();
        dispatcher.start(StateVector::GLOBAL, base);
        assert_eq!(
            dispatcher.direction_mode(ControlId::DPad),
            Some(DirectionMode::FourWay)
        );

        dispatcher.enter_state(StateVector::mode_level(2), base);
        assert_eq!(
            dispatcher.direction_mode(ControlId::DPad),
            Some(DirectionMode::EightWay)
        );

        dispatcher.enter_state(StateVector::mode_level(1), base);
        assert_eq!(dispatcher.passive().direction_mode(ControlId::DPad), None);
    }

    #[test]
    fn unsupported_inputs_are_ignored() {
        let mut collection = ActionSetCollection::new();
        collection.bind(
            StateVector::GLOBAL,
            TriggeringControl::discrete(ControlId::DPad, Direction::UpLeft),
            Reason::Directed,
            vec![Action::MouseWheel(MouseWheelAction { delta: 1 })],
        );
        let mut dispatcher = dispatcher(collection);
        let base = Instant::now();
        dispatcher.start(StateVector::GLOBAL, base);

        // Four-way pad does not report diagonals, buttons do not report directions
        dispatcher.handle_input(ControlInput::directed(ControlId::DPad, Direction::UpLeft), base);
        dispatcher.handle_input(
            ControlInput::directed(ControlId::Button1, Direction::None),
            base,
        );
        assert!(wheels(&dispatcher).is_empty());
    }

    #[test]
    fn centering_fires_on_the_held_direction() {
        let mut collection = ActionSetCollection::new();
        collection.bind(
            StateVector::GLOBAL,
            TriggeringControl::discrete(ControlId::DPad, Direction::Left),
            Reason::Undirected,
            vec![Action::MouseWheel(MouseWheelAction { delta: -1 })],
        );
        let mut dispatcher = dispatcher(collection);
        let base = Instant::now();
        dispatcher.start(StateVector::GLOBAL, base);

        dispatcher.handle_input(ControlInput::directed(ControlId::DPad, Direction::Left), base);
        dispatcher.handle_input(ControlInput::undirected(ControlId::DPad), at(base, 50));
        assert_eq!(wheels(&dispatcher), vec![-1]);
    }

    #[test]
    fn centering_a_stick_stops_steering() {
        let mut collection = ActionSetCollection::new();
        collection.bind(
            StateVector::GLOBAL,
            TriggeringControl::continuous(ControlId::LeftStick),
            Reason::Updated,
            vec![Action::SteerPointer(SteerPointerAction::new(1000.0))],
        );
        let mut dispatcher = dispatcher(collection);
        let base = Instant::now();
        dispatcher.start(StateVector::GLOBAL, base);

        let pointer_moves = |dispatcher: &Dispatcher<RecordingEffects>| {
            dispatcher
                .effects()
                .calls
                .iter()
                .filter(|call| matches!(call, Recorded::Pointer(_)))
                .count()
        };

        dispatcher.handle_input(
            ControlInput::moved(ControlId::LeftStick, Deflection::new(1.0, 0.0)),
            base,
        );
        assert_eq!(dispatcher.ongoing(), 1);
        dispatcher.tick(at(base, 20));
        let moved = pointer_moves(&dispatcher);
        assert_eq!(moved, 1);

        dispatcher.handle_input(ControlInput::undirected(ControlId::LeftStick), at(base, 30));
        assert_eq!(dispatcher.ongoing(), 0);
        for ms in (50..=1000).step_by(20) {
            dispatcher.tick(at(base, ms));
        }
        assert_eq!(pointer_moves(&dispatcher), moved);
    }

    #[test]
    fn wide_page_ids_are_never_entered() {
        let mut states = StateTree::new();
        states.add_mode(1, "Wide").add_page(200, "Far").add_cell(1, "Only");
        let mut collection = ActionSetCollection::new();
        collection.bind(
            StateVector::GLOBAL,
            TriggeringControl::button(ControlId::Button1),
            Reason::Pressed,
            vec![Action::MouseWheel(MouseWheelAction { delta: 1 })],
        );
        let mut dispatcher = Dispatcher::new(
            collection,
            states,
            ControlLayout::standard_gamepad(),
            TimingSettings::default(),
            RecordingEffects::default(),
        );
        let base = Instant::now();

        assert!(dispatcher.start(StateVector::GLOBAL, base));
        assert_eq!(dispatcher.current_state(), StateVector::mode_level(1));
        assert!(!dispatcher.enter_state(StateVector::new(1, 200, 1), base));

        dispatcher.handle_input(ControlInput::pressed(ControlId::Button1), base);
        assert_eq!(wheels(&dispatcher), vec![1]);
    }

    #[test]
    fn shutdown_releases_everything() {
        let mut collection = ActionSetCollection::new();
        collection.bind(
            StateVector::GLOBAL,
            TriggeringControl::button(ControlId::Button1),
            Reason::Pressed,
            vec![Action::Key(KeyAction::new(KeyCode::Alt, PressMode::Press))],
        );
        let mut dispatcher = dispatcher(collection);
        let base = Instant::now();
        dispatcher.start(StateVector::GLOBAL, base);
        dispatcher.handle_input(ControlInput::pressed(ControlId::Button1), base);

        dispatcher.shutdown(at(base, 5));
        dispatcher.shutdown(at(base, 6));
        assert_eq!(
            dispatcher.effects().keys(),
            vec![(KeyCode::Alt, true), (KeyCode::Alt, false)]
        );
    }
}
