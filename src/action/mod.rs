//! Actions and their execution lifecycle
//!
//! An [`Action`] is one effect operation. Every action follows the same lifecycle:
//!
//! ```text
//!             start()        resume() ... resume()
//! NotStarted ────────► Ongoing ──────────────────► Finished
//!     ▲                   │
//!     └───────────────────┘
//!      activate() / deactivate()
//! ```
//!
//! Actions never block. Anything that needs time (a keystroke that is released after
//! its length, a double click, a wait) records a timestamp on `start` and reports
//! [`Lifecycle::is_ongoing`] until a later `resume` sees enough time has passed.
//!
//! The set of actions is closed. Profiles name the variant through the serde `type`
//! tag, and [`Action::from_type`] builds a default instance of a variant for editors.

pub mod context;
pub mod effects;
pub mod flow;
pub mod keyboard;
pub mod list;
pub mod mouse;
pub mod navigation;
pub mod passive;
pub mod set;
pub mod system;

pub use context::{ActionContext, ActionEvent, Deflection, PassiveSettings, RepeatTiming};
pub use effects::{EffectError, EffectSink, UiEvent};
pub use flow::{NoOpAction, WaitAction};
pub use keyboard::{KeyAction, PressMode};
pub use list::ActionList;
pub use mouse::{
    ClickMode, MouseButtonAction, MouseWheelAction, MovePointerAction, SteerPointerAction,
};
pub use navigation::{CellStep, ChangeSituationAction, NavigateCellsAction};
pub use passive::{DirectionModeAction, RepeatSettingsAction};
pub use set::{ActionSet, Annotation};
pub use system::{
    LoadProfileAction, PredictionAction, StartProgramAction, TypeTextAction, WindowAction,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Texts shown for an action in the configuration UI and on overlays
#[derive(Clone, Debug, PartialEq)]
pub struct Description {
    pub text: String,
    pub short: String,
    pub tiny: String,
    pub icon: Option<&'static str>,
}

/// Execution contract shared by every action
///
/// `activate` and `deactivate` must be safe to call at any time and any number of
/// times. Failures of effect primitives are reported through the context and never
/// leave the action ongoing.
pub trait Lifecycle {
    /// Applies state-entry effects such as passive settings
    fn activate(&mut self, _ctx: &mut ActionContext<'_>, _event: &ActionEvent) {}

    /// Releases everything the action holds
    fn deactivate(&mut self, _ctx: &mut ActionContext<'_>, _event: &ActionEvent) {}

    fn start(&mut self, ctx: &mut ActionContext<'_>, event: &ActionEvent);

    /// Continues an ongoing action. Called once per tick while [`Self::is_ongoing`].
    fn resume(&mut self, _ctx: &mut ActionContext<'_>, _event: &ActionEvent) {}

    fn is_ongoing(&self) -> bool {
        false
    }

    /// Drops execution state without touching any effect
    fn cancel(&mut self) {}

    fn describe(&self) -> Description;
}

/// One configured effect operation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    Key(KeyAction),
    MouseButton(MouseButtonAction),
    MouseWheel(MouseWheelAction),
    MovePointer(MovePointerAction),
    SteerPointer(SteerPointerAction),
    StartProgram(StartProgramAction),
    Window(WindowAction),
    TypeText(TypeTextAction),
    ChangeSituation(ChangeSituationAction),
    NavigateCells(NavigateCellsAction),
    Wait(WaitAction),
    Prediction(PredictionAction),
    DirectionMode(DirectionModeAction),
    RepeatSettings(RepeatSettingsAction),
    LoadProfile(LoadProfileAction),
    NoOp(NoOpAction),
}

/// Serialized tag of an [`Action`] variant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    Key,
    MouseButton,
    MouseWheel,
    MovePointer,
    SteerPointer,
    StartProgram,
    Window,
    TypeText,
    ChangeSituation,
    NavigateCells,
    Wait,
    Prediction,
    DirectionMode,
    RepeatSettings,
    LoadProfile,
    NoOp,
}

impl ActionType {
    pub const ALL: [ActionType; 16] = [
        ActionType::Key,
        ActionType::MouseButton,
        ActionType::MouseWheel,
        ActionType::MovePointer,
        ActionType::SteerPointer,
        ActionType::StartProgram,
        ActionType::Window,
        ActionType::TypeText,
        ActionType::ChangeSituation,
        ActionType::NavigateCells,
        ActionType::Wait,
        ActionType::Prediction,
        ActionType::DirectionMode,
        ActionType::RepeatSettings,
        ActionType::LoadProfile,
        ActionType::NoOp,
    ];
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Runs `$body` with `$inner` bound to the variant's payload
macro_rules! dispatch {
    ($action:expr, $inner:ident => $body:expr) => {
        match $action {
            Action::Key($inner) => $body,
            Action::MouseButton($inner) => $body,
            Action::MouseWheel($inner) => $body,
            Action::MovePointer($inner) => $body,
            Action::SteerPointer($inner) => $body,
            Action::StartProgram($inner) => $body,
            Action::Window($inner) => $body,
            Action::TypeText($inner) => $body,
            Action::ChangeSituation($inner) => $body,
            Action::NavigateCells($inner) => $body,
            Action::Wait($inner) => $body,
            Action::Prediction($inner) => $body,
            Action::DirectionMode($inner) => $body,
            Action::RepeatSettings($inner) => $body,
            Action::LoadProfile($inner) => $body,
            Action::NoOp($inner) => $body,
        }
    };
}

impl Action {
    /// Default instance of the variant named by `action_type`
    pub fn from_type(action_type: ActionType) -> Self {
        match action_type {
            ActionType::Key => Action::Key(KeyAction::default()),
            ActionType::MouseButton => Action::MouseButton(MouseButtonAction::default()),
            ActionType::MouseWheel => Action::MouseWheel(MouseWheelAction::default()),
            ActionType::MovePointer => Action::MovePointer(MovePointerAction::default()),
            ActionType::SteerPointer => Action::SteerPointer(SteerPointerAction::default()),
            ActionType::StartProgram => Action::StartProgram(StartProgramAction::default()),
            ActionType::Window => Action::Window(WindowAction::default()),
            ActionType::TypeText => Action::TypeText(TypeTextAction::default()),
            ActionType::ChangeSituation => {
                Action::ChangeSituation(ChangeSituationAction::default())
            }
            ActionType::NavigateCells => Action::NavigateCells(NavigateCellsAction::default()),
            ActionType::Wait => Action::Wait(WaitAction::default()),
            ActionType::Prediction => Action::Prediction(PredictionAction::default()),
            ActionType::DirectionMode => Action::DirectionMode(DirectionModeAction::default()),
            ActionType::RepeatSettings => Action::RepeatSettings(RepeatSettingsAction::default()),
            ActionType::LoadProfile => Action::LoadProfile(LoadProfileAction::default()),
            ActionType::NoOp => Action::NoOp(NoOpAction::default()),
        }
    }

    pub fn action_type(&self) -> ActionType {
        match self {
            Action::Key(_) => ActionType::Key,
            Action::MouseButton(_) => ActionType::MouseButton,
            Action::MouseWheel(_) => ActionType::MouseWheel,
            Action::MovePointer(_) => ActionType::MovePointer,
            Action::SteerPointer(_) => ActionType::SteerPointer,
            Action::StartProgram(_) => ActionType::StartProgram,
            Action::Window(_) => ActionType::Window,
            Action::TypeText(_) => ActionType::TypeText,
            Action::ChangeSituation(_) => ActionType::ChangeSituation,
            Action::NavigateCells(_) => ActionType::NavigateCells,
            Action::Wait(_) => ActionType::Wait,
            Action::Prediction(_) => ActionType::Prediction,
            Action::DirectionMode(_) => ActionType::DirectionMode,
            Action::RepeatSettings(_) => ActionType::RepeatSettings,
            Action::LoadProfile(_) => ActionType::LoadProfile,
            Action::NoOp(_) => ActionType::NoOp,
        }
    }

    /// A Delete or Backspace keystroke
    pub fn is_deletion_key(&self) -> bool {
        matches!(self, Action::Key(key) if key.is_deletion())
    }

    /// Actions that produce text or start programs. Mixing these with a deletion key
    /// in one binding is rejected by the security pass.
    pub fn is_relevant(&self) -> bool {
        matches!(
            self,
            Action::Key(_) | Action::TypeText(_) | Action::StartProgram(_)
        )
    }

    /// Actions that may stay bound to a timer-driven auto-repeat reason
    pub fn allowed_on_auto_repeat(&self) -> bool {
        matches!(self, Action::ChangeSituation(_) | Action::NavigateCells(_))
    }
}

impl Lifecycle for Action {
    fn activate(&mut self, ctx: &mut ActionContext<'_>, event: &ActionEvent) {
        dispatch!(self, inner => {
            inner.activate(ctx, event);
            inner.cancel();
        })
    }

    fn deactivate(&mut self, ctx: &mut ActionContext<'_>, event: &ActionEvent) {
        dispatch!(self, inner => {
            inner.deactivate(ctx, event);
            inner.cancel();
        })
    }

    fn start(&mut self, ctx: &mut ActionContext<'_>, event: &ActionEvent) {
        dispatch!(self, inner => inner.start(ctx, event))
    }

    fn resume(&mut self, ctx: &mut ActionContext<'_>, event: &ActionEvent) {
        dispatch!(self, inner => inner.resume(ctx, event))
    }

    fn is_ongoing(&self) -> bool {
        dispatch!(self, inner => inner.is_ongoing())
    }

    fn cancel(&mut self) {
        dispatch!(self, inner => inner.cancel())
    }

    fn describe(&self) -> Description {
        dispatch!(self, inner => inner.describe())
    }
}

impl From<KeyAction> for Action {
    fn from(action: KeyAction) -> Self {
        Action::Key(action)
    }
}

impl From<ChangeSituationAction> for Action {
    fn from(action: ChangeSituationAction) -> Self {
        Action::ChangeSituation(action)
    }
}

impl From<WaitAction> for Action {
    fn from(action: WaitAction) -> Self {
        Action::Wait(action)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::context::{ActionContext, ActionEvent, PassiveSettings};
    use super::effects::testing::RecordingEffects;
    use crate::config::TimingSettings;
    use crate::control::{ControlId, Reason, TriggeringControl};
    use crate::state::{StateTree, StateVector};
    use std::time::{Duration, Instant};

    /// Owns what an [`ActionContext`] borrows, with a fixed time origin
    pub struct Harness {
        pub timing: TimingSettings,
        pub states: StateTree,
        pub passive: PassiveSettings,
        pub state: StateVector,
        pub base: Instant,
    }

    impl Harness {
        /// Default timing, a 2 x 3 x 4 grid, device in (1, 1, 1)
        pub fn new() -> Self {
            Self {
                timing: TimingSettings::default(),
                states: StateTree::grid(2, 3, 4),
                passive: PassiveSettings::default(),
                state: StateVector::new(1, 1, 1),
                base: Instant::now(),
            }
        }

        pub fn context<'a>(
            &'a mut self,
            effects: &'a mut RecordingEffects,
            ms: u64,
        ) -> ActionContext<'a> {
            ActionContext::new(
                self.base + Duration::from_millis(ms),
                &self.timing,
                &self.states,
                effects,
                &mut self.passive,
            )
        }

        pub fn event(&self) -> ActionEvent {
            ActionEvent::new(
                self.state,
                TriggeringControl::button(ControlId::Button1),
                Reason::Pressed,
            )
        }
    }
}
