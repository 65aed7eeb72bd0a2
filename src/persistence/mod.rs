//! # Profiles
//!
//! A profile is one complete, user-editable configuration: the state hierarchy, the
//! control layout and every binding. Profiles are TOML documents stored under
//! `<config dir>/actionmap/profiles/<name>.toml`.
//!
//! Each binding is addressed by its (state, triggering control) pair and each list
//! inside it by its reason, so the document mirrors the runtime structure:
//!
//! ```toml
//! name = "desktop"
//!
//! [[bindings]]
//! state = { mode = 1, page = -1, cell = -1 }
//! triggering = { id = "Button1" }
//!
//! [[bindings.lists]]
//! reason = "Pressed"
//!
//! [[bindings.lists.actions]]
//! type = "Key"
//! key = "Enter"
//! ```
//!
//! Loading never runs a profile. The engine validates it first.

use crate::action::effects::{
    KeyCode, MouseButton, PointerMotion, PointerUnits, ProgramSpec, WindowMatch, WindowOp,
};
use crate::action::{
    Action, ActionList, ActionSet, CellStep, ChangeSituationAction, ClickMode, KeyAction,
    MouseButtonAction, MovePointerAction, NavigateCellsAction, StartProgramAction,
    SteerPointerAction, TypeTextAction, WaitAction, WindowAction,
};
use crate::config::{EngineSettings, PROFILE_DIR};
use crate::control::{ControlId, ControlLayout, Direction, Reason, TriggeringControl};
use crate::mapping::ActionSetCollection;
use crate::state::{StateTree, StateVector, NEXT};
use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const PROFILE_EXTENSION: &str = "toml";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Profile {
    pub name: String,
    /// State entered on start. Wildcard axes settle on the first child.
    #[serde(default)]
    pub initial_state: StateVector,
    #[serde(default)]
    pub states: StateTree,
    #[serde(default = "ControlLayout::standard_gamepad")]
    pub controls: ControlLayout,
    #[serde(default)]
    pub bindings: Vec<ActionSet>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial_state: StateVector::GLOBAL,
            states: StateTree::new(),
            controls: ControlLayout::standard_gamepad(),
            bindings: Vec::new(),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let profile: Self =
            toml::from_str(content).map_err(|e| eyre!("Failed to parse profile: {}", e))?;
        profile
            .states
            .check_ids()
            .map_err(|e| eyre!("Invalid state tree in profile {}: {}", profile.name, e))?;
        Ok(profile)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize profile {}: {}", self.name, e))
    }

    /// `<config dir>/actionmap/profiles`
    pub fn default_dir() -> Option<PathBuf> {
        EngineSettings::config_dir().map(|dir| dir.join(PROFILE_DIR))
    }

    pub fn path_for(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{}.{}", name, PROFILE_EXTENSION))
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read profile {}: {}", path.display(), e))?;
        let profile = Self::from_toml_str(&content)?;
        info!(
            "Loaded profile {} with {} bindings from {}",
            profile.name,
            profile.bindings.len(),
            path.display()
        );
        Ok(profile)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create profile directory: {}", e))?;
        }
        let content = self.to_toml_string()?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write profile {}: {}", path.display(), e))?;
        info!("Saved profile {} to {}", self.name, path.display());
        Ok(())
    }

    /// Names of the profiles stored in `dir`, sorted. A missing directory has none.
    pub async fn available(dir: &Path) -> Result<Vec<String>> {
        if !tokio::fs::try_exists(dir)
            .await
            .map_err(|e| eyre!("Failed to check profile directory: {}", e))?
        {
            debug!("Profile directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| eyre!("Failed to read profile directory: {}", e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| eyre!("Failed to read profile directory entry: {}", e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(PROFILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn into_collection(self) -> ActionSetCollection {
        ActionSetCollection::from_sets(self.bindings)
    }

    /// Adds `actions` for `reason` to the binding of (state, control), creating it
    pub fn bind(
        &mut self,
        state: StateVector,
        triggering: TriggeringControl,
        reason: Reason,
        actions: Vec<Action>,
    ) {
        let list = Some(ActionList::new(reason, actions));
        match self
            .bindings
            .iter_mut()
            .find(|set| set.state() == state && set.triggering() == triggering)
        {
            Some(set) => set.set_actions(reason, list),
            None => {
                let mut set = ActionSet::new(state, triggering);
                set.set_actions(reason, list);
                self.bindings.push(set);
            }
        }
    }

    /// Small desktop profile used when no profile file exists
    ///
    /// Two modes of three pages with four cells each. Buttons type and click, the pad
    /// walks the cells, the left stick steers the pointer and Start switches modes.
    pub fn sample() -> Self {
        let mut profile = Self::new("sample");
        profile.states = StateTree::grid(2, 3, 4);

        let global = StateVector::GLOBAL;
        profile.bind(
            global,
            TriggeringControl::button(ControlId::Button1),
            Reason::Pressed,
            vec![Action::Key(KeyAction::stroke(KeyCode::Enter))],
        );
        profile.bind(
            global,
            TriggeringControl::button(ControlId::Button2),
            Reason::Pressed,
            vec![Action::Key(KeyAction::stroke(KeyCode::Escape))],
        );
        profile.bind(
            global,
            TriggeringControl::button(ControlId::Button3),
            Reason::Pressed,
            vec![Action::MouseButton(MouseButtonAction::new(
                MouseButton::Left,
                ClickMode::Click,
            ))],
        );
        profile.bind(
            global,
            TriggeringControl::button(ControlId::Button4),
            Reason::Pressed,
            vec![Action::MouseButton(MouseButtonAction::new(
                MouseButton::Left,
                ClickMode::DoubleClick,
            ))],
        );
        profile.bind(
            global,
            TriggeringControl::button(ControlId::Start),
            Reason::Pressed,
            vec![Action::ChangeSituation(ChangeSituationAction::new(
                StateVector::new(NEXT, 1, 1),
            ))],
        );
        profile.bind(
            global,
            TriggeringControl::button(ControlId::Select),
            Reason::PressedLong,
            vec![Action::StartProgram(StartProgramAction {
                program: ProgramSpec {
                    program: "xdg-open".to_string(),
                    args: vec![".".to_string()],
                    working_dir: None,
                },
            })],
        );
        profile.bind(
            global,
            TriggeringControl::continuous(ControlId::LeftStick),
            Reason::Updated,
            vec![Action::SteerPointer(SteerPointerAction::default())],
        );

        for (direction, step) in [
            (Direction::Right, CellStep::Next),
            (Direction::Left, CellStep::Previous),
        ] {
            let pad = TriggeringControl::discrete(ControlId::DPad, direction);
            for reason in [Reason::Directed, Reason::DirectionRepeated] {
                profile.bind(
                    global,
                    pad,
                    reason,
                    vec![Action::NavigateCells(NavigateCellsAction { step })],
                );
            }
        }

        // Mode 2 is a text mode: the same buttons type words instead
        let text_mode = StateVector::mode_level(2);
        profile.bind(
            text_mode,
            TriggeringControl::button(ControlId::Button1),
            Reason::Pressed,
            vec![Action::TypeText(TypeTextAction {
                text: "hello ".to_string(),
            })],
        );
        profile.bind(
            text_mode,
            TriggeringControl::button(ControlId::Button2),
            Reason::Pressed,
            vec![
                Action::Window(WindowAction {
                    op: WindowOp::Activate,
                    target: WindowMatch {
                        process: None,
                        title: Some("Editor".to_string()),
                    },
                }),
                Action::Wait(WaitAction::new(100)),
                Action::MovePointer(MovePointerAction {
                    motion: PointerMotion {
                        x: 0.5,
                        y: 0.5,
                        units: PointerUnits::Normalized,
                        relative: false,
                    },
                }),
            ],
        );

        profile
    }
}
