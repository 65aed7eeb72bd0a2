//! Programs, windows, text and other host-level actions

use super::context::{ActionContext, ActionEvent};
use super::effects::{PredictionCommand, ProgramSpec, UiEvent, WindowMatch, WindowOp};
use super::{Description, Lifecycle};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StartProgramAction {
    #[serde(flatten)]
    pub program: ProgramSpec,
}

impl StartProgramAction {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: ProgramSpec {
                program: program.into(),
                ..ProgramSpec::default()
            },
        }
    }
}

impl Lifecycle for StartProgramAction {
    fn start(&mut self, ctx: &mut ActionContext<'_>, _event: &ActionEvent) {
        if let Err(e) = ctx.effects.start_process(&self.program) {
            ctx.report("Start program", e);
        }
    }

    fn describe(&self) -> Description {
        let name = std::path::Path::new(&self.program.program)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.program.clone());
        Description {
            text: format!("Start {}", self.program.program),
            short: format!("Start {}", name),
            tiny: name,
            icon: Some("program"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowAction {
    pub op: WindowOp,
    #[serde(default)]
    pub target: WindowMatch,
}

impl Default for WindowAction {
    fn default() -> Self {
        Self {
            op: WindowOp::Activate,
            target: WindowMatch::default(),
        }
    }
}

impl Lifecycle for WindowAction {
    fn start(&mut self, ctx: &mut ActionContext<'_>, _event: &ActionEvent) {
        if let Err(e) = ctx.effects.window(self.op, &self.target) {
            ctx.report("Window", e);
        }
    }

    fn describe(&self) -> Description {
        let verb = format!("{:?}", self.op);
        Description {
            text: format!("{} {}", verb, self.target),
            short: format!("{} window", verb),
            tiny: verb,
            icon: Some("window"),
        }
    }
}

/// Sends text to the UI side, which types it into the focused window
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeTextAction {
    pub text: String,
}

impl Lifecycle for TypeTextAction {
    fn start(&mut self, ctx: &mut ActionContext<'_>, _event: &ActionEvent) {
        if !self.text.is_empty() {
            ctx.effects.submit(UiEvent::text(self.text.clone()));
        }
    }

    fn describe(&self) -> Description {
        let tiny: String = self.text.chars().take(8).collect();
        Description {
            text: format!("Type \"{}\"", self.text),
            short: format!("Type {}", tiny),
            tiny,
            icon: Some("keyboard"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadProfileAction {
    pub name: String,
}

impl Lifecycle for LoadProfileAction {
    fn start(&mut self, ctx: &mut ActionContext<'_>, _event: &ActionEvent) {
        ctx.effects.submit(UiEvent::load_profile(self.name.clone()));
    }

    fn describe(&self) -> Description {
        Description {
            text: format!("Load profile {}", self.name),
            short: format!("Load {}", self.name),
            tiny: self.name.clone(),
            icon: Some("profile"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionAction {
    pub command: PredictionCommand,
}

impl Default for PredictionAction {
    fn default() -> Self {
        Self {
            command: PredictionCommand::Select(0),
        }
    }
}

impl Lifecycle for PredictionAction {
    fn start(&mut self, ctx: &mut ActionContext<'_>, _event: &ActionEvent) {
        if let Err(e) = ctx.effects.prediction(&self.command) {
            ctx.report("Prediction", e);
        }
    }

    fn describe(&self) -> Description {
        let (text, tiny) = match &self.command {
            PredictionCommand::Select(n) => {
                (format!("Insert suggestion {}", n + 1), format!("#{}", n + 1))
            }
            PredictionCommand::NextSuggestions => {
                ("Next suggestions".to_string(), ">>".to_string())
            }
            PredictionCommand::PreviousSuggestions => {
                ("Previous suggestions".to_string(), "<<".to_string())
            }
            PredictionCommand::Clear => ("Clear suggestions".to_string(), "Clr".to_string()),
        };
        Description {
            short: text.clone(),
            text,
            tiny,
            icon: Some("prediction"),
        }
    }
}
