use super::context::{ActionContext, ActionEvent};
use super::{Description, Lifecycle};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Delays the rest of its action list
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WaitAction {
    pub duration_ms: u64,

    #[serde(skip)]
    started: Option<Instant>,
}

impl WaitAction {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            started: None,
        }
    }

    fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

impl Lifecycle for WaitAction {
    fn start(&mut self, ctx: &mut ActionContext<'_>, _event: &ActionEvent) {
        if self.duration_ms > 0 {
            self.started = Some(ctx.now);
        }
    }

    fn resume(&mut self, ctx: &mut ActionContext<'_>, _event: &ActionEvent) {
        if let Some(started) = self.started {
            if ctx.elapsed_since(started) >= self.duration() {
                self.started = None;
            }
        }
    }

    fn is_ongoing(&self) -> bool {
        self.started.is_some()
    }

    fn cancel(&mut self) {
        self.started = None;
    }

    fn describe(&self) -> Description {
        Description {
            text: format!("Wait {} ms", self.duration_ms),
            short: format!("Wait {}ms", self.duration_ms),
            tiny: format!("{}ms", self.duration_ms),
            icon: Some("wait"),
        }
    }
}

/// Placeholder that does nothing. Keeps a reason bound without an effect.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NoOpAction {}

impl Lifecycle for NoOpAction {
    fn start(&mut self, _ctx: &mut ActionContext<'_>, _event: &ActionEvent) {}

    fn describe(&self) -> Description {
        Description {
            text: "Do nothing".to_string(),
            short: "Nothing".to_string(),
            tiny: "-".to_string(),
            icon: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::effects::testing::RecordingEffects;
    use crate::action::testing::Harness;

    #[test]
    fn wait_finishes_after_duration() {
        let mut harness = Harness::new();
        let event = harness.event();
        let mut effects = RecordingEffects::default();
        let mut action = WaitAction::new(100);

        action.start(&mut harness.context(&mut effects, 0), &event);
        action.resume(&mut harness.context(&mut effects, 99), &event);
        assert!(action.is_ongoing());
        action.resume(&mut harness.context(&mut effects, 100), &event);
        assert!(!action.is_ongoing());
    }

    #[test]
    fn zero_wait_completes_on_start() {
        let mut harness = Harness::new();
        let event = harness.event();
        let mut effects = RecordingEffects::default();
        let mut action = WaitAction::new(0);

        action.start(&mut harness.context(&mut effects, 0), &event);
        assert!(!action.is_ongoing());
    }
}
