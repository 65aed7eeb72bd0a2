//! Mouse button, wheel and pointer actions

use super::context::{ActionContext, ActionEvent, Deflection};
use super::effects::{EffectError, MouseButton, PointerMotion, PointerUnits};
use super::{Description, Lifecycle};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClickMode {
    #[default]
    Click,
    DoubleClick,
    Press,
    Release,
    Toggle,
}

/// Where a timed click currently is
#[derive(Clone, Copy, Debug, PartialEq)]
enum ClickPhase {
    /// Button is down, `remaining` clicks follow after the release
    Down { since: Instant, remaining: u8 },
    /// Button is up between two clicks
    Up { since: Instant, remaining: u8 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MouseButtonAction {
    pub button: MouseButton,
    #[serde(default)]
    pub mode: ClickMode,

    #[serde(skip)]
    phase: Option<ClickPhase>,
    #[serde(skip)]
    held: bool,
}

impl Default for MouseButtonAction {
    fn default() -> Self {
        Self::new(MouseButton::Left, ClickMode::Click)
    }
}

impl MouseButtonAction {
    pub fn new(button: MouseButton, mode: ClickMode) -> Self {
        Self {
            button,
            mode,
            phase: None,
            held: false,
        }
    }

    fn set(&mut self, ctx: &mut ActionContext<'_>, pressed: bool) -> Result<(), EffectError> {
        self.held = pressed;
        ctx.effects.set_mouse_button(self.button, pressed)
    }

    fn begin_click(
        &mut self,
        ctx: &mut ActionContext<'_>,
        remaining: u8,
    ) -> Result<(), EffectError> {
        self.set(ctx, true)?;
        self.phase = Some(ClickPhase::Down {
            since: ctx.now,
            remaining,
        });
        Ok(())
    }

    fn advance(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), EffectError> {
        match self.phase {
            Some(ClickPhase::Down { since, remaining })
                if ctx.elapsed_since(since) >= ctx.timing.click_length() =>
            {
                self.phase = None;
                self.set(ctx, false)?;
                if remaining > 0 {
                    self.phase = Some(ClickPhase::Up {
                        since: ctx.now,
                        remaining,
                    });
                }
                Ok(())
            }
            Some(ClickPhase::Up { since, remaining })
                if ctx.elapsed_since(since) >= ctx.timing.double_click_gap() =>
            {
                self.begin_click(ctx, remaining - 1)
            }
            _ => Ok(()),
        }
    }
}

impl Lifecycle for MouseButtonAction {
    fn deactivate(&mut self, ctx: &mut ActionContext<'_>, _event: &ActionEvent) {
        self.phase = None;
        if self.held {
            if let Err(e) = self.set(ctx, false) {
                ctx.report("Mouse button release", e);
            }
        }
    }

    fn start(&mut self, ctx: &mut ActionContext<'_>, _event: &ActionEvent) {
        let result = match self.mode {
            ClickMode::Click => self.begin_click(ctx, 0),
            ClickMode::DoubleClick => self.begin_click(ctx, 1),
            ClickMode::Press => self.set(ctx, true),
            ClickMode::Release => self.set(ctx, false),
            ClickMode::Toggle => ctx.effects.toggle_mouse_button(self.button),
        };
        if let Err(e) = result {
            ctx.report("Mouse button", e);
            self.cancel();
        }
    }

    fn resume(&mut self, ctx: &mut ActionContext<'_>, _event: &ActionEvent) {
        if let Err(e) = self.advance(ctx) {
            ctx.report("Mouse button", e);
            self.cancel();
        }
    }

    fn is_ongoing(&self) -> bool {
        self.phase.is_some()
    }

    fn cancel(&mut self) {
        self.phase = None;
    }

    fn describe(&self) -> Description {
        let button = format!("{:?}", self.button);
        let verb = match self.mode {
            ClickMode::Click => "Click",
            ClickMode::DoubleClick => "Double click",
            ClickMode::Press => "Hold",
            ClickMode::Release => "Release",
            ClickMode::Toggle => "Toggle",
        };
        Description {
            text: format!("{} {} mouse button", verb, button.to_lowercase()),
            short: format!("{} {}", verb, button),
            tiny: button,
            icon: Some("mouse"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MouseWheelAction {
    /// Positive scrolls up
    pub delta: i32,
}

impl Lifecycle for MouseWheelAction {
    fn start(&mut self, ctx: &mut ActionContext<'_>, _event: &ActionEvent) {
        if let Err(e) = ctx.effects.wheel(self.delta) {
            ctx.report("Mouse wheel", e);
        }
    }

    fn describe(&self) -> Description {
        let direction = if self.delta >= 0 { "up" } else { "down" };
        Description {
            text: format!("Scroll {} by {}", direction, self.delta.abs()),
            short: format!("Scroll {}", direction),
            tiny: format!("{:+}", self.delta),
            icon: Some("mouse"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovePointerAction {
    pub motion: PointerMotion,
}

impl Default for MovePointerAction {
    fn default() -> Self {
        Self {
            motion: PointerMotion {
                x: 0.5,
                y: 0.5,
                units: PointerUnits::Normalized,
                relative: false,
            },
        }
    }
}

impl Lifecycle for MovePointerAction {
    fn start(&mut self, ctx: &mut ActionContext<'_>, _event: &ActionEvent) {
        if let Err(e) = ctx.effects.move_pointer(self.motion) {
            ctx.report("Move pointer", e);
        }
    }

    fn describe(&self) -> Description {
        let m = &self.motion;
        let (verb, short) = if m.relative {
            ("Move pointer by", "Move by")
        } else {
            ("Move pointer to", "Move to")
        };
        let coords = match m.units {
            PointerUnits::Normalized => format!("{:.0}%, {:.0}%", m.x * 100.0, m.y * 100.0),
            PointerUnits::Pixels => format!("{}, {} px", m.x, m.y),
        };
        Description {
            text: format!("{} {}", verb, coords),
            short: format!("{} {}", short, coords),
            tiny: coords,
            icon: Some("pointer"),
        }
    }
}

/// Moves the pointer with a velocity proportional to the stick deflection
///
/// Every `start` (one per stick update) sets the velocity. Motion is emitted on
/// `resume` in whole pixels; the fractional remainder carries over to the next tick.
/// A centered deflection stops steering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SteerPointerAction {
    /// Pixels per second at full deflection
    pub speed: f64,
    #[serde(default)]
    pub invert_y: bool,

    #[serde(skip)]
    velocity: (f64, f64),
    #[serde(skip)]
    last_tick: Option<Instant>,
    #[serde(skip)]
    remainder: (f64, f64),
}

impl Default for SteerPointerAction {
    fn default() -> Self {
        Self::new(800.0)
    }
}

impl SteerPointerAction {
    pub fn new(speed: f64) -> Self {
        Self {
            speed,
            invert_y: false,
            velocity: (0.0, 0.0),
            last_tick: None,
            remainder: (0.0, 0.0),
        }
    }

    fn set_velocity(&mut self, deflection: Deflection) {
        let y = if self.invert_y {
            -deflection.y
        } else {
            deflection.y
        };
        self.velocity = (
            f64::from(deflection.x) * self.speed,
            f64::from(y) * self.speed,
        );
    }
}

impl Lifecycle for SteerPointerAction {
    fn start(&mut self, ctx: &mut ActionContext<'_>, event: &ActionEvent) {
        if event.deflection.is_centered() {
            self.cancel();
            return;
        }
        self.set_velocity(event.deflection);
        if self.last_tick.is_none() {
            self.last_tick = Some(ctx.now);
        }
    }

    fn resume(&mut self, ctx: &mut ActionContext<'_>, _event: &ActionEvent) {
        let Some(last) = self.last_tick else {
            return;
        };
        // Microsecond integer math keeps the accumulation exact for whole-ms ticks
        let micros = ctx.elapsed_since(last).as_micros() as f64;
        self.last_tick = Some(ctx.now);

        self.remainder.0 += self.velocity.0 * micros / 1_000_000.0;
        self.remainder.1 += self.velocity.1 * micros / 1_000_000.0;
        let dx = self.remainder.0.trunc();
        let dy = self.remainder.1.trunc();
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        self.remainder.0 -= dx;
        self.remainder.1 -= dy;

        let motion = PointerMotion {
            x: dx,
            y: dy,
            units: PointerUnits::Pixels,
            relative: true,
        };
        if let Err(e) = ctx.effects.move_pointer(motion) {
            ctx.report("Steer pointer", e);
            self.cancel();
        }
    }

    fn is_ongoing(&self) -> bool {
        self.last_tick.is_some()
    }

    fn cancel(&mut self) {
        self.last_tick = None;
        self.velocity = (0.0, 0.0);
        self.remainder = (0.0, 0.0);
    }

    fn describe(&self) -> Description {
        Description {
            text: format!("Steer pointer at up to {} px/s", self.speed),
            short: "Steer pointer".to_string(),
            tiny: "Steer".to_string(),
            icon: Some("pointer"),
        }
    }
}
