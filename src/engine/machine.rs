//! Profile engine with statum state machine
//!
//! A loaded profile can only run after both validation passes. The typestate makes the
//! order a compile-time guarantee: there is no path from `Loaded` to `Active` that skips
//! [`ProfileEngine::secure`].
//!
//! # State Machine
//!
//! ```text
//! Loaded ──► Secured ──► Active ──► Deactivating ──► Deactivated
//!  (validate +       (enter        (shutdown      (every set
//!   security)         initial)      signal)        released)
//! ```
//!
//! # Architecture
//!
//! ```text
//! ControlInput ──► Input Channel ──► [Dispatcher] ──► EffectSink
//!                                         ▲
//!                                    tick interval
//! ```

use super::dispatcher::Dispatcher;
use super::error::EngineError;
use super::input::ControlInput;
use crate::action::EffectSink;
use crate::config::EngineSettings;
use crate::persistence::Profile;
use crate::state::StateVector;
use statum::{machine, state};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Effect sink owned by an engine task
pub type BoxedEffects = Box<dyn EffectSink + Send>;

/// Capacity of the input channel handed out by [`EngineHandle::start`]
const INPUT_CHANNEL_SIZE: usize = 256;

/// States for profile engine lifecycle using statum
#[state]
#[derive(Debug, Clone)]
pub enum EngineState {
    Loaded,       // Profile parsed, nothing checked yet
    Secured,      // Structural and security validation done
    Active,       // Dispatching inputs and ticks
    Deactivating, // Shutdown requested
    Deactivated,  // Every set released
}

/// Runs one profile through its lifecycle
#[machine]
pub struct ProfileEngine<S: EngineState> {
    name: String,
    settings: EngineSettings,
    initial_state: StateVector,
    dispatcher: Dispatcher<BoxedEffects>,
}

impl<S: EngineState> ProfileEngine<S> {
    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn dispatcher(&self) -> &Dispatcher<BoxedEffects> {
        &self.dispatcher
    }
}

/// Monotonic time taken from tokio's clock
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

impl ProfileEngine<Loaded> {
    pub fn create(profile: Profile, settings: EngineSettings, effects: BoxedEffects) -> Self {
        info!("Loading profile engine: {}", profile.name);

        let name = profile.name.clone();
        let initial_state = profile.initial_state;
        let states = profile.states.clone();
        let controls = profile.controls.clone();
        let collection = profile.into_collection();
        let dispatcher = Dispatcher::new(
            collection,
            states,
            controls,
            settings.timing.clone(),
            effects,
        );

        Self::new(name, settings, initial_state, dispatcher)
    }

    /// Prunes invalid bindings, then enforces the security limits
    pub fn secure(mut self) -> ProfileEngine<Secured> {
        info!("Securing profile engine: {}", self.name);

        let states = self.dispatcher.states().clone();
        let controls = self.dispatcher.controls().clone();
        let security = self.settings.security.clone();
        let collection = self.dispatcher.collection_mut();

        let report = collection.validate(&states, &controls);
        if !report.is_clean() {
            warn!("Profile {} had invalid bindings: {:?}", self.name, report);
        }
        let security_report = collection.validate_security(&security);
        if !security_report.is_clean() {
            warn!(
                "Profile {} violated security limits: {:?}",
                self.name, security_report
            );
        }

        debug!(
            "Profile {} secured with {} action sets",
            self.name,
            collection.len()
        );
        self.transition()
    }
}

impl ProfileEngine<Secured> {
    /// Enters the profile's initial state
    pub fn activate(mut self) -> Result<ProfileEngine<Active>, EngineError> {
        info!("Activating profile engine: {}", self.name);

        if let Err(e) = self.dispatcher.states().check_ids() {
            error!("State tree of {} is unusable: {}", self.name, e);
            return Err(EngineError::ConfigError(e.to_string()));
        }
        if !self.dispatcher.start(self.initial_state, now()) {
            error!(
                "Initial state {} of {} does not exist",
                self.initial_state, self.name
            );
            return Err(EngineError::UnknownState(self.initial_state.to_string()));
        }
        Ok(self.transition())
    }
}

impl ProfileEngine<Active> {
    pub fn handle_input(&mut self, input: ControlInput) {
        debug!("Input: {}", input);
        self.dispatcher.handle_input(input, now());
    }

    pub fn tick(&mut self) {
        self.dispatcher.tick(now());
    }

    /// Main processing loop with graceful shutdown support
    ///
    /// Runs until the shutdown signal arrives or every input sender is dropped. Inputs
    /// are handled as they arrive; ongoing lists and held controls advance on every
    /// tick of the configured interval.
    pub async fn run_until_shutdown(
        mut self,
        mut input_receiver: mpsc::Receiver<ControlInput>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) -> ProfileEngine<Deactivating> {
        info!("Starting dispatch loop for: {}", self.name);

        let mut ticker = tokio::time::interval(self.settings.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Shutdown signal received for: {}", self.name);
                    break;
                }

                input = input_receiver.recv() => {
                    match input {
                        Some(input) => self.handle_input(input),
                        None => {
                            info!("Input channel closed for: {}", self.name);
                            break;
                        }
                    }
                }

                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }

        info!("Transitioning to Deactivating state: {}", self.name);
        self.transition()
    }

    pub fn deactivate(self) -> ProfileEngine<Deactivating> {
        info!("Deactivating profile engine: {}", self.name);
        self.transition()
    }
}

impl ProfileEngine<Deactivating> {
    /// Releases everything the active sets hold
    pub fn shutdown(mut self) -> ProfileEngine<Deactivated> {
        info!("Shutting down profile engine: {}", self.name);
        self.dispatcher.shutdown(now());
        info!("Engine shut down successfully: {}", self.name);
        self.transition()
    }
}

impl ProfileEngine<Deactivated> {
    /// State the engine was in when it stopped
    pub fn final_state(&self) -> StateVector {
        self.dispatcher.current_state()
    }
}

/// Handle for a profile engine running in a tokio task
#[derive(Debug)]
pub struct EngineHandle {
    pub name: String,

    task_handle: Option<JoinHandle<Result<(), EngineError>>>,

    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl EngineHandle {
    pub fn new(name: String) -> Self {
        Self {
            name,
            task_handle: None,
            shutdown_tx: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Validates and activates the profile, then spawns the dispatch loop
    ///
    /// # Returns
    ///
    /// * Input sender feeding the dispatcher
    pub fn start(
        &mut self,
        profile: Profile,
        settings: EngineSettings,
        effects: BoxedEffects,
    ) -> Result<mpsc::Sender<ControlInput>, EngineError> {
        if self.task_handle.is_some() {
            return Err(EngineError::AlreadyStarted(self.name.clone()));
        }

        let (input_tx, input_rx) = mpsc::channel(INPUT_CHANNEL_SIZE);
        let engine = ProfileEngine::create(profile, settings, effects)
            .secure()
            .activate()?;
        let engine_name = self.name.clone();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);
        let task_handle = tokio::spawn(async move {
            info!("Spawning running engine: {}", engine_name);
            let deactivating = engine.run_until_shutdown(input_rx, shutdown_rx).await;
            info!("Engine entering deactivating state: {}", engine_name);
            let stopped = deactivating.shutdown();
            debug!("Engine {} stopped in {}", engine_name, stopped.final_state());
            Ok(())
        });

        self.task_handle = Some(task_handle);
        info!("Profile engine activated: {}", self.name);
        Ok(input_tx)
    }

    /// Gracefully shuts down the engine and waits for task completion
    pub async fn shutdown(&mut self) -> Result<(), EngineError> {
        debug!("Sending shutdown signal to engine: {}", self.name);

        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                warn!("Engine task already terminated: {}", self.name);
            }
        }

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => {
                    debug!("Engine task completed: {}", self.name);
                    result
                }
                Err(e) => {
                    error!("Engine task panicked: {} - {}", self.name, e);
                    Err(EngineError::TaskError(format!(
                        "Engine task panicked: {}",
                        e
                    )))
                }
            }
        } else {
            debug!("Engine already shut down: {}", self.name);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::effects::testing::{Recorded, SharedEffects};
    use crate::action::effects::KeyCode;
    use crate::action::{Action, KeyAction, MouseWheelAction, PressMode};
    use crate::control::{ControlId, Reason, TriggeringControl};
    use crate::state::StateTree;
    use std::time::Duration;

    fn profile() -> Profile {
        let mut profile = Profile::new("test");
        profile.states = StateTree::grid(2, 2, 2);
        profile.bind(
            StateVector::GLOBAL,
            TriggeringControl::button(ControlId::Button1),
            Reason::Pressed,
            vec![Action::Key(KeyAction::new(KeyCode::Shift, PressMode::Press))],
        );
        profile.bind(
            StateVector::GLOBAL,
            TriggeringControl::button(ControlId::Button2),
            Reason::PressRepeated,
            vec![Action::MouseWheel(MouseWheelAction { delta: 1 })],
        );
        profile
    }

    #[test]
    fn secure_strips_repeated_input() {
        let effects = SharedEffects::default();
        let engine =
            ProfileEngine::create(profile(), EngineSettings::default(), Box::new(effects)).secure();

        let collection = engine.dispatcher().collection();
        let wheel = collection
            .find(
                &StateVector::GLOBAL,
                &TriggeringControl::button(ControlId::Button2),
            )
            .and_then(|id| collection.action_set(id));
        assert!(wheel.map_or(true, |set| set.actions(Reason::PressRepeated).is_none()));
    }

    #[test]
    fn unknown_initial_state_fails_activation() {
        let mut profile = profile();
        profile.initial_state = StateVector::mode_level(9);
        let effects = Box::new(SharedEffects::default());
        let result = ProfileEngine::create(profile, EngineSettings::default(), effects)
            .secure()
            .activate();
        assert!(matches!(result, Err(EngineError::UnknownState(_))));
    }

    #[test]
    fn state_ids_that_do_not_pack_fail_activation() {
        let mut profile = profile();
        profile
            .states
            .add_mode(3, "Wide")
            .add_page(200, "Far")
            .add_cell(1, "Only");
        let effects = Box::new(SharedEffects::default());
        let result = ProfileEngine::create(profile, EngineSettings::default(), effects)
            .secure()
            .activate();
        assert!(matches!(result, Err(EngineError::ConfigError(_))));
    }

    #[tokio::test]
    async fn handle_runs_inputs_and_releases_on_shutdown() {
        let effects = SharedEffects::default();
        let mut handle = EngineHandle::new("test".to_string());
        let inputs = handle
            .start(profile(), EngineSettings::default(), Box::new(effects.clone()))
            .unwrap();
        assert!(handle.is_running());
        assert!(matches!(
            handle.start(profile(), EngineSettings::default(), Box::new(effects.clone())),
            Err(EngineError::AlreadyStarted(_))
        ));

        inputs
            .send(ControlInput::pressed(ControlId::Button1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(effects.calls(), vec![Recorded::Key(KeyCode::Shift, true)]);

        handle.shutdown().await.unwrap();
        assert!(!handle.is_running());
        assert_eq!(
            effects.calls(),
            vec![
                Recorded::Key(KeyCode::Shift, true),
                Recorded::Key(KeyCode::Shift, false)
            ]
        );
    }

    #[tokio::test]
    async fn closing_the_input_channel_stops_the_engine() {
        let mut handle = EngineHandle::new("closing".to_string());
        let effects = Box::new(SharedEffects::default());
        let inputs = handle
            .start(profile(), EngineSettings::default(), effects)
            .unwrap();
        drop(inputs);
        handle.shutdown().await.unwrap();
        handle.shutdown().await.unwrap();
    }
}
