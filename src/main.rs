use actionmap::action::UiEvent;
use actionmap::config::EngineSettings;
use actionmap::engine::{ControlInput, EngineHandle, TracingEffects};
use actionmap::persistence::Profile;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Reads control events from stdin, one per line, e.g. `Button1 Pressed`,
/// `DPad Directed Up` or `LeftStick Updated 0.5 -0.2`. `quit` or EOF stops.
#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let settings = load_settings().await?;
    let profile_name = std::env::args().nth(1);
    let profile = load_profile(profile_name.as_deref()).await?;

    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    let (mut engine, mut inputs) = start_engine(profile, &settings, ui_tx.clone())?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("Reading control events from stdin");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = line.map_err(|e| eyre!("Failed to read stdin: {}", e))?;
                let Some(line) = line else {
                    info!("End of input");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line.eq_ignore_ascii_case("quit") {
                    break;
                }
                match line.parse::<ControlInput>() {
                    Ok(input) => {
                        if inputs.send(input).await.is_err() {
                            error!("Engine stopped accepting input");
                            break;
                        }
                    }
                    Err(e) => warn!("{}", e),
                }
            }

            Some(event) = ui_rx.recv() => {
                let UiEvent::LoadProfile { name, .. } = event else {
                    continue;
                };
                match load_profile(Some(&name)).await {
                    Ok(profile) => {
                        engine.shutdown().await?;
                        (engine, inputs) = start_engine(profile, &settings, ui_tx.clone())?;
                    }
                    Err(e) => error!("Keeping current profile: {}", e),
                }
            }
        }
    }

    engine.shutdown().await?;
    info!("Stopped");
    Ok(())
}

fn start_engine(
    profile: Profile,
    settings: &EngineSettings,
    ui_tx: mpsc::UnboundedSender<UiEvent>,
) -> Result<(EngineHandle, mpsc::Sender<ControlInput>)> {
    let mut handle = EngineHandle::new(profile.name.clone());
    let effects = Box::new(TracingEffects::with_ui_channel(ui_tx));
    let inputs = handle
        .start(profile, settings.clone(), effects)
        .map_err(|e| eyre!("Failed to start engine: {}", e))?;
    Ok((handle, inputs))
}

async fn load_settings() -> Result<EngineSettings> {
    match EngineSettings::default_path() {
        Some(path) => EngineSettings::load(&path).await,
        None => {
            warn!("No config directory on this platform, using default settings");
            Ok(EngineSettings::default())
        }
    }
}

/// Loads `name` from the profile directory. Without a name, or if the file is
/// missing, the built-in sample profile is used.
async fn load_profile(name: Option<&str>) -> Result<Profile> {
    let Some(name) = name else {
        info!("No profile given, using the sample profile");
        return Ok(Profile::sample());
    };

    let path = profile_path(name)?;
    if !tokio::fs::try_exists(&path)
        .await
        .map_err(|e| eyre!("Failed to check if profile exists: {}", e))?
    {
        warn!(
            "Profile {} not found at {}, using the sample profile",
            name,
            path.display()
        );
        return Ok(Profile::sample());
    }
    Profile::load(&path).await
}

fn profile_path(name: &str) -> Result<PathBuf> {
    // A name with an extension is taken as a path
    if name.ends_with(".toml") {
        return Ok(PathBuf::from(name));
    }
    let dir = Profile::default_dir().ok_or_else(|| eyre!("No config directory available"))?;
    debug!("Looking for profile {} in {}", name, dir.display());
    Ok(Profile::path_for(&dir, name))
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
