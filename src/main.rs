//! Stopwatch CLI
//!
//! A background daemon keeps the elapsed time; the CLI starts, pauses and
//! stops it, shows it in a live panel or a floating overlay, and installs the
//! LaunchAgent that can start it at login.

use std::io::BufRead;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tokio::sync::mpsc;

use stopwatch::cli::{Cli, Commands, Display, IpcClient, OverlayArgs, PrefsAction, UpdateStream};
use stopwatch::daemon::run_daemon;
use stopwatch::launchagent;
use stopwatch::prefs::{PrefKey, PreferenceStore};
use stopwatch::surface::{mark_first_run, FloatingOverlay, LaunchPlan, PanelInput, PanelState};
use stopwatch::types::{AppPaths, IpcResponse, TimeUpdate};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init_tracing(default_log_level(&cli));

    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// Logs go to stderr so they never interleave with the live panel.
fn init_tracing(default_level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Log level used when `RUST_LOG` is not set.
fn default_log_level(cli: &Cli) -> &'static str {
    if cli.verbose {
        "debug"
    } else if matches!(cli.command, Some(Commands::Daemon { .. })) {
        "info"
    } else {
        "warn"
    }
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let paths = AppPaths::resolve(cli.home.as_deref())
        .context("ホームディレクトリが見つかりません。--home を指定してください")?;
    tracing::debug!(root = ?paths.root(), "Using runtime directory");

    match cli.command {
        Some(Commands::Start) => {
            let response = IpcClient::new(&paths).start().await?;
            Display::show_start_success(&response);
        }
        Some(Commands::Pause) => {
            let response = IpcClient::new(&paths).pause().await?;
            Display::show_pause_success(&response);
        }
        Some(Commands::Resume) => {
            let response = IpcClient::new(&paths).resume().await?;
            Display::show_resume_success(&response);
        }
        Some(Commands::Stop) => {
            let response = IpcClient::new(&paths).stop().await?;
            Display::show_stop_success(&response);
        }
        Some(Commands::Status) => {
            let response = IpcClient::new(&paths).status().await?;
            Display::show_status(&response);
        }
        Some(Commands::Watch) => run_watch(&paths).await?,
        Some(Commands::Overlay(args)) => run_overlay(&paths, &args).await?,
        Some(Commands::Prefs { action }) => run_prefs(&paths, action)?,
        Some(Commands::Daemon { boot }) => run_daemon(&paths, boot).await?,
        Some(Commands::Install) => {
            let replaced = launchagent::is_installed();
            launchagent::install(&paths).context("LaunchAgentのインストールに失敗しました")?;
            Display::show_install_success(replaced);
        }
        Some(Commands::Uninstall) => {
            let removed =
                launchagent::uninstall().context("LaunchAgentのアンインストールに失敗しました")?;
            Display::show_uninstall_success(removed);
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
        }
        None => {
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

// ============================================================================
// Surfaces
// ============================================================================

/// Runs the main panel until the user quits.
///
/// On open, the launch plan may auto-start the timer and hand over to the
/// overlay instead.
async fn run_watch(paths: &AppPaths) -> Result<()> {
    let store = open_prefs(paths)?;
    if mark_first_run(&store)? {
        Display::show_first_run();
    }

    let prefs = store.load();
    let plan = LaunchPlan::from_preferences(&prefs);
    let client = IpcClient::new(paths);

    if plan.start_timer {
        client.start().await?;
    }
    if plan.open_overlay {
        return overlay_loop(&client, FloatingOverlay::from_preferences(&prefs)).await;
    }

    let (response, mut updates) = client.subscribe().await?;
    let mut panel = PanelState::new();
    if let Some(update) = initial_update(&response) {
        panel.apply(&update);
    }
    Display::draw_panel(&panel);

    let mut input = spawn_stdin_reader();

    loop {
        tokio::select! {
            update = updates.next() => match update? {
                Some(update) => {
                    panel.apply(&update);
                    Display::draw_panel(&panel);
                }
                None => {
                    Display::finish_live_line();
                    anyhow::bail!("デーモンとの接続が切れました");
                }
            },
            line = input.recv() => {
                let Some(line) = line else { break };
                match PanelInput::parse(&line) {
                    Some(PanelInput::Quit) => break,
                    Some(PanelInput::Minimize) => {
                        Display::finish_live_line();
                        // Closing the panel's subscription before the overlay opens its own.
                        drop(updates);
                        return overlay_loop(&client, FloatingOverlay::from_preferences(&store.load()))
                            .await;
                    }
                    Some(key) => {
                        if let Some(request) = panel.press(key) {
                            if let Err(e) = client.send(request).await {
                                Display::finish_live_line();
                                Display::show_error(&format!("{:#}", e));
                                resync_panel(&client, &mut panel).await;
                            }
                        }
                    }
                    None => tracing::debug!(input = %line, "Ignored panel input"),
                }
                Display::draw_panel(&panel);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Display::finish_live_line();
    Ok(())
}

/// Replaces the panel's optimistic button state with the tracker's after a
/// failed press.
async fn resync_panel(client: &IpcClient, panel: &mut PanelState) {
    match client.status().await {
        Ok(response) => {
            if let Some(update) = initial_update(&response) {
                panel.apply(&update);
            }
        }
        Err(e) => tracing::warn!("Failed to refresh panel: {:#}", e),
    }
}

/// Shows the overlay, moving it first if a position was given.
async fn run_overlay(paths: &AppPaths, args: &OverlayArgs) -> Result<()> {
    let store = open_prefs(paths)?;
    let mut overlay = FloatingOverlay::from_preferences(&store.load());

    if let Some((x, y)) = args.position() {
        overlay
            .move_to(&store, x, y)
            .context("表示位置を保存できませんでした")?;
    }

    overlay_loop(&IpcClient::new(paths), overlay).await
}

async fn overlay_loop(client: &IpcClient, mut overlay: FloatingOverlay) -> Result<()> {
    let (response, mut updates) = client.subscribe().await?;
    if let Some(update) = initial_update(&response) {
        overlay.apply(&update);
    }
    Display::draw_overlay(&overlay);

    loop {
        tokio::select! {
            update = next_update(&mut updates) => {
                overlay.apply(&update?);
                Display::draw_overlay(&overlay);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

async fn next_update(updates: &mut UpdateStream) -> Result<TimeUpdate> {
    updates
        .next()
        .await?
        .context("デーモンとの接続が切れました")
}

/// Converts the status carried by a subscribe response into an update.
fn initial_update(response: &IpcResponse) -> Option<TimeUpdate> {
    let data = response.data.as_ref()?;
    Some(TimeUpdate::with_state(
        data.elapsed_ms.unwrap_or(0),
        data.is_running.unwrap_or(false),
    ))
}

/// Reads stdin lines on a plain thread so an unread line never holds up
/// runtime shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

// ============================================================================
// Preferences
// ============================================================================

fn open_prefs(paths: &AppPaths) -> Result<PreferenceStore> {
    PreferenceStore::open(paths.prefs_dir()).context("設定を開けませんでした")
}

fn run_prefs(paths: &AppPaths, action: Option<PrefsAction>) -> Result<()> {
    let store = open_prefs(paths)?;

    let (key, enabled) = match action.unwrap_or(PrefsAction::Show) {
        PrefsAction::Show => {
            Display::show_preferences(&store.load());
            return Ok(());
        }
        PrefsAction::AutoStart { enabled } => (PrefKey::AutoStartTimer, enabled),
        PrefsAction::AutoMinimize { enabled } => (PrefKey::AutoMinimize, enabled),
    };

    store.set_bool(key, enabled)?;
    Display::show_preference_updated(key, enabled);
    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use stopwatch::types::{ResponseData, StatusSnapshot, TimerState};

    #[test]
    fn test_default_log_level() {
        let cli = Cli::parse_from(["stopwatch", "status"]);
        assert_eq!(default_log_level(&cli), "warn");

        let cli = Cli::parse_from(["stopwatch", "daemon"]);
        assert_eq!(default_log_level(&cli), "info");

        let cli = Cli::parse_from(["stopwatch", "-v", "daemon"]);
        assert_eq!(default_log_level(&cli), "debug");
    }

    #[test]
    fn test_initial_update_from_response() {
        let response = IpcResponse::success(
            "",
            Some(ResponseData::from_snapshot(&StatusSnapshot {
                state: TimerState::Running,
                elapsed_ms: 4_000,
            })),
        );
        assert_eq!(
            initial_update(&response),
            Some(TimeUpdate::with_state(4_000, true))
        );
        assert_eq!(initial_update(&IpcResponse::success("", None)), None);
    }

    #[tokio::test]
    async fn test_resync_panel_restores_tracker_state() {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
        use tokio::net::UnixListener;

        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("test.sock");
        let listener = UnixListener::bind(&socket_path).unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(stream);
            let mut request = String::new();
            reader.read_line(&mut request).await.unwrap();

            let response = IpcResponse::success(
                "",
                Some(ResponseData::from_snapshot(&StatusSnapshot {
                    state: TimerState::Running,
                    elapsed_ms: 7_000,
                })),
            );
            let mut json = serde_json::to_vec(&response).unwrap();
            json.push(b'\n');
            reader.get_mut().write_all(&json).await.unwrap();
        });

        // A stop press that never reached the tracker.
        let mut panel = PanelState::new();
        panel.apply(&TimeUpdate::with_state(5_000, true));
        panel.press(PanelInput::Stop);
        assert!(panel.start_enabled());

        let client = IpcClient::with_socket_path(socket_path);
        resync_panel(&client, &mut panel).await;

        assert!(panel.stop_enabled());
        assert_eq!(panel.time_text(), "00:00:07");
    }

    #[test]
    fn test_run_prefs_sets_values() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::new(dir.path());

        run_prefs(&paths, Some(PrefsAction::AutoStart { enabled: true })).unwrap();
        run_prefs(&paths, None).unwrap();

        let prefs = PreferenceStore::open(paths.prefs_dir()).unwrap().load();
        assert!(prefs.auto_start_timer());
        assert!(!prefs.auto_minimize());
    }
}
