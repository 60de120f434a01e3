//! `winserve demo`: a scripted session against a headless server.
//!
//! Three applications share the screen: a shell that manages windows and
//! owns the desktop, an editor with a child pane and a modal dialog, and a
//! viewer with a monitor rectangle. Some input is injected, the viewer is
//! moved, and the resulting window table is printed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tokio::task::JoinHandle;

use crate::app::{AppClient, Application};
use crate::cli::output::{format_bool, format_clip, format_optional, layer_label, print_highlighted_json, truncate};
use crate::config::ServerConfig;
use crate::error::CliError;
use crate::messaging::{InputEvent, Message, MouseButton, Status};
use crate::region::Rect;
use crate::server::{HeadlessDevice, ServerHandle, WindowServer};
use crate::topwin::{WindowInfo, WindowSpec, WindowStyle};

/// Messages received by one application, counted by kind.
pub type Tally = BTreeMap<&'static str, usize>;

/// Everything the demo observed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoReport {
    pub windows: Vec<WindowInfo>,
    pub focus_at_end: Option<u32>,
    pub received: BTreeMap<String, Tally>,
    pub flushed_rects: usize,
}

/// Window row for table display.
#[derive(Tabled)]
struct WindowRow {
    #[tabled(rename = "ID")]
    window: u32,
    #[tabled(rename = "Parent")]
    parent: String,
    #[tabled(rename = "App")]
    app: String,
    #[tabled(rename = "Layer")]
    layer: &'static str,
    #[tabled(rename = "Extent")]
    extent: String,
    #[tabled(rename = "Clip")]
    clip: String,
    #[tabled(rename = "Z")]
    z: String,
    #[tabled(rename = "Focused")]
    focused: String,
    #[tabled(rename = "Flags")]
    flags: String,
}

impl From<&WindowInfo> for WindowRow {
    fn from(info: &WindowInfo) -> Self {
        Self {
            window: info.window,
            parent: format_optional(info.parent),
            app: truncate(&info.app_name, 12),
            layer: layer_label(info.layer),
            extent: info.extent.to_string(),
            clip: format_clip(info.clip_rects, info.clip_extents),
            z: format_optional(info.z),
            focused: format_bool(info.flags.contains(&"activated")),
            flags: truncate(&info.flags.join(", "), 32),
        }
    }
}

/// Execute the demo command.
///
/// # Errors
///
/// Returns an error if any step of the session fails.
pub fn execute(config: &ServerConfig, json: bool) -> Result<(), CliError> {
    let runtime = super::runtime()?;
    let report = runtime.block_on(run_session(config))?;

    if json {
        print_highlighted_json(&serde_json::to_value(&report)?);
        return Ok(());
    }

    println!("{}", format!("Windows ({})", report.windows.len()).bold());
    let rows: Vec<WindowRow> = report.windows.iter().map(WindowRow::from).collect();
    println!("{}", Table::new(rows).with(Style::rounded()));

    println!();
    for (app, tally) in &report.received {
        let summary: Vec<String> = tally.iter().map(|(kind, n)| format!("{kind}={n}")).collect();
        println!("{} {}", format!("{app}:").cyan(), summary.join(" "));
    }
    println!("{} {}", "flushed rectangles:".dimmed(), report.flushed_rects);
    Ok(())
}

/// Spawn an application's receive loop; the task yields what it received.
fn spawn_app(mut app: Application) -> JoinHandle<Tally> {
    tokio::spawn(async move {
        let mut tally = Tally::new();
        let mut handler = |_: &AppClient, msg: &Message| -> Status {
            *tally.entry(msg.kind.name()).or_default() += 1;
            Ok(0)
        };
        app.run(&mut handler).await;
        tally
    })
}

async fn join<T>(task: JoinHandle<T>) -> Result<T, CliError> {
    task.await.map_err(|err| CliError::CommandError(format!("task failed: {err}")))
}

/// Run the whole scripted session and collect a report.
///
/// # Errors
///
/// Returns the first failing request.
pub async fn run_session(config: &ServerConfig) -> Result<DemoReport, CliError> {
    let device = Arc::new(HeadlessDevice::new(config.screen.width, config.screen.height));
    let (server, server_task) = WindowServer::spawn(config, device.clone());
    let screen = Rect::from_origin_size(0, 0, config.screen.width, config.screen.height);

    let (shell, shell_task) = launch(&server, "shell").await?;
    let (editor, editor_task) = launch(&server, "editor").await?;
    let (viewer, viewer_task) = launch(&server, "viewer").await?;

    shell.set_window_manager().await?;
    shell.create_window(1, None, WindowSpec::new(screen).with_style(WindowStyle::ON_BOTTOM)).await?;
    shell.show_window(1).await?;

    editor.create_window(10, None, WindowSpec::new(Rect::new(40, 60, 440, 360)).with_title(20)).await?;
    editor.show_window(10).await?;
    editor.create_window(11, Some(10), WindowSpec::new(Rect::new(60, 100, 240, 200))).await?;
    editor.show_window(11).await?;

    viewer.create_window(20, None, WindowSpec::new(Rect::new(300, 200, 700, 500)).with_title(20)).await?;
    viewer.show_window(20).await?;
    viewer.add_monitor(20, Rect::new(320, 220, 480, 320)).await?;

    // The dialog blocks the editor's other windows until it goes away.
    editor.create_window(12, Some(10), WindowSpec::new(Rect::new(120, 140, 360, 260))).await?;
    editor.show_window(12).await?;
    editor.enter_modal(12).await?;

    server.inject(InputEvent::Motion { x: 350, y: 250 })?;
    server.inject(InputEvent::Button { x: 600, y: 400, button: MouseButton::Left, pressed: true })?;
    server.inject(InputEvent::Button { x: 600, y: 400, button: MouseButton::Left, pressed: false })?;
    server.inject(InputEvent::Key { code: 0x20, pressed: true })?;
    viewer.move_window(20, 520, 320).await?;

    tokio::time::sleep(config.server.idle_tick() + Duration::from_millis(20)).await;

    let windows = server.windows().await?;
    let focus_at_end = windows
        .iter()
        .find(|info| info.flags.contains(&"activated"))
        .map(|info| info.window);

    // The editor holds one extra keep-alive for its modal session.
    shell.quit()?;
    editor.quit()?;
    editor.quit()?;
    viewer.quit()?;

    let mut received = BTreeMap::new();
    received.insert("shell".to_string(), join(shell_task).await?);
    received.insert("editor".to_string(), join(editor_task).await?);
    received.insert("viewer".to_string(), join(viewer_task).await?);

    server.shutdown().await?;
    join(server_task).await?;

    let flushed_rects = device.take_updates().len();
    tracing::debug!(windows = windows.len(), flushed_rects, "demo: session finished");
    Ok(DemoReport { windows, focus_at_end, received, flushed_rects })
}

async fn launch(server: &ServerHandle, name: &str) -> Result<(AppClient, JoinHandle<Tally>), CliError> {
    let app = Application::connect(server, name).await?;
    let client = app.client();
    Ok((client, spawn_app(app)))
}
