//! screencapture - capture the screen to PNG files

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "screencapture", version, about = "Capture the screen to PNG files")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Save directory (default: <Pictures>/ScreenCapture)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Every monitor
    Full,
    /// The foreground window
    Window,
    /// A fixed rectangle in virtual-screen coordinates
    Region {
        #[arg(long, allow_hyphen_values = true)]
        x: i32,
        #[arg(long, allow_hyphen_values = true)]
        y: i32,
        #[arg(long)]
        width: i32,
        #[arg(long)]
        height: i32,
    },
    /// Drag out a region on a frozen overlay
    Select,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    run(Cli::parse())
}

#[cfg(windows)]
fn run(cli: Cli) -> anyhow::Result<()> {
    use anyhow::Context;
    use capture::{EventSink, Rect, TracingSink};
    use export::SaveConfig;
    use overlay::OverlayWindow;
    use std::sync::Arc;
    use windows::Win32::UI::HiDpi::{
        SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
    };

    // Physical pixels everywhere, so rects match what BitBlt copies
    unsafe {
        let _ = SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2);
    }

    let mut config = SaveConfig::default();
    if let Some(dir) = cli.dir {
        config.directory = dir;
    }

    let events: Arc<dyn EventSink> = Arc::new(TracingSink);
    let service = app::native_service(config, events).context("failed to start save workers")?;

    let saved = match cli.command {
        Command::Full => Some(service.capture_full_screen()?),
        Command::Window => Some(service.capture_active_window()?),
        Command::Region { x, y, width, height } => {
            Some(service.capture_region(Rect::from_origin_size(x, y, width, height))?)
        }
        Command::Select => service.select_and_capture_region(&OverlayWindow)?,
    };

    // Dropping the service waits for the queued save
    drop(service);

    if let Some(path) = saved {
        println!("{}", path.display());
    }
    Ok(())
}

#[cfg(not(windows))]
fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::debug!(?cli, "no capture backend on this platform");
    Err(capture::CaptureError::Unsupported.into())
}
