use clap::{Parser, Subcommand};
use orbit::config;
use orbit::events::AppEvent;
use orbit::ring::KeyAction;
use orbit::sys::SOCKET_PATH;
use std::io::{BufRead, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "orbitctl", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Route pointer and key input to the given section
    Focus { index: usize },
    /// Press the pointer at a horizontal coordinate
    Down {
        #[arg(allow_negative_numbers = true)]
        x: Option<f64>,
    },
    /// Move the pressed pointer
    Move {
        #[arg(allow_negative_numbers = true)]
        x: Option<f64>,
    },
    /// Release the pointer
    Up,
    /// Abort the drag as if the pointer was released
    Cancel,
    /// Nudge the ring with an arrow key (left or right)
    Key { key: KeyAction },
    /// Release the arrow key and settle on the nearest panel
    Keyup,
    /// Report a new viewport width
    Resize { width: f64 },
    /// Report how much of a section is inside the viewport (0..1)
    Visible { section: usize, ratio: f64 },
    /// Ask the daemon to reload its configuration
    Reload,
    /// Send protocol lines from a file, or stdin when no file is given
    Replay { file: Option<PathBuf> },
    /// Write the default configuration file if none exists
    Init,
}

impl Commands {
    fn event(&self) -> Option<AppEvent> {
        let event = match *self {
            Commands::Focus { index } => AppEvent::Focus(index),
            Commands::Down { x } => AppEvent::PointerDown(x),
            Commands::Move { x } => AppEvent::PointerMove(x),
            Commands::Up => AppEvent::PointerUp,
            Commands::Cancel => AppEvent::PointerCancel,
            Commands::Key { key } => AppEvent::Key(key),
            Commands::Keyup => AppEvent::KeyRelease,
            Commands::Resize { width } => AppEvent::Resize(width),
            Commands::Visible { section, ratio } => AppEvent::Visibility { section, ratio },
            Commands::Reload => AppEvent::ConfigReload,
            Commands::Replay { .. } | Commands::Init => return None,
        };
        Some(event)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Init => {
            let path = config::write_default_config()?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::Replay { file } => replay(file.as_deref()),
        command => match command.event() {
            Some(event) => send_lines(&[event.to_string()]),
            None => Ok(()),
        },
    }
}

fn replay(file: Option<&Path>) -> anyhow::Result<()> {
    let raw: Vec<String> = match file {
        Some(path) => fs_lines(path)?,
        None => std::io::stdin().lock().lines().collect::<Result<_, _>>()?,
    };

    let mut lines = Vec::with_capacity(raw.len());
    for (n, line) in raw.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event: AppEvent = trimmed
            .parse()
            .map_err(|e| anyhow::anyhow!("line {}: {}", n + 1, e))?;
        lines.push(event.to_string());
    }
    log::debug!("Replaying {} command(s)", lines.len());
    send_lines(&lines)
}

fn fs_lines(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = fs_err::read_to_string(path)?;
    Ok(text.lines().map(str::to_string).collect())
}

fn send_lines(lines: &[String]) -> anyhow::Result<()> {
    let mut stream = UnixStream::connect(SOCKET_PATH).map_err(|e| {
        anyhow::anyhow!(
            "Failed to connect to orbit daemon at {}: {}. Is orbit running?",
            SOCKET_PATH,
            e
        )
    })?;

    for line in lines {
        writeln!(stream, "{}", line)?;
    }
    Ok(())
}
