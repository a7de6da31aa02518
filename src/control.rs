//! Line commands on stdin, turned into [`ControlEvent`]s for the frame loop.
//!
//! HTTP requests and image decoding run on the reader thread; the frame
//! loop only ever receives finished state.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use thiserror::Error;

use crate::compositor::BackgroundState;
use crate::services::{load_image, BackgroundService, OverlayText, PrivacyLevel, PrivacyService};

/// State change applied at the top of the next loop iteration.
#[derive(Debug, Clone)]
pub enum ControlEvent {
    Background(BackgroundState),
    Privacy(PrivacyLevel, OverlayText),
    ToggleHud,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    BackgroundColor,
    BackgroundBlur,
    BackgroundImage(String),
    ListBackgrounds,
    UploadBackground(PathBuf),
    Privacy(PrivacyLevel),
    ToggleHud,
    Help,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("{0}")]
    InvalidLevel(String),
}

const HELP: &str = "commands: bg color | bg blur | bg image <path-or-url> | bg list | \
bg upload <path> | privacy low|medium|high|hidden | hide | g";

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    let command = match (head.to_ascii_lowercase().as_str(), rest) {
        ("g", "") => Command::ToggleHud,
        ("hide", "") => Command::Privacy(PrivacyLevel::Hidden),
        ("help", "") => Command::Help,
        ("privacy", "") => return Err(CommandError::MissingArgument("privacy")),
        ("privacy", level) => {
            Command::Privacy(level.parse().map_err(CommandError::InvalidLevel)?)
        }
        ("bg", args) => {
            let (verb, arg) = match args.split_once(char::is_whitespace) {
                Some((verb, arg)) => (verb, arg.trim()),
                None => (args, ""),
            };
            match (verb.to_ascii_lowercase().as_str(), arg) {
                ("color", "") => Command::BackgroundColor,
                ("blur", "") => Command::BackgroundBlur,
                ("list", "") => Command::ListBackgrounds,
                ("image", "") => return Err(CommandError::MissingArgument("bg image")),
                ("image", src) => Command::BackgroundImage(src.to_string()),
                ("upload", "") => return Err(CommandError::MissingArgument("bg upload")),
                ("upload", path) => Command::UploadBackground(PathBuf::from(path)),
                _ => return Err(CommandError::Unknown(line.to_string())),
            }
        }
        _ => return Err(CommandError::Unknown(line.to_string())),
    };
    Ok(Some(command))
}

/// Executes commands against the asset services.
pub struct Controller {
    backgrounds: BackgroundService,
    privacy: PrivacyService,
}

impl Controller {
    pub fn new(backgrounds: BackgroundService, privacy: PrivacyService) -> Self {
        Self {
            backgrounds,
            privacy,
        }
    }

    /// Event for the initial privacy level, fetched before the loop starts.
    pub fn privacy_event(&self, level: PrivacyLevel) -> ControlEvent {
        ControlEvent::Privacy(level, self.privacy.overlay(level))
    }

    /// Run `command`. Failures are logged and yield no event.
    pub fn execute(&self, command: Command) -> Option<ControlEvent> {
        match command {
            Command::BackgroundColor => Some(ControlEvent::Background(BackgroundState::color())),
            Command::BackgroundBlur => Some(ControlEvent::Background(BackgroundState::blur())),
            Command::BackgroundImage(source) => self.select_image(&source),
            Command::ListBackgrounds => {
                let urls = self.backgrounds.list_or_empty();
                tracing::info!("{} background(s) available", urls.len());
                for url in urls {
                    tracing::info!("  {}", url);
                }
                None
            }
            Command::UploadBackground(path) => match self.backgrounds.upload(&path) {
                Ok(Some(url)) => {
                    tracing::info!("Uploaded {} as {}", path.display(), url);
                    self.select_image(&url)
                }
                Ok(None) => {
                    tracing::warn!("Upload of {} returned no path", path.display());
                    None
                }
                Err(e) => {
                    tracing::warn!("Upload failed: {}", e);
                    None
                }
            },
            Command::Privacy(level) => Some(self.privacy_event(level)),
            Command::ToggleHud => Some(ControlEvent::ToggleHud),
            Command::Help => {
                tracing::info!("{}", HELP);
                None
            }
        }
    }

    fn select_image(&self, source: &str) -> Option<ControlEvent> {
        match load_image(self.backgrounds.client(), source) {
            Ok(image) => Some(ControlEvent::Background(BackgroundState::image(image))),
            Err(e) => {
                tracing::warn!("Background image unavailable: {}", e);
                None
            }
        }
    }

    /// Read commands from `reader` until EOF or until the loop hangs up.
    pub fn run<R: BufRead>(&self, reader: R, events: &Sender<ControlEvent>) {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!("Control input closed: {}", e);
                    break;
                }
            };
            let command = match parse_command(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("{}", e);
                    continue;
                }
            };
            tracing::debug!(?command, "Control command");
            if let Some(event) = self.execute(command) {
                if events.send(event).is_err() {
                    break;
                }
            }
        }
    }

    /// Spawn the stdin reader thread.
    pub fn spawn(self, events: Sender<ControlEvent>) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("control".into())
            .spawn(move || self.run(io::stdin().lock(), &events))
    }
}
