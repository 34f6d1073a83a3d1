//! Command line front end
//!
//! Plain stdin lines are sent as they are. Lines starting with `:` are
//! console commands; `::` escapes a literal leading colon.

use clap::Parser;
use serialkit_communication::SessionCommand;
use serialkit_core::{
    BaudRate, ByteCounters, DataBits, DisplayMode, Encoding, NotificationLevel, Parity,
    SendOptions, SessionEvent, StatusLine, StopBits,
};
use serialkit_settings::{Config, Overrides, SettingsResult};
use std::path::PathBuf;
use thiserror::Error;

pub const HELP: &str = "\
Lines are sent as typed. Commands:
  :open | :close            open or close the selected port
  :ports                    list available ports
  :port <name>              select a port
  :hex on|off               send the line as hex pairs
  :nl on|off                append \\r\\n to every send
  :display hex|text         render received data as hex or text
  :ts on|off                timestamp received chunks
  :lb on|off                line break after received chunks
  :timed <ms>               resend the last line every <ms>
  :stop                     stop timed sending
  :clear-send               clear the send buffer and sent counter
  :reset                    clear everything
  :status                   show status and counters
  :quit                     exit";

/// Serial port terminal.
#[derive(Debug, Parser)]
#[command(name = "serialkit", version, about = "Serial port terminal")]
pub struct Args {
    /// Settings file (.toml or .json); defaults to the platform config dir.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Port to open at startup, e.g. /dev/ttyUSB0 or COM3.
    #[arg(long, short)]
    pub port: Option<String>,

    /// Baud rate (1200 to 115200).
    #[arg(long, short)]
    pub baud: Option<BaudRate>,

    /// Data bits (5 to 8).
    #[arg(long)]
    pub data_bits: Option<DataBits>,

    /// Stop bits (1, 1.5 or 2).
    #[arg(long)]
    pub stop_bits: Option<StopBits>,

    /// Parity (none, odd or even).
    #[arg(long)]
    pub parity: Option<Parity>,

    /// List available ports and exit.
    #[arg(long)]
    pub list: bool,

    /// Render received data as hex.
    #[arg(long)]
    pub hex_display: bool,

    /// Timestamp received chunks.
    #[arg(long)]
    pub timestamp: bool,
}

impl Args {
    /// Command line values that override the settings file
    pub fn overrides(&self) -> Overrides {
        Overrides {
            port: self.port.clone(),
            baud_rate: self.baud,
            data_bits: self.data_bits,
            stop_bits: self.stop_bits,
            parity: self.parity,
            hex_display: self.hex_display,
            timestamp: self.timestamp,
        }
    }

    /// Load the settings file (or defaults) and apply the overrides
    pub fn resolve_config(&self) -> SettingsResult<Config> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => Config::default_path()?,
        };
        let mut config = Config::load_or_default(&path)?;
        config.apply(&self.overrides());
        config.validate()?;
        Ok(config)
    }
}

/// Problems with a console command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Unknown command ':{0}', try :help")]
    UnknownCommand(String),

    #[error(":{0} needs an argument")]
    MissingArgument(&'static str),

    #[error("Invalid argument for :{command}: {value}")]
    InvalidArgument {
        command: &'static str,
        value: String,
    },
}

/// One parsed stdin line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Send(String),
    Open,
    Close,
    Ports,
    Port(String),
    SendHex(bool),
    Newline(bool),
    Display(Encoding),
    Timestamp(bool),
    LineBreak(bool),
    Timed(u64),
    Stop,
    ClearSend,
    Reset,
    Status,
    Help,
    Quit,
}

fn switch(command: &'static str, arg: Option<&str>) -> Result<bool, InputError> {
    match arg {
        Some("on" | "1" | "true") => Ok(true),
        Some("off" | "0" | "false") => Ok(false),
        Some(other) => Err(InputError::InvalidArgument {
            command,
            value: other.to_string(),
        }),
        None => Err(InputError::MissingArgument(command)),
    }
}

impl Input {
    /// Parse one line of user input
    pub fn parse(line: &str) -> Result<Self, InputError> {
        if let Some(literal) = line.strip_prefix("::") {
            return Ok(Input::Send(format!(":{}", literal)));
        }
        let Some(rest) = line.strip_prefix(':') else {
            return Ok(Input::Send(line.to_string()));
        };

        let mut words = rest.split_whitespace();
        let command = words.next().unwrap_or_default();
        let arg = words.next();

        match command {
            "open" => Ok(Input::Open),
            "close" => Ok(Input::Close),
            "ports" => Ok(Input::Ports),
            "port" => arg
                .map(|name| Input::Port(name.to_string()))
                .ok_or(InputError::MissingArgument("port")),
            "hex" => switch("hex", arg).map(Input::SendHex),
            "nl" => switch("nl", arg).map(Input::Newline),
            "ts" => switch("ts", arg).map(Input::Timestamp),
            "lb" => switch("lb", arg).map(Input::LineBreak),
            "display" => match arg {
                Some("hex") => Ok(Input::Display(Encoding::Hex)),
                Some("text") => Ok(Input::Display(Encoding::Text)),
                Some(other) => Err(InputError::InvalidArgument {
                    command: "display",
                    value: other.to_string(),
                }),
                None => Err(InputError::MissingArgument("display")),
            },
            "timed" => {
                let value = arg.ok_or(InputError::MissingArgument("timed"))?;
                value
                    .parse()
                    .map(Input::Timed)
                    .map_err(|_| InputError::InvalidArgument {
                        command: "timed",
                        value: value.to_string(),
                    })
            }
            "stop" => Ok(Input::Stop),
            "clear-send" => Ok(Input::ClearSend),
            "reset" => Ok(Input::Reset),
            "status" => Ok(Input::Status),
            "help" | "?" => Ok(Input::Help),
            "quit" | "q" | "exit" => Ok(Input::Quit),
            other => Err(InputError::UnknownCommand(other.to_string())),
        }
    }
}

/// What the console wants done with a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Commands(Vec<SessionCommand>),
    Show(String),
    Quit,
}

/// Text for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Terminal traffic, for stdout
    Display(String),
    /// Everything else, for stderr
    Notice(String),
}

/// Console state mirrored from session events
pub struct Console {
    send_options: SendOptions,
    display_mode: DisplayMode,
    status: StatusLine,
    counters: ByteCounters,
    timed: Option<u64>,
}

impl Console {
    pub fn new(send_options: SendOptions, display_mode: DisplayMode) -> Self {
        Self {
            send_options,
            display_mode,
            status: StatusLine::default(),
            counters: ByteCounters::default(),
            timed: None,
        }
    }

    /// Turn a stdin line into session commands
    pub fn handle_line(&mut self, line: &str) -> Result<Action, InputError> {
        let commands = match Input::parse(line)? {
            Input::Send(text) => {
                if text.is_empty() && !self.send_options.append_newline {
                    return Ok(Action::Commands(Vec::new()));
                }
                vec![SessionCommand::SetSendBuffer(text), SessionCommand::Send]
            }
            Input::Open => vec![SessionCommand::Open],
            Input::Close => vec![SessionCommand::Close],
            Input::Ports => vec![SessionCommand::RefreshPorts],
            Input::Port(name) => vec![SessionCommand::SelectPort(name)],
            Input::SendHex(hex) => {
                self.send_options.hex = hex;
                vec![SessionCommand::SetSendOptions(self.send_options)]
            }
            Input::Newline(append_newline) => {
                self.send_options.append_newline = append_newline;
                vec![SessionCommand::SetSendOptions(self.send_options)]
            }
            Input::Display(encoding) => {
                self.display_mode.encoding = encoding;
                vec![SessionCommand::SetDisplayMode(self.display_mode)]
            }
            Input::Timestamp(timestamp) => {
                self.display_mode.timestamp = timestamp;
                vec![SessionCommand::SetDisplayMode(self.display_mode)]
            }
            Input::LineBreak(line_break) => {
                self.display_mode.line_break = line_break;
                vec![SessionCommand::SetDisplayMode(self.display_mode)]
            }
            Input::Timed(interval_ms) => vec![SessionCommand::EnableTimed { interval_ms }],
            Input::Stop => vec![SessionCommand::DisableTimed],
            Input::ClearSend => vec![SessionCommand::ResetSend],
            Input::Reset => vec![SessionCommand::Reset],
            Input::Status => return Ok(Action::Show(self.status_report())),
            Input::Help => return Ok(Action::Show(HELP.to_string())),
            Input::Quit => return Ok(Action::Quit),
        };
        Ok(Action::Commands(commands))
    }

    /// Track an event and render it for the user, if it is worth showing
    pub fn observe(&mut self, event: &SessionEvent) -> Option<Output> {
        match event {
            SessionEvent::DisplayLine(line) => Some(Output::Display(
                line.trim_end_matches(['\r', '\n']).to_string(),
            )),
            SessionEvent::StatusChanged(status) => {
                self.status = status.clone();
                Some(Output::Notice(format!("-- {}", status)))
            }
            SessionEvent::CountersChanged(counters) => {
                self.counters = *counters;
                None
            }
            SessionEvent::Notification {
                level,
                title,
                message,
            } => {
                let tag = match level {
                    NotificationLevel::Warning => "warning",
                    NotificationLevel::Critical => "error",
                };
                Some(Output::Notice(format!("{}: {}: {}", tag, title, message)))
            }
            SessionEvent::PortsListed(ports) if ports.is_empty() => {
                Some(Output::Notice("No serial ports found".to_string()))
            }
            SessionEvent::PortsListed(ports) => Some(Output::Notice(format!(
                "Ports: {}",
                ports.join(", ")
            ))),
            SessionEvent::TimedSendChanged(timed) => {
                self.timed = *timed;
                Some(Output::Notice(format!("-- {}", event)))
            }
            SessionEvent::ChannelChanged(_)
            | SessionEvent::PortStatusChanged(_)
            | SessionEvent::DisplayCleared
            | SessionEvent::SendBufferCleared => None,
        }
    }

    /// Status line, counters and timer state on one line
    pub fn status_report(&self) -> String {
        let (sent, received) = self.counters.labels();
        let timed = match self.timed {
            Some(ms) => format!("timed {}ms", ms),
            None => "timed off".to_string(),
        };
        format!("{} | {} {} | {}", self.status, sent, received, timed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialkit_core::PortStatus;

    #[test]
    fn test_parse_plain_and_escaped_lines() {
        assert_eq!(Input::parse("AT").unwrap(), Input::Send("AT".to_string()));
        assert_eq!(
            Input::parse("::open").unwrap(),
            Input::Send(":open".to_string())
        );
        assert_eq!(Input::parse("").unwrap(), Input::Send(String::new()));
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Input::parse(":open").unwrap(), Input::Open);
        assert_eq!(
            Input::parse(":port /dev/ttyUSB0").unwrap(),
            Input::Port("/dev/ttyUSB0".to_string())
        );
        assert_eq!(Input::parse(":hex on").unwrap(), Input::SendHex(true));
        assert_eq!(
            Input::parse(":display hex").unwrap(),
            Input::Display(Encoding::Hex)
        );
        assert_eq!(Input::parse(":timed 250").unwrap(), Input::Timed(250));
        assert_eq!(Input::parse(":q").unwrap(), Input::Quit);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Input::parse(":frobnicate"),
            Err(InputError::UnknownCommand("frobnicate".to_string()))
        );
        assert_eq!(
            Input::parse(":port"),
            Err(InputError::MissingArgument("port"))
        );
        assert_eq!(
            Input::parse(":ts maybe"),
            Err(InputError::InvalidArgument {
                command: "ts",
                value: "maybe".to_string()
            })
        );
        assert!(Input::parse(":timed soon").is_err());
    }

    #[test]
    fn test_plain_line_sets_buffer_then_sends() {
        let mut console = Console::new(SendOptions::default(), DisplayMode::default());
        assert_eq!(
            console.handle_line("AT").unwrap(),
            Action::Commands(vec![
                SessionCommand::SetSendBuffer("AT".to_string()),
                SessionCommand::Send
            ])
        );
        assert_eq!(
            console.handle_line("").unwrap(),
            Action::Commands(Vec::new())
        );
    }

    #[test]
    fn test_toggles_keep_other_flags() {
        let mut console = Console::new(SendOptions::default(), DisplayMode::hex());
        console.handle_line(":nl on").unwrap();
        assert_eq!(
            console.handle_line(":hex on").unwrap(),
            Action::Commands(vec![SessionCommand::SetSendOptions(SendOptions {
                hex: true,
                append_newline: true
            })])
        );
        assert_eq!(
            console.handle_line(":ts on").unwrap(),
            Action::Commands(vec![SessionCommand::SetDisplayMode(
                DisplayMode::hex().with_timestamp(true)
            )])
        );
    }

    #[test]
    fn test_observe_tracks_status() {
        let mut console = Console::new(SendOptions::default(), DisplayMode::default());
        assert_eq!(
            console.observe(&SessionEvent::DisplayLine("[recv:] OK\r\n".to_string())),
            Some(Output::Display("[recv:] OK".to_string()))
        );
        console.observe(&SessionEvent::StatusChanged(StatusLine::ok(
            "COM3 OPENED, 9600, 8, 1, 0",
        )));
        console.observe(&SessionEvent::CountersChanged(ByteCounters {
            sent: 4,
            received: 2,
        }));
        console.observe(&SessionEvent::TimedSendChanged(Some(500)));
        assert_eq!(
            console.status_report(),
            "COM3 OPENED, 9600, 8, 1, 0 | S: 4 R: 2 | timed 500ms"
        );
        assert_eq!(
            console.observe(&SessionEvent::PortStatusChanged(PortStatus {
                name: "COM3".to_string(),
                reachable: true
            })),
            None
        );
    }
}
