use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crossterm::style::Stylize;
use lockbox_core::console::{self, ConsoleCommand, VERBS};
use lockbox_core::journal::{Record, Severity};
use lockbox_core::{Config, Flag, LockBox, Millis, SharedFlags};

use crate::board::SimBoard;

/// Longest stretch a single `advance` may cover.
const MAX_ADVANCE_MS: u32 = 10 * 60 * 1_000;

pub struct SessionOptions {
    pub config: Config,
    pub transcript: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            config: Config::default(),
            transcript: None,
        }
    }
}

/// How a response line should be presented.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tone {
    Plain,
    Info,
    Warn,
    Error,
    Screen,
}

impl From<Severity> for Tone {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Info => Tone::Info,
            Severity::Warn => Tone::Warn,
            Severity::Error => Tone::Error,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Output {
    pub tone: Tone,
    pub text: String,
}

impl Output {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            tone: Tone::Plain,
            text: text.into(),
        }
    }

    fn toned(tone: Tone, text: impl Into<String>) -> Self {
        Self {
            tone,
            text: text.into(),
        }
    }

    /// Text with terminal colours applied.
    pub fn styled(&self) -> String {
        match self.tone {
            Tone::Plain => self.text.clone(),
            Tone::Info => self.text.as_str().cyan().to_string(),
            Tone::Warn => self.text.as_str().yellow().to_string(),
            Tone::Error => self.text.as_str().red().bold().to_string(),
            Tone::Screen => self.text.as_str().green().to_string(),
        }
    }
}

pub struct Session {
    lockbox: LockBox<'static, SimBoard>,
    now: Millis,
    last_seen: u32,
    engaged: bool,
    transcript: Option<TranscriptLogger>,
}

impl Session {
    pub fn new(options: SessionOptions) -> io::Result<Self> {
        // One flag set per session, alive for the rest of the process.
        let flags: &'static SharedFlags = Box::leak(Box::new(SharedFlags::new()));
        let mut lockbox = LockBox::new(flags, SimBoard::new(), options.config);
        lockbox.start(Millis::ZERO);

        let transcript = options
            .transcript
            .as_deref()
            .map(TranscriptLogger::new)
            .transpose()?;

        Ok(Self {
            lockbox,
            now: Millis::ZERO,
            last_seen: 0,
            engaged: false,
            transcript,
        })
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    /// Parses and executes one console line.
    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<Output>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        self.log(TranscriptRole::Host, trimmed)?;
        let outputs = match console::parse_command(trimmed) {
            Ok(command) => self.execute(command),
            Err(error) => vec![Output::toned(Tone::Warn, error.to_string())],
        };
        for output in &outputs {
            self.log(TranscriptRole::Emulator, &output.text)?;
        }
        Ok(outputs)
    }

    /// Journal records produced so far, for the start-up banner.
    pub fn drain(&mut self) -> Vec<Output> {
        let mut outputs = Vec::new();
        self.collect(&mut outputs);
        outputs
    }

    fn execute(&mut self, command: ConsoleCommand) -> Vec<Output> {
        let mut outputs = Vec::new();
        match command {
            ConsoleCommand::Advance(ms) => self.advance(ms, &mut outputs),
            ConsoleCommand::Inject(flag) => outputs.push(self.inject(flag)),
            ConsoleCommand::Goto(raw) => {
                if let Err(error) = self.lockbox.goto(raw, self.now) {
                    outputs.push(Output::toned(Tone::Error, error.to_string()));
                }
                self.collect(&mut outputs);
            }
            ConsoleCommand::Phone { present } => {
                self.board().phone_inside = present;
                outputs.push(Output::plain(if present {
                    "phone placed in the box"
                } else {
                    "phone taken out"
                }));
            }
            ConsoleCommand::Lid { open } => {
                self.board().lid_open = open;
                outputs.push(Output::plain(if open { "lid opened" } else { "lid closed" }));
            }
            ConsoleCommand::Move => {
                self.board().jolt();
                outputs.push(Output::plain("box jostled"));
            }
            ConsoleCommand::Rotate => {
                self.board().rotate();
                outputs.push(Output::plain("dial turned one detent"));
            }
            ConsoleCommand::Press => {
                let enabled = self.board().mask.button;
                outputs.push(self.interrupt("button", enabled, Flag::DialPressed));
            }
            ConsoleCommand::Noise => {
                let enabled = self.board().mask.audio;
                outputs.push(self.interrupt("audio", enabled, Flag::AudioVolHigh));
            }
            ConsoleCommand::Knock { matched } => {
                self.board().finish_knock(matched);
                outputs.push(Output::plain(if matched {
                    "knock pattern matched"
                } else {
                    "knock pattern missed"
                }));
            }
            ConsoleCommand::Status => self.status(&mut outputs),
            ConsoleCommand::Events => self.events(&mut outputs),
            ConsoleCommand::Help => {
                for verb in &VERBS {
                    outputs.push(Output::plain(format!(
                        "{:<22} - {}",
                        verb.usage, verb.summary
                    )));
                }
                outputs.push(Output::plain(format!("{:<22} - leave the emulator", "exit")));
            }
        }
        outputs
    }

    fn advance(&mut self, ms: u32, outputs: &mut Vec<Output>) {
        let ms = if ms > MAX_ADVANCE_MS {
            outputs.push(Output::toned(
                Tone::Warn,
                format!("advance capped at {MAX_ADVANCE_MS} ms"),
            ));
            MAX_ADVANCE_MS
        } else {
            ms
        };

        for _ in 0..ms {
            self.now += 1;
            self.lockbox.tick(self.now);
            self.collect(outputs);
        }
        outputs.push(Output::plain(format!(
            "t={} mode={}",
            self.now,
            self.lockbox.mode()
        )));
    }

    fn inject(&self, flag: Flag) -> Output {
        if self.lockbox.flags().insert(flag) {
            Output::plain(format!("{flag} pending"))
        } else {
            Output::toned(Tone::Warn, format!("{flag} already pending or flag set full"))
        }
    }

    fn interrupt(&self, source: &str, enabled: bool, flag: Flag) -> Output {
        if enabled {
            self.inject(flag)
        } else {
            Output::toned(Tone::Warn, format!("{source} interrupt masked, ignored"))
        }
    }

    /// Appends journal records, screen changes and solenoid changes since the last call.
    fn collect(&mut self, outputs: &mut Vec<Output>) {
        let records: Vec<Record> = self
            .lockbox
            .journal()
            .since(self.last_seen)
            .copied()
            .collect();
        for record in records {
            self.last_seen = record.id;
            outputs.push(Output::toned(record.kind.severity().into(), record.to_string()));
        }

        let now = self.now;
        if let Some(screen) = self.board().take_screen_change() {
            outputs.push(Output::toned(Tone::Screen, format!("@{now} screen: {screen}")));
        }

        let engaged = self.lockbox.hardware().engaged;
        if engaged != self.engaged {
            self.engaged = engaged;
            let text = if engaged {
                format!("@{now} solenoid engaged")
            } else {
                format!("@{now} solenoid released")
            };
            outputs.push(Output::toned(Tone::Info, text));
        }
    }

    fn status(&self, outputs: &mut Vec<Output>) {
        let state = *self.lockbox.state();
        let board = self.lockbox.hardware();

        outputs.push(Output::plain(format!(
            "t={} mode={} (#{})",
            self.now,
            state.mode,
            state.mode.index()
        )));
        let countdown = match state.countdown_remaining(self.now) {
            Some(ms) => format!("{ms} ms left"),
            None => "idle".to_string(),
        };
        outputs.push(Output::plain(format!(
            "solenoid {}, countdown {countdown}",
            if board.engaged { "engaged" } else { "released" },
        )));
        outputs.push(Output::plain(format!(
            "interrupts: button {}, audio {}",
            on_off(state.mask.button),
            on_off(state.mask.audio)
        )));

        let pending = self.lockbox.flags().snapshot();
        let names: Vec<&str> = pending.iter().map(Flag::name).collect();
        outputs.push(Output::plain(format!(
            "flags [{}/{}]: {}",
            pending.len(),
            pending.capacity(),
            if names.is_empty() {
                "none".to_string()
            } else {
                names.join(", ")
            }
        )));

        let phone = match self.lockbox.phone_detected() {
            Some(true) => "detected",
            Some(false) => "absent",
            None => "not scanned yet",
        };
        outputs.push(Output::plain(format!(
            "phone {phone} (actually {}), lid {}, nfc polls {}",
            if board.phone_inside { "inside" } else { "outside" },
            if board.lid_open { "open" } else { "closed" },
            self.lockbox.nfc().polls()
        )));
        outputs.push(Output::toned(
            Tone::Screen,
            format!("screen: {}", self.lockbox.screen(self.now)),
        ));
    }

    fn events(&self, outputs: &mut Vec<Output>) {
        let scheduler = self.lockbox.scheduler();
        outputs.push(Output::plain(format!(
            "{} of {} slots in use",
            scheduler.len(),
            scheduler.capacity()
        )));
        for event in scheduler.iter() {
            let repeats = event
                .repeats()
                .map_or_else(String::new, |n| format!(" x{n}"));
            let task = event.callback().map_or("-", |task| task.name());
            outputs.push(Output::plain(format!(
                "  {:<12} {:<22} {:<18} due {} (+{} ms) every {} ms{repeats}",
                event.label().name(),
                task,
                event.mode().name(),
                event.schedule_time(),
                event.schedule_time().since(self.now),
                event.delay(),
            )));
        }
    }

    fn board(&mut self) -> &mut SimBoard {
        self.lockbox.hardware_mut()
    }

    fn log(&mut self, role: TranscriptRole, line: &str) -> io::Result<()> {
        let now = self.now;
        match self.transcript.as_mut() {
            Some(transcript) => transcript.append_line(now, role, line),
            None => Ok(()),
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

/// Plain-text session log keyed by simulated time.
struct TranscriptLogger {
    writer: BufWriter<fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        writeln!(logger.writer, "# Phone lock box emulator transcript")?;
        writeln!(
            logger.writer,
            "# Timestamps are simulated milliseconds since power-up"
        )?;
        writeln!(logger.writer)?;
        logger.writer.flush()?;
        Ok(logger)
    }

    fn append_line(&mut self, now: Millis, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>8} ms] {} {}",
            now.as_u32(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

#[derive(Clone, Copy)]
enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}
