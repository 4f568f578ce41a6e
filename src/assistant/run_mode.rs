//! Run Modes
//!
//! A run mode owns the outer loop: where lines come from, where replies go,
//! and when the session stops. Handler failures are reported and the loop
//! carries on with the next line.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::thread;

use colored::Colorize;
use crossbeam_channel::{select, Receiver};
use log::{debug, error, info, warn};

use super::context::{NoPrompt, Prompter};
use super::input::{InputProcessor, Step};
use super::{Assistant, Response};
use crate::plugin::error::{PluginError, PluginResult};

pub const DEFAULT_PROMPT: &str = "> ";
pub const DEFAULT_GREETING: &str = "Hello! Type 'help' to see what I can do.";

/// Presentation settings for the built-in run modes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub prompt: String,
    pub greeting: String,
    pub color: bool,
    /// Print each batch command before its reply
    pub echo: bool,
    /// Command file for batch runs (stdin when unset)
    pub script: Option<PathBuf>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            color: false,
            echo: false,
            script: None,
        }
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitReason {
    ExitToken,
    #[default]
    EndOfInput,
    Interrupted,
}

/// Counters for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub processed: usize,
    pub handled: usize,
    pub unknown: usize,
    pub errors: usize,
    pub exit: ExitReason,
}

pub trait RunMode: Send {
    fn name(&self) -> &'static str;

    fn run(&mut self, assistant: &mut Assistant, input: &dyn InputProcessor) -> PluginResult<RunSummary>;
}

/// Write the outcome of one step; returns the farewell on exit
fn report(
    out: &mut dyn Write,
    outcome: PluginResult<Step>,
    summary: &mut RunSummary,
    color: bool,
) -> io::Result<Option<String>> {
    match outcome {
        Ok(Step::Exit(farewell)) => return Ok(Some(farewell)),
        Ok(Step::Continue(response)) => {
            summary.processed += 1;
            match &response {
                Response::Handled { .. } => summary.handled += 1,
                Response::Unknown(_) => summary.unknown += 1,
            }
            if !response.text().is_empty() {
                writeln!(out, "{}", response.text())?;
            }
        }
        Err(e) => {
            summary.processed += 1;
            summary.errors += 1;
            error!("{}", e);
            if color {
                writeln!(out, "{} {}", "Error:".red().bold(), e)?;
            } else {
                writeln!(out, "Error: {}", e)?;
            }
        }
    }
    Ok(None)
}

/// Forward Ctrl-C as messages on a channel.
///
/// Once installed the process no longer dies on SIGINT; the run loop
/// decides what to do with the interrupt.
pub fn install_interrupt_listener() -> PluginResult<Receiver<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let (tx, rx) = crossbeam_channel::unbounded();

    thread::Builder::new()
        .name("interrupt-listener".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    debug!("Interrupt received");
                    if tx.send(()).is_err() {
                        break;
                    }
                }
            })
        })?;

    Ok(rx)
}

/// Read one line, decoding invalid UTF-8 lossily; `None` at end of input
pub fn read_line_lossy(reader: &mut dyn BufRead) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    let line = match String::from_utf8(buf) {
        Ok(line) => line,
        Err(e) => {
            warn!("Input line is not valid UTF-8; undecodable bytes replaced");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };
    Ok(Some(line))
}

fn spawn_line_reader(mut reader: Box<dyn BufRead + Send>) -> PluginResult<Receiver<io::Result<String>>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("line-reader".to_string())
        .spawn(move || loop {
            match read_line_lossy(&mut *reader) {
                Ok(None) => break,
                Ok(Some(line)) => {
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// Prompter reading answers from the interactive line channel
struct ChannelPrompter<'a> {
    lines: &'a Receiver<io::Result<String>>,
    interrupts: &'a Receiver<()>,
    output: &'a mut dyn Write,
    interrupted: bool,
}

impl Prompter for ChannelPrompter<'_> {
    fn prompt(&mut self, question: &str) -> Option<String> {
        if self.interrupted {
            return None;
        }
        if write!(self.output, "{} ", question).and_then(|_| self.output.flush()).is_err() {
            return None;
        }
        select! {
            recv(self.lines) -> msg => match msg {
                Ok(Ok(line)) => Some(line),
                _ => None,
            },
            recv(self.interrupts) -> _ => {
                self.interrupted = true;
                None
            }
        }
    }
}

/// Read-eval-print loop over a line source
pub struct InteractiveMode {
    reader: Option<Box<dyn BufRead + Send>>,
    output: Box<dyn Write + Send>,
    interrupts: Option<Receiver<()>>,
    listen_for_interrupts: bool,
    settings: RunSettings,
}

impl InteractiveMode {
    /// Interactive session on the terminal, stopping on Ctrl-C
    pub fn stdio(settings: RunSettings) -> Self {
        Self {
            reader: Some(Box::new(BufReader::new(io::stdin()))),
            output: Box::new(io::stdout()),
            interrupts: None,
            listen_for_interrupts: true,
            settings,
        }
    }

    pub fn new(reader: Box<dyn BufRead + Send>, output: Box<dyn Write + Send>, settings: RunSettings) -> Self {
        Self {
            reader: Some(reader),
            output,
            interrupts: None,
            listen_for_interrupts: false,
            settings,
        }
    }

    /// Use an existing interrupt channel
    pub fn with_interrupts(mut self, interrupts: Receiver<()>) -> Self {
        self.interrupts = Some(interrupts);
        self
    }
}

impl RunMode for InteractiveMode {
    fn name(&self) -> &'static str {
        "interactive"
    }

    fn run(&mut self, assistant: &mut Assistant, input: &dyn InputProcessor) -> PluginResult<RunSummary> {
        let reader = self
            .reader
            .take()
            .ok_or_else(|| PluginError::generic("interactive input has already been consumed"))?;
        if self.interrupts.is_none() && self.listen_for_interrupts {
            self.interrupts = Some(install_interrupt_listener()?);
        }
        let interrupts = self.interrupts.clone().unwrap_or_else(crossbeam_channel::never);
        let lines = spawn_line_reader(reader)?;

        let mut summary = RunSummary::default();
        let color = self.settings.color;
        writeln!(self.output, "{}", self.settings.greeting)?;

        loop {
            write!(self.output, "{}", self.settings.prompt)?;
            self.output.flush()?;

            let line = select! {
                recv(lines) -> msg => match msg {
                    Ok(Ok(line)) => line,
                    Ok(Err(e)) => {
                        error!("Failed to read input: {}", e);
                        summary.exit = ExitReason::EndOfInput;
                        break;
                    }
                    Err(_) => {
                        summary.exit = ExitReason::EndOfInput;
                        break;
                    }
                },
                recv(interrupts) -> _ => {
                    summary.exit = ExitReason::Interrupted;
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            let (outcome, interrupted) = {
                let mut prompter = ChannelPrompter {
                    lines: &lines,
                    interrupts: &interrupts,
                    output: &mut *self.output,
                    interrupted: false,
                };
                let outcome = input.step(assistant, &line, &mut prompter);
                (outcome, prompter.interrupted)
            };

            if let Some(farewell) = report(&mut *self.output, outcome, &mut summary, color)? {
                writeln!(self.output, "{}", farewell)?;
                summary.exit = ExitReason::ExitToken;
                info!("Session ended by exit token after {} command(s)", summary.processed);
                return Ok(summary);
            }

            if interrupted {
                summary.exit = ExitReason::Interrupted;
                break;
            }
        }

        // End of input or interrupt: leave the prompt line before saying goodbye
        writeln!(self.output)?;
        writeln!(self.output, "{}", input.farewell())?;
        info!("Session ended ({:?}) after {} command(s)", summary.exit, summary.processed);
        Ok(summary)
    }
}

/// Where batch commands come from
enum BatchSource {
    /// One command per line; blank lines and `#` comments are skipped
    Lines(Box<dyn BufRead + Send>),
    /// Commands taken as given
    Commands(std::vec::IntoIter<String>),
}

impl BatchSource {
    fn next_command(&mut self) -> io::Result<Option<String>> {
        match self {
            BatchSource::Lines(reader) => loop {
                match read_line_lossy(&mut **reader)? {
                    None => return Ok(None),
                    Some(line) => {
                        let command = line.trim();
                        if !command.is_empty() && !command.starts_with('#') {
                            return Ok(Some(command.to_string()));
                        }
                    }
                }
            },
            BatchSource::Commands(commands) => Ok(commands.next()),
        }
    }
}

/// Non-interactive run over a command list, one command per line
pub struct BatchMode {
    source: Option<BatchSource>,
    output: Box<dyn Write + Send>,
    settings: RunSettings,
}

impl BatchMode {
    pub fn new(source: Box<dyn BufRead + Send>, output: Box<dyn Write + Send>, settings: RunSettings) -> Self {
        Self {
            source: Some(BatchSource::Lines(source)),
            output,
            settings,
        }
    }

    /// Read from the settings' script file, or stdin when none is set
    pub fn from_settings(settings: RunSettings) -> PluginResult<Self> {
        match settings.script.clone() {
            Some(path) => Self::from_script(&path, settings),
            None => Ok(Self::new(Box::new(BufReader::new(io::stdin())), Box::new(io::stdout()), settings)),
        }
    }

    pub fn from_script(path: &Path, settings: RunSettings) -> PluginResult<Self> {
        let file = File::open(path).map_err(|e| {
            PluginError::configuration_error(format!("Cannot open command file {}: {}", path.display(), e))
        })?;
        Ok(Self::new(Box::new(BufReader::new(file)), Box::new(io::stdout()), settings))
    }

    /// Run a fixed list of commands, each dispatched as one input
    pub fn from_commands(commands: &[String], output: Box<dyn Write + Send>, settings: RunSettings) -> Self {
        Self {
            source: Some(BatchSource::Commands(commands.to_vec().into_iter())),
            output,
            settings,
        }
    }
}

impl RunMode for BatchMode {
    fn name(&self) -> &'static str {
        "batch"
    }

    fn run(&mut self, assistant: &mut Assistant, input: &dyn InputProcessor) -> PluginResult<RunSummary> {
        let mut source = self
            .source
            .take()
            .ok_or_else(|| PluginError::generic("batch input has already been consumed"))?;
        let mut summary = RunSummary::default();

        while let Some(command) = source.next_command()? {
            if self.settings.echo {
                writeln!(self.output, "{}{}", self.settings.prompt, command)?;
            }

            let outcome = input.step(assistant, &command, &mut NoPrompt);
            if let Some(farewell) = report(&mut *self.output, outcome, &mut summary, self.settings.color)? {
                writeln!(self.output, "{}", farewell)?;
                summary.exit = ExitReason::ExitToken;
                break;
            }
        }

        self.output.flush()?;
        debug!(
            "Batch run finished: {} processed, {} handled, {} unknown, {} errors",
            summary.processed, summary.handled, summary.unknown, summary.errors
        );
        Ok(summary)
    }
}
