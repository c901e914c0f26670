//! Pager activation and invocation.
//!
//! [`Pager`] decides when text overflows one screen and hands it to an
//! external pager with the text piped to stdin. The command resolves, in
//! order: an explicit command set by configuration, `$PAGER`, then the
//! first of `less`/`more`/`pg` found on `PATH`. When nothing resolves, a
//! built-in screenful pager takes over.
//!
//! Invocation goes through the [`PagerRunner`] trait so tests can swap in
//! [`MockPagerRunner`] instead of launching processes.

use std::cell::RefCell;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::process::{Command, Stdio};
use std::rc::Rc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PagerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("pager command `{0}` is empty or unparsable")]
    InvalidCommand(String),
    #[error("pager `{0}` exited with status {1}")]
    CommandFailed(String, std::process::ExitStatus),
}

/// How the text being paged was produced.
///
/// The activation arithmetic differs: formatted output is measured in
/// lines, raw inspect text (often one long line) in characters against the
/// whole screen area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// Output a formatter produced; activation keys on line count.
    Rendered,
    /// Raw inspect text; activation keys on character count.
    Inspect,
}

impl PageMode {
    /// Returns true for inspect-mode measurement.
    pub fn is_inspect(&self) -> bool {
        matches!(self, PageMode::Inspect)
    }
}

/// Abstraction over pager lookup and invocation for testability.
pub trait PagerRunner {
    /// Detect the pager command to use.
    ///
    /// Returns `None` if no pager is available.
    fn detect_pager(&self) -> Option<String>;

    /// Run the pager command with `text` piped to its stdin.
    ///
    /// Blocks until the pager exits.
    fn run(&self, command: &str, text: &str) -> Result<(), PagerError>;
}

/// Real pager runner using system commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealPagerRunner;

impl PagerRunner for RealPagerRunner {
    fn detect_pager(&self) -> Option<String> {
        if let Ok(pager) = std::env::var("PAGER") {
            if !pager.is_empty() && command_exists(&pager) {
                return Some(pager);
            }
        }

        for candidate in ["less", "more", "pg"] {
            if command_exists(candidate) {
                return Some(candidate.to_string());
            }
        }

        None
    }

    fn run(&self, command: &str, text: &str) -> Result<(), PagerError> {
        // Parse the command to handle cases like "less -R" or "more -d"
        let parts = shell_words::split(command)
            .map_err(|_| PagerError::InvalidCommand(command.to_string()))?;

        let (cmd, args) = match parts.split_first() {
            Some(split) => split,
            None => return Err(PagerError::InvalidCommand(command.to_string())),
        };

        let mut child = Command::new(cmd).args(args).stdin(Stdio::piped()).spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // The user may quit the pager before it drains stdin; a broken
            // pipe here is not a failure.
            match stdin.write_all(text.as_bytes()) {
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                other => other?,
            }
        }

        let status = child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(PagerError::CommandFailed(command.to_string(), status))
        }
    }
}

/// Check if a pager command exists on PATH.
fn command_exists(command: &str) -> bool {
    // Extract the command name (first word) in case of "less -R" etc.
    let cmd = command.split_whitespace().next().unwrap_or(command);
    which::which(cmd).is_ok()
}

/// Decides when text overflows the screen and pages it.
///
/// Dimensions start from whatever the caller detected or configured;
/// [`resize`](Pager::resize) keeps them in sync with the terminal.
///
/// # Example
///
/// ```rust
/// use vantage_pager::{PageMode, Pager};
///
/// let (width, height) = vantage_pager::term::detect_dimensions().unwrap_or((80, 24));
/// let pager = Pager::new(width, height);
///
/// let report = "a single line\n";
/// assert!(!pager.activated_by(report, PageMode::Rendered));
/// ```
#[derive(Clone)]
pub struct Pager {
    runner: Rc<dyn PagerRunner>,
    width: usize,
    height: usize,
    command: Option<String>,
}

impl Pager {
    /// Create a pager with the system runner.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            runner: Rc::new(RealPagerRunner),
            width,
            height,
            command: None,
        }
    }

    /// Create a pager with a custom runner.
    ///
    /// Primarily used for testing to mock pager invocation.
    pub fn with_runner<R: PagerRunner + 'static>(runner: R, width: usize, height: usize) -> Self {
        Self {
            runner: Rc::new(runner),
            width,
            height,
            command: None,
        }
    }

    /// Set an explicit pager command (e.g. `less -R`), bypassing detection.
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Replace the explicit command. `None` returns to detection.
    pub fn set_command(&mut self, command: Option<String>) {
        self.command = command;
    }

    /// Current width in columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Current height in rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Update the dimensions the activation decision works with.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    /// Whether `text` is too large for one screen.
    ///
    /// Rendered output activates when its newline count exceeds the
    /// height; inspect text activates when its character count exceeds the
    /// screen area (width times height).
    pub fn activated_by(&self, text: &str, mode: PageMode) -> bool {
        match mode {
            PageMode::Rendered => text.matches('\n').count() > self.height,
            PageMode::Inspect => text.chars().count() > self.width * self.height,
        }
    }

    /// Page `text`, blocking until the user is done.
    ///
    /// Falls back to the built-in screenful pager when no command
    /// resolves.
    pub fn page(&self, text: &str, mode: PageMode) -> Result<(), PagerError> {
        match self.resolve_command() {
            Some(command) => self.runner.run(&command, text),
            None => {
                let stdin = io::stdin();
                page_screenfuls(
                    text,
                    mode,
                    self.width,
                    self.height,
                    &mut stdin.lock(),
                    &mut io::stdout(),
                )
            }
        }
    }

    /// The command that would be launched: the explicit one, else the
    /// runner's detected pager.
    pub fn resolve_command(&self) -> Option<String> {
        self.command.clone().or_else(|| self.runner.detect_pager())
    }
}

impl fmt::Debug for Pager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pager")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("command", &self.command)
            .finish()
    }
}

/// Built-in pager: print a screenful, wait for Enter, repeat.
///
/// `q` followed by Enter stops early. Inspect mode slices by characters
/// per screen, rendered mode by lines, matching the activation
/// arithmetic. Two rows are reserved for the prompt.
fn page_screenfuls<R: BufRead, W: Write>(
    text: &str,
    mode: PageMode,
    width: usize,
    height: usize,
    input: &mut R,
    out: &mut W,
) -> Result<(), PagerError> {
    let rows = height.saturating_sub(2).max(1);

    let screens: Vec<String> = match mode {
        PageMode::Rendered => {
            let lines: Vec<&str> = text.split('\n').collect();
            lines.chunks(rows).map(|chunk| chunk.join("\n")).collect()
        }
        PageMode::Inspect => {
            let chars: Vec<char> = text.chars().collect();
            chars
                .chunks(width.max(1) * rows)
                .map(|chunk| chunk.iter().collect())
                .collect()
        }
    };

    let total = screens.len();
    for (i, screen) in screens.iter().enumerate() {
        writeln!(out, "{}", screen)?;
        if i + 1 < total {
            write!(out, "=== press Enter to continue, q to quit ===")?;
            out.flush()?;
            let mut line = String::new();
            input.read_line(&mut line)?;
            if line.trim().eq_ignore_ascii_case("q") {
                break;
            }
        }
    }

    Ok(())
}

/// Mock pager runner for testing.
///
/// Records what would have been paged instead of launching a process. The
/// call log is shared through `Rc`, so clones of the pager report into the
/// same log.
#[derive(Debug, Clone)]
pub struct MockPagerRunner {
    pager: Option<String>,
    result: MockPagerResult,
    log: Rc<RefCell<Vec<PagedCall>>>,
}

/// One recorded `run` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedCall {
    pub command: String,
    pub text: String,
}

/// The result of a mock pager invocation.
#[derive(Debug, Clone)]
pub enum MockPagerResult {
    /// Pager consumes the text and exits successfully.
    Success,
    /// Pager fails with an error message.
    Failure(String),
}

impl MockPagerRunner {
    /// Create a mock that simulates no pager on the system.
    pub fn no_pager() -> Self {
        Self {
            pager: None,
            result: MockPagerResult::Success,
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Create a mock that accepts everything paged to it.
    pub fn available() -> Self {
        Self {
            pager: Some("mock-pager".to_string()),
            result: MockPagerResult::Success,
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Create a mock whose invocation fails.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            pager: Some("mock-pager".to_string()),
            result: MockPagerResult::Failure(message.into()),
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Handle to the calls recorded so far.
    pub fn log(&self) -> Rc<RefCell<Vec<PagedCall>>> {
        self.log.clone()
    }
}

impl PagerRunner for MockPagerRunner {
    fn detect_pager(&self) -> Option<String> {
        self.pager.clone()
    }

    fn run(&self, command: &str, text: &str) -> Result<(), PagerError> {
        match &self.result {
            MockPagerResult::Success => {
                self.log.borrow_mut().push(PagedCall {
                    command: command.to_string(),
                    text: text.to_string(),
                });
                Ok(())
            }
            MockPagerResult::Failure(msg) => Err(PagerError::Io(io::Error::other(msg.clone()))),
        }
    }
}
