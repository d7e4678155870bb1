use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bon::Builder;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tracing::{debug, info, trace};

use super::commands::{INTERRUPT, WRITE_READY_MARKER};
use super::model::parent_directory;
use super::port::{DevicePort, PortStreams};
use crate::error::{FixtureError, TransportError};

const FAKE_PORT_NAME: &str = "fake-flipper";
const PROMPT: &str = "\r\n>: ";
const DUPLEX_CAPACITY: usize = 64 * 1024;
const DEFAULT_DIRECTORIES: [&str; 4] = ["/ext", "/ext/nfc", "/ext/apps", "/int"];
const DEFAULT_APPS: [&str; 4] = ["NFC", "Sub-GHz", "Infrared", "Bad USB"];

/// A file seeded onto the fake device, parsed from `path=content`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FakeFile {
    path: String,
    content: String,
}

impl FromStr for FakeFile {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let Some((path, content)) = value.split_once('=') else {
            return Err(FixtureError::InvalidFileRecord {
                record: value.to_string(),
            });
        };
        let path = path.trim();
        if !path.starts_with('/') {
            return Err(FixtureError::RelativePath {
                path: path.to_string(),
            });
        }
        Ok(Self {
            path: path.to_string(),
            content: content.to_string(),
        })
    }
}

/// Settings for the simulated device.
#[derive(Debug, Clone, Default, Builder)]
pub struct FakeDeviceConfig {
    #[builder(default)]
    files: Vec<FakeFile>,
    apps: Option<Vec<String>>,
    #[builder(into)]
    running_app: Option<String>,
    /// Never answer, as a device stuck outside its command line would.
    #[builder(default)]
    stalled: bool,
    /// Accept file content without storing it, so a later `storage stat`
    /// cannot find the file.
    #[builder(default)]
    discard_writes: bool,
    /// Echo command lines starting with this text but never answer them.
    #[builder(into)]
    unanswered_command: Option<String>,
}

/// How a simulated shell misbehaves, if at all.
#[derive(Debug, Clone, Default)]
struct ShellBehaviour {
    stalled: bool,
    discard_writes: bool,
    unanswered_command: Option<String>,
}

#[derive(Debug, Default)]
struct FakeDeviceState {
    directories: BTreeSet<String>,
    files: BTreeMap<String, String>,
    apps: Vec<String>,
    running_app: Option<String>,
    commands: Vec<String>,
    interrupts: usize,
}

impl FakeDeviceState {
    fn add_directory(&mut self, path: &str) {
        let mut current = Some(path);
        while let Some(directory) = current {
            self.directories.insert(directory.to_string());
            current = parent_directory(directory);
        }
    }

    fn children(&self, directory: &str) -> Vec<String> {
        let directory = directory.trim_end_matches('/');
        let is_child = |path: &&String| parent_directory(path) == Some(directory);
        let directories = self
            .directories
            .iter()
            .filter(is_child)
            .filter_map(|path| path.rsplit_once('/'))
            .map(|(_parent, name)| format!("[D] {name}"));
        let files = self
            .files
            .iter()
            .filter(|(path, _content)| is_child(path))
            .filter_map(|(path, content)| {
                let (_parent, name) = path.rsplit_once('/')?;
                Some(format!("[F] {name} {}b", content.len()))
            });
        directories.chain(files).collect()
    }
}

/// In-process simulation of the device command line.
///
/// Every [`DevicePort::open`] starts a fresh simulated shell over an
/// in-memory duplex pipe; storage and loader state is shared between opens
/// and inspectable from tests.
#[derive(Debug, Clone)]
pub struct FakeDevicePort {
    state: Arc<Mutex<FakeDeviceState>>,
    behaviour: ShellBehaviour,
}

impl FakeDevicePort {
    /// Creates a simulated device from `config`.
    ///
    /// ```
    /// use ntag::{FakeDeviceConfig, FakeDevicePort};
    ///
    /// let port = FakeDevicePort::new(
    ///     FakeDeviceConfig::builder()
    ///         .files(vec!["/ext/nfc/a.nfc=hello".parse()?])
    ///         .build(),
    /// );
    /// assert_eq!(Some("hello".to_string()), port.file("/ext/nfc/a.nfc"));
    /// # Ok::<(), ntag::FixtureError>(())
    /// ```
    #[must_use]
    pub fn new(config: FakeDeviceConfig) -> Self {
        let mut state = FakeDeviceState {
            apps: config.apps.unwrap_or_else(|| {
                DEFAULT_APPS.iter().map(ToString::to_string).collect()
            }),
            running_app: config.running_app,
            ..FakeDeviceState::default()
        };
        for directory in DEFAULT_DIRECTORIES {
            state.add_directory(directory);
        }
        for file in config.files {
            if let Some(parent) = parent_directory(&file.path) {
                state.add_directory(parent);
            }
            state.files.insert(file.path, file.content);
        }

        Self {
            state: Arc::new(Mutex::new(state)),
            behaviour: ShellBehaviour {
                stalled: config.stalled,
                discard_writes: config.discard_writes,
                unanswered_command: config.unanswered_command,
            },
        }
    }

    /// Returns the content stored at `path`.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<String> {
        self.lock().files.get(path).cloned()
    }

    /// Returns every command line received, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    /// Returns how many interrupt bytes the device has received.
    #[must_use]
    pub fn interrupts(&self) -> usize {
        self.lock().interrupts
    }

    /// Returns the running application, if any.
    #[must_use]
    pub fn running_app(&self) -> Option<String> {
        self.lock().running_app.clone()
    }

    fn lock(&self) -> MutexGuard<'_, FakeDeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DevicePort for FakeDevicePort {
    fn describe(&self) -> String {
        FAKE_PORT_NAME.to_string()
    }

    async fn open(&self) -> Result<PortStreams, TransportError> {
        let (client, device) = tokio::io::duplex(DUPLEX_CAPACITY);
        let shell = FakeShell {
            state: Arc::clone(&self.state),
            behaviour: self.behaviour.clone(),
            mode: ShellMode::Command,
            line: Vec::new(),
        };
        tokio::spawn(shell.run(device));
        info!(stalled = self.behaviour.stalled, "using fake device");

        let (reader, writer) = tokio::io::split(client);
        Ok(PortStreams::new(reader, writer))
    }
}

#[derive(Debug)]
enum ShellMode {
    Command,
    Writing { path: String, content: Vec<u8> },
}

/// The simulated shell behind one open port.
#[derive(Debug)]
struct FakeShell {
    state: Arc<Mutex<FakeDeviceState>>,
    behaviour: ShellBehaviour,
    mode: ShellMode,
    line: Vec<u8>,
}

impl FakeShell {
    async fn run(mut self, stream: DuplexStream) {
        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut chunk = [0u8; 1024];
        loop {
            let len = match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(len) => len,
            };
            let output = self.feed(&chunk[..len]);
            if output.is_empty() {
                continue;
            }
            if writer.write_all(output.as_bytes()).await.is_err() {
                break;
            }
        }
        debug!("fake device stream closed");
    }

    /// Consumes client bytes and returns what the device prints in reply.
    fn feed(&mut self, bytes: &[u8]) -> String {
        let mut output = String::new();
        for byte in bytes {
            if *byte == INTERRUPT {
                self.lock().interrupts += 1;
            }
            if self.behaviour.stalled {
                continue;
            }

            match &mut self.mode {
                ShellMode::Writing { path, content } => {
                    if *byte != INTERRUPT {
                        content.push(*byte);
                        continue;
                    }
                    let path = std::mem::take(path);
                    let content = String::from_utf8_lossy(content).into_owned();
                    let content = content.strip_suffix("\r\n").unwrap_or(&content).to_string();
                    if self.behaviour.discard_writes {
                        trace!(%path, len = content.len(), "fake file discarded");
                    } else {
                        trace!(%path, len = content.len(), "fake file stored");
                        self.lock().files.insert(path, content);
                    }
                    self.mode = ShellMode::Command;
                    output.push_str(PROMPT);
                }
                ShellMode::Command => match byte {
                    &INTERRUPT => {
                        self.line.clear();
                        output.push_str(PROMPT);
                    }
                    b'\r' => {}
                    b'\n' => {
                        let line = String::from_utf8_lossy(&self.line).trim().to_string();
                        self.line.clear();
                        if line.is_empty() {
                            output.push_str(PROMPT);
                        } else {
                            output.push_str(&line);
                            output.push_str("\r\n");
                            output.push_str(&self.execute(&line));
                        }
                    }
                    other => self.line.push(*other),
                },
            }
        }
        output
    }

    /// Runs a command line and returns its response, ending in a prompt
    /// unless the command switched to content input.
    fn execute(&mut self, line: &str) -> String {
        self.lock().commands.push(line.to_string());
        if self
            .behaviour
            .unanswered_command
            .as_deref()
            .is_some_and(|unanswered| line.starts_with(unanswered))
        {
            trace!(line, "fake command left unanswered");
            return String::new();
        }
        let (command, rest) = split_word(line);
        let (subcommand, argument) = split_word(rest);

        let response = match (command, subcommand) {
            ("storage", "write") => {
                let path = argument.to_string();
                self.mode = ShellMode::Writing {
                    path,
                    content: Vec::new(),
                };
                return format!("{WRITE_READY_MARKER}\r\n");
            }
            ("storage", "mkdir") => self.mkdir(argument),
            ("storage", "stat") => self.stat(argument),
            ("storage", "list") => self.list(argument),
            ("loader", "list") => self.loader_list(),
            ("loader", "info") => self.loader_info(),
            ("loader", "open") => self.loader_open(argument),
            ("loader", "close") => self.loader_close(),
            ("loader", "signal") => self.loader_signal(argument),
            _other => format!("`{command}` command not found"),
        };
        format!("{response}{PROMPT}")
    }

    fn mkdir(&self, path: &str) -> String {
        let mut state = self.lock();
        if state.directories.contains(path) {
            return "Storage error: already exists".to_string();
        }
        state.add_directory(path);
        String::new()
    }

    fn stat(&self, path: &str) -> String {
        let state = self.lock();
        if let Some(content) = state.files.get(path) {
            return format!("File, size: {}b", content.len());
        }
        if state.directories.contains(path) {
            return "Directory".to_string();
        }
        "Storage error: file/dir not exist".to_string()
    }

    fn list(&self, path: &str) -> String {
        let state = self.lock();
        let directory = path.trim_end_matches('/');
        if !state.directories.contains(directory) {
            return "Storage error: file/dir not exist".to_string();
        }
        let entries = state.children(directory);
        if entries.is_empty() {
            return "Empty".to_string();
        }
        entries.join("\r\n")
    }

    fn loader_list(&self) -> String {
        let state = self.lock();
        let mut response = String::from("Applications:");
        for app in &state.apps {
            response.push_str("\r\n\t");
            response.push_str(app);
        }
        response
    }

    fn loader_info(&self) -> String {
        match &self.lock().running_app {
            Some(app) => format!("Application \"{app}\" is running"),
            None => "No application is running".to_string(),
        }
    }

    fn loader_open(&self, argument: &str) -> String {
        let mut quoted = argument.split('"').skip(1).step_by(2);
        let Some(app) = quoted.next() else {
            return "Error: usage: loader open \"<app>\" [\"<file>\"]".to_string();
        };
        let file = quoted.next();

        let mut state = self.lock();
        if let Some(running) = &state.running_app {
            return format!("Error: application \"{running}\" is already running");
        }
        if !state.apps.iter().any(|known| known == app) {
            return format!("Error: application \"{app}\" not found");
        }
        if let Some(file) = file
            && !state.files.contains_key(file)
        {
            return format!("Error: cannot open {file}");
        }
        state.running_app = Some(app.to_string());
        String::new()
    }

    fn loader_close(&self) -> String {
        match self.lock().running_app.take() {
            Some(app) => format!("Application \"{app}\" closed"),
            None => "No application is running".to_string(),
        }
    }

    fn loader_signal(&self, argument: &str) -> String {
        if self.lock().running_app.is_none() {
            return "Error: no application is running".to_string();
        }
        let (name, _arg) = split_word(argument);
        format!("Signal {name} sent")
    }

    fn lock(&self) -> MutexGuard<'_, FakeDeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    text.split_once(' ')
        .map_or((text, ""), |(word, rest)| (word, rest.trim()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn shell(config: FakeDeviceConfig) -> (FakeDevicePort, FakeShell) {
        let port = FakeDevicePort::new(config);
        let shell = FakeShell {
            state: Arc::clone(&port.state),
            behaviour: port.behaviour.clone(),
            mode: ShellMode::Command,
            line: Vec::new(),
        };
        (port, shell)
    }

    #[rstest]
    #[case("a.nfc=x", FixtureError::RelativePath { path: "a.nfc".to_string() })]
    #[case("/ext/a.nfc", FixtureError::InvalidFileRecord { record: "/ext/a.nfc".to_string() })]
    fn fake_file_rejects_malformed_records(#[case] record: &str, #[case] expected: FixtureError) {
        assert_eq!(Err(expected), record.parse::<FakeFile>());
    }

    #[test]
    fn commands_are_echoed_before_response_and_prompt() {
        let (_port, mut shell) = shell(FakeDeviceConfig::default());
        assert_eq!(
            "storage stat /ext\r\nDirectory\r\n>: ",
            shell.feed(b"storage stat /ext\r\n")
        );
    }

    #[test]
    fn write_mode_stores_content_until_interrupt() {
        let (port, mut shell) = shell(FakeDeviceConfig::default());
        let banner = shell.feed(b"storage write /ext/nfc/a.nfc\r\n");
        assert!(banner.ends_with(&format!("{WRITE_READY_MARKER}\r\n")));

        assert_eq!("", shell.feed(b"line one\nline two\n\r\n"));
        assert_eq!(PROMPT, shell.feed(&[INTERRUPT]));
        assert_eq!(
            Some("line one\nline two\n".to_string()),
            port.file("/ext/nfc/a.nfc")
        );
    }

    #[test]
    fn discarded_writes_fail_stat() {
        let (port, mut shell) = shell(FakeDeviceConfig::builder().discard_writes(true).build());
        shell.feed(b"storage write /ext/nfc/a.nfc\r\n");
        shell.feed(b"content\r\n");

        assert_eq!(PROMPT, shell.feed(&[INTERRUPT]));
        assert_eq!(None, port.file("/ext/nfc/a.nfc"));
        assert_eq!(
            "storage stat /ext/nfc/a.nfc\r\nStorage error: file/dir not exist\r\n>: ",
            shell.feed(b"storage stat /ext/nfc/a.nfc\r\n")
        );
    }

    #[test]
    fn unanswered_command_is_only_echoed() {
        let (port, mut shell) = shell(
            FakeDeviceConfig::builder()
                .unanswered_command("loader info")
                .build(),
        );

        assert_eq!("loader info\r\n", shell.feed(b"loader info\r\n"));
        assert_eq!(vec!["loader info".to_string()], port.commands());
        assert!(shell.feed(b"loader list\r\n").ends_with(PROMPT));
    }

    #[test]
    fn listing_reports_directories_then_files() {
        let (_port, mut shell) = shell(
            FakeDeviceConfig::builder()
                .files(vec!["/ext/nfc/tag.nfc=abc".parse().expect("valid fixture")])
                .build(),
        );
        shell.feed(b"storage mkdir /ext/nfc/sub\r\n");
        assert_eq!(
            "storage list /ext/nfc\r\n[D] sub\r\n[F] tag.nfc 3b\r\n>: ",
            shell.feed(b"storage list /ext/nfc\r\n")
        );
    }

    #[test]
    fn loader_tracks_running_app() {
        let (port, mut shell) = shell(FakeDeviceConfig::default());
        shell.feed(b"loader open \"NFC\"\r\n");
        assert_eq!(Some("NFC".to_string()), port.running_app());
        assert!(shell.feed(b"loader open \"Bad USB\"\r\n").contains("Error"));
        shell.feed(b"loader close\r\n");
        assert_eq!(None, port.running_app());
    }

    #[test]
    fn stalled_device_counts_interrupts_silently() {
        let (port, mut shell) = shell(FakeDeviceConfig::builder().stalled(true).build());
        assert_eq!("", shell.feed(&[INTERRUPT, b'\r', b'\n', INTERRUPT]));
        assert_eq!(2, port.interrupts());
        assert_matches!(port.commands().as_slice(), []);
    }
}
