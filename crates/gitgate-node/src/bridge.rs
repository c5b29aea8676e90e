//! Bridge between HTTP requests and the git executable.
//!
//! Buffered runs cover the short commands (`update-server-info` and ref
//! advertisement). Stateless RPC is streamed in both directions: the request
//! body is fed to stdin by a background task while stdout is handed back as
//! a pull-based stream, so a slow client slows the subprocess down instead of
//! growing a buffer.

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::{debug, warn};

use gitgate_git::Service;

/// A stream of body chunks.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Environment variable carrying the client's `Git-Protocol` header.
pub const GIT_PROTOCOL_ENV: &str = "GIT_PROTOCOL";

/// Errors from running the git executable.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The process could not be started.
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    /// The process exited unsuccessfully.
    #[error("exited with {}: {stderr}", describe_exit(.code))]
    Exit { code: Option<i32>, stderr: String },
    /// Talking to the process failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "signal".to_string(),
    }
}

/// One invocation of the git executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Arguments after the executable name.
    pub args: Vec<String>,
    /// Working directory.
    pub dir: PathBuf,
    /// Variables added to the inherited environment.
    pub envs: Vec<(String, String)>,
}

impl Invocation {
    /// Creates an invocation running in `dir`.
    pub fn new<I, S>(dir: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            dir: dir.into(),
            envs: Vec::new(),
        }
    }

    /// `update-server-info`, refreshing the dumb-protocol ref caches.
    pub fn update_server_info(dir: &Path) -> Self {
        Self::new(dir, ["update-server-info"])
    }

    /// `<service> --stateless-rpc --advertise-refs .`
    pub fn advertise_refs(dir: &Path, service: Service) -> Self {
        Self::new(
            dir,
            [service.name(), "--stateless-rpc", "--advertise-refs", "."],
        )
    }

    /// `<service> --stateless-rpc .`
    pub fn stateless_rpc(dir: &Path, service: Service) -> Self {
        Self::new(dir, [service.name(), "--stateless-rpc", "."])
    }

    /// Forwards a `Git-Protocol` header value, if the client sent one.
    pub fn with_protocol(mut self, protocol: Option<&str>) -> Self {
        if let Some(protocol) = protocol.filter(|p| !p.is_empty()) {
            self.envs
                .push((GIT_PROTOCOL_ENV.to_string(), protocol.to_string()));
        }
        self
    }

    /// Adds environment variables.
    pub fn with_envs(mut self, envs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.envs.extend(envs);
        self
    }
}

/// A running stateless-RPC process.
pub struct RpcProcess {
    /// Everything the process writes to stdout.
    pub stdout: ByteStream,
    /// Resolves once the process has exited.
    pub exit: BoxFuture<'static, Result<(), BridgeError>>,
}

/// Runs git commands on behalf of protocol handlers.
#[async_trait]
pub trait GitBackend: Send + Sync + 'static {
    /// Runs to completion and returns stdout.
    async fn run(&self, invocation: Invocation) -> Result<Vec<u8>, BridgeError>;

    /// Starts a process reading `stdin` and streaming its stdout.
    fn spawn(&self, invocation: Invocation, stdin: ByteStream) -> Result<RpcProcess, BridgeError>;
}

/// Variables added to the environment of push operations.
pub trait HookEnvironment: Send + Sync + 'static {
    /// Returns `(name, value)` pairs.
    fn envs(&self) -> Vec<(String, String)>;
}

/// Marks receive-pack runs so server-side hooks can tell they came over HTTP.
#[derive(Debug, Default, Clone)]
pub struct DefaultHookEnvironment;

impl HookEnvironment for DefaultHookEnvironment {
    fn envs(&self) -> Vec<(String, String)> {
        vec![("SSH_ORIGINAL_COMMAND".to_string(), "1".to_string())]
    }
}

/// [`GitBackend`] backed by the git executable.
#[derive(Debug, Clone)]
pub struct GitCommand {
    program: PathBuf,
}

impl GitCommand {
    /// Creates a backend invoking `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.dir)
            .envs(invocation.envs.iter().map(|(k, v)| (k, v)))
            .kill_on_drop(true);
        cmd
    }

    fn launch_error(&self, source: io::Error) -> BridgeError {
        BridgeError::Launch {
            program: self.program.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl GitBackend for GitCommand {
    async fn run(&self, invocation: Invocation) -> Result<Vec<u8>, BridgeError> {
        debug!(args = ?invocation.args, dir = %invocation.dir.display(), "Running git");

        let output = self
            .command(&invocation)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.launch_error(e))?;

        if !output.status.success() {
            return Err(BridgeError::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(output.stdout)
    }

    fn spawn(&self, invocation: Invocation, stdin: ByteStream) -> Result<RpcProcess, BridgeError> {
        debug!(args = ?invocation.args, dir = %invocation.dir.display(), "Spawning git");

        let mut child = self
            .command(&invocation)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.launch_error(e))?;

        let (child_stdin, stdout, mut stderr) =
            match (child.stdin.take(), child.stdout.take(), child.stderr.take()) {
                (Some(i), Some(o), Some(e)) => (i, o, e),
                _ => {
                    return Err(BridgeError::Io(io::Error::other(
                        "child process pipes not captured",
                    )))
                }
            };

        tokio::spawn(async move {
            if let Err(e) = feed_stdin(child_stdin, stdin).await {
                // The process may exit before reading all of its input; its
                // exit status carries the real outcome.
                debug!(error = %e, "Stopped feeding request body to git");
            }
        });

        let exit = async move {
            let mut diagnostics = Vec::new();
            if let Err(e) = stderr.read_to_end(&mut diagnostics).await {
                warn!(error = %e, "Failed to read git stderr");
            }
            let status = child.wait().await?;
            if !status.success() {
                return Err(BridgeError::Exit {
                    code: status.code(),
                    stderr: String::from_utf8_lossy(&diagnostics).into_owned(),
                });
            }
            Ok::<(), BridgeError>(())
        };

        Ok(RpcProcess {
            stdout: ReaderStream::new(stdout).boxed(),
            exit: tokio::spawn(exit)
                .map(|joined| joined.unwrap_or_else(|e| Err(io::Error::other(e).into())))
                .boxed(),
        })
    }
}

/// Copies the request stream into the child's stdin, then closes it.
async fn feed_stdin(mut child_stdin: ChildStdin, stdin: ByteStream) -> io::Result<()> {
    let mut reader = StreamReader::new(stdin);
    tokio::io::copy(&mut reader, &mut child_stdin).await?;
    child_stdin.shutdown().await
}
