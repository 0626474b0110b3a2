// Server command description
//
// How to start the target dev server: either a shell line (the usual
// `npm run dev`) or a program with explicit arguments.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

/// Default command used to boot the booking site's Vite dev server
pub const DEFAULT_SERVER_COMMAND: &str = "npm run dev";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Invocation {
    Shell(String),
    Program { program: PathBuf, args: Vec<String> },
}

/// A command that starts a long-running server process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    invocation: Invocation,
    current_dir: Option<PathBuf>,
    env: HashMap<String, String>,
}

impl ServerCommand {
    /// Runs `line` through the platform shell (`sh -c`, or `cmd /C` on Windows)
    pub fn shell(line: impl Into<String>) -> Self {
        Self {
            invocation: Invocation::Shell(line.into()),
            current_dir: None,
            env: HashMap::new(),
        }
    }

    /// Executes `program` directly, without a shell
    pub fn program<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            invocation: Invocation::Program {
                program: program.into(),
                args: args.into_iter().map(Into::into).collect(),
            },
            current_dir: None,
            env: HashMap::new(),
        }
    }

    /// Sets the working directory of the server process
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Adds an environment variable for the server process
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Builds the tokio command with piped stdout/stderr and a null stdin.
    ///
    /// On Unix the child becomes the leader of a new process group so the
    /// whole tree (shell, npm, vite) can be signalled at once.
    pub(crate) fn to_command(&self) -> Command {
        let mut cmd = match &self.invocation {
            Invocation::Shell(line) => {
                #[cfg(windows)]
                {
                    let mut cmd = Command::new("cmd");
                    cmd.arg("/C").arg(line);
                    cmd
                }
                #[cfg(not(windows))]
                {
                    let mut cmd = Command::new("sh");
                    cmd.arg("-c").arg(line);
                    cmd
                }
            }
            Invocation::Program { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
        };

        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd.envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }
}

impl Default for ServerCommand {
    fn default() -> Self {
        Self::shell(DEFAULT_SERVER_COMMAND)
    }
}

impl fmt::Display for ServerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.invocation {
            Invocation::Shell(line) => write!(f, "{}", line),
            Invocation::Program { program, args } => {
                write!(f, "{}", program.display())?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
        }
    }
}
