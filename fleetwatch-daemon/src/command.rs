//! External command execution with shell-lexical tokenization.

use std::process::{Command, Stdio};

/// Result of running one configured command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub ok: bool,
    /// Captured stdout and stderr (trimmed, joined by a newline), or the
    /// reason the command could not be started.
    pub output: String,
}

impl CommandOutcome {
    fn failed(output: impl Into<String>) -> Self {
        Self {
            ok: false,
            output: output.into(),
        }
    }
}

/// Tokenize `command` with shell quoting rules and run it to completion.
///
/// Never fails: a tokenization error, spawn error or non-zero exit all come
/// back as `ok = false`. There is no timeout.
pub fn run_command(command: &str) -> CommandOutcome {
    let argv = match shlex::split(command) {
        Some(argv) if !argv.is_empty() => argv,
        _ => return CommandOutcome::failed(format!("cannot parse command: {command}")),
    };

    let output = match Command::new(&argv[0])
        .args(&argv[1..])
        .stdin(Stdio::null())
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!("{command} failed to execute: {e}");
            return CommandOutcome::failed(e.to_string());
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let captured = [stdout.trim(), stderr.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if !output.status.success() {
        tracing::debug!("{command} failed: {}", output.status);
    }
    CommandOutcome {
        ok: output.status.success(),
        output: captured,
    }
}
