use anyhow::{Context, Result};
use ipt_core::{Ruleset, parse_ruleset};
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Family {
    #[default]
    V4,
    V6,
}

impl Family {
    pub fn save_program(&self) -> &'static str {
        match self {
            Self::V4 => "iptables-save",
            Self::V6 => "ip6tables-save",
        }
    }
}

/// Captures the live ruleset by running `iptables-save`.
#[derive(Debug, Clone)]
pub struct SaveCapture {
    program: String,
    table: Option<String>,
    counters: bool,
}

impl SaveCapture {
    pub fn new(family: Family) -> Self {
        Self::with_program(family.save_program())
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            table: None,
            counters: false,
        }
    }

    /// Restrict the dump to one table (`-t`).
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Include packet and byte counters (`-c`).
    pub fn counters(mut self, enabled: bool) -> Self {
        self.counters = enabled;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = vec![];
        if self.counters {
            args.push("-c".to_string());
        }
        if let Some(table) = &self.table {
            args.push("-t".to_string());
            args.push(table.clone());
        }
        args
    }

    pub async fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Run the save program and return its raw output.
    pub async fn capture_dump(&self) -> Result<String> {
        let args = self.args();
        debug!(program = %self.program, ?args, "running save program");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} failed: {}", self.program, stderr.trim());
        }

        if !output.stderr.is_empty() {
            warn!(
                program = %self.program,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "save program wrote to stderr"
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Capture and parse the live ruleset.
    pub async fn capture_ruleset(&self) -> Result<Ruleset> {
        let dump = self.capture_dump().await?;
        let ruleset = parse_ruleset(&dump)
            .with_context(|| format!("Failed to parse output of {}", self.program))?;
        Ok(ruleset)
    }
}

impl Default for SaveCapture {
    fn default() -> Self {
        Self::new(Family::default())
    }
}
