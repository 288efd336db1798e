use std::path::Path;

use async_trait::async_trait;
use cadence_core::config::BuildConfig;
use tracing::{debug, info};

use crate::error::{BuildError, Result};

/// Turns a task source directory into a standalone executable at `output`.
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(&self, task: &str, source: &Path, output: &Path) -> Result<()>;
}

/// Runs an external toolchain. `{source}` and `{output}` inside `args` are
/// replaced with the source directory and the artifact path.
#[derive(Debug, Clone)]
pub struct ToolchainCompiler {
    program: String,
    args: Vec<String>,
}

impl ToolchainCompiler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(cfg: &BuildConfig) -> Self {
        Self::new(cfg.program.clone(), cfg.args.clone())
    }

    fn render_args(&self, source: &Path, output: &Path) -> Vec<String> {
        let source = source.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace("{source}", &source).replace("{output}", &output))
            .collect()
    }
}

#[async_trait]
impl Compiler for ToolchainCompiler {
    async fn compile(&self, task: &str, source: &Path, output: &Path) -> Result<()> {
        let args = self.render_args(source, output);
        debug!(program = %self.program, ?args, "invoking compiler");

        let out = tokio::process::Command::new(&self.program)
            .args(&args)
            .current_dir(source)
            .output()
            .await
            .map_err(|e| {
                BuildError::failed(task, format!("failed to execute {}: {e}", self.program))
            })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(BuildError::failed(
                task,
                format!(
                    "{} exited with {}: {}",
                    self.program,
                    out.status,
                    stderr.trim()
                ),
            ));
        }
        info!(task, output = %output.display(), "executable created");
        Ok(())
    }
}
