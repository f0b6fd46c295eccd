// Module: Command
// Setup/teardown commands go through a shell and inherit the process
// stdio. Behind a seam so the suite tester can count invocations in
// tests.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

#[async_trait]
pub trait CommandLauncher: Send + Sync {
    async fn launch(&self, command: &str) -> Result<()>;
}

pub struct ShellLauncher;

#[async_trait]
impl CommandLauncher for ShellLauncher {
    async fn launch(&self, command: &str) -> Result<()> {
        // Grupos sem setup/teardown declarados chegam aqui como "".
        if command.is_empty() {
            return Ok(());
        }
        tracing::debug!(command, "launching command");
        let status = Command::new("bash")
            .arg("-c")
            .arg(command)
            .status()
            .await
            .with_context(|| format!("cannot launch command '{}'", command))?;
        if !status.success() {
            bail!("command '{}' exited with {}", command, status);
        }
        Ok(())
    }
}
