//! completion command - Shell completion scripts for gitread

use crate::cli::args::{Cli, Shell};
use anyhow::Result;
use clap::CommandFactory;
use clap_complete::{generate, shells};
use std::io::Write;

/// Print the completion script for `shell` on stdout.
pub fn completion(shell: Shell) -> Result<()> {
    write_completion(shell, &mut std::io::stdout().lock())
}

fn write_completion<W: Write>(shell: Shell, out: &mut W) -> Result<()> {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();

    match shell {
        Shell::Bash => generate(shells::Bash, &mut cmd, &bin, out),
        Shell::Zsh => generate(shells::Zsh, &mut cmd, &bin, out),
        Shell::Fish => generate(shells::Fish, &mut cmd, &bin, out),
        Shell::PowerShell => generate(shells::PowerShell, &mut cmd, &bin, out),
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_name_the_read_commands() {
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell] {
            let mut buf = Vec::new();
            write_completion(shell, &mut buf).unwrap();
            let script = String::from_utf8(buf).unwrap();
            assert!(script.contains("merge-base"), "{:?}", shell);
            assert!(script.contains("last-commit"), "{:?}", shell);
        }
    }
}
