//! Interactive editing support
//!
//! Opens $EDITOR for page bodies and asks for confirmation before deletes.

use std::env;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::process::Command;

use anyhow::{bail, Context, Result};

/// Open content in the user's preferred editor and return the saved text
pub fn edit_text(initial_content: &str) -> Result<String> {
    let editor = find_editor()?;

    let file = tempfile::Builder::new()
        .prefix("folio_page_")
        .suffix(".md")
        .tempfile()
        .context("Failed to create temp file")?;
    fs::write(file.path(), initial_content)
        .with_context(|| format!("Failed to write temp file: {:?}", file.path()))?;

    let status = Command::new(&editor)
        .arg(file.path())
        .status()
        .with_context(|| format!("Failed to run editor: {}", editor))?;

    if !status.success() {
        bail!(
            "Editor '{}' exited with non-zero status. Check that your editor is configured correctly.",
            editor
        );
    }

    fs::read_to_string(file.path())
        .with_context(|| format!("Failed to read edited file: {:?}", file.path()))
}

/// $EDITOR, then $VISUAL, then the first of a few common editors on PATH
fn find_editor() -> Result<String> {
    for var in ["EDITOR", "VISUAL"] {
        if let Ok(editor) = env::var(var) {
            if !editor.is_empty() {
                return Ok(editor);
            }
        }
    }

    if let Some(editor) = ["nano", "vim", "vi"].into_iter().find(|e| command_exists(e)) {
        return Ok(editor.to_string());
    }

    bail!(
        "No editor found. Set $EDITOR or pass --body.\n\
         Example: export EDITOR=nano"
    )
}

fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Ask a yes/no question on the terminal
///
/// Returns false without prompting when stdin is not a terminal.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !io::stdin().is_terminal() {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(is_yes(&input))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
