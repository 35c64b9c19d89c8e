//! Interactive startup menu

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::error::{Error, Result};

const MENU: &str = "\
Solix lite mode
  1. Run all accounts
  2. Exit
Select an option: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Run,
    Exit,
}

pub fn parse_choice(input: &str) -> Result<MenuChoice> {
    match input.trim() {
        "1" => Ok(MenuChoice::Run),
        "2" => Ok(MenuChoice::Exit),
        other => Err(Error::InvalidChoice(other.to_string())),
    }
}

/// Print the menu and read one choice from stdin. End of input counts as
/// an invalid choice.
pub async fn prompt() -> Result<MenuChoice> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(MENU.as_bytes())
        .await
        .map_err(|e| Error::Stdin(e.to_string()))?;
    stdout.flush().await.map_err(|e| Error::Stdin(e.to_string()))?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .map_err(|e| Error::Stdin(e.to_string()))?;
    parse_choice(&line)
}
