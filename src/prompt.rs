// Credential prompts. Values given on the command line pass straight
// through; anything missing is asked for once on the terminal.

use dialoguer::{Input, Password};
use std::io::IsTerminal;

use crate::error::PromptError;

pub const MIN_PASSWORD_LEN: usize = 4;

/// Source of interactively entered credentials.
pub trait Prompter {
    fn prompt_email(&self) -> Result<String, PromptError>;
    fn prompt_password(&self) -> Result<String, PromptError>;
}

/// Terminal prompts using `dialoguer`. Refuses to prompt when stdin is not a
/// terminal so piped or scripted runs fail fast instead of hanging.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    fn ensure_interactive(&self) -> Result<(), PromptError> {
        if std::io::stdin().is_terminal() {
            Ok(())
        } else {
            Err(PromptError::NotInteractive)
        }
    }
}

impl Prompter for TerminalPrompter {
    fn prompt_email(&self) -> Result<String, PromptError> {
        self.ensure_interactive()?;
        let email = Input::<String>::new()
            .with_prompt("Email")
            .validate_with(|input: &String| validate_email(input))
            .interact_text()?;
        Ok(email.trim().to_string())
    }

    fn prompt_password(&self) -> Result<String, PromptError> {
        self.ensure_interactive()?;
        // `Password` hides input in the terminal.
        let password = Password::new()
            .with_prompt("Password")
            .validate_with(|input: &String| validate_password(input))
            .interact()?;
        Ok(password)
    }
}

/// Returns `username` if given, otherwise asks for an email address.
pub fn input_email(username: Option<&str>, prompter: &dyn Prompter) -> Result<String, PromptError> {
    match username.filter(|u| !u.is_empty()) {
        Some(username) => Ok(username.to_string()),
        None => prompter.prompt_email(),
    }
}

/// Returns `password` if given, otherwise asks for it with hidden input.
pub fn input_password(
    password: Option<&str>,
    prompter: &dyn Prompter,
) -> Result<String, PromptError> {
    match password.filter(|p| !p.is_empty()) {
        Some(password) => Ok(password.to_string()),
        None => prompter.prompt_password(),
    }
}

pub fn validate_email(input: &str) -> Result<(), &'static str> {
    let input = input.trim();
    if input.is_empty() {
        return Err("Email is required");
    }
    let valid = match input.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !input.contains(char::is_whitespace)
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err("Not a valid email address")
    }
}

pub fn validate_password(input: &str) -> Result<(), &'static str> {
    if input.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err("Password must be at least 4 characters")
    }
}
