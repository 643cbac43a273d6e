// UI layer: the command flows (login, signup, reset, link, show, ...) and
// an interactive menu built on `dialoguer` for runs without a subcommand.
// Each flow loads settings, talks to the API, then saves the merged
// result back.

use crate::api::{ApiClient, ApiResponse, Credentials, HttpTransport};
use crate::error::{CredentialError, PromptError};
use crate::prompt::{self, Prompter};
use crate::settings::schema::Placement;
use crate::settings::{LoadOutcome, Settings, SettingsStore, DEFAULT_URL};
use anyhow::{bail, Context, Result};
use dialoguer::Select;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

/// Credentials supplied on the command line. Missing values are prompted for.
#[derive(Debug, Clone, Default)]
pub struct CredentialInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Load settings. An unreadable file is reported and skipped; whatever the
/// other file holds is kept.
pub fn load_settings(store: &SettingsStore, overrides: &Settings) -> Settings {
    load_for_update(store, overrides).0
}

/// Load settings along with the files that may be written back. A file that
/// failed to load is left out so saving never replaces it.
fn load_for_update(store: &SettingsStore, overrides: &Settings) -> (Settings, Vec<Placement>) {
    let outcome = store.load(overrides);
    let writable = outcome.writable();
    if let LoadOutcome::Failed { errors, .. } = &outcome {
        for (_, e) in errors {
            eprintln!("Warning: {e}; leaving it untouched");
        }
    }
    (outcome.into_settings(), writable)
}

/// Whether `err` comes from the user pressing Ctrl+C at a prompt.
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<PromptError>(),
            Some(PromptError::Interrupted)
        ) || matches!(
            cause.downcast_ref::<CredentialError>(),
            Some(CredentialError::Prompt(PromptError::Interrupted))
        )
    })
}

fn client<T: HttpTransport>(transport: T, settings: &Settings) -> ApiClient<T> {
    ApiClient::with_transport(transport, settings.url().unwrap_or(DEFAULT_URL))
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Merge an auth response into settings. A username echoed by the API
/// replaces the one entered.
fn merge_response(settings: &mut Settings, response: ApiResponse, username: String) {
    settings.insert("username", username);
    settings.extend(response);
}

/// Log in and persist the session token.
pub fn login<T: HttpTransport>(
    store: &SettingsStore,
    overrides: &Settings,
    input: &CredentialInput,
    transport: T,
    prompter: &dyn Prompter,
) -> Result<Settings> {
    let (mut settings, writable) = load_for_update(store, overrides);
    let username = prompt::input_email(input.email.as_deref(), prompter)?;
    let password = prompt::input_password(input.password.as_deref(), prompter)?;

    let api = client(transport, &settings);
    tracing::debug!(url = api.base_url(), "logging in");
    let progress = spinner("Logging in...");
    let res = api.login(&Credentials::new(username.as_str()).with_password(password));
    progress.finish_and_clear();
    let response = res.context("Login failed")?;

    merge_response(&mut settings, response, username);
    store
        .save_layers(&settings, &writable)
        .context("Failed to save settings")?;
    tracing::debug!(username = ?settings.username(), "logged in");
    Ok(settings)
}

/// Create an account and persist whatever session the API hands back.
pub fn signup<T: HttpTransport>(
    store: &SettingsStore,
    overrides: &Settings,
    input: &CredentialInput,
    transport: T,
    prompter: &dyn Prompter,
) -> Result<Settings> {
    let (mut settings, writable) = load_for_update(store, overrides);
    let username = prompt::input_email(input.email.as_deref(), prompter)?;
    let password = prompt::input_password(input.password.as_deref(), prompter)?;

    let api = client(transport, &settings);
    tracing::debug!(url = api.base_url(), "signing up");
    let progress = spinner("Signing up...");
    let res = api.signup(&Credentials::new(username.as_str()).with_password(password));
    progress.finish_and_clear();
    let response = res.context("Sign up failed")?;

    merge_response(&mut settings, response, username);
    store
        .save_layers(&settings, &writable)
        .context("Failed to save settings")?;
    Ok(settings)
}

/// Request a password reset for the stored session. Returns the API's
/// message, if any.
pub fn reset<T: HttpTransport>(
    store: &SettingsStore,
    overrides: &Settings,
    input: &CredentialInput,
    transport: T,
    prompter: &dyn Prompter,
) -> Result<Option<String>> {
    let settings = load_settings(store, overrides);
    let Some(token) = settings.token() else {
        bail!("Not logged in. Run `dropstack login` first.");
    };
    let email = input.email.as_deref().or(settings.username());
    let username = prompt::input_email(email, prompter)?;

    let api = client(transport, &settings);
    let progress = spinner("Requesting password reset...");
    let res = api.reset(&Credentials::new(username).with_token(token));
    progress.finish_and_clear();
    let response = res.context("Password reset failed")?;

    Ok(response
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string))
}

/// Forget the stored identity by deleting the global settings file.
pub fn logout(store: &SettingsStore) -> Result<()> {
    store
        .remove_global_file()
        .context("Failed to remove global settings")
}

/// Merge deployment overrides into the project file and save.
pub fn link(store: &SettingsStore, overrides: &Settings) -> Result<Settings> {
    let (settings, writable) = load_for_update(store, overrides);
    store
        .save_layers(&settings, &writable)
        .context("Failed to save settings")?;
    Ok(settings)
}

/// Delete the project settings file in the current directory.
pub fn unlink(store: &SettingsStore) -> Result<()> {
    store
        .remove_project_file()
        .context("Failed to remove project settings")
}

/// Merged settings as pretty JSON with the token masked.
pub fn show(store: &SettingsStore, overrides: &Settings) -> Result<String> {
    let mut settings = load_settings(store, overrides);
    if settings.token().is_some() {
        settings.insert("token", "********");
    }
    serde_json::to_string_pretty(&settings).context("Failed to format settings")
}

pub fn greeting(settings: &Settings) -> String {
    format!("Welcome {}!", settings.username().unwrap_or("back"))
}

/// Interactive menu used when no subcommand is given. Loops until the user
/// chooses "Exit" or cancels; a failed action is reported and the menu
/// shown again.
pub fn main_menu<T: HttpTransport + Clone>(
    store: &SettingsStore,
    overrides: &Settings,
    transport: T,
    prompter: &dyn Prompter,
) -> Result<()> {
    if !std::io::stdin().is_terminal() {
        bail!("No command given and input is not a terminal. Run `dropstack --help`.");
    }

    let items = [
        "Login",
        "Sign up",
        "Reset password",
        "Show settings",
        "Logout",
        "Exit",
    ];
    let input = CredentialInput::default();
    loop {
        // `Select` shows a keyboard-navigable list in the terminal.
        let selection = match Select::new().items(&items).default(0).interact() {
            Ok(selection) => selection,
            Err(e) => match PromptError::from(e) {
                PromptError::Interrupted => break,
                e => return Err(e.into()),
            },
        };
        let outcome = match selection {
            0 => login(store, overrides, &input, transport.clone(), prompter)
                .map(|s| greeting(&s)),
            1 => signup(store, overrides, &input, transport.clone(), prompter)
                .map(|_| "Signed up. Check your inbox to verify the account.".to_string()),
            2 => reset(store, overrides, &input, transport.clone(), prompter)
                .map(|msg| msg.unwrap_or_else(|| "Password reset requested.".to_string())),
            3 => show(store, overrides),
            4 => logout(store).map(|_| "Logged out.".to_string()),
            _ => break,
        };
        match outcome {
            Ok(message) => println!("{message}"),
            Err(e) if is_cancelled(&e) => break,
            Err(e) => println!("{e:#}"),
        }
    }
    Ok(())
}
