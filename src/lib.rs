// Library root
// -----------
// The `dropstack` binary (`main.rs`) is a thin layer over these modules.
//
// Module responsibilities:
// - `api`: HTTP calls to the auth endpoints (login, signup, reset).
// - `prompt`: interactive email/password collection with validation.
// - `settings`: load/merge/save of the global and project settings files.
// - `ui`: command flows and the interactive menu that tie the above together.
// - `error`: error types shared by the library modules.
pub mod api;
pub mod error;
pub mod prompt;
pub mod settings;
pub mod ui;

pub use api::{ApiClient, Credentials};
pub use error::{CredentialError, PromptError, SettingsError};
pub use settings::{LoadOutcome, Settings, SettingsPaths, SettingsStore};
