// Entrypoint for the CLI application.
// - Parses flags, sets up logging and the settings store, then hands off to
//   the flows in `ui`.
// - With no subcommand, falls back to the interactive menu.

use clap::{Args, Parser, Subcommand};
use dropstack_cli::api::ReqwestTransport;
use dropstack_cli::prompt::TerminalPrompter;
use dropstack_cli::ui::{self, CredentialInput};
use dropstack_cli::{Settings, SettingsPaths, SettingsStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dropstack", version, about = "Log in to Dropstack and manage deployment settings")]
struct Cli {
    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project settings file, relative to the current directory
    #[arg(long, global = true, value_name = "FILE")]
    project_file: Option<String>,

    /// Platform API URL
    #[arg(long, global = true, env = "DROPSTACK_BASE_URL")]
    url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the session token
    Login(CredentialArgs),
    /// Create an account
    Signup(CredentialArgs),
    /// Request a password reset for the logged-in account
    Reset {
        #[arg(long)]
        email: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Print the merged settings
    Show,
    /// Write deployment settings to the project file
    Link(ProjectArgs),
    /// Delete the project settings file
    Unlink,
}

#[derive(Args, Debug)]
struct CredentialArgs {
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    password: Option<String>,
}

impl From<CredentialArgs> for CredentialInput {
    fn from(args: CredentialArgs) -> Self {
        CredentialInput {
            email: args.email,
            password: args.password,
        }
    }
}

#[derive(Args, Debug)]
struct ProjectArgs {
    #[arg(long)]
    alias: Option<String>,
    #[arg(long)]
    domain: Option<String>,
    #[arg(long)]
    instances: Option<u32>,
    /// Environment variable as KEY=VALUE; repeatable
    #[arg(short = 'e', long = "variable", value_name = "KEY=VALUE")]
    variables: Vec<String>,
    #[arg(long)]
    https: bool,
    #[arg(long)]
    alive_endpoint: Option<String>,
    /// Deployment type (static, node, docker, ...)
    #[arg(long = "type")]
    kind: Option<String>,
    #[arg(long)]
    stateful: bool,
    /// Path to leave out of the upload; repeatable
    #[arg(long = "exclude", value_name = "PATH")]
    excludes: Vec<String>,
}

impl ProjectArgs {
    fn apply(self, overrides: &mut Settings) {
        if let Some(alias) = self.alias {
            overrides.insert("alias", alias);
        }
        if let Some(domain) = self.domain {
            overrides.insert("domain", domain);
        }
        if let Some(instances) = self.instances {
            overrides.insert("instances", instances);
        }
        if !self.variables.is_empty() {
            overrides.insert("variables", self.variables);
        }
        if self.https {
            overrides.insert("https", true);
        }
        if let Some(endpoint) = self.alive_endpoint {
            overrides.insert("aliveEndpoint", endpoint);
        }
        if let Some(kind) = self.kind {
            overrides.insert("type", kind);
        }
        if self.stateful {
            overrides.insert("stateful", true);
        }
        if !self.excludes.is_empty() {
            overrides.insert("excludes", self.excludes);
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "dropstack_cli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    // Ctrl+C ends the run with status 0. Prompts in raw mode swallow the
    // signal and report it as an interrupted read instead.
    let _ = ctrlc::set_handler(|| std::process::exit(0));

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Err(e) if ui::is_cancelled(&e) => {
            tracing::debug!("cancelled at a prompt");
            Ok(())
        }
        res => res,
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let store = SettingsStore::new(SettingsPaths::discover(cli.project_file.as_deref())?);
    let mut overrides = Settings::new();
    if let Some(url) = cli.url {
        overrides.insert("url", url);
    }
    let transport = ReqwestTransport::new()?;
    let prompter = TerminalPrompter;

    match cli.command {
        Some(Command::Login(args)) => {
            let settings = ui::login(&store, &overrides, &args.into(), transport, &prompter)?;
            println!("{}", ui::greeting(&settings));
        }
        Some(Command::Signup(args)) => {
            ui::signup(&store, &overrides, &args.into(), transport, &prompter)?;
            println!("Signed up. Check your inbox to verify the account.");
        }
        Some(Command::Reset { email }) => {
            let input = CredentialInput {
                email,
                password: None,
            };
            let message = ui::reset(&store, &overrides, &input, transport, &prompter)?;
            println!("{}", message.as_deref().unwrap_or("Password reset requested."));
        }
        Some(Command::Logout) => {
            ui::logout(&store)?;
            println!("Logged out.");
        }
        Some(Command::Show) => println!("{}", ui::show(&store, &overrides)?),
        Some(Command::Link(args)) => {
            args.apply(&mut overrides);
            let settings = ui::link(&store, &overrides)?;
            println!(
                "Linked {} to {}",
                store.paths().project.display(),
                settings.get_str("alias").unwrap_or("a new deployment")
            );
        }
        Some(Command::Unlink) => {
            ui::unlink(&store)?;
            println!("Removed {}", store.paths().project.display());
        }
        None => ui::main_menu(&store, &overrides, transport, &prompter)?,
    }
    Ok(())
}
