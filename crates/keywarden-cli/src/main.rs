//! Keywarden CLI - console harness for the session manager.
//!
//! Subcommands:
//!   login   - interactive password sign-in
//!   status  - session phase, claims, credential expiry, route decisions
//!   scopes  - list the authorized property scopes
//!   logout  - drop the session everywhere

use std::io::{self, Write};

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use keywarden_core::{
    authorize, AuthError, Config, FileStorage, GuardDecision, IdentityClient, KeyringStorage,
    RefreshCoordinator, ScopeCache, SessionPipeline, SessionStore, Transport,
};

// ============================================================================
// Constants
// ============================================================================

/// When set, session persistence goes to a cache file instead of the OS
/// keychain (useful on headless machines without a secret service).
const ENV_NO_KEYRING: &str = "KEYWARDEN_NO_KEYRING";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Set up logging with environment-based filter
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str);

    let result = match command {
        Some("login") => run(|mut cli| async move { cli.login().await }).await,
        Some("status") => run(|cli| async move { cli.status().await }).await,
        Some("scopes") => run(|cli| async move { cli.scopes().await }).await,
        Some("logout") => run(|cli| async move { cli.logout().await }).await,
        _ => {
            print_usage();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn print_usage() {
    eprintln!("Usage: keywarden <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  login    Sign in with username and password");
    eprintln!("  status   Show session state and route access");
    eprintln!("  scopes   List authorized property scopes");
    eprintln!("  logout   Sign out and clear the stored session");
}

async fn run<F, Fut>(f: F) -> Result<()>
where
    F: FnOnce(Cli) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    let config = Config::load()?;
    let cli = Cli::build(config)?;
    f(cli).await
}

// ============================================================================
// Command context
// ============================================================================

/// Everything a subcommand needs, wired once from config.
struct Cli {
    config: Config,
    pipeline: SessionPipeline,
    transport: Transport,
    scopes: ScopeCache,
}

impl Cli {
    fn build(config: Config) -> Result<Self> {
        // One connection pool shared by the identity and resource backends.
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let identity = IdentityClient::with_client(client.clone(), &config.identity_base_url);
        let store = SessionStore::new();
        let coordinator = RefreshCoordinator::new(identity.clone(), store.clone())
            .with_grace(config.refresh_grace_secs);
        let transport = Transport::new(
            client,
            &config.resource_base_url,
            store.clone(),
            coordinator.clone(),
            config.refresh_grace_secs,
        );

        let pipeline = SessionPipeline::new(identity, store, coordinator)
            .with_grace(config.refresh_grace_secs);
        let pipeline = if std::env::var(ENV_NO_KEYRING).is_ok() {
            pipeline.with_storage(FileStorage::new(config.cache_dir()?))
        } else {
            pipeline.with_storage(KeyringStorage::new())
        };

        Ok(Self {
            config,
            pipeline,
            transport,
            scopes: ScopeCache::new(),
        })
    }

    /// Restore the persisted session, printing a hint when there is none.
    async fn restore_or_hint(&self) -> bool {
        if self.pipeline.restore().await {
            true
        } else {
            println!("No session. Run `keywarden login` first.");
            false
        }
    }

    // ===== login =====

    async fn login(&mut self) -> Result<()> {
        println!("\n=== Keywarden Login ===\n");

        let username = self.prompt_username()?;
        let password = rpassword::prompt_password("Password: ")?;

        println!("\nAuthenticating...");

        match self.pipeline.sign_in(&username, &password).await {
            Ok(snapshot) => {
                self.config.last_username = Some(username);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }

                info!(username = %snapshot.claims.username, "Login successful");
                println!("Signed in as {}.", snapshot.claims.display_name());
                Ok(())
            }
            Err(e) => Err(login_failure(e)),
        }
    }

    fn prompt_username(&self) -> Result<String> {
        if let Some(ref last_user) = self.config.last_username {
            print!("Username [{}]: ", last_user);
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            let input = input.trim();

            if input.is_empty() {
                Ok(last_user.clone())
            } else {
                Ok(input.to_string())
            }
        } else {
            print!("Username: ");
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            Ok(input.trim().to_string())
        }
    }

    // ===== status =====

    async fn status(&self) -> Result<()> {
        if !self.restore_or_hint().await {
            return Ok(());
        }

        let Some(snapshot) = self.pipeline.session().await else {
            println!("No session. Run `keywarden login` first.");
            return Ok(());
        };

        println!("Phase:    {}", self.pipeline.phase().await);
        println!("User:     {}", snapshot.claims.username);
        if let Some(ref email) = snapshot.claims.email {
            println!("Email:    {}", email);
        }
        println!("Position: {}", snapshot.claims.position);

        match snapshot.failure {
            Some(failure) => {
                println!("Failure:  {}", failure.reason_code());
            }
            None => {
                if let Some(pair) = self.pipeline.store().credentials().await {
                    let minutes = (pair.access_expiry - Utc::now()).num_minutes().max(0);
                    println!("Access:   expires in {} minutes", minutes);
                }
            }
        }

        println!("\nRoute access:");
        for prefix in &self.config.protected_prefixes {
            let decision = authorize(
                prefix,
                Some(&snapshot),
                &self.config.protected_prefixes,
                &self.config.sign_in_path,
            );
            match decision {
                GuardDecision::Allow => println!("  {}  allow", prefix),
                GuardDecision::Redirect { target } => {
                    println!("  {}  redirect -> {}", prefix, target)
                }
            }
        }

        Ok(())
    }

    // ===== scopes =====

    async fn scopes(&self) -> Result<()> {
        if !self.restore_or_hint().await {
            return Ok(());
        }

        let cached = self.scopes.get_or_fetch(&self.transport).await?;

        if cached.scopes.is_empty() {
            println!("No property scopes authorized for this account.");
            return Ok(());
        }

        println!("Property scopes:");
        for scope in &cached.scopes {
            let marker = if cached.selected.as_deref() == Some(scope.property_id.as_str()) {
                "*"
            } else {
                " "
            };
            match scope.description {
                Some(ref description) => {
                    println!("  {} {}  {} ({})", marker, scope.property_id, scope.name, description)
                }
                None => println!("  {} {}  {}", marker, scope.property_id, scope.name),
            }
        }

        Ok(())
    }

    // ===== logout =====

    async fn logout(&self) -> Result<()> {
        self.pipeline.sign_out().await;
        self.scopes.invalidate().await;
        println!("Signed out.");
        Ok(())
    }
}

/// Map a sign-in failure to the message shown at the prompt. Credential and
/// connectivity failures get a plain explanation; anything else surfaces the
/// underlying error.
fn login_failure(e: AuthError) -> anyhow::Error {
    match e {
        AuthError::InvalidCredentials => anyhow::anyhow!("Invalid username or password"),
        AuthError::Network { .. } => {
            anyhow::anyhow!("Unable to connect to server. Check your internet connection.")
        }
        other => other.into(),
    }
}
