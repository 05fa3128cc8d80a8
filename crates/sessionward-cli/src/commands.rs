//! Subcommand implementations on top of `SessionManager`.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use sessionward_core::auth::credentials::DEFAULT_SERVICE_NAME;
use sessionward_core::{
    Config, Credentials, FileStorage, HttpTransport, KeyringStorage, LogNavigator, SessionManager,
    SlotStorage, SnapshotCache, TokenBackend, TokenStore, UserIdentity,
};
use tracing::{debug, warn};

/// Page a signed-in user is sent to instead of the login prompt
const HOME_PATH: &str = "/";

/// Subdirectory of the cache dir holding token slots when the file backend is used
const TOKEN_DIR: &str = "tokens";

pub struct Client {
    config: Config,
    manager: SessionManager,
}

impl Client {
    pub fn new(config: Config) -> Result<Self> {
        let cache_dir = config.cache_dir()?;
        let token_storage: Arc<dyn SlotStorage> = match config.token_backend {
            TokenBackend::File => Arc::new(FileStorage::new(cache_dir.join(TOKEN_DIR))),
            TokenBackend::Keyring => Arc::new(KeyringStorage::new(DEFAULT_SERVICE_NAME)),
        };
        debug!(
            backend = ?config.token_backend,
            cache_dir = %cache_dir.display(),
            "Token storage ready"
        );

        let transport = HttpTransport::from_config(&config).context("Failed to create HTTP client")?;
        let manager = SessionManager::new(
            Arc::new(transport),
            TokenStore::new(token_storage),
            SnapshotCache::new(Arc::new(FileStorage::new(cache_dir))),
            Arc::new(LogNavigator),
        )
        .with_logout_redirect(config.logout_redirect.clone());

        Ok(Self { config, manager })
    }

    pub async fn login(&mut self, email: Option<String>, force: bool) -> Result<()> {
        self.manager.initialize().await;
        if !force {
            if let Some(user) = self.manager.session().user {
                self.manager.redirect_if_logged_in(HOME_PATH);
                println!("Already logged in as {}", describe_user(&user));
                return Ok(());
            }
        }

        let email = match email {
            Some(email) => email,
            None => prompt_email(self.config.last_email.as_deref())?,
        };
        let password = rpassword::prompt_password("Password: ")?;

        match self.manager.login(&Credentials::new(email, password)).await {
            Ok(user) => {
                self.config.last_email = Some(user.email.clone());
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                println!("Logged in as {}", describe_user(&user));
                Ok(())
            }
            Err(e) => {
                let message = self.manager.session().error.unwrap_or_else(|| e.user_message());
                self.manager.clear_error();
                anyhow::bail!(message)
            }
        }
    }

    pub async fn logout(&self) -> Result<()> {
        self.manager.logout().await;
        println!("Logged out");
        Ok(())
    }

    pub async fn status(&self, json: bool) -> Result<()> {
        let mut watcher = self.manager.subscribe();
        self.manager.initialize().await;
        let session = watcher
            .settled()
            .await
            .unwrap_or_else(|| self.manager.session());

        if json {
            println!("{}", serde_json::to_string_pretty(&session)?);
            return Ok(());
        }

        match session.user.filter(|_| session.is_logged_in) {
            Some(user) => {
                println!("Logged in as {}", describe_user(&user));
                println!("Server:  {}", self.config.api_base_url);
                println!("Expires: {}", format_expiry(user.exp));
            }
            None => println!("Not logged in"),
        }
        Ok(())
    }

    pub async fn whoami(&self) -> Result<()> {
        self.manager.initialize().await;
        match self.manager.session().user {
            Some(user) => {
                println!("{}", user.email);
                Ok(())
            }
            None => anyhow::bail!("Not logged in"),
        }
    }
}

fn prompt_email(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut email = String::new();
    io::stdin().read_line(&mut email)?;
    Ok(choose_email(email.trim(), last))
}

/// Empty input accepts the remembered address.
fn choose_email(input: &str, last: Option<&str>) -> String {
    match (input.is_empty(), last) {
        (true, Some(last)) => last.to_string(),
        _ => input.to_string(),
    }
}

fn describe_user(user: &UserIdentity) -> String {
    let admin = if user.is_admin() { ", admin" } else { "" };
    format!("{} <{}>{}", user.name, user.email, admin)
}

fn format_expiry(exp: Option<i64>) -> String {
    match exp.and_then(|exp| DateTime::from_timestamp(exp, 0)) {
        Some(at) => at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        None => "never".to_string(),
    }
}

// ===== Tests =====
