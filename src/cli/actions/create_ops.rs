use crate::{
    credentials::{hash_password, MIN_PASSWORD_LEN},
    model::Role,
    store::{NewUser, PgStore, StoreError, UserDirectory},
};
use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub dsn: String,
    pub username: String,
    pub email: String,
    pub password: SecretString,
}

/// Build the ops account record. Ops users skip email verification.
///
/// # Errors
/// Returns an error if a field is empty or the password is too short.
pub fn new_ops_user(args: &Args) -> Result<NewUser> {
    let username = args.username.trim();
    let email = args.email.trim().to_lowercase();
    if username.is_empty() {
        return Err(anyhow!("username must not be empty"));
    }
    if !email.contains('@') {
        return Err(anyhow!("email must be a valid address"));
    }
    let password = args.password.expose_secret();
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(anyhow!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }

    Ok(NewUser {
        username: username.to_string(),
        email,
        password_hash: hash_password(password)?,
        role: Role::Ops,
        email_verified: true,
    })
}

/// Execute the create-ops-user action.
/// # Errors
/// Returns an error if the database is unreachable or the user already exists.
pub async fn execute(args: Args) -> Result<()> {
    let new_user = new_ops_user(&args)?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&args.dsn)
        .await
        .context("Failed to connect to database")?;
    let store = PgStore::new(pool);
    store
        .migrate()
        .await
        .context("Failed to apply database schema")?;

    match store.create_user(new_user).await {
        Ok(user) => {
            info!("Created ops user {} (id {})", user.username, user.id);
            println!("Created ops user {}", user.username);
            Ok(())
        }
        Err(StoreError::Conflict(field)) => Err(anyhow!("That {field} is already taken.")),
        Err(err) => Err(err.into()),
    }
}
