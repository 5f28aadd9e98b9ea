use crate::api;
use crate::api::handlers::auth::AuthConfig;
use crate::cli::actions::Action;
use anyhow::Result;

/// Handle the server action
/// # Errors
/// Returns an error if the server fails to start.
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            session_ttl_seconds,
            secure_cookies,
        } => {
            let config = AuthConfig::new()
                .with_session_ttl_seconds(session_ttl_seconds)
                .with_secure_cookies(secure_cookies);

            api::new(port, dsn, config).await?;
        }
    }

    Ok(())
}
