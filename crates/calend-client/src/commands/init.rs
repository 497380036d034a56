//! `init`: authorize calend against Google Calendar.

use std::path::Path;

use calend_providers::CalendarProvider;
use calend_providers::google::{GoogleConfig, GoogleProvider, OAuthCredentials};
use tracing::info;

use crate::config::{ClientConfig, save_google_credentials};
use crate::error::{ClientError, ClientResult};

/// Runs the OAuth consent flow with the client in `credentials_file` and
/// records the client id and secret in the configuration file at
/// `config_path`.
///
/// Stored tokens that already cover the required scope are reused unless
/// `force` is set.
pub async fn run(
    credentials_file: &Path,
    force: bool,
    config: &ClientConfig,
    config_path: &Path,
) -> ClientResult<()> {
    let credentials = OAuthCredentials::from_file(credentials_file)?;
    credentials
        .validate()
        .map_err(|e| ClientError::Config(format!("invalid Google credentials: {}", e)))?;

    let provider = GoogleProvider::new(provider_config(credentials.clone(), config))?;

    if provider.is_authenticated() && !provider.needs_reauth() && !force {
        save_google_credentials(
            config_path,
            &credentials.client_id,
            &credentials.client_secret,
        )?;
        println!("Already authenticated with Google Calendar.");
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    println!("Starting Google Calendar authentication...");
    println!();
    println!("A browser window will open for you to authorize access.");
    println!("If the browser doesn't open, check the terminal for a URL to copy.");
    println!();

    provider.authenticate().await?;

    save_google_credentials(
        config_path,
        &credentials.client_id,
        &credentials.client_secret,
    )?;

    info!("Google authentication successful");
    println!();
    println!("Authentication successful!");
    println!("Configuration saved to {}.", config_path.display());

    Ok(())
}

fn provider_config(credentials: OAuthCredentials, config: &ClientConfig) -> GoogleConfig {
    GoogleConfig::new(credentials).with_token_path(config.token_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GoogleSettings;
    use calend_providers::google::{TokenInfo, TokenStorage};

    const CREDENTIALS: &str = r#"{
        "installed": {
            "client_id": "calend-test.apps.googleusercontent.com",
            "client_secret": "test-secret",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    fn config_with_tokens(dir: &Path) -> ClientConfig {
        ClientConfig {
            google: Some(GoogleSettings {
                token_path: Some(dir.join("tokens.json")),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn reuses_stored_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let credentials_file = dir.path().join("client_secret.json");
        std::fs::write(&credentials_file, CREDENTIALS).unwrap();

        let config = config_with_tokens(dir.path());
        TokenStorage::new(config.token_path())
            .set(TokenInfo::new(
                "access",
                Some("refresh".to_string()),
                Some(3600),
                vec![GoogleConfig::DEFAULT_SCOPE.to_string()],
            ))
            .unwrap();

        let config_path = dir.path().join("calend").join("config.toml");
        run(&credentials_file, false, &config, &config_path)
            .await
            .unwrap();

        let saved = ClientConfig::load(Some(&config_path)).unwrap();
        let google = saved.google.unwrap();
        assert_eq!(
            google.client_id.as_deref(),
            Some("calend-test.apps.googleusercontent.com")
        );
        assert_eq!(google.client_secret.as_deref(), Some("test-secret"));
    }

    #[tokio::test]
    async fn missing_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let err = run(
            &dir.path().join("missing.json"),
            false,
            &ClientConfig::default(),
            &config_path,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ClientError::Provider(_)));
        assert!(err.to_string().contains("missing.json"));
        assert!(!config_path.exists());
    }

    #[tokio::test]
    async fn rejects_non_google_client() {
        let dir = tempfile::tempdir().unwrap();
        let credentials_file = dir.path().join("client_secret.json");
        std::fs::write(
            &credentials_file,
            r#"{"client_id": "someone-else", "client_secret": "s"}"#,
        )
        .unwrap();

        let err = run(
            &credentials_file,
            false,
            &ClientConfig::default(),
            &dir.path().join("config.toml"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn token_path_comes_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_tokens(dir.path());
        let creds = OAuthCredentials::new("calend-test.apps.googleusercontent.com", "s");
        assert_eq!(
            provider_config(creds, &config).token_path,
            dir.path().join("tokens.json")
        );
    }
}
