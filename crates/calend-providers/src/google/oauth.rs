//! OAuth 2.0 authorization code flow with PKCE for Google APIs.
//!
//! The browser is sent to Google's consent page; Google redirects back to a
//! short-lived HTTP listener on 127.0.0.1, which hands over the authorization
//! code. The code is then exchanged, together with the PKCE verifier, for an
//! access token and a refresh token.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::OAuthCredentials;
use super::tokens::TokenInfo;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Verifier entropy in bytes, before encoding.
const CODE_VERIFIER_LENGTH: usize = 32;

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// OAuth client for Google APIs.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ProviderError::internal("failed to create HTTP client").with_source(e)
            })?;

        Ok(Self {
            credentials,
            http_client,
        })
    }

    /// Runs the interactive authorization and returns the granted tokens.
    ///
    /// # Errors
    ///
    /// Fails if no loopback port is free, the user denies access, the
    /// callback does not arrive within five minutes, or the code exchange is
    /// rejected.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = Self::bind_loopback_server(port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);
        let auth_url = pkce.build_auth_url(&self.credentials.client_id, &redirect_uri, scopes);

        info!("starting OAuth flow, opening browser");
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
        }

        let callback = Self::wait_for_callback(listener)?;
        if callback.state != pkce.state {
            return Err(ProviderError::authentication(
                "OAuth state mismatch, refusing the callback",
            ));
        }

        info!("received authorization code, exchanging for tokens");
        self.exchange_code(&callback.code, &pkce.verifier, &redirect_uri, scopes)
            .await
    }

    /// Obtains a new access token from a refresh token.
    ///
    /// Returns the access token and its lifetime in seconds.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> ProviderResult<(String, Option<i64>)> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.post_token_endpoint(&params, "token refresh").await?;
        info!("refreshed access token");
        Ok((response.access_token, response.expires_in))
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<TokenInfo> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self.post_token_endpoint(&params, "token exchange").await?;
        info!("obtained tokens");
        Ok(TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            scopes.to_vec(),
        ))
    }

    async fn post_token_endpoint(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "{} failed ({}): {}",
                what, status, body
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("invalid token response: {}", e)))
    }

    fn bind_loopback_server(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
        for port in port_range.0..=port_range.1 {
            if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
                debug!("bound loopback server on port {}", port);
                return Ok((listener, port));
            }
        }
        Err(ProviderError::configuration(format!(
            "no available port in range {}-{}",
            port_range.0, port_range.1
        )))
    }

    fn wait_for_callback(listener: TcpListener) -> ProviderResult<Callback> {
        let (tx, rx) = mpsc::channel();

        // The listener blocks; a helper thread lets us give up after a timeout.
        thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        if let Some(result) = Self::handle_callback(stream) {
                            let _ = tx.send(result);
                            return;
                        }
                    }
                    Err(e) => error!("failed to accept connection: {}", e),
                }
            }
        });

        match rx.recv_timeout(CALLBACK_TIMEOUT) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Err(ProviderError::authentication("OAuth callback timeout"))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(ProviderError::internal("callback channel disconnected"))
            }
        }
    }

    /// Answers one request on the loopback server. Returns `None` for
    /// requests that are not the OAuth redirect (favicon and the like).
    fn handle_callback(mut stream: TcpStream) -> Option<ProviderResult<Callback>> {
        let mut request_line = String::new();
        BufReader::new(&stream).read_line(&mut request_line).ok()?;

        let target = parse_request_target(&request_line)?;
        let result = Callback::from_target(target);

        let response = if result.is_ok() {
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
            <html><body><h1>calend is authorised</h1>\
            <p>You can close this window and return to the terminal.</p></body></html>"
        } else {
            "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\n\r\n\
            <html><body><h1>Authorisation failed</h1>\
            <p>You can close this window.</p></body></html>"
        };
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();

        Some(result)
    }
}

/// Extracts the target of a `GET /callback...` request line.
fn parse_request_target(request_line: &str) -> Option<&str> {
    let mut parts = request_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    parts.next().filter(|target| target.starts_with("/callback"))
}

/// Parameters of a successful OAuth redirect.
#[derive(Debug, PartialEq, Eq)]
struct Callback {
    code: String,
    state: String,
}

impl Callback {
    fn from_target(target: &str) -> ProviderResult<Self> {
        let query = target.split_once('?').map_or("", |(_, q)| q);

        let mut code = None;
        let mut state = None;
        let mut error = None;
        for (key, value) in query.split('&').filter_map(|p| p.split_once('=')) {
            let value = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_default();
            match key {
                "code" => code = Some(value),
                "state" => state = Some(value),
                "error" => error = Some(value),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Err(ProviderError::authentication(format!(
                "authorization denied: {}",
                error
            )));
        }

        let code = code.ok_or_else(|| {
            ProviderError::authentication("missing authorization code in callback")
        })?;
        Ok(Self {
            code,
            state: state.unwrap_or_default(),
        })
    }
}

/// PKCE verifier, challenge and CSRF state for one authorization (RFC 7636).
#[derive(Debug)]
pub struct PkceFlow {
    /// High-entropy random verifier.
    pub verifier: String,
    /// Base64url SHA-256 of the verifier.
    pub challenge: String,
    /// Random state echoed back by the redirect.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new flow with a random verifier and state.
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    fn compute_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Builds the Google consent page URL.
    pub fn build_auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        let scope = scopes.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            GOOGLE_AUTH_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod pkce {
        use super::*;

        #[test]
        fn verifier_length() {
            // 32 bytes base64url without padding
            assert_eq!(PkceFlow::new().verifier.len(), 43);
        }

        #[test]
        fn challenge_matches_rfc7636_example() {
            assert_eq!(
                PkceFlow::compute_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
                "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
            );
        }

        #[test]
        fn flows_are_random() {
            let a = PkceFlow::new();
            let b = PkceFlow::new();
            assert_ne!(a.verifier, b.verifier);
            assert_ne!(a.state, b.state);
        }

        #[test]
        fn auth_url_format() {
            let flow = PkceFlow::new();
            let url = flow.build_auth_url(
                "calend.apps.googleusercontent.com",
                "http://127.0.0.1:8080/callback",
                &["https://www.googleapis.com/auth/calendar".to_string()],
            );

            assert!(url.starts_with(GOOGLE_AUTH_URL));
            assert!(url.contains("client_id=calend.apps.googleusercontent.com"));
            assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fcallback"));
            assert!(url.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fcalendar&"));
            assert!(url.contains("code_challenge_method=S256"));
            assert!(url.contains("access_type=offline"));
        }
    }

    mod callback {
        use super::*;

        #[test]
        fn request_target() {
            assert_eq!(
                parse_request_target("GET /callback?code=abc HTTP/1.1\r\n"),
                Some("/callback?code=abc")
            );
            assert_eq!(parse_request_target("GET /favicon.ico HTTP/1.1\r\n"), None);
            assert_eq!(parse_request_target("POST /callback HTTP/1.1\r\n"), None);
            assert_eq!(parse_request_target(""), None);
        }

        #[test]
        fn code_and_state() {
            let callback = Callback::from_target("/callback?state=xyz&code=4%2F0Ab&scope=s").unwrap();
            assert_eq!(
                callback,
                Callback {
                    code: "4/0Ab".to_string(),
                    state: "xyz".to_string()
                }
            );
        }

        #[test]
        fn denied() {
            let err = Callback::from_target("/callback?error=access_denied&state=xyz").unwrap_err();
            assert!(err.is_auth_required());
            assert!(err.message().contains("access_denied"));
        }

        #[test]
        fn missing_code() {
            assert!(Callback::from_target("/callback").is_err());
        }
    }

    #[test]
    fn token_response_without_refresh_token() {
        let json = r#"{"access_token": "ya29.a0", "expires_in": 3599, "token_type": "Bearer"}"#;
        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "ya29.a0");
        assert_eq!(response.expires_in, Some(3599));
        assert!(response.refresh_token.is_none());
    }
}
