//! Google Calendar provider.
//!
//! Authorization uses the OAuth 2.0 installed-app flow with PKCE and a
//! loopback redirect. The user supplies their own OAuth client, downloaded
//! from Google Cloud Console as a JSON file:
//!
//! 1. `calend init client_secret.json` opens the consent page in a browser.
//! 2. Google redirects to `http://127.0.0.1:<port>/callback` with a code.
//! 3. The code is exchanged for access and refresh tokens, which are stored
//!    in the token file.
//! 4. Later runs reuse the stored tokens and refresh the access token when it
//!    expires.
//!
//! ```ignore
//! use calend_providers::google::{GoogleConfig, GoogleProvider, OAuthCredentials};
//!
//! let credentials = OAuthCredentials::from_file("client_secret.json")?;
//! let provider = GoogleProvider::new(GoogleConfig::new(credentials))?;
//! if !provider.is_authenticated() {
//!     provider.authenticate().await?;
//! }
//! ```

mod client;
mod config;
mod oauth;
mod provider;
mod tokens;

pub use client::GoogleCalendarClient;
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow};
pub use provider::GoogleProvider;
pub use tokens::{TokenInfo, TokenStorage};
