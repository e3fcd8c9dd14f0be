// =============================================================================
// GOOGLE OAUTH 2.0 - INSTALLED APP FLOW
// =============================================================================
//
// Implements the `AuthorizationFlow` port against Google's OAuth endpoints.
//
// **Client secret:**
// Download the OAuth client for a "Desktop app" from the Google Cloud Console
// (APIs & Services > Credentials) and save it as `credentials.json`. Both the
// `installed` and `web` JSON shapes are accepted.
//
// **Interactive authorization (loopback redirect):**
// 1. Bind an ephemeral port on 127.0.0.1
// 2. Print the consent URL with `redirect_uri=http://localhost:<port>/` and a
//    PKCE (S256) challenge
// 3. Wait for the browser to hit the loopback port with `?code=...&state=...`
// 4. Exchange the code and the PKCE verifier at the token endpoint
//
// `access_type=offline` and `prompt=consent` make Google hand out a refresh
// token, so later runs only need a refresh.

use crate::core::auth::{AccessToken, AuthError, AuthorizationFlow, DEFAULT_TOKEN_URI};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use oauth2::basic::{BasicClient, BasicErrorResponse, BasicTokenResponse};
use oauth2::reqwest::async_http_client;
use oauth2::url::Url;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenResponse,
    TokenUrl,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

const SUCCESS_PAGE: &str = "<html><body><h3>Authorization complete.</h3>\
<p>You may close this window and return to the terminal.</p></body></html>";

const FAILURE_PAGE: &str = "<html><body><h3>Authorization failed.</h3>\
<p>Return to the terminal for details.</p></body></html>";

// =============================================================================
// CLIENT SECRET
// =============================================================================

/// The OAuth client registered in the Google Cloud Console.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let file: ClientSecretFile = serde_json::from_str(json)
            .map_err(|e| AuthError::Configuration(format!("invalid client secret: {}", e)))?;

        file.installed.or(file.web).ok_or_else(|| {
            AuthError::Configuration(
                "client secret has neither an 'installed' nor a 'web' section".to_string(),
            )
        })
    }

    pub async fn from_file(path: &Path) -> Result<Self, AuthError> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AuthError::Configuration(format!(
                    "'{}' not found. Create an OAuth client for a Desktop app in the \
                     Google Cloud Console, download its JSON and save it under that name.",
                    path.display()
                ))
            } else {
                AuthError::Configuration(format!("{}: {}", path.display(), e))
            }
        })?;
        Self::from_json(&json)
    }
}

// =============================================================================
// TOKEN ENDPOINT
// =============================================================================

type TokenError = RequestTokenError<oauth2::reqwest::Error<reqwest::Error>, BasicErrorResponse>;

fn token_error(e: TokenError) -> AuthError {
    let detail = match &e {
        RequestTokenError::ServerResponse(response) => response.to_string(),
        other => other.to_string(),
    };
    AuthError::Authorization(format!("Token request failed: {}", detail))
}

/// Absolute expiry for an `expires_in` lifetime. Lifetimes too large for a
/// timestamp are treated as no expiry.
fn expiry_after(expires_in: Option<std::time::Duration>) -> Option<DateTime<Utc>> {
    let lifetime = Duration::from_std(expires_in?).ok()?;
    Utc::now().checked_add_signed(lifetime)
}

/// Maps a token endpoint response onto the persisted token shape.
fn to_access_token(
    response: &BasicTokenResponse,
    previous_refresh: Option<String>,
    secret: &ClientSecret,
    requested_scopes: &[String],
) -> AccessToken {
    let scopes = match response.scopes() {
        Some(scopes) => scopes.iter().map(|s| s.as_str().to_string()).collect(),
        None => requested_scopes.to_vec(),
    };

    AccessToken {
        token: response.access_token().secret().clone(),
        refresh_token: response
            .refresh_token()
            .map(|t| t.secret().clone())
            .or(previous_refresh),
        token_uri: Some(secret.token_uri.clone()),
        client_id: Some(secret.client_id.clone()),
        client_secret: Some(secret.client_secret.clone()),
        scopes,
        expiry: expiry_after(response.expires_in()),
    }
}

/// OAuth client for the given registration. Google expects the client
/// credentials in the request body rather than a Basic auth header.
fn oauth_client(secret: &ClientSecret) -> Result<BasicClient, AuthError> {
    let auth_url = AuthUrl::new(secret.auth_uri.clone())
        .map_err(|e| AuthError::Configuration(format!("invalid auth_uri: {}", e)))?;
    let token_url = TokenUrl::new(secret.token_uri.clone())
        .map_err(|e| AuthError::Configuration(format!("invalid token_uri: {}", e)))?;

    Ok(BasicClient::new(
        ClientId::new(secret.client_id.clone()),
        Some(oauth2::ClientSecret::new(secret.client_secret.clone())),
        auth_url,
        Some(token_url),
    )
    .set_auth_type(AuthType::RequestBody))
}

// =============================================================================
// FLOW
// =============================================================================

pub struct GoogleOAuthFlow {
    client_secret_path: PathBuf,
}

impl GoogleOAuthFlow {
    pub fn new(client_secret_path: impl Into<PathBuf>) -> Self {
        Self {
            client_secret_path: client_secret_path.into(),
        }
    }
}

#[async_trait]
impl AuthorizationFlow for GoogleOAuthFlow {
    async fn refresh(&self, token: &AccessToken) -> Result<AccessToken, AuthError> {
        let refresh_token = token
            .refresh_token
            .clone()
            .ok_or_else(|| AuthError::Authorization("token has no refresh token".to_string()))?;

        let secret = match (&token.client_id, &token.client_secret) {
            (Some(id), Some(client_secret)) => ClientSecret {
                client_id: id.clone(),
                client_secret: client_secret.clone(),
                auth_uri: DEFAULT_AUTH_URI.to_string(),
                token_uri: token.token_uri().to_string(),
            },
            _ => ClientSecret::from_file(&self.client_secret_path).await?,
        };

        let response = oauth_client(&secret)?
            .exchange_refresh_token(&RefreshToken::new(refresh_token.clone()))
            .request_async(async_http_client)
            .await
            .map_err(token_error)?;

        tracing::info!("Refreshed Google access token");
        Ok(to_access_token(
            &response,
            Some(refresh_token),
            &secret,
            &token.scopes,
        ))
    }

    async fn authorize(&self, scopes: &[String]) -> Result<AccessToken, AuthError> {
        let secret = ClientSecret::from_file(&self.client_secret_path).await?;

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| AuthError::Authorization(format!("cannot bind loopback port: {}", e)))?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::Authorization(e.to_string()))?
            .port();
        let redirect_uri = format!("http://localhost:{}/", port);

        let client = oauth_client(&secret)?.set_redirect_uri(
            RedirectUrl::new(redirect_uri)
                .map_err(|e| AuthError::Configuration(format!("invalid redirect uri: {}", e)))?,
        );
        let state = CsrfToken::new_random();
        let (url, pkce_verifier) = consent_url(&client, scopes, &state);

        println!("\nPlease visit this URL to authorize this application:\n{}\n", url);
        tracing::info!(port, "Waiting for the OAuth redirect");

        let code = wait_for_redirect(&listener, state.secret()).await?;

        let response = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(async_http_client)
            .await
            .map_err(token_error)?;

        tracing::info!("Google authorization complete");
        Ok(to_access_token(&response, None, &secret, scopes))
    }
}

/// Consent URL asking for offline access, plus the PKCE verifier that must
/// accompany the code exchange.
fn consent_url(client: &BasicClient, scopes: &[String], state: &CsrfToken) -> (Url, PkceCodeVerifier) {
    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let mut request = client
        .authorize_url(|| state.clone())
        .set_pkce_challenge(pkce_challenge)
        .add_extra_param("access_type", "offline")
        .add_extra_param("prompt", "consent");
    for scope in scopes {
        request = request.add_scope(Scope::new(scope.clone()));
    }

    let (url, _) = request.url();
    (url, pkce_verifier)
}

// =============================================================================
// LOOPBACK REDIRECT
// =============================================================================

#[derive(Debug, PartialEq, Eq)]
enum Redirect {
    Code { code: String, state: Option<String> },
    Denied(String),
    /// Favicon requests and anything else without an OAuth payload.
    Unrelated,
}

/// Parses the request line of an incoming redirect, e.g. `GET /?code=..&state=.. HTTP/1.1`.
fn parse_redirect(request_line: &str) -> Redirect {
    let Some(target) = request_line.split_whitespace().nth(1) else {
        return Redirect::Unrelated;
    };
    let Ok(url) = Url::parse(&format!("http://localhost{}", target)) else {
        return Redirect::Unrelated;
    };

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    match (code, error) {
        (_, Some(error)) => Redirect::Denied(error),
        (Some(code), None) => Redirect::Code { code, state },
        (None, None) => Redirect::Unrelated,
    }
}

/// Accepts loopback connections until one carries an authorization code or an error.
async fn wait_for_redirect(listener: &TcpListener, expected_state: &str) -> Result<String, AuthError> {
    loop {
        let (mut stream, _) = listener
            .accept()
            .await
            .map_err(|e| AuthError::Authorization(e.to_string()))?;

        let (reader, mut writer) = stream.split();
        let mut reader = BufReader::new(reader);

        let mut request_line = String::new();
        reader
            .read_line(&mut request_line)
            .await
            .map_err(|e| AuthError::Authorization(e.to_string()))?;

        // Drain headers so the browser sees a clean response.
        let mut header = String::new();
        while reader.read_line(&mut header).await.unwrap_or(0) > 2 {
            header.clear();
        }

        let (status, page, outcome) = match parse_redirect(&request_line) {
            Redirect::Unrelated => ("404 Not Found", "", None),
            Redirect::Denied(error) => (
                "200 OK",
                FAILURE_PAGE,
                Some(Err(AuthError::Authorization(format!(
                    "authorization was denied: {}",
                    error
                )))),
            ),
            Redirect::Code { code, state } => {
                if state.as_deref() == Some(expected_state) {
                    ("200 OK", SUCCESS_PAGE, Some(Ok(code)))
                } else {
                    (
                        "200 OK",
                        FAILURE_PAGE,
                        Some(Err(AuthError::Authorization(
                            "state mismatch in OAuth redirect".to_string(),
                        ))),
                    )
                }
            }
        };

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            page.len(),
            page
        );
        if let Err(e) = writer.write_all(response.as_bytes()).await {
            tracing::warn!("Failed to answer OAuth redirect: {}", e);
        }
        let _ = writer.shutdown().await;

        if let Some(outcome) = outcome {
            return outcome;
        }
    }
}
