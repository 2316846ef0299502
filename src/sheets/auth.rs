use crate::config::GoogleConfig;
use crate::error::{AppError, Result};
use oauth2::{
    AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, PkceCodeChallenge, RedirectUrl, RefreshToken, Scope, StandardRevocableToken,
    TokenResponse, TokenUrl,
    basic::{
        BasicClient, BasicErrorResponse, BasicRevocationErrorResponse,
        BasicTokenIntrospectionResponse, BasicTokenResponse,
    },
};
use reqwest::redirect::Policy;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use tiny_http::{Response, Server};
use tracing::{debug, info, instrument, warn};
use url::Url;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const GOOGLE_SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];
const CALLBACK_PORT: u16 = 3000;

/// Refresh this long before the access token actually expires
const EXPIRY_BUFFER_SECS: i64 = 300;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub(super) struct StoredTokens {
    pub access_token: String,
    /// Google omits this from refresh responses, so it can be absent
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry time as seconds since Unix epoch
    pub expires_at: i64,
    /// Scopes the token was granted for
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl StoredTokens {
    /// Check if the access token is expired or about to expire
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at < (now + EXPIRY_BUFFER_SECS)
    }

    pub fn covers(&self, required: &[&str]) -> bool {
        required
            .iter()
            .all(|scope| self.scopes.iter().any(|granted| granted == scope))
    }
}

/// Storage for the persisted credential, narrow so tests can substitute an
/// in-memory implementation.
pub(super) trait CredentialStore {
    fn load(&self) -> Result<Option<StoredTokens>>;
    fn save(&self, tokens: &StoredTokens) -> Result<()>;
}

pub(super) struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub(super) fn new() -> Result<Self> {
        Ok(Self {
            path: token_cache_path()?,
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<StoredTokens>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .map_err(|e| AppError::Auth(format!("Failed to read tokens file: {}", e)))?;

        let tokens: StoredTokens = serde_json::from_str(&contents)
            .map_err(|e| AppError::Auth(format!("Failed to parse tokens: {}", e)))?;

        Ok(Some(tokens))
    }

    fn save(&self, tokens: &StoredTokens) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Auth(format!("Failed to create token cache directory: {}", e))
            })?;
        }

        let contents = serde_json::to_string_pretty(tokens)?;

        // Create file with read-only permissions from the start to avoid race condition
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600)
            .open(&self.path)
            .map_err(|e| AppError::Auth(format!("Failed to create tokens file: {}", e)))?;

        file.write_all(contents.as_bytes())
            .map_err(|e| AppError::Auth(format!("Failed to write tokens file: {}", e)))?;

        Ok(())
    }
}

/// What the credential lifecycle does next, given the cached state.
///
/// Kept as a pure function of the cached tokens and the current time so the
/// refresh-before-interactive ordering is unit-testable.
#[derive(Debug, PartialEq)]
enum NextStep {
    UseCached(StoredTokens),
    Refresh { refresh_token: String },
    Authenticate,
}

fn next_step(cached: Option<StoredTokens>, now: i64) -> NextStep {
    let Some(tokens) = cached else {
        return NextStep::Authenticate;
    };

    if !tokens.covers(GOOGLE_SCOPES) {
        return NextStep::Authenticate;
    }

    if !tokens.is_expired_at(now) {
        return NextStep::UseCached(tokens);
    }

    match tokens.refresh_token {
        Some(refresh_token) => NextStep::Refresh { refresh_token },
        None => NextStep::Authenticate,
    }
}

// Type alias for the client when Auth and Token URLs are set
type ConfiguredClient = Client<
    BasicErrorResponse,
    BasicTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,    // HasAuthUrl
    EndpointNotSet, // HasDeviceAuthUrl
    EndpointNotSet, // HasIntrospectionUrl
    EndpointNotSet, // HasRevocationUrl
    EndpointSet,    // HasTokenUrl
>;

pub(super) struct GoogleAuth<S = FileCredentialStore> {
    client: ConfiguredClient,
    http_client: reqwest::Client,
    store: S,
}

impl GoogleAuth<FileCredentialStore> {
    pub(super) fn new(config: &GoogleConfig) -> Result<Self> {
        Self::with_store(config, FileCredentialStore::new()?)
    }
}

impl<S: CredentialStore> GoogleAuth<S> {
    pub(super) fn with_store(config: &GoogleConfig, store: S) -> Result<Self> {
        let client_id = ClientId::new(config.client_id.clone());
        let client_secret = ClientSecret::new(config.client_secret.clone());

        let auth_url = AuthUrl::new(GOOGLE_AUTH_URL.to_string())
            .map_err(|e| AppError::Auth(format!("Invalid auth URL: {}", e)))?;
        let token_url = TokenUrl::new(GOOGLE_TOKEN_URL.to_string())
            .map_err(|e| AppError::Auth(format!("Invalid token URL: {}", e)))?;

        let redirect_url = format!("http://localhost:{}/callback", CALLBACK_PORT);
        let client = BasicClient::new(client_id)
            .set_client_secret(client_secret)
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(
                RedirectUrl::new(redirect_url)
                    .map_err(|e| AppError::Auth(format!("Invalid redirect URL: {}", e)))?,
            );

        let http_client = reqwest::ClientBuilder::new()
            .redirect(Policy::none())
            .build()
            .map_err(|e| AppError::Auth(format!("Failed to build reqwest client: {}", e)))?;

        Ok(Self {
            client,
            http_client,
            store,
        })
    }

    pub(super) fn http_client(&self) -> reqwest::Client {
        self.http_client.clone()
    }

    /// Get valid Google tokens, refreshing or re-authenticating as needed.
    ///
    /// Newly obtained tokens are persisted; a persistence failure is logged
    /// but does not fail the run, the in-memory tokens are still used.
    pub(super) async fn get_valid_tokens(&self) -> Result<StoredTokens> {
        let cached = match self.store.load() {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("Failed to load cached tokens, re-authenticating: {}", e);
                None
            }
        };

        let tokens = match next_step(cached, chrono::Utc::now().timestamp()) {
            NextStep::UseCached(tokens) => {
                debug!("Using cached Google tokens");
                return Ok(tokens);
            }
            NextStep::Refresh { refresh_token } => {
                debug!("Access token expired, refreshing...");
                match self.refresh_access_token(&refresh_token).await {
                    Ok(refreshed_tokens) => {
                        debug!("Token refresh successful");
                        refreshed_tokens
                    }
                    Err(e) => {
                        debug!("Token refresh failed ({}), re-authenticating...", e);
                        self.authenticate().await?
                    }
                }
            }
            NextStep::Authenticate => {
                debug!("No usable cached tokens, authenticating with Google...");
                self.authenticate().await?
            }
        };

        if let Err(e) = self.store.save(&tokens) {
            warn!("Failed to persist tokens, continuing with in-memory credential: {}", e);
        }

        Ok(tokens)
    }

    async fn authenticate(&self) -> Result<StoredTokens> {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let scopes = GOOGLE_SCOPES
            .iter()
            .map(|s| Scope::new(s.to_string()))
            .collect::<Vec<Scope>>();
        let auth_request = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(scopes)
            .set_pkce_challenge(pkce_challenge)
            // Google only issues a refresh token for offline access with
            // consent re-prompted
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent");

        // Start a local server to receive the callback
        let bind_addr = format!("127.0.0.1:{}", CALLBACK_PORT);
        let server = Server::http(&bind_addr)
            .map_err(|e| AppError::Auth(format!("Failed to bind to {}: {}", bind_addr, e)))?;

        let (auth_url, csrf_token) = auth_request.url();
        println!("Open this URL in your browser:\n{}", auth_url);
        println!();
        println!("Waiting for authorization...");

        let request = server
            .recv()
            .map_err(|e| AppError::Auth(format!("Failed to receive request: {}", e)))?;

        let callback_url = format!("http://localhost:{}{}", CALLBACK_PORT, request.url());
        let url = Url::parse(&callback_url)
            .map_err(|e| AppError::Auth(format!("Failed to parse callback URL: {}", e)))?;

        let code_pair = url
            .query_pairs()
            .find(|(key, _)| key == "code")
            .ok_or_else(|| AppError::Auth("No code in callback".to_string()))?;

        let code = AuthorizationCode::new(code_pair.1.into_owned());

        let state_pair = url
            .query_pairs()
            .find(|(key, _)| key == "state")
            .ok_or_else(|| AppError::Auth("No state in callback".to_string()))?;

        if state_pair.1.as_ref() != csrf_token.secret() {
            return Err(AppError::Auth("CSRF token mismatch".to_string()));
        }

        // Send success response
        let response =
            Response::from_string("Authentication successful! You can close this window.");
        request
            .respond(response)
            .map_err(|e| AppError::Auth(format!("Failed to send response: {}", e)))?;

        // Exchange the code for an access token
        let token_result = self
            .client
            .exchange_code(code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::Auth(format!("Failed to exchange code: {:?}", e)))?;

        Ok(tokens_from_response(token_result, None))
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<StoredTokens> {
        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::Auth(format!("Failed to refresh token: {:?}", e)))?;

        Ok(tokens_from_response(token_result, Some(refresh_token)))
    }
}

/// Build StoredTokens from a token endpoint response.
///
/// Refresh responses usually omit the refresh token, in which case
/// `previous_refresh_token` is carried forward. A response without a scope
/// list granted exactly what was requested.
fn tokens_from_response(
    token_result: BasicTokenResponse,
    previous_refresh_token: Option<&str>,
) -> StoredTokens {
    let access_token = token_result.access_token().secret().clone();

    let refresh_token = token_result
        .refresh_token()
        .map(|token| token.secret().clone())
        .or_else(|| previous_refresh_token.map(str::to_string));

    let scopes = token_result
        .scopes()
        .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
        .unwrap_or_else(|| GOOGLE_SCOPES.iter().map(|s| s.to_string()).collect());

    // Calculate expiry time
    let expires_in = token_result
        .expires_in()
        .map(|d| d.as_secs() as i64)
        .unwrap_or(3600); // Default to 1 hour if not provided
    let expires_at = chrono::Utc::now().timestamp() + expires_in;

    StoredTokens {
        access_token,
        refresh_token,
        expires_at,
        scopes,
    }
}

/// Clear cached Google tokens by deleting the token cache file
#[instrument(name = "Clearing auth tokens for Google Sheets", skip_all)]
pub fn clear_tokens() -> Result<()> {
    let token_path = token_cache_path()?;

    if !token_path.exists() {
        debug!("No Google tokens to clear");
        return Ok(());
    }

    fs::remove_file(&token_path)
        .map_err(|e| AppError::Auth(format!("Failed to delete tokens file: {}", e)))?;
    info!("Cleared Google cached tokens");

    Ok(())
}

fn token_cache_path() -> Result<PathBuf> {
    crate::config::Config::cache_file("google_tokens.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const NOW: i64 = 1_700_000_000;

    fn valid_tokens() -> StoredTokens {
        StoredTokens {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: NOW + 3600,
            scopes: GOOGLE_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_absent_tokens_authenticate() {
        assert_eq!(next_step(None, NOW), NextStep::Authenticate);
    }

    #[test]
    fn test_valid_tokens_used_as_is() {
        let tokens = valid_tokens();
        assert_eq!(
            next_step(Some(tokens.clone()), NOW),
            NextStep::UseCached(tokens)
        );
    }

    #[test]
    fn test_expired_with_refresh_token_refreshes() {
        let tokens = StoredTokens {
            expires_at: NOW - 1,
            ..valid_tokens()
        };
        assert_eq!(
            next_step(Some(tokens), NOW),
            NextStep::Refresh {
                refresh_token: "refresh".to_string()
            }
        );
    }

    #[test]
    fn test_expired_without_refresh_token_authenticates() {
        let tokens = StoredTokens {
            refresh_token: None,
            expires_at: NOW - 1,
            ..valid_tokens()
        };
        assert_eq!(next_step(Some(tokens), NOW), NextStep::Authenticate);
    }

    #[test]
    fn test_missing_scope_authenticates() {
        let tokens = StoredTokens {
            scopes: vec!["https://www.googleapis.com/auth/drive.file".to_string()],
            ..valid_tokens()
        };
        assert_eq!(next_step(Some(tokens), NOW), NextStep::Authenticate);
    }

    #[test]
    fn test_expiry_buffer() {
        let tokens = StoredTokens {
            expires_at: NOW + EXPIRY_BUFFER_SECS - 1,
            ..valid_tokens()
        };
        assert!(tokens.is_expired_at(NOW));

        let tokens = StoredTokens {
            expires_at: NOW + EXPIRY_BUFFER_SECS + 1,
            ..valid_tokens()
        };
        assert!(!tokens.is_expired_at(NOW));
    }

    struct MemoryCredentialStore {
        tokens: Mutex<Option<StoredTokens>>,
    }

    impl CredentialStore for MemoryCredentialStore {
        fn load(&self) -> Result<Option<StoredTokens>> {
            Ok(self.tokens.lock().unwrap().clone())
        }

        fn save(&self, tokens: &StoredTokens) -> Result<()> {
            *self.tokens.lock().unwrap() = Some(tokens.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_valid_cached_tokens_skip_network() {
        let cached = StoredTokens {
            expires_at: chrono::Utc::now().timestamp() + 3600,
            ..valid_tokens()
        };
        let store = MemoryCredentialStore {
            tokens: Mutex::new(Some(cached.clone())),
        };

        let config = GoogleConfig {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
        };

        // No token endpoint exists for this config; reaching the network
        // would fail, so success proves the cached tokens were used as-is.
        let auth = GoogleAuth::with_store(&config, store).unwrap();
        let tokens = auth.get_valid_tokens().await.unwrap();
        assert_eq!(tokens, cached);
    }
}
