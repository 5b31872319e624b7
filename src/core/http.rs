use std::{
    sync::Arc,
    time::Duration,
};

use reqwest::{
    header::USER_AGENT,
    Client,
    Method,
    Response,
    StatusCode,
};
use serde::{
    de::DeserializeOwned,
    Deserialize,
    Serialize,
};
use tokio::{
    sync::Mutex,
    time::sleep,
};
use tracing::{
    debug,
    info,
    warn,
};

use crate::core::{
    PracticeError,
    Settings,
};

const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, backoff: Duration::from_secs(1) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Called after a successful refresh so new tokens can be persisted.
pub type TokenListener = Arc<dyn Fn(&Credentials) + Send + Sync>;

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Bearer-authenticated JSON transport.
///
/// A 401 triggers exactly one refresh-and-retry cycle. Connection failures, timeouts
/// and 5xx responses are retried with a fixed backoff; any other 4xx fails immediately.
pub struct Transport {
    client: Client,
    base_url: String,
    credentials: Mutex<Credentials>,
    policy: RetryPolicy,
    token_listener: Option<TokenListener>,
}

impl Transport {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, PracticeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PracticeError::Custom(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: Mutex::new(credentials),
            policy,
            token_listener: None,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, PracticeError> {
        Self::new(
            settings.api_base_url.clone(),
            Credentials {
                access_token: settings.access_token.clone(),
                refresh_token: settings.refresh_token.clone(),
            },
            RetryPolicy { max_retries: settings.max_retries, backoff: settings.retry_backoff() },
            settings.request_timeout(),
        )
    }

    pub fn with_token_listener(mut self, listener: TokenListener) -> Self {
        self.token_listener = Some(listener);
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PracticeError> {
        self.execute(Method::GET, path, query, None).await
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PracticeError> {
        let body = serde_json::to_value(body)?;
        self.execute(Method::POST, path, &[], Some(body)).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<T, PracticeError> {
        let url = self.url(path);
        let mut retries: u32 = 0;
        let mut refreshed = false;

        loop {
            let token = self.credentials.lock().await.access_token.clone();
            let result = self.send_once(&method, &url, query, body.as_ref(), &token).await;

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_auth() && !refreshed => {
                    refreshed = true;
                    info!(%url, "access token rejected, refreshing");
                    self.refresh(&token).await?;
                }
                Err(e) if e.is_retryable() && retries < self.policy.max_retries => {
                    retries += 1;
                    warn!(
                        %url,
                        attempt = retries,
                        max = self.policy.max_retries,
                        "request failed, retrying: {e}"
                    );
                    sleep(self.policy.backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: &Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
        token: &str,
    ) -> Result<T, PracticeError> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .header(USER_AGENT, "monster-practice/0.1 (+reqwest)")
            .bearer_auth(token);

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await?;
        let resp = ensure_success(resp)?;
        let bytes = resp.bytes().await?;
        debug!(%url, bytes = bytes.len(), "response received");

        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn refresh(&self, rejected_token: &str) -> Result<(), PracticeError> {
        let mut credentials = self.credentials.lock().await;

        // Another request already swapped the token while this one was in flight.
        if credentials.access_token != rejected_token {
            return Ok(());
        }

        let Some(refresh_token) = credentials.refresh_token.clone() else {
            return Err(PracticeError::Auth("no refresh token available".to_string()));
        };

        let resp = self
            .client
            .post(self.url(REFRESH_PATH))
            .json(&RefreshRequest { refresh_token: &refresh_token })
            .send()
            .await
            .map_err(|e| PracticeError::Auth(format!("Token refresh request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(PracticeError::Auth(format!(
                "Token refresh failed (HTTP {})",
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| PracticeError::Auth(format!("Token refresh body unreadable: {e}")))?;
        let tokens: RefreshResponse = serde_json::from_slice(&bytes)
            .map_err(|e| PracticeError::Auth(format!("Failed to parse token response: {e}")))?;

        credentials.access_token = tokens.access_token;
        if let Some(refresh_token) = tokens.refresh_token {
            credentials.refresh_token = Some(refresh_token);
        }

        if let Some(listener) = &self.token_listener {
            listener(&*credentials);
        }

        info!("access token refreshed");
        Ok(())
    }
}

fn ensure_success(resp: Response) -> Result<Response, PracticeError> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(PracticeError::Auth(format!("HTTP 401 from {}", resp.url())));
    }
    if !status.is_success() {
        return Err(PracticeError::HttpStatus {
            status: status.as_u16(),
            url: resp.url().to_string(),
        });
    }
    Ok(resp)
}
