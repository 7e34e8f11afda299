use std::process::{Command, Stdio};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dup_core::{DRIVE_SCOPE, OAuthClient, OAuthToken};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

const CALLBACK_READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum OAuthFlowError {
    #[error("oauth error: {0}")]
    OAuth(#[from] dup_core::OAuthError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("authorization code missing in redirect")]
    MissingCode,
    #[error("authorization was denied: {0}")]
    Denied(String),
    #[error("authorization state mismatch")]
    StateMismatch,
    #[error("authorization timed out")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CallbackOutcome {
    Code { code: String, state: Option<String> },
    Denied(String),
}

/// Installed-app authorization: a loopback redirect on an ephemeral port.
pub struct OAuthFlow {
    client: OAuthClient,
    timeout: Duration,
}

impl OAuthFlow {
    pub fn new(client: OAuthClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub async fn authenticate(&self) -> Result<OAuthToken, OAuthFlowError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let redirect_uri = format!("http://127.0.0.1:{}/", addr.port());
        let state = session_state();
        let url = self
            .client
            .authorize_url(&redirect_uri, Some(DRIVE_SCOPE), Some(&state));

        if env_flag("DUP_OAUTH_NO_BROWSER") || !open_in_browser(&url) {
            println!("Open this URL in your browser to authorize dup:\n{url}");
        } else {
            println!("Opened your browser to authorize dup. If nothing happened, visit:\n{url}");
        }

        let code = self.wait_for_code(&listener, &state).await?;
        tracing::debug!("authorization code received, exchanging for token");
        Ok(self.client.exchange_code(&code, Some(&redirect_uri)).await?)
    }

    async fn wait_for_code(
        &self,
        listener: &TcpListener,
        expected_state: &str,
    ) -> Result<String, OAuthFlowError> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        loop {
            let (mut stream, peer) = tokio::time::timeout_at(deadline, listener.accept())
                .await
                .map_err(|_| OAuthFlowError::Timeout)??;

            let mut request = vec![0u8; 8192];
            let read = tokio::time::timeout(CALLBACK_READ_TIMEOUT, stream.read(&mut request))
                .await
                .map_err(|_| OAuthFlowError::Timeout)??;
            let request_text = String::from_utf8_lossy(&request[..read]);

            // Browsers also probe /favicon.ico and similar; ignore those.
            let Some(outcome) = parse_callback(&request_text) else {
                tracing::debug!(%peer, "ignoring non-callback request on loopback listener");
                let _ = stream
                    .write_all(b"HTTP/1.1 404 Not Found\r\nConnection: close\r\n\r\n")
                    .await;
                continue;
            };

            let result = match outcome {
                CallbackOutcome::Denied(reason) => Err(OAuthFlowError::Denied(reason)),
                CallbackOutcome::Code { state, .. } if state.as_deref() != Some(expected_state) => {
                    Err(OAuthFlowError::StateMismatch)
                }
                CallbackOutcome::Code { code, .. } => Ok(code),
            };
            let page: &[u8] = if result.is_ok() {
                b"HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n\
                <html><body><h2>dup is connected to Google Drive</h2><p>You can close this tab.</p></body></html>"
            } else {
                b"HTTP/1.1 400 Bad Request\r\nContent-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n\
                <html><body><h2>Authorization failed</h2><p>Return to the terminal for details.</p></body></html>"
            };
            let _ = stream.write_all(page).await;
            let _ = stream.shutdown().await;
            return result;
        }
    }
}

fn parse_callback(request: &str) -> Option<CallbackOutcome> {
    let request_line = request.lines().next()?;
    let target = request_line.split_whitespace().nth(1)?;
    let request_url = if target.starts_with("http://") || target.starts_with("https://") {
        Url::parse(target).ok()?
    } else {
        Url::parse(&format!("http://127.0.0.1{target}")).ok()?
    };
    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in request_url.query_pairs() {
        match key.as_ref() {
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }
    if let Some(error) = error {
        return Some(CallbackOutcome::Denied(error));
    }
    code.map(|code| CallbackOutcome::Code { code, state })
}

fn session_state() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let digest = md5::compute(format!("{nanos}:{}", std::process::id()));
    format!("{digest:x}")
}

fn open_in_browser(url: &Url) -> bool {
    let mut command = if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else if cfg!(target_os = "macos") {
        Command::new("open")
    } else {
        Command::new("xdg-open")
    };
    command
        .arg(url.as_str())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}
