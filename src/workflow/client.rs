//! The authenticated transport to GitHub REST API.

use std::{fmt, time::Duration};

use reqwest::{
    RequestBuilder, Response,
    header::{self, HeaderMap, HeaderValue},
    redirect,
};
use serde::{Deserialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};

/// The public GitHub REST API.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// The default bound of a single API request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// At most this many bytes of an error response are read to find the server's message.
pub const ERROR_BODY_LIMIT: usize = 32 * 1024;

const USER_AGENT: &str = concat!("artifact-fetch/", env!("CARGO_PKG_VERSION"));

/// Credentials attached to every API request.
#[non_exhaustive]
#[derive(Clone)]
pub enum Credentials {
    /// A token sent as bearer authentication.
    Token(String),
    /// A user name and token sent as basic authentication.
    Basic {
        /// The user name.
        user: String,
        /// The token used as password.
        token: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(***)"),
            Self::Basic { user, .. } => write!(f, "Basic {{ user: {user:?}, token: *** }}"),
        }
    }
}

/// A client of GitHub REST API scoped to one repository.
///
/// API requests carry the credentials and follow redirects, except those built by [`GitHubClient::resolve_request`],
/// whose `Location` header is the answer. Archive downloads go through a separate client without credentials, as the
/// resolved URLs are pre-signed.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    api: reqwest::Client,
    resolve: reqwest::Client,
    download: reqwest::Client,
    base_url: String,
    owner: String,
    repo: String,
    credentials: Credentials,
    timeout: Duration,
}

impl GitHubClient {
    /// Creates a [`GitHubClient`] for `owner/repo` at `base_url`.
    ///
    /// Every API request is bounded by `timeout`. Archive downloads are not bounded as a whole, but fail once the
    /// connection stays silent for `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the underlying HTTP clients cannot be built.
    pub fn new(
        base_url: &str,
        owner: &str,
        repo: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );

        let api = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers.clone())
            .build()
            .map_err(|err| Error::Config(format!("failed to build HTTP client: {err}")))?;
        let resolve = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|err| Error::Config(format!("failed to build HTTP client: {err}")))?;
        let download = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .read_timeout(timeout)
            .build()
            .map_err(|err| Error::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            api,
            resolve,
            download,
            base_url: base_url.trim_end_matches('/').to_owned(),
            owner: owner.to_owned(),
            repo: repo.to_owned(),
            credentials,
            timeout,
        })
    }

    /// The repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Builds the URL of `path` under the repository, e.g. `actions/runs`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{path}",
            self.base_url, self.owner, self.repo
        )
    }

    /// Builds an authenticated request for GitHub REST API.
    pub fn request(&self, url: &str) -> RequestBuilder {
        self.authorize(self.api.get(url))
    }

    /// Builds an authenticated request that hands back redirects instead of following them.
    pub fn resolve_request(&self, url: &str) -> RequestBuilder {
        self.authorize(self.resolve.get(url))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.timeout(self.timeout);
        match &self.credentials {
            Credentials::Token(token) => builder.bearer_auth(token),
            Credentials::Basic { user, token } => builder.basic_auth(user, Some(token)),
        }
    }

    /// Builds an unauthenticated request for a pre-signed download URL.
    pub fn download_request(&self, url: &str) -> RequestBuilder {
        self.download.get(url)
    }
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

/// Sends `request`, failing with [`Error::Cancelled`] as soon as `cancel` is cancelled.
pub(crate) async fn send(
    request: RequestBuilder,
    url: &str,
    cancel: &CancellationToken,
) -> Result<Response> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        result = request.send() => result.map_err(|err| Error::transport(url, err)),
    }
}

/// Turns an error status, or a redirect left unfollowed, into [`Error::Remote`] carrying the server's message.
pub(crate) async fn check_response(response: Response, url: &str) -> Result<Response> {
    let status = response.status();
    if status.is_redirection() || status.is_client_error() || status.is_server_error() {
        let message = read_error_message(response).await;
        return Err(Error::Remote {
            url: url.to_owned(),
            status,
            message,
        });
    }

    Ok(response)
}

/// Reads the `message` of a GitHub error body, reading at most [`ERROR_BODY_LIMIT`] bytes.
///
/// Returns an empty string when the body is unreadable or carries no message.
pub(crate) async fn read_error_message(mut response: Response) -> String {
    let mut body = Vec::new();
    while body.len() < ERROR_BODY_LIMIT {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(err) => {
                debug!("failed to read error body: {err}");
                break;
            }
        }
    }
    body.truncate(ERROR_BODY_LIMIT);

    serde_json::from_slice::<ApiMessage>(&body)
        .map(|m| m.message)
        .unwrap_or_default()
}

/// Sends `request` and decodes its JSON body.
pub(crate) async fn fetch_json<T>(
    request: RequestBuilder,
    url: &str,
    cancel: &CancellationToken,
) -> Result<T>
where
    T: DeserializeOwned,
{
    let response = check_response(send(request, url, cancel).await?, url).await?;

    let body = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(Error::Cancelled),
        result = response.bytes() => result.map_err(|err| Error::transport(url, err))?,
    };

    serde_json::from_slice(&body).map_err(|source| Error::Decode {
        url: url.to_owned(),
        source,
    })
}
