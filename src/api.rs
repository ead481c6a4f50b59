// API client module: a small blocking HTTP client for the Backblaze B2
// native API. It owns the account session, refreshes it when it gets too
// old, and maps each B2 call onto a single request/response pair.

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha1::{Digest, Sha1};
use tracing::{debug, error, info, warn};

use crate::config::B2Config;
use crate::error::{B2Error, B2Result};

pub const B2_API_PREFIX: &str = "/b2api/v2/";

/// Content type asking B2 to infer the type from the file name.
pub const CONTENT_TYPE_AUTO: &str = "b2/x-auto";

const HEADER_FILE_NAME: &str = "X-Bz-File-Name";
const HEADER_CONTENT_SHA1: &str = "X-Bz-Content-Sha1";

/// State obtained from `b2_authorize_account`. Always replaced as a whole.
#[derive(Debug, Clone)]
pub struct Session {
    pub api_url: String,
    pub download_url: String,
    pub authorization_token: String,
    pub authorized_at: Instant,
    stale: bool,
}

impl Session {
    fn needs_refresh(&self, buffer: Duration) -> bool {
        self.stale || self.authorized_at.elapsed() >= buffer
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizeAccountResponse {
    api_url: String,
    download_url: String,
    authorization_token: String,
}

/// One-time upload target returned by `b2_get_upload_url`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    #[serde(default)]
    pub bucket_id: Option<String>,
    pub upload_url: String,
    pub authorization_token: String,
}

/// File metadata as returned by uploads and `b2_get_file_info`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub file_id: String,
    pub file_name: String,
    pub account_id: Option<String>,
    pub bucket_id: Option<String>,
    #[serde(default)]
    pub content_length: u64,
    pub content_sha1: Option<String>,
    pub content_type: Option<String>,
    pub action: Option<String>,
    pub upload_timestamp: Option<i64>,
    #[serde(default)]
    pub file_info: HashMap<String, String>,
    /// Fields not modelled above (retention, legal hold, encryption, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of `b2_delete_file_version`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileVersion {
    pub file_id: String,
    pub file_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Blocking B2 client bound to one bucket.
///
/// All operations take `&self`; the session sits behind a lock so a client
/// can be shared between threads without mixing a fresh token with a stale
/// base URL.
pub struct Client {
    http: HttpClient,
    config: B2Config,
    session: RwLock<Session>,
}

impl Client {
    /// Build the client and authorize right away. Fails with
    /// [`B2Error::Authorization`] when B2 rejects the credentials.
    pub fn new(config: B2Config) -> B2Result<Self> {
        let mut builder = HttpClient::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        let session = request_session(&http, &config)?;
        info!(bucket = %config.bucket_name, "Authorized with B2");

        Ok(Self {
            http,
            config,
            session: RwLock::new(session),
        })
    }

    /// Build the client from `B2_*` environment variables.
    pub fn from_env() -> B2Result<Self> {
        Self::new(B2Config::from_env()?)
    }

    pub fn config(&self) -> &B2Config {
        &self.config
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.read_session().clone()
    }

    pub fn authorized_at(&self) -> Instant {
        self.read_session().authorized_at
    }

    /// Fetch a new account session and replace the current one. On failure
    /// the previous session stays in place.
    pub fn authorize(&self) -> B2Result<()> {
        let session = request_session(&self.http, &self.config)?;
        *self.write_session() = session;
        Ok(())
    }

    /// Re-authorize if the session is older than the configured buffer (or
    /// was marked stale) and return the session to use for the next call.
    fn ensure_authorized(&self) -> B2Result<Session> {
        {
            let session = self.read_session();
            if !session.needs_refresh(self.config.reauthorization_buffer) {
                return Ok(session.clone());
            }
        }
        self.authorize()?;
        Ok(self.session())
    }

    fn invalidate_session(&self) {
        self.write_session().stale = true;
    }

    /// Ask B2 for an upload URL and its one-time token.
    pub fn get_upload_url(&self) -> B2Result<UploadTicket> {
        let session = self.ensure_authorized()?;

        let response = self
            .http
            .get(api_url(&session.api_url, "b2_get_upload_url"))
            .header(AUTHORIZATION, session.authorization_token.as_str())
            .query(&[("bucketId", self.config.bucket_id.as_str())])
            .send()?;

        Ok(check_status(response)?.json()?)
    }

    /// Upload `content` under `name`, retrying up to the configured number
    /// of attempts when B2 answers 401 or 503.
    pub fn upload_file<R: Read + Seek>(&self, name: &str, content: &mut R) -> B2Result<FileInfo> {
        self.upload_file_with_attempts(name, content, self.config.max_upload_attempts)
    }

    /// Upload with an explicit attempt limit. Every attempt uses a fresh
    /// upload URL and re-reads `content` from offset 0. The error of the
    /// last attempt is returned unchanged.
    pub fn upload_file_with_attempts<R: Read + Seek>(
        &self,
        name: &str,
        content: &mut R,
        max_attempts: u32,
    ) -> B2Result<FileInfo> {
        let max_attempts = max_attempts.max(1);
        let file_name = HeaderValue::from_str(name)
            .map_err(|_| B2Error::InvalidHeader(format!("{}: {}", HEADER_FILE_NAME, name)))?;

        let mut attempt = 1;
        loop {
            let ticket = self.get_upload_url()?;
            let (body, sha1) = read_with_digest(content)?;
            debug!(name, attempt, size = body.len(), %sha1, "Uploading file to B2");

            let result = self.post_upload(&ticket, file_name.clone(), body, &sha1);
            match result {
                Ok(info) => return Ok(info),
                Err(e) if e.is_retryable_upload() && attempt < max_attempts => {
                    // B2 docs: call b2_get_upload_url again to get a new auth token.
                    warn!(name, attempt, max_attempts, error = %e, "Received file upload error. Retrying...");
                    self.invalidate_session();
                    content.seek(SeekFrom::Start(0))?;
                    attempt += 1;
                }
                Err(e) => {
                    error!(name, attempt, error = %e, "Unable to recover from error while uploading file");
                    return Err(e);
                }
            }
        }
    }

    fn post_upload(
        &self,
        ticket: &UploadTicket,
        file_name: HeaderValue,
        body: Vec<u8>,
        sha1: &str,
    ) -> B2Result<FileInfo> {
        let response = self
            .http
            .post(&ticket.upload_url)
            .header(AUTHORIZATION, ticket.authorization_token.as_str())
            .header(CONTENT_TYPE, CONTENT_TYPE_AUTO)
            .header(HEADER_FILE_NAME, file_name)
            .header(HEADER_CONTENT_SHA1, sha1)
            .body(body)
            .send()?;

        Ok(check_status(response)?.json()?)
    }

    pub fn get_file_info(&self, file_id: &str) -> B2Result<FileInfo> {
        let session = self.ensure_authorized()?;

        let response = self
            .http
            .get(api_url(&session.api_url, "b2_get_file_info"))
            .header(AUTHORIZATION, session.authorization_token.as_str())
            .query(&[("fileId", file_id)])
            .send()?;

        Ok(check_status(response)?.json()?)
    }

    /// Download a file by name through the bucket's download URL.
    pub fn download_file(&self, name: &str) -> B2Result<Vec<u8>> {
        let session = self.ensure_authorized()?;
        let url = file_url(&session.download_url, &self.config.bucket_name, name);
        debug!(%url, "Downloading file from B2");

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, session.authorization_token.as_str())
            .send()?;

        Ok(check_status(response)?.bytes()?.to_vec())
    }

    pub fn delete_file_version(&self, file_name: &str, file_id: &str) -> B2Result<FileVersion> {
        let session = self.ensure_authorized()?;
        debug!(file_name, file_id, "Deleting file version");

        let response = self
            .http
            .get(api_url(&session.api_url, "b2_delete_file_version"))
            .header(AUTHORIZATION, session.authorization_token.as_str())
            .query(&[("fileId", file_id), ("fileName", file_name)])
            .send()?;

        Ok(check_status(response)?.json()?)
    }

    /// Public download URL of `name`. The name is not escaped.
    pub fn get_file_url(&self, name: &str) -> String {
        file_url(&self.read_session().download_url, &self.config.bucket_name, name)
    }

    /// URL of a native API endpoint on the session's API host.
    pub fn build_url(&self, endpoint: &str) -> String {
        api_url(&self.read_session().api_url, endpoint)
    }

    fn read_session(&self) -> RwLockReadGuard<'_, Session> {
        // Sessions are replaced whole, so a poisoned lock still holds a
        // consistent value.
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn request_session(http: &HttpClient, config: &B2Config) -> B2Result<Session> {
    debug!("Authorizing request to B2");
    let key = STANDARD.encode(format!("{}:{}", config.key_id, config.application_key));

    let response = http
        .get(format!("{}/b2_authorize_account", config.auth_base_url))
        .header(AUTHORIZATION, format!("Basic {}", key))
        .send()?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(B2Error::Authorization { status, body });
    }

    let account: AuthorizeAccountResponse = response.json()?;
    Ok(Session {
        api_url: account.api_url,
        download_url: account.download_url,
        authorization_token: account.authorization_token,
        authorized_at: Instant::now(),
        stale: false,
    })
}

fn check_status(response: Response) -> B2Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(B2Error::Http { status, body })
}

/// Rewind, read everything, rewind again. Returns the bytes and their SHA-1.
fn read_with_digest<R: Read + Seek>(content: &mut R) -> B2Result<(Vec<u8>, String)> {
    content.seek(SeekFrom::Start(0))?;
    let mut body = Vec::new();
    content.read_to_end(&mut body)?;
    content.seek(SeekFrom::Start(0))?;
    let sha1 = content_sha1(&body);
    Ok((body, sha1))
}

/// Lowercase hex SHA-1, the form B2 expects in `X-Bz-Content-Sha1`.
pub fn content_sha1(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

pub fn file_url(download_url: &str, bucket_name: &str, name: &str) -> String {
    format!("{}/file/{}/{}", download_url, bucket_name, name)
}

pub fn api_url(api_base: &str, endpoint: &str) -> String {
    format!("{}{}{}", api_base, B2_API_PREFIX, endpoint)
}
