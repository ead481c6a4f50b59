use b2_client::B2Config;
use serde_json::json;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const AUTHORIZE_PATH: &str = "/b2api/v2/b2_authorize_account";
pub const UPLOAD_URL_PATH: &str = "/b2api/v2/b2_get_upload_url";
pub const UPLOAD_PATH: &str = "/upload/bucket-id";

pub const SESSION_TOKEN: &str = "session-token";
pub const UPLOAD_TOKEN: &str = "upload-token";

/// base64("key-id:app-key")
pub const BASIC_CREDENTIALS: &str = "Basic a2V5LWlkOmFwcC1rZXk=";

/// Initialize tracing for tests
fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init()
        .ok();
}

/// A mock B2 service. The client under test is blocking, so the mock server
/// lives on its own runtime and is driven with `block_on` from the test
/// thread.
pub struct TestContext {
    pub server: MockServer,
    runtime: Runtime,
}

impl TestContext {
    pub fn new() -> Self {
        setup_tracing();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("failed to build runtime");
        let server = runtime.block_on(MockServer::start());

        Self { server, runtime }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Config pointing every B2 base URL at the mock server.
    pub fn config(&self) -> B2Config {
        B2Config::new("key-id", "app-key", "bucket-id", "bkt")
            .with_auth_base_url(format!("{}/b2api/v2", self.uri()))
    }

    pub fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    /// `b2_authorize_account` answering with the mock server as both API and
    /// download host.
    pub fn mount_authorize(&self) {
        self.mount(
            Mock::given(method("GET"))
                .and(path(AUTHORIZE_PATH))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "accountId": "account",
                    "apiUrl": self.uri(),
                    "downloadUrl": self.uri(),
                    "authorizationToken": SESSION_TOKEN,
                    "recommendedPartSize": 100000000,
                    "absoluteMinimumPartSize": 5000000
                }))),
        );
    }

    pub fn mount_upload_url(&self) {
        self.mount(
            Mock::given(method("GET"))
                .and(path(UPLOAD_URL_PATH))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "bucketId": "bucket-id",
                    "uploadUrl": format!("{}{}", self.uri(), UPLOAD_PATH),
                    "authorizationToken": UPLOAD_TOKEN
                }))),
        );
    }

    pub fn requests(&self) -> Vec<Request> {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
    }

    pub fn requests_to(&self, request_path: &str) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.path() == request_path)
            .collect()
    }

    pub fn authorize_calls(&self) -> usize {
        self.requests_to(AUTHORIZE_PATH).len()
    }
}

pub fn header<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

pub fn file_info_json(file_name: &str, sha1: &str, length: usize) -> serde_json::Value {
    json!({
        "accountId": "account",
        "action": "upload",
        "bucketId": "bucket-id",
        "contentLength": length,
        "contentSha1": sha1,
        "contentType": "text/plain",
        "fileId": format!("4_z{}", file_name.len()),
        "fileInfo": {},
        "fileName": file_name,
        "uploadTimestamp": 1700000000000u64
    })
}
