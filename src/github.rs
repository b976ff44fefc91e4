use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;

use crate::config::Config;
use crate::error::{EztkError, Result};
use crate::tracker::IssueTracker;
use crate::types::{Issue, IssuePayload, IssueState};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const PER_PAGE: u32 = 100;

pub struct GitHub {
    client: Client,
    api_url: String,
    web_url: String,
    owner: String,
}

impl std::fmt::Debug for GitHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHub")
            .field("api_url", &self.api_url)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl GitHub {
    pub fn new(config: &Config, token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| EztkError::Auth(e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("eztk/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EztkError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            web_url: config.web_url.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
        })
    }

    fn issues_url(&self, repo: &str) -> String {
        format!(
            "{}/repos/{}/{}/issues",
            self.api_url,
            urlencoding::encode(&self.owner),
            urlencoding::encode(repo)
        )
    }

    fn issue_url(&self, repo: &str, number: u64) -> String {
        format!("{}/{}/{}/issues/{}", self.web_url, self.owner, repo, number)
    }

    /// Send, then split failures into transport vs API errors.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| EztkError::Transport(e.to_string()))?;

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(EztkError::Api {
                status: status.as_u16(),
                message: api_message(&text),
            });
        }
        Ok(response)
    }
}

// GitHub API response types

#[derive(Deserialize)]
struct GhIssue {
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    #[serde(default)]
    labels: Vec<GhLabel>,
    html_url: Option<String>,
    /// Present when the "issue" is a pull request.
    pull_request: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GhLabel {
    name: String,
}

#[derive(Deserialize)]
struct GhCreated {
    number: u64,
}

#[derive(Deserialize)]
struct GhErrorBody {
    message: String,
}

/// GitHub wraps errors as `{"message": ...}`; fall back to the raw body.
fn api_message(text: &str) -> String {
    serde_json::from_str::<GhErrorBody>(text)
        .map(|b| b.message)
        .unwrap_or_else(|_| text.trim().to_string())
}

/// A body that arrived but did not parse is a decode error; one that could
/// not be read (timeout, reset) is a transport failure.
fn body_error(e: reqwest::Error) -> EztkError {
    if e.is_decode() {
        EztkError::Decode(e.to_string())
    } else {
        EztkError::Transport(e.to_string())
    }
}

impl GitHub {
    /// Keep open issues only, drop pull requests, preserve remote order.
    fn parse_issues(&self, repo: &str, raw: Vec<GhIssue>) -> Vec<Issue> {
        raw.into_iter()
            .filter(|i| i.pull_request.is_none() && i.state == "open")
            .map(|i| Issue {
                repo: repo.to_string(),
                number: i.number,
                title: i.title,
                body: i.body.unwrap_or_default(),
                labels: i.labels.into_iter().map(|l| l.name).collect(),
                state: IssueState::Open,
                url: i
                    .html_url
                    .unwrap_or_else(|| self.issue_url(repo, i.number)),
            })
            .collect()
    }
}

#[async_trait]
impl IssueTracker for GitHub {
    fn name(&self) -> &str {
        "GitHub"
    }

    fn repo_url(&self, repo: &str) -> String {
        format!("{}/{}/{}", self.web_url, self.owner, repo)
    }

    async fn fetch_repo(&self, repo: &str) -> Result<Vec<Issue>> {
        let request = self
            .client
            .get(self.issues_url(repo))
            .query(&[("state", "open".to_string()), ("per_page", PER_PAGE.to_string())]);
        let raw: Vec<GhIssue> = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(body_error)?;

        Ok(self.parse_issues(repo, raw))
    }

    async fn create_issue(&self, repo: &str, payload: &IssuePayload) -> Result<u64> {
        let request = self.client.post(self.issues_url(repo)).json(payload);
        let response = self.send(request).await?;

        if response.status() != reqwest::StatusCode::CREATED {
            return Err(EztkError::Api {
                status: response.status().as_u16(),
                message: "issue was not created".to_string(),
            });
        }

        let created: GhCreated = response
            .json()
            .await
            .map_err(body_error)?;
        Ok(created.number)
    }

    async fn update_issue(&self, repo: &str, number: u64, payload: &IssuePayload) -> Result<()> {
        let url = format!("{}/{}", self.issues_url(repo), number);
        self.send(self.client.patch(url).json(payload)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client() -> GitHub {
        let config = Config::from_toml(
            r#"
owner = "qkzk"
api_url = "https://api.example.test/"

[[repos]]
name = "r1"
path = "/tmp"
"#,
        )
        .unwrap();
        GitHub::new(&config, "secret").unwrap()
    }

    #[test]
    fn urls_use_owner_and_escape_repo() {
        let gh = client();
        assert_eq!(
            gh.issues_url("cours nsi"),
            "https://api.example.test/repos/qkzk/cours%20nsi/issues"
        );
        assert_eq!(gh.repo_url("eztk"), "https://github.com/qkzk/eztk");
    }

    #[test]
    fn parse_keeps_open_issues_in_remote_order() {
        let gh = client();
        let raw: Vec<GhIssue> = serde_json::from_str(
            r#"[
  {"number": 9, "title": "b", "body": null, "state": "open",
   "labels": [{"name": "z"}, {"name": "a"}],
   "html_url": "https://github.com/qkzk/r1/issues/9"},
  {"number": 3, "title": "pr", "body": "", "state": "open", "labels": [],
   "pull_request": {"url": "x"}},
  {"number": 2, "title": "old", "body": "", "state": "closed", "labels": []},
  {"number": 1, "title": "a", "body": "text", "state": "open"}
]"#,
        )
        .unwrap();

        let issues = gh.parse_issues("r1", raw);

        let numbers: Vec<u64> = issues.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![9, 1]);
        assert_eq!(issues[0].labels, vec!["z", "a"]);
        assert_eq!(issues[0].body, "");
        assert_eq!(issues[1].body, "text");
        assert_eq!(issues[1].url, "https://github.com/qkzk/r1/issues/1");
        assert!(issues.iter().all(|i| i.repo == "r1" && i.is_open()));
    }

    #[test]
    fn api_message_prefers_github_error_body() {
        assert_eq!(
            api_message(r#"{"message":"Bad credentials","documentation_url":"x"}"#),
            "Bad credentials"
        );
        assert_eq!(api_message("  Service Unavailable \n"), "Service Unavailable");
    }

    #[test]
    fn debug_does_not_leak_token() {
        let rendered = format!("{:?}", client());
        assert!(!rendered.contains("secret"));
    }

    #[tokio::test]
    async fn unreachable_remote_is_transport_error() {
        let config = Config::from_toml(
            r#"
owner = "qkzk"
api_url = "http://127.0.0.1:9"

[[repos]]
name = "r1"
path = "/tmp"
"#,
        )
        .unwrap();
        let gh = GitHub::new(&config, "t").unwrap();

        let err = gh.fetch_repo("r1").await.unwrap_err();
        assert!(matches!(err, EztkError::Transport(_)));
    }

    /// Serve one canned HTTP response on a local port and return its base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            // Read the whole request so closing the socket does not reset it.
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&request[..end]).to_lowercase();
                    let length = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{}", addr)
    }

    fn client_at(api_url: &str) -> GitHub {
        let config = Config::from_toml(&format!(
            r#"
owner = "qkzk"
api_url = "{}"

[[repos]]
name = "r1"
path = "/tmp"
"#,
            api_url
        ))
        .unwrap();
        GitHub::new(&config, "t").unwrap()
    }

    #[tokio::test]
    async fn refused_fetch_is_api_error_with_github_message() {
        let url = serve_once(
            "401 Unauthorized",
            r#"{"message":"Bad credentials","documentation_url":"https://docs.github.com"}"#,
        )
        .await;

        let err = client_at(&url).fetch_repo("r1").await.unwrap_err();

        match err {
            EztkError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Bad credentials");
            }
            other => panic!("expected an API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn fetch_parses_issue_list() {
        let url = serve_once(
            "200 OK",
            r#"[{"number": 4, "title": "t", "body": "b", "state": "open", "labels": []}]"#,
        )
        .await;

        let issues = client_at(&url).fetch_repo("r1").await.unwrap();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].number, 4);
    }

    #[tokio::test]
    async fn unparsable_body_is_decode_error() {
        let url = serve_once("200 OK", "not json").await;

        let err = client_at(&url).fetch_repo("r1").await.unwrap_err();

        assert_eq!(err.kind(), "decode");
    }

    #[tokio::test]
    async fn create_requires_created_status() {
        let url = serve_once("200 OK", r#"{"number": 5}"#).await;
        let payload = Issue::draft("r1", "t", "").payload();

        let err = client_at(&url).create_issue("r1", &payload).await.unwrap_err();

        assert!(matches!(err, EztkError::Api { status: 200, .. }));
    }

    #[tokio::test]
    async fn create_returns_assigned_number() {
        let url = serve_once("201 Created", r#"{"number": 12}"#).await;
        let payload = Issue::draft("r1", "t", "").payload();

        let number = client_at(&url).create_issue("r1", &payload).await.unwrap();

        assert_eq!(number, 12);
    }

    #[tokio::test]
    async fn refused_update_reports_false() {
        let url = serve_once("422 Unprocessable Entity", r#"{"message":"Validation Failed"}"#).await;
        let gh = client_at(&url);
        let mut issue = Issue::draft("r1", "t", "");
        issue.number = 3;

        assert!(!tracker::update_issue(&gh, "r1", &issue).await);
    }
}
