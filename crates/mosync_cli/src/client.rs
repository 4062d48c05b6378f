//! HTTP client with session login, backed by `ureq`.

use mosync_engine::{HttpClient, Method, ResponseTree};
use parking_lot::RwLock;
use std::time::Duration;
use tracing::debug;

/// Path of the session login endpoint.
const LOGIN_PATH: &str = "/api/aaaLogin.json";
/// Cookie carrying the session token.
const SESSION_COOKIE: &str = "APIC-cookie";

/// A status code and body returned by the API.
type Reply = (u16, String);

/// Cached session token.
#[derive(Debug, Default)]
struct Session {
    token: RwLock<Option<String>>,
}

impl Session {
    fn token(&self, login: impl FnOnce() -> Result<String, String>) -> Result<String, String> {
        let cached = self.token.read().clone();
        if let Some(token) = cached {
            return Ok(token);
        }
        let token = login()?;
        *self.token.write() = Some(token.clone());
        Ok(token)
    }

    /// Sends with the session token, logging in first if there is none.
    ///
    /// A 401 or 403 drops the token and the request is sent once more with
    /// a fresh login. The body of the last reply is returned whatever its
    /// status.
    fn send(
        &self,
        mut login: impl FnMut() -> Result<String, String>,
        mut send: impl FnMut(&str) -> Result<Reply, String>,
    ) -> Result<String, String> {
        let token = self.token(&mut login)?;
        let (status, body) = send(&token)?;
        if !matches!(status, 401 | 403) {
            return Ok(body);
        }

        debug!(status, "session rejected, logging in again");
        *self.token.write() = None;
        let token = self.token(&mut login)?;
        send(&token).map(|(_, body)| body)
    }
}

/// HTTP client that logs in on first use and re-logs in once when the
/// session is rejected.
pub struct ApiClient {
    agent: ureq::Agent,
    base_url: String,
    username: String,
    password: String,
    session: Session,
}

impl ApiClient {
    /// Creates a client for the API at `base_url`.
    pub fn new(base_url: &str, username: String, password: String, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
            session: Session::default(),
        }
    }

    fn login(&self) -> Result<String, String> {
        debug!(user = %self.username, "logging in");
        let body = login_body(&self.username, &self.password);
        let response = self
            .agent
            .post(&format!("{}{}", self.base_url, LOGIN_PATH))
            .set("Content-Type", "application/json")
            .send_string(&body);
        let (_, text) = read_reply(response)?;
        extract_token(&text)
    }

    fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
        token: &str,
    ) -> Result<ureq::Response, ureq::Error> {
        let request = self
            .agent
            .request(method.as_str(), url)
            .set("Cookie", &format!("{SESSION_COOKIE}={token}"))
            .set("Content-Type", "application/json");
        match body {
            Some(body) => request.send_string(body),
            None => request.call(),
        }
    }
}

impl HttpClient for ApiClient {
    fn execute(&self, method: Method, url: &str, body: Option<&str>) -> Result<String, String> {
        self.session.send(
            || self.login(),
            |token| read_reply(self.send(method, url, body, token)),
        )
    }
}

/// Returns the status and body of a response, including error statuses.
fn read_reply(response: Result<ureq::Response, ureq::Error>) -> Result<Reply, String> {
    match response {
        Ok(response) | Err(ureq::Error::Status(_, response)) => {
            let status = response.status();
            let body = response.into_string().map_err(|e| e.to_string())?;
            Ok((status, body))
        }
        Err(e) => Err(e.to_string()),
    }
}

fn login_body(username: &str, password: &str) -> String {
    serde_json::json!({
        "aaaUser": { "attributes": { "name": username, "pwd": password } }
    })
    .to_string()
}

/// Pulls the session token out of a login response.
fn extract_token(body: &str) -> Result<String, String> {
    let tree = ResponseTree::parse(body).map_err(|e| format!("login: {e}"))?;
    if let Some(error) = tree.error_entry() {
        return Err(format!("login rejected ({}): {}", error.code, error.text));
    }
    tree.attributes("aaaLogin")
        .and_then(|attrs| attrs.get("token"))
        .and_then(|token| token.as_str())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| "login response carries no token".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_body_shape() {
        let body: serde_json::Value = serde_json::from_str(&login_body("admin", "s3cret")).unwrap();
        assert_eq!(body["aaaUser"]["attributes"]["name"], "admin");
        assert_eq!(body["aaaUser"]["attributes"]["pwd"], "s3cret");
    }

    #[test]
    fn token_extraction() {
        let body = r#"{"totalCount":"1","imdata":[{"aaaLogin":{"attributes":{"token":"abc123","refreshTimeoutSeconds":"600"}}}]}"#;
        assert_eq!(extract_token(body).unwrap(), "abc123");
    }

    #[test]
    fn rejected_login() {
        let body = r#"{"imdata":[{"error":{"attributes":{"code":"401","text":"Username or password is incorrect"}}}]}"#;
        let err = extract_token(body).unwrap_err();
        assert!(err.contains("401"));
        assert!(err.contains("incorrect"));
    }

    #[test]
    fn missing_token() {
        assert!(extract_token(r#"{"imdata":[]}"#).is_err());
        assert!(extract_token("not json").is_err());
    }

    fn logins(tokens: &[&str]) -> (std::cell::Cell<usize>, Vec<String>) {
        (
            std::cell::Cell::new(0),
            tokens.iter().map(|t| t.to_string()).collect(),
        )
    }

    #[test]
    fn session_logs_in_once() {
        let session = Session::default();
        let (count, tokens) = logins(&["t1"]);
        let login = || {
            count.set(count.get() + 1);
            Ok::<_, String>(tokens[count.get() - 1].clone())
        };

        let mut seen = Vec::new();
        for _ in 0..3 {
            let body = session
                .send(login, |token| {
                    seen.push(token.to_string());
                    Ok((200, "{\"imdata\":[]}".to_string()))
                })
                .unwrap();
            assert_eq!(body, "{\"imdata\":[]}");
        }

        assert_eq!(count.get(), 1);
        assert_eq!(seen, vec!["t1", "t1", "t1"]);
    }

    #[test]
    fn rejected_session_logs_in_again_once() {
        let session = Session::default();
        *session.token.write() = Some("expired".into());
        let (count, tokens) = logins(&["fresh"]);

        let mut seen = Vec::new();
        let body = session
            .send(
                || {
                    count.set(count.get() + 1);
                    Ok::<_, String>(tokens[count.get() - 1].clone())
                },
                |token| {
                    seen.push(token.to_string());
                    Ok(match token {
                        "expired" => (403, "denied".to_string()),
                        _ => (200, "ok".to_string()),
                    })
                },
            )
            .unwrap();

        assert_eq!(body, "ok");
        assert_eq!(count.get(), 1);
        assert_eq!(seen, vec!["expired", "fresh"]);
        assert_eq!(session.token.read().as_deref(), Some("fresh"));
    }

    #[test]
    fn second_rejection_returns_the_body() {
        let session = Session::default();
        let (count, tokens) = logins(&["t1", "t2"]);
        let mut sends = 0;

        let body = session
            .send(
                || {
                    count.set(count.get() + 1);
                    Ok::<_, String>(tokens[count.get() - 1].clone())
                },
                |_| {
                    sends += 1;
                    Ok((401, "unauthorized".to_string()))
                },
            )
            .unwrap();

        assert_eq!(body, "unauthorized");
        assert_eq!(count.get(), 2);
        assert_eq!(sends, 2);
    }

    #[test]
    fn login_failure_stops_the_request() {
        let session = Session::default();
        let mut sends = 0;

        let err = session
            .send(
                || Err("login rejected (401): bad password".to_string()),
                |_| {
                    sends += 1;
                    Ok((200, String::new()))
                },
            )
            .unwrap_err();

        assert!(err.contains("bad password"));
        assert_eq!(sends, 0);
        assert!(session.token.read().is_none());
    }

    #[test]
    fn client_trims_base_url() {
        let client = ApiClient::new(
            "https://apic.example.com/",
            "admin".into(),
            "pw".into(),
            Duration::from_secs(5),
        );
        assert_eq!(client.base_url, "https://apic.example.com");
    }
}
