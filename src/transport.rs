//! HTTP transport seam between [`JenkinsClient`](crate::client::JenkinsClient)
//! and the network.
//!
//! The client builds plain [`HttpRequest`] values and interprets
//! [`HttpResponse`] values; only [`HttpTransport`] knows about `reqwest`.
//! A [`Connector`] turns a resolved server into a transport, which is how
//! the tools layer obtains one client per call.
//!
//! ## Authentication
//!
//! Jenkins uses HTTP basic auth with the username and an API token.
//!
//! ## Status handling
//!
//! Transports never judge status codes. Redirects are not followed, so the
//! `Location` header of a build submission reaches the client intact.

use std::future::Future;
use std::time::Duration;

use crate::error::JenkinsError;
use crate::registry::ServerConfig;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// URL with the query string appended, unencoded. For logs and matching.
    pub fn display_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query: Vec<String> = self.query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{}?{}", self.url, query.join("&"))
    }

    /// Attach an XML payload with the matching content type.
    pub fn xml(self, body: impl Into<String>) -> Self {
        let mut req = self.header("Content-Type", "application/xml");
        req.body = Some(body.into());
        req
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lower-cased.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    /// Fail with [`JenkinsError::Http`] on any status >= 400.
    pub fn error_for_status(self, url: &str) -> Result<Self, JenkinsError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(JenkinsError::Http {
                status: self.status,
                url: url.to_string(),
            })
        }
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, JenkinsError> {
        serde_json::from_str(&self.body).map_err(|e| JenkinsError::Protocol(e.to_string()))
    }
}

/// Something that can carry an [`HttpRequest`] to a Jenkins server.
pub trait Transport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, JenkinsError>>;
}

/// Builds a transport for a resolved server.
pub trait Connector {
    type Transport: Transport;

    fn connect(&self, server: &ServerConfig) -> Result<Self::Transport, JenkinsError>;
}

/// `reqwest`-backed transport bound to one server's credentials.
pub struct HttpTransport {
    http: reqwest::Client,
    user: String,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(server: &ServerConfig, timeout: Duration) -> Result<Self, JenkinsError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            http,
            user: server.user.clone(),
            token: server.token.clone(),
        })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, JenkinsError> {
        let display_url = request.display_url();
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };
        let mut builder = self
            .http
            .request(method, &request.url)
            .basic_auth(&self.user, self.token.as_deref());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body.take() {
            builder = builder.body(body);
        }

        let resp = builder.send().await.map_err(|e| {
            tracing::error!(
                "Jenkins API request failed: {} {}: {}",
                request.method.as_str(),
                display_url,
                e
            );
            JenkinsError::from(e)
        })?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = resp.text().await?;

        tracing::debug!(
            "Jenkins API request: {} {} -> {}",
            request.method.as_str(),
            display_url,
            status
        );
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Opens an [`HttpTransport`] per server with a fixed request timeout.
#[derive(Debug, Clone, Copy)]
pub struct HttpConnector {
    pub timeout: Duration,
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Connector for HttpConnector {
    type Transport = HttpTransport;

    fn connect(&self, server: &ServerConfig) -> Result<HttpTransport, JenkinsError> {
        HttpTransport::new(server, self.timeout)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted in-memory transport.
    //!
    //! Routes are matched in registration order by method and a fragment of
    //! [`HttpRequest::display_url`], so a query string can tell two GETs on
    //! the same path apart. Each route replays its queued replies; the last one sticks.
    //! Unmatched requests get an empty 404. Every request is logged.

    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use serde_json::Value;

    use super::*;

    #[derive(Debug, Clone)]
    pub enum Reply {
        Response(HttpResponse),
        Fail(String),
    }

    impl Reply {
        pub fn json(status: u16, body: Value) -> Self {
            Reply::Response(HttpResponse {
                status,
                headers: vec![("content-type".into(), "application/json".into())],
                body: body.to_string(),
            })
        }

        pub fn text(status: u16, body: &str) -> Self {
            Reply::Response(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.to_string(),
            })
        }

        pub fn status(status: u16) -> Self {
            Self::text(status, "")
        }

        pub fn created_at(location: &str) -> Self {
            Reply::Response(HttpResponse {
                status: 201,
                headers: vec![("location".into(), location.to_string())],
                body: String::new(),
            })
        }
    }

    struct Route {
        method: Method,
        fragment: String,
        replies: VecDeque<Reply>,
    }

    #[derive(Default)]
    struct State {
        routes: Vec<Route>,
        requests: Vec<HttpRequest>,
    }

    #[derive(Clone, Default)]
    pub struct MockTransport {
        state: Arc<Mutex<State>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue `reply` for requests whose URL contains `fragment`.
        pub fn on(&self, method: Method, fragment: &str, reply: Reply) -> &Self {
            let mut state = self.state.lock().unwrap();
            if let Some(route) = state
                .routes
                .iter_mut()
                .find(|r| r.method == method && r.fragment == fragment)
            {
                route.replies.push_back(reply);
            } else {
                state.routes.push(Route {
                    method,
                    fragment: fragment.to_string(),
                    replies: VecDeque::from([reply]),
                });
            }
            self
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.state.lock().unwrap().requests.clone()
        }

        pub fn count(&self, method: Method, fragment: &str) -> usize {
            self.requests()
                .iter()
                .filter(|r| r.method == method && r.display_url().contains(fragment))
                .count()
        }
    }

    impl Transport for MockTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, JenkinsError> {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());
            let url = request.display_url();
            let reply = state
                .routes
                .iter_mut()
                .find(|r| r.method == request.method && url.contains(&r.fragment))
                .map(|route| {
                    if route.replies.len() > 1 {
                        route.replies.pop_front().unwrap()
                    } else {
                        route.replies[0].clone()
                    }
                })
                .unwrap_or_else(|| Reply::status(404));
            match reply {
                Reply::Response(resp) => Ok(resp),
                Reply::Fail(msg) => Err(JenkinsError::Request(msg)),
            }
        }
    }

    /// Hands out clones of one shared [`MockTransport`].
    #[derive(Clone, Default)]
    pub struct MockConnector {
        pub transport: MockTransport,
    }

    impl Connector for MockConnector {
        type Transport = MockTransport;

        fn connect(&self, _server: &ServerConfig) -> Result<MockTransport, JenkinsError> {
            Ok(self.transport.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let resp = HttpResponse {
            status: 201,
            headers: vec![("location".into(), "http://ci/queue/item/5/".into())],
            body: String::new(),
        };
        assert_eq!(resp.header("Location"), Some("http://ci/queue/item/5/"));
        assert!(resp.is_success());
    }

    #[test]
    fn redirects_count_as_success() {
        let resp = HttpResponse {
            status: 302,
            headers: Vec::new(),
            body: String::new(),
        };
        assert!(resp.error_for_status("http://ci/job/a/1/stop").is_ok());
    }

    #[test]
    fn error_status_names_url() {
        let resp = HttpResponse {
            status: 500,
            headers: Vec::new(),
            body: "boom".into(),
        };
        let err = resp.error_for_status("http://ci/x").unwrap_err();
        assert_eq!(err.to_string(), "Jenkins API returned HTTP 500 for http://ci/x");
    }

    #[test]
    fn display_url_appends_query() {
        let req = HttpRequest::get("http://ci/job/a/api/json").query("tree", "jobs[name]");
        assert_eq!(req.display_url(), "http://ci/job/a/api/json?tree=jobs[name]");
        assert_eq!(HttpRequest::get("http://ci").display_url(), "http://ci");
    }

    /// Serves one canned response per accepted connection, then stops.
    fn serve_once_each(responses: Vec<String>) -> String {
        use std::io::{BufRead, BufReader, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());
        std::thread::spawn(move || {
            for response in responses {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut line = String::new();
                while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                    line.clear();
                }
                let mut stream = stream;
                stream.write_all(response.as_bytes()).unwrap();
            }
        });
        addr
    }

    #[tokio::test]
    async fn follows_redirects_to_the_final_response() {
        let body = r#"{"name":"app"}"#;
        let addr = serve_once_each(vec![
            "HTTP/1.1 301 Moved Permanently\r\nLocation: /moved/job/app/api/json\r\n\
             Content-Length: 0\r\nConnection: close\r\n\r\n"
                .to_string(),
            format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            ),
        ]);
        let server = ServerConfig {
            name: "local".into(),
            uri: addr.clone(),
            user: "bob".into(),
            token: Some("t".into()),
        };
        let transport = HttpTransport::new(&server, Duration::from_secs(5)).unwrap();

        let resp = transport
            .send(HttpRequest::get(&format!("{addr}/job/app/api/json")))
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        let data: serde_json::Value = resp.json().unwrap();
        assert_eq!(data["name"], "app");
    }

    #[test]
    fn xml_sets_content_type() {
        let req = HttpRequest::post("http://ci/createItem").xml("<a/>");
        assert_eq!(
            req.headers,
            vec![("Content-Type".to_string(), "application/xml".to_string())]
        );
        assert_eq!(req.body.as_deref(), Some("<a/>"));
    }
}
