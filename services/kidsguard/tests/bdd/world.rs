//! BDD test world for the kidsguard client

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cucumber::World;
use futures::StreamExt;
use kidsguard::config::{Config, DashboardConfig, ToastConfig};
use kidsguard::io::{HttpClient, HttpResponse, LineStream};
use kidsguard::stream::Preview;
use kidsguard::toast::Toast;
use kidsguard::{KidsGuard, KidsGuardBuilder, KidsGuardError};

pub const BASE_URL: &str = "http://backend";

/// A request the fake backend received
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

/// Backend double answering from a route table keyed by "METHOD /path"
#[derive(Debug, Default)]
pub struct FakeBackend {
    routes: Mutex<HashMap<String, String>>,
    stream_lines: Mutex<Vec<String>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeBackend {
    pub fn route(&self, method: &str, path: &str, body: impl Into<String>) {
        self.routes
            .lock()
            .unwrap()
            .insert(format!("{} {}", method, path), body.into());
    }

    pub fn push_stream_line(&self, line: &str) {
        self.stream_lines.lock().unwrap().push(line.to_string());
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    fn answer(
        &self,
        method: &str,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> kidsguard::Result<HttpResponse> {
        let path = url
            .strip_prefix(BASE_URL)
            .unwrap_or(url)
            .split('?')
            .next()
            .unwrap_or_default()
            .to_string();
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            path: path.clone(),
            body: body.cloned(),
        });

        match self.routes.lock().unwrap().get(&format!("{} {}", method, path)) {
            Some(body) => Ok(HttpResponse {
                status: 200,
                body: body.clone(),
            }),
            None => Err(KidsGuardError::Http(format!(
                "{} {} failed: connection refused",
                method, url
            ))),
        }
    }
}

#[async_trait::async_trait]
impl HttpClient for FakeBackend {
    async fn get(&self, url: &str) -> kidsguard::Result<HttpResponse> {
        self.answer("GET", url, None)
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> kidsguard::Result<HttpResponse> {
        self.answer("POST", url, Some(body))
    }

    async fn open_stream(&self, url: &str) -> kidsguard::Result<LineStream> {
        self.answer("STREAM", url, None).ok();
        let lines: Vec<kidsguard::Result<String>> = self
            .stream_lines
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .map(Ok)
            .collect();
        Ok(futures::stream::iter(lines).boxed())
    }
}

#[derive(Debug, Default, World)]
pub struct KidsGuardWorld {
    pub backend: Arc<FakeBackend>,
    pub session: Option<KidsGuard>,
    pub preview: Option<Preview>,
    pub last_error: Option<KidsGuardError>,
    pub stopped: Option<usize>,
}

impl KidsGuardWorld {
    pub async fn start_session(&mut self) {
        let mut config = Config {
            dashboard: DashboardConfig {
                enabled: false,
                ..DashboardConfig::default()
            },
            toasts: ToastConfig { max_visible: 20 },
            ..Config::default()
        };
        config.backend.base_url = BASE_URL.to_string();

        let session = KidsGuardBuilder::new(config)
            .with_http_client(self.backend.clone() as Arc<dyn HttpClient>)
            .with_notifiers(Vec::new())
            .build()
            .await
            .expect("session should build with an injected client");
        self.session = Some(session);
    }

    pub fn session(&self) -> &KidsGuard {
        self.session.as_ref().expect("no session started")
    }

    pub async fn toasts(&self) -> Vec<Toast> {
        let now = tokio::time::Instant::now();
        self.session()
            .context()
            .state
            .read()
            .await
            .page
            .toasts
            .active(now)
    }

    pub fn record<T>(&mut self, result: kidsguard::Result<T>) -> Option<T> {
        match result {
            Ok(value) => {
                self.last_error = None;
                Some(value)
            }
            Err(e) => {
                self.last_error = Some(e);
                None
            }
        }
    }
}
