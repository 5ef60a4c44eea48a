use appwrite::Credentials;
use chrono::Utc;
use http_body_util::{BodyExt, Limited};
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::histogram;
use shared::http::{ResponseBody, json_response};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Service, ServiceBuilder};
use tower_http::cors::{Cors, CorsLayer};

use crate::aggregator::aggregate;
use crate::codec;
use crate::errors::RelayError;
use crate::fetcher::Fetcher;
use crate::metrics_defs::FETCH_DURATION;
use crate::notifier::Notifier;
use crate::protocol::{
    FetchDeploymentsRequest, FetchDeploymentsResponse, HealthEnvironment, HealthResponse,
    IndexResponse, MessageResponse, TestEmailRequest,
};

const MAX_BODY_BYTES: usize = 64 * 1024;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const ENDPOINTS: &[&str] = &[
    "GET /health - Health check",
    "POST /api/fetch-deployments - Fetch and monitor deployments",
    "POST /api/test-email - Send a test email through the messaging tool",
];

struct RelayState {
    fetcher: Fetcher,
    notifier: Notifier,
    port: u16,
}

/// HTTP front of the relay. Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct RelayService {
    state: Arc<RelayState>,
}

impl RelayService {
    pub fn new(fetcher: Fetcher, notifier: Notifier, port: u16) -> Self {
        RelayService {
            state: Arc::new(RelayState {
                fetcher,
                notifier,
                port,
            }),
        }
    }

    pub async fn handle<B>(&self, req: Request<B>) -> Response<ResponseBody>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let result = match (&method, path.as_str()) {
            (&Method::GET, "/") => Ok(self.index()),
            (&Method::GET, "/health") => Ok(self.health()),
            (&Method::POST, "/api/fetch-deployments") => {
                self.fetch_deployments(req.into_body()).await
            }
            (&Method::POST, "/api/test-email") => self.test_email(req.into_body()).await,
            _ => Err(RelayError::NoRouteMatched),
        };

        result.unwrap_or_else(|e| {
            let status = e.status_code();
            if status.is_server_error() {
                tracing::error!(%method, path, error = %e, "Request failed");
            } else {
                tracing::info!(%method, path, %status, error = %e, "Request rejected");
            }
            e.into_response()
        })
    }

    fn index(&self) -> Response<ResponseBody> {
        json_response(
            StatusCode::OK,
            &IndexResponse {
                message: "Sendra relay",
                version: VERSION,
                endpoints: ENDPOINTS,
            },
        )
    }

    fn health(&self) -> Response<ResponseBody> {
        let mailer = self.state.notifier.mailer().ok();

        json_response(
            StatusCode::OK,
            &HealthResponse {
                status: "ok",
                timestamp: Utc::now(),
                mcp_connected: mailer.is_some(),
                environment: HealthEnvironment {
                    version: VERSION,
                    port: self.state.port,
                    has_sender_email: mailer.and_then(|m| m.sender()).is_some(),
                },
            },
        )
    }

    async fn fetch_deployments<B>(&self, body: B) -> Result<Response<ResponseBody>, RelayError>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let start = Instant::now();

        let request: FetchDeploymentsRequest = read_json(body).await?;
        let (project_id, token) = request.into_required()?;

        let api_key = codec::decode(&token).map_err(|e| {
            tracing::info!(project_id, error = %e, "Rejecting undecodable credential");
            RelayError::Unauthorized
        })?;
        let credentials = Credentials::new(project_id.clone(), api_key);

        let outcomes = self.state.fetcher.fetch(&credentials).await?;
        let aggregate = aggregate(&outcomes);

        let report = self
            .state
            .notifier
            .notify_failures(&project_id, &aggregate.failed_deployments())
            .await;

        tracing::info!(
            project_id,
            sites = aggregate.sites_count,
            failed_sites = aggregate.failed_sites,
            deployments = aggregate.total(),
            emails_sent = report.sent,
            "Fetched deployments"
        );
        histogram!(FETCH_DURATION).record(start.elapsed().as_secs_f64());

        Ok(json_response(
            StatusCode::OK,
            &FetchDeploymentsResponse::new(aggregate, &report),
        ))
    }

    async fn test_email<B>(&self, body: B) -> Result<Response<ResponseBody>, RelayError>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request: TestEmailRequest = read_json(body).await?;
        let (to, subject, message) = request.into_required()?;
        let mailer = self.state.notifier.mailer()?;

        let email = self
            .state
            .notifier
            .templates()
            .test_email(to, subject, &message)
            .map_err(|e| RelayError::InternalError(format!("Failed to render test email: {e}")))?;
        mailer
            .send(&email)
            .await
            .map_err(|e| RelayError::InternalError(format!("Failed to send test email: {e}")))?;

        tracing::info!(to = %email.to, "Sent test email");
        Ok(json_response(
            StatusCode::OK,
            &MessageResponse {
                success: true,
                message: "Test email sent successfully".into(),
            },
        ))
    }
}

/// Reads a bounded JSON body. An empty body reads as `T::default()`, so absent
/// fields are reported by the request's own validation.
async fn read_json<T, B>(body: B) -> Result<T, RelayError>
where
    T: DeserializeOwned + Default,
    B: Body + Send,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = Limited::new(body, MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| RelayError::BadRequest(format!("Failed to read request body: {e}")))?
        .to_bytes();

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| RelayError::BadRequest(format!("Invalid JSON body: {e}")))
}

impl<B> Service<Request<B>> for RelayService
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

/// Wraps the relay in its middleware. Any origin may call the relay, and CORS
/// preflights are answered here without reaching the routes.
pub fn build_stack(service: RelayService) -> Cors<RelayService> {
    ServiceBuilder::new()
        .layer(CorsLayer::permissive())
        .service(service)
}
