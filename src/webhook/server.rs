// ABOUTME: HTTP/1 receiver for GitHub webhook deliveries.
// ABOUTME: Verifies signatures, answers pings and queues push-triggered redeploys one at a time.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use super::event::PushEvent;
use super::signature;
use crate::error::{Error, Result};
use crate::pipeline::RunOutcome;
use crate::registry::{PushRedeploy, Registry};

const EVENT_HEADER: &str = "x-github-event";
const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const DELIVERY_HEADER: &str = "x-github-delivery";

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

struct ServerState {
    registry: Registry,
    path: String,
    secret: Option<String>,
    /// Held for the duration of each redeploy so runs never overlap.
    runs: Mutex<()>,
}

/// Receives push events and turns them into pipeline runs.
#[derive(Clone)]
pub struct WebhookServer {
    state: Arc<ServerState>,
}

impl WebhookServer {
    pub fn new(registry: Registry, path: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            state: Arc::new(ServerState {
                registry,
                path: path.into(),
                secret,
                runs: Mutex::new(()),
            }),
        }
    }

    /// Accept connections on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = listener
            .local_addr()
            .map_err(|e| Error::Server(e.to_string()))?;
        tracing::info!(%addr, path = %self.state.path, "webhook receiver listening");
        if self.state.secret.is_none() {
            tracing::warn!("no webhook secret configured; deliveries are not authenticated");
        }

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("webhook receiver shutting down");
                    break;
                }
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let state = self.state.clone();
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req: Request<Incoming>| {
                                    let state = state.clone();
                                    async move { Ok::<_, Infallible>(handle(state, req).await) }
                                });
                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(io, service)
                                    .await
                                {
                                    tracing::debug!(%remote_addr, "connection error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        // Let an in-flight redeploy reach its next checkpoint.
        let _guard = self.state.runs.lock().await;
        Ok(())
    }
}

fn respond(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

fn header<'a, B>(req: &'a Request<B>, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

async fn handle(state: Arc<ServerState>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    if req.uri().path() != state.path {
        return respond(StatusCode::NOT_FOUND, "not found");
    }
    if req.method() != Method::POST {
        return respond(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
    }

    let event_type = header(&req, EVENT_HEADER).unwrap_or_default().to_string();
    let delivery = header(&req, DELIVERY_HEADER).unwrap_or("-").to_string();
    let signature_header = header(&req, SIGNATURE_HEADER).map(str::to_string);

    let body = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::warn!(%delivery, "failed to read body: {}", e);
            return respond(StatusCode::BAD_REQUEST, "unreadable body");
        }
    };

    if let Some(ref secret) = state.secret {
        let valid = signature_header
            .as_deref()
            .is_some_and(|sig| signature::verify(secret, &body, sig));
        if !valid {
            tracing::warn!(%delivery, "rejected delivery with bad signature");
            return respond(StatusCode::UNAUTHORIZED, "bad signature");
        }
    }

    match event_type.as_str() {
        "ping" => respond(StatusCode::OK, "pong"),
        "push" => handle_push(state, &body, &delivery),
        other => {
            tracing::debug!(%delivery, event = other, "ignoring event");
            respond(StatusCode::ACCEPTED, "ignored")
        }
    }
}

fn handle_push(state: Arc<ServerState>, body: &[u8], delivery: &str) -> Response<Full<Bytes>> {
    let event = match PushEvent::from_slice(body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(%delivery, "malformed push payload: {}", e);
            return respond(StatusCode::BAD_REQUEST, "malformed push payload");
        }
    };

    if event.deleted {
        tracing::info!(%delivery, push = %event.describe(), "ignoring branch deletion");
        return respond(StatusCode::ACCEPTED, "ignored branch deletion");
    }

    let apps = match state.registry.apps_for_push(&event) {
        Ok(apps) => apps,
        Err(e) => {
            tracing::error!(%delivery, "failed to look up applications: {}", e);
            return respond(StatusCode::INTERNAL_SERVER_ERROR, "store error");
        }
    };
    if apps.is_empty() {
        tracing::info!(%delivery, push = %event.describe(), "no application tracks this push");
        return respond(StatusCode::NOT_FOUND, "no matching application");
    }

    let names: Vec<String> = apps.iter().map(|r| r.name.to_string()).collect();
    tracing::info!(%delivery, push = %event.describe(), apps = ?names, "redeploy queued");

    tokio::spawn(async move {
        let _guard = state.runs.lock().await;
        match state.registry.redeploy_from_push(&event).await {
            Ok(redeploys) => {
                for redeploy in redeploys {
                    log_redeploy(redeploy);
                }
            }
            Err(e) => tracing::error!(push = %event.describe(), "redeploy aborted: {}", e),
        }
    });

    respond(StatusCode::OK, format!("redeploying {}", names.join(", ")))
}

fn log_redeploy(redeploy: PushRedeploy) {
    let app = redeploy.name;
    match redeploy.result {
        Ok(report) => match report.outcome {
            RunOutcome::Completed => tracing::info!(%app, "redeploy completed"),
            RunOutcome::Failed { step, reason } => {
                tracing::error!(%app, %step, %reason, "redeploy failed");
            }
        },
        Err(e) => tracing::error!(%app, "redeploy not started: {}", e),
    }
}
