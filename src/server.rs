//! HTTP surface: `/probe`, `/metrics` and `/healthz` on a hyper server.

use std::convert::Infallible;
use std::net::TcpListener;
use std::sync::Arc;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use tracing::{error, info};

use crate::errors::ExporterError;
use crate::metrics::content_type;
use crate::probe::Prober;

/// Every `target` value from the query string, in order. Values are
/// percent-decoded but otherwise passed through untouched.
pub fn targets_from_query(query: Option<&str>) -> Vec<String> {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .filter(|(k, _)| k == "target")
                .map(|(_, v)| v.into_owned())
                .collect()
        })
        .unwrap_or_default()
}

fn metrics_response(body: String) -> Response<Body> {
    // Prometheus (v3+) rejects scrapes without the versioned text content type.
    let mut resp = Response::new(Body::from(body));
    if let Ok(value) = content_type().parse() {
        resp.headers_mut().insert(hyper::header::CONTENT_TYPE, value);
    }
    resp
}

fn plain(status: StatusCode, body: impl Into<Body>) -> Response<Body> {
    let mut resp = Response::new(body.into());
    *resp.status_mut() = status;
    resp
}

fn internal_error(e: ExporterError) -> Response<Body> {
    error!(error = %e, "Failed to render metrics");
    plain(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Route a single request.
pub async fn handle(req: Request<Body>, prober: Arc<Prober>) -> Result<Response<Body>, Infallible> {
    let resp = match (req.method(), req.uri().path()) {
        (&Method::GET, "/probe") => {
            let targets = targets_from_query(req.uri().query());
            match prober.probe(&targets).await {
                Ok(report) => metrics_response(report.body),
                Err(e @ ExporterError::MissingParameter(_)) => {
                    plain(StatusCode::BAD_REQUEST, e.to_string())
                }
                Err(e) => internal_error(e),
            }
        }

        (&Method::GET, "/metrics") => match prober.render().await {
            Ok(body) => metrics_response(body),
            Err(e) => internal_error(e),
        },

        (&Method::GET, "/healthz") => Response::new(Body::from("OK")),

        _ => plain(StatusCode::NOT_FOUND, Body::empty()),
    };

    Ok(resp)
}

/// Serve on an already-bound listener until the server fails.
pub async fn serve(listener: TcpListener, prober: Arc<Prober>) -> Result<(), ExporterError> {
    let addr = listener.local_addr().map_err(ExporterError::Listener)?;
    listener.set_nonblocking(true).map_err(ExporterError::Listener)?;

    let make_svc = make_service_fn(move |_conn| {
        let prober = Arc::clone(&prober);
        async move { Ok::<_, Infallible>(service_fn(move |req| handle(req, Arc::clone(&prober)))) }
    });

    info!(%addr, "Beginning to serve");
    Server::from_tcp(listener)?.serve(make_svc).await?;
    Ok(())
}
