use std::convert::Infallible;
use std::future::Future;
use std::net::{SocketAddr, TcpListener};

use anyhow::Result;
use chrono::Utc;
use hyper::header::{HeaderValue, CONTENT_TYPE, HOST};
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use log::*;
use serde::Serialize;
use serde_json::json;

use crate::service::InfoServicePtr;

pub const V1_APP_INFO_PATH: &str = "/v1/appinfo";

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Serves the app info endpoint on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, svc: InfoServicePtr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let make_svc = make_service_fn(move |conn: &AddrStream| {
        let svc = svc.clone();
        let remote_addr = conn.remote_addr();

        async move {
            Ok::<_, Infallible>(service_fn(move |req| handle(svc.clone(), remote_addr, req)))
        }
    });

    let server = Server::from_tcp(listener)?.serve(make_svc);
    info!("Starting server @ {}", server.local_addr());

    server.with_graceful_shutdown(shutdown).await?;

    info!("Server finished running");
    Ok(())
}

async fn handle(
    svc: InfoServicePtr,
    remote_addr: SocketAddr,
    req: Request<Body>,
) -> std::result::Result<Response<Body>, Infallible> {
    log_request(&req, remote_addr);

    let resp = match req.uri().path() {
        V1_APP_INFO_PATH => get_app_info(svc).await,
        _ => encode_error(StatusCode::NOT_FOUND, "not found"),
    };

    Ok(resp)
}

fn log_request(req: &Request<Body>, remote_addr: SocketAddr) {
    let host = req
        .headers()
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| req.uri().host())
        .unwrap_or_default();

    info!(
        "Received message at {}: method={} path={} host={host} remote_addr={remote_addr} request_uri={}",
        Utc::now().to_rfc3339(),
        req.method(),
        req.uri().path(),
        req.uri(),
    );
}

async fn get_app_info(svc: InfoServicePtr) -> Response<Body> {
    // the label file is read with blocking calls
    let result = tokio::task::spawn_blocking(move || svc.app_info()).await;

    match result {
        Ok(Ok(info)) => encode_json(StatusCode::OK, &info),

        Ok(Err(failure)) => {
            // Only the error goes back to the client
            warn!(
                "GetAppInfo failed: {} (pod_name={:?} namespace={:?})",
                failure.error, failure.partial.pod_name, failure.partial.namespace
            );
            encode_error(StatusCode::INTERNAL_SERVER_ERROR, &failure.to_string())
        }

        Err(err) => {
            error!("GetAppInfo task failed: {err}");
            encode_error(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    }
}

fn encode_json<T: Serialize>(status: StatusCode, payload: &T) -> Response<Body> {
    match serde_json::to_vec(payload) {
        Ok(mut body) => {
            body.push(b'\n');
            json_response(status, body)
        }
        Err(err) => {
            error!("Failed to encode response: {err}");
            encode_error(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    }
}

fn encode_error(status: StatusCode, msg: &str) -> Response<Body> {
    let mut body = json!({ "error": msg }).to_string().into_bytes();
    body.push(b'\n');

    json_response(status, body)
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response<Body> {
    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    resp
}
