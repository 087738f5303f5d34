//! Request handling for the mock server.

use super::ServerState;
use crate::error::MockError;
use crate::request::{Body, Request};
use crate::response::BufferedResponse;
use crate::url::RequestUrl;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, error};

/// Handle a request received by the mock server.
///
/// Engine failures are answered with `404 Not Found` while the server is
/// recoverable, and still reported to the registry's sink if one is set.
/// Otherwise they go through the registry's fatal path.
pub(super) async fn handle_mock_request(
    req: hyper::Request<Incoming>,
    state: Arc<ServerState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let method = parts.method.to_string();
    let url = RequestUrl::from_uri(&parts.uri);
    debug!(method = %method, url = %url, "received request");

    let body = match body.collect().await {
        Ok(collected) => Body::from(collected.to_bytes()),
        Err(e) => Body::Failed(e.to_string()),
    };

    let mut request = Request::new(method, url, body);
    for (name, value) in &parts.headers {
        request = request.with_header(
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }

    match respond(&state, &mut request) {
        Ok(response) => Ok(response.into_hyper()),
        Err(e) if state.is_recoverable() => {
            error!("{}", e);
            state.failures.record_error(&e.to_string());
            state.registry.report(&e);
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::NOT_FOUND;
            Ok(response)
        }
        Err(e) => state.registry.fail(&e),
    }
}

fn respond(state: &ServerState, request: &mut Request) -> Result<BufferedResponse, MockError> {
    let response = state.registry.try_requested(request)?;
    let mut target = BufferedResponse::default();
    response.write(request, &mut target)?;
    Ok(target)
}
