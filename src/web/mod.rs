//! JSON API for the dashboard rendering layer.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that activates
//! one [`DashboardController`] and serves its state:
//! - `GET /api/dashboard`: view snapshot, filter via query parameters
//! - `GET /api/buckets`: chart buckets for the current or a given filter
//! - `GET /api/deliveries/latest`: the poller's cache
//! - `GET /api/activity`: recent activity log entries
//! - `GET /api/config`, `GET /api/health`
//!
//! Launched via `hookdash web` (default: `http://127.0.0.1:9747`).

mod api;

use std::io::Cursor;

use anyhow::Result;
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::dashboard::{DashboardController, PollerHandle};

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the API server on the given address.
///
/// Blocks the current thread. Requests are handled sequentially against the
/// controller; the poller keeps running on its own thread. Handler errors
/// become JSON 500 responses without stopping the server.
pub fn serve(addr: &str, mut controller: DashboardController) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("hookdash API running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");

    let poller = controller.activate();

    for request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        let result = dispatch(&mut controller, &poller, &method, &url);

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => error_response(500, &format!("{e:#}")),
        };
        let _ = request.respond(resp);

        // Brief access log
        println!(
            "{} {} {}",
            method,
            url,
            chrono::Local::now().format("%H:%M:%S")
        );
    }

    controller.deactivate(poller);
    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch an incoming request to the appropriate handler.
fn dispatch(
    controller: &mut DashboardController,
    poller: &PollerHandle,
    method: &Method,
    url: &str,
) -> Result<Response<Cursor<Vec<u8>>>> {
    // Strip query string for path matching
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        (&Method::Get, "/api/dashboard") => api::get_dashboard(controller, url),
        (&Method::Get, "/api/buckets") => api::get_buckets(controller, url),
        (&Method::Get, "/api/deliveries/latest") => api::get_latest_deliveries(controller, poller),
        (&Method::Get, "/api/activity") => api::get_activity(url),
        (&Method::Get, "/api/config") => api::get_config(),
        (&Method::Get, "/api/health") => api::get_health(controller, poller),

        // 404
        _ => Ok(error_response(404, "not found")),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// `{"error": ...}` with the given status.
pub(crate) fn error_response(status: u16, message: &str) -> Response<Cursor<Vec<u8>>> {
    let body = serde_json::json!({ "error": message }).to_string();
    Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(status))
}

/// JSON content type header.
pub(crate) fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8")
        .expect("static header is valid")
}
