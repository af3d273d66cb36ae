//! HTTP server for the markbox REST API.
//!
//! A single-threaded `tiny_http` accept loop: each request is read,
//! dispatched through [`crate::api_handler::handle_request`], and answered
//! as JSON with permissive CORS headers (the browser frontend is served
//! from a different origin).

use std::io::Read;

use tiny_http::{Header, Method, Request, Response, Server};

use crate::api_handler::{self, ApiResponse};
use crate::database::Database;

/// Starts the server and blocks serving requests until the process exits.
pub fn run(db: Database, port: u16) {
    let addr = format!("127.0.0.1:{}", port);
    let server = match Server::http(&addr) {
        Ok(s) => {
            println!("[HTTP] Server listening on http://{}", addr);
            s
        }
        Err(e) => {
            eprintln!("[HTTP] Failed to start server on {}: {}", addr, e);
            return;
        }
    };

    for request in server.incoming_requests() {
        if let Err(e) = handle(request, &db) {
            eprintln!("[HTTP] Error handling request: {}", e);
        }
    }
}

fn handle(mut request: Request, db: &Database) -> Result<(), String> {
    let method = request.method().clone();
    let url = request.url().to_string();
    println!("[HTTP] {} {}", method, url);

    if method == Method::Options {
        // CORS preflight
        let response = cors_response(json_response(204, ""));
        return request
            .respond(response)
            .map_err(|e| format!("failed to send response: {}", e));
    }

    let body = match method {
        Method::Post | Method::Put => {
            let mut buf = String::new();
            request
                .as_reader()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read body: {}", e))?;
            Some(buf)
        }
        _ => None,
    };

    let method_name = method.to_string().to_ascii_uppercase();
    let ApiResponse { status, body: payload } =
        api_handler::handle_request(db, &method_name, &url, body.as_deref());

    let response = cors_response(json_response(status, &payload.to_string()));
    request
        .respond(response)
        .map_err(|e| format!("failed to send response: {}", e))
}

fn json_response(status: u16, body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    let data = body.as_bytes().to_vec();
    let cursor = std::io::Cursor::new(data);
    Response::new(
        tiny_http::StatusCode(status),
        vec![Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap()],
        cursor,
        Some(body.len()),
        None,
    )
}

fn cors_response(
    mut response: Response<std::io::Cursor<Vec<u8>>>,
) -> Response<std::io::Cursor<Vec<u8>>> {
    response.add_header(
        Header::from_bytes(&b"Access-Control-Allow-Origin"[..], &b"*"[..]).unwrap(),
    );
    response.add_header(
        Header::from_bytes(
            &b"Access-Control-Allow-Methods"[..],
            &b"GET, POST, PUT, DELETE, OPTIONS"[..],
        )
        .unwrap(),
    );
    response.add_header(
        Header::from_bytes(&b"Access-Control-Allow-Headers"[..], &b"Content-Type"[..]).unwrap(),
    );
    response
}
