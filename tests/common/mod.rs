//! In-process stand-in for a Fronius inverter.
//!
//! An axum router served on a background thread with its own tokio runtime,
//! so the blocking client under test can call it from the test thread.
//! Unknown paths answer 404. Every request target is recorded.

#![allow(dead_code)]

use axum::Router;
use axum::http::{StatusCode, Uri, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const POWER_FLOW: &str = "/solar_api/v1/GetPowerFlowRealtimeData.fcgi";
pub const METER: &str = "/solar_api/v1/GetMeterRealtimeData.cgi";

#[derive(Clone)]
pub enum Reply {
    Json(String),
    Status(u16),
    Text(String),
    /// Wait before answering with the inner reply.
    Delayed(Duration, Box<Reply>),
}

type RequestLog = Arc<Mutex<Vec<String>>>;

pub struct StubServer {
    pub base_url: String,
    requests: RequestLog,
}

impl StubServer {
    pub fn spawn(routes: Vec<(&str, Reply)>) -> Self {
        let requests = RequestLog::default();

        let mut app = Router::new();
        for (path, reply) in routes {
            let seen = Arc::clone(&requests);
            app = app.route(path, get(move |uri: Uri| answer(seen, uri, reply)));
        }
        let seen = Arc::clone(&requests);
        let app = app.fallback(move |uri: Uri| answer(seen, uri, Reply::Status(404)));

        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        listener.set_nonblocking(true).expect("non-blocking listener");
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("stub runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
                axum::serve(listener, app).await.expect("stub server");
            });
        });

        Self { base_url, requests }
    }

    /// Request targets (path and query) in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// A base URL on which nothing is listening.
pub fn closed_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn answer(seen: RequestLog, uri: Uri, reply: Reply) -> Response {
    let target = uri.path_and_query().map_or_else(|| uri.path().to_string(), |pq| pq.to_string());
    seen.lock().unwrap().push(target);

    let mut reply = reply;
    while let Reply::Delayed(delay, inner) = reply {
        tokio::time::sleep(delay).await;
        reply = *inner;
    }
    respond(reply)
}

fn respond(reply: Reply) -> Response {
    match reply {
        Reply::Json(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Reply::Text(body) => Html(body).into_response(),
        Reply::Status(code) => {
            let status = StatusCode::from_u16(code).unwrap();
            (status, format!("status {}", code)).into_response()
        }
        Reply::Delayed(_, inner) => respond(*inner),
    }
}

// ---------------------------------------------------------------------------
// Canned payloads
// ---------------------------------------------------------------------------

pub fn power_flow_json(pv: &str, grid: &str, load: &str) -> String {
    format!(
        r#"{{
            "Body": {{ "Data": {{
                "Site": {{ "Mode": "meter", "P_Akku": null, "P_PV": {}, "P_Grid": {}, "P_Load": {} }},
                "Version": "12"
            }} }},
            "Head": {{ "Status": {{ "Code": 0, "Reason": "", "UserMessage": "" }} }}
        }}"#,
        pv, grid, load
    )
}

pub fn meter_json() -> String {
    r#"{
        "Body": { "Data": { "0": {
            "Current_AC_Phase_1": 7.1, "Current_AC_Phase_2": 6.9, "Current_AC_Phase_3": 7.4,
            "Voltage_AC_Phase_1": 229.8, "Voltage_AC_Phase_2": 231.2, "Voltage_AC_Phase_3": 230.5
        } } },
        "Head": { "Status": { "Code": 0, "Reason": "", "UserMessage": "" } }
    }"#
    .to_string()
}

/// An inverter answering both endpoints with the canonical sample.
pub fn healthy_inverter() -> StubServer {
    StubServer::spawn(vec![
        (POWER_FLOW, Reply::Json(power_flow_json("5230", "-1200", "-4030"))),
        (METER, Reply::Json(meter_json())),
    ])
}
