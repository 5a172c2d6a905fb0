use std::{fmt::Display, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use ticket_tracker::{api, db, http};
use tower::ServiceExt as _;

/// Failed response, with every message the server reported.
#[derive(Debug)]
pub struct Error {
    pub status: StatusCode,
    pub messages: Vec<String>,
}

/// Drives the whole router in process against a fresh in-memory store.
pub struct Client {
    app: Router,
}

impl Client {
    pub fn new() -> Self {
        Self::with_store(db::Memory::new())
    }

    pub fn with_store(store: impl db::Store + 'static) -> Self {
        let state = http::AppState::new(store);
        Self {
            app: http::router(Arc::new(state)),
        }
    }

    pub async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        body: Body,
    ) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .expect("failed to build a request");
        let res = self
            .app
            .clone()
            .oneshot(req)
            .await
            .expect("failed to send a request");
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("failed to get a response");
        (status, bytes.to_vec())
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        expected: StatusCode,
    ) -> Result<T, Error> {
        let body = match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        };
        let (status, bytes) = self.send_raw(method, uri, body).await;
        if status != expected {
            return Err(Error {
                status,
                messages: messages(&bytes),
            });
        }
        Ok(serde_json::from_slice(&bytes).expect("unexpected response body"))
    }

    pub async fn health(&self) -> Result<api::Health, Error> {
        self.send(Method::GET, "/", None, StatusCode::OK).await
    }

    pub async fn add_ticket(&self, body: Value) -> Result<api::Ticket, Error> {
        let res = self
            .send::<api::ticket::Single>(
                Method::POST,
                "/tickets",
                Some(body),
                StatusCode::CREATED,
            )
            .await?;
        assert!(res.status);
        Ok(res.ticket)
    }

    pub async fn add_simple_ticket(
        &self,
        title: &str,
        description: &str,
    ) -> api::Ticket {
        self.add_ticket(json!({
            "title": title,
            "description": description,
        }))
        .await
        .expect("failed to add a ticket")
    }

    pub async fn get_tickets(
        &self,
        status: Option<&str>,
    ) -> Result<api::ticket::List, Error> {
        let uri = match status {
            Some(status) => format!("/tickets?status={status}"),
            None => "/tickets".to_owned(),
        };
        let res = self
            .send::<api::ticket::List>(Method::GET, &uri, None, StatusCode::OK)
            .await?;
        assert!(res.status);
        Ok(res)
    }

    pub async fn get_ticket(
        &self,
        id: impl Display,
    ) -> Result<api::Ticket, Error> {
        let res = self
            .send::<api::ticket::Single>(
                Method::GET,
                &format!("/tickets/{id}"),
                None,
                StatusCode::OK,
            )
            .await?;
        assert!(res.status);
        Ok(res.ticket)
    }

    pub async fn edit_ticket(
        &self,
        id: impl Display,
        body: Value,
    ) -> Result<api::ticket::Updated, Error> {
        let res = self
            .send::<api::ticket::Updated>(
                Method::PUT,
                &format!("/tickets/{id}"),
                Some(body),
                StatusCode::OK,
            )
            .await?;
        assert!(res.status);
        Ok(res)
    }
}

fn messages(bytes: &[u8]) -> Vec<String> {
    if let Ok(rejected) = serde_json::from_slice::<api::Rejected>(bytes) {
        assert!(!rejected.status);
        return rejected.errors;
    }
    if let Ok(failure) = serde_json::from_slice::<api::Failure>(bytes) {
        assert!(!failure.status);
        return vec![failure.error];
    }
    vec![String::from_utf8_lossy(bytes).into_owned()]
}
