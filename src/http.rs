use std::{any::Any, convert::Infallible, sync::Arc};

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use derive_more::From;
use serde_json::Value;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::{
    api::{self, Input},
    db,
};

pub type SharedAppState = Arc<AppState>;

pub struct AppState {
    pub store: Box<dyn db::Store>,
}

impl AppState {
    pub fn new(store: impl db::Store + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }
}

pub fn router(state: SharedAppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/tickets", get(list_tickets).post(add_ticket))
        .route("/tickets/:id", get(get_ticket).put(edit_ticket))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panicked))
        .with_state(state)
}

/// JSON body decoded into `T` but not yet checked.
///
/// Never rejects, so a handler can decide itself when a bad body matters.
pub struct Payload<T>(pub Result<T, api::Invalid>);

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: Input + Send,
{
    type Rejection = Infallible;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let input = match Json::<Value>::from_request(req, state).await {
            Ok(Json(value)) => T::from_json(value),
            Err(rejection) => Err(api::Invalid::single(rejection.body_text())),
        };
        Ok(Self(input))
    }
}

/// JSON body that passed every rule of `T`, already normalized.
pub struct Valid<T: Input>(pub T::Output);

#[async_trait]
impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: Input + Send,
    T::Output: Send,
{
    type Rejection = api::Invalid;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Payload(input) = match Payload::<T>::from_request(req, state).await
        {
            Ok(payload) => payload,
            Err(never) => match never {},
        };
        input.and_then(Input::check).map(Self)
    }
}

/// Query string that passed every rule of `T`, already normalized.
pub struct ValidQuery<T: Input>(pub T::Output);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: Input + Send,
    T::Output: Send,
{
    type Rejection = api::Invalid;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Query(input) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| api::Invalid::single(rejection.body_text()))?;
        input.check().map(Self)
    }
}

impl IntoResponse for api::Invalid {
    fn into_response(self) -> Response {
        let body = api::Rejected {
            status: false,
            errors: self.0,
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

fn failure(status: StatusCode, error: &str) -> Response {
    let body = api::Failure {
        status: false,
        error: error.into(),
    };
    (status, Json(body)).into_response()
}

fn panicked(_: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("request handler panicked");
    failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

fn ticket_not_found() -> Response {
    failure(StatusCode::NOT_FOUND, "Ticket not found")
}

fn internal_error(e: &db::Error) -> Response {
    tracing::error!("storage failure: {e}");
    failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

async fn health() -> Json<api::Health> {
    Json(api::Health {
        status: "OK".into(),
        message: "Server is running".into(),
    })
}

async fn add_ticket(
    State(state): State<SharedAppState>,
    Valid(new): Valid<api::input::CreateTicket>,
) -> Result<(StatusCode, Json<api::ticket::Single>), AddTicketError> {
    let ticket = state.store.insert_ticket(new).await?;
    tracing::info!(ticket.id = %ticket.id, "ticket created");

    Ok((
        StatusCode::CREATED,
        Json(api::ticket::Single {
            status: true,
            ticket: ticket.into(),
        }),
    ))
}

#[derive(Debug, From)]
pub enum AddTicketError {
    #[from]
    DbError(db::Error),
}

impl IntoResponse for AddTicketError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(e) => internal_error(&e),
        }
    }
}

async fn list_tickets(
    State(state): State<SharedAppState>,
    ValidQuery(filter): ValidQuery<api::input::ListTickets>,
) -> Result<Json<api::ticket::List>, ListTicketsError> {
    let all = state.store.list_tickets().await?;
    let counts = all.iter().collect::<api::ticket::Counts>();
    let tickets = all
        .into_iter()
        .filter(|t| filter.map_or(true, |status| t.status == status))
        .map(api::Ticket::from)
        .collect::<Vec<_>>();

    let message = if tickets.is_empty() {
        "No tickets found"
    } else {
        "Ticket fetched successfully"
    };
    Ok(Json(api::ticket::List {
        status: true,
        tickets,
        counts,
        message: message.into(),
    }))
}

#[derive(Debug, From)]
pub enum ListTicketsError {
    #[from]
    DbError(db::Error),
}

impl IntoResponse for ListTicketsError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(e) => internal_error(&e),
        }
    }
}

async fn get_ticket(
    State(state): State<SharedAppState>,
    Path(id): Path<String>,
) -> Result<Json<api::ticket::Single>, GetTicketError> {
    use GetTicketError as E;

    // Nothing is stored under an id that is not a UUID.
    let id = id.parse::<api::ticket::Id>().map_err(|_| E::TicketNotFound)?;
    let ticket = state
        .store
        .get_ticket_by_id(id)
        .await?
        .ok_or(E::TicketNotFound)?;

    Ok(Json(api::ticket::Single {
        status: true,
        ticket: ticket.into(),
    }))
}

#[derive(Debug, From)]
pub enum GetTicketError {
    #[from]
    DbError(db::Error),
    TicketNotFound,
}

impl IntoResponse for GetTicketError {
    fn into_response(self) -> Response {
        match self {
            Self::TicketNotFound => ticket_not_found(),
            Self::DbError(e) => internal_error(&e),
        }
    }
}

async fn edit_ticket(
    State(state): State<SharedAppState>,
    Path(id): Path<String>,
    Payload(input): Payload<api::input::UpdateTicket>,
) -> Result<Json<api::ticket::Updated>, EditTicketError> {
    use EditTicketError as E;

    // An unknown ticket is reported before anything wrong with the body.
    let id = id.parse::<api::ticket::Id>().map_err(|_| E::TicketNotFound)?;
    state
        .store
        .get_ticket_by_id(id)
        .await?
        .ok_or(E::TicketNotFound)?;
    let changes = input.and_then(Input::check)?;
    let ticket = state
        .store
        .update_ticket(id, &changes)
        .await?
        .ok_or(E::TicketNotFound)?;
    tracing::info!(
        ticket.id = %ticket.id,
        ticket.status = %ticket.status,
        "ticket updated",
    );

    Ok(Json(api::ticket::Updated {
        status: true,
        ticket: ticket.into(),
        message: "Ticket updated successfully".into(),
    }))
}

#[derive(Debug, From)]
pub enum EditTicketError {
    #[from]
    DbError(db::Error),
    #[from]
    Invalid(api::Invalid),
    TicketNotFound,
}

impl IntoResponse for EditTicketError {
    fn into_response(self) -> Response {
        match self {
            Self::Invalid(invalid) => invalid.into_response(),
            Self::TicketNotFound => ticket_not_found(),
            Self::DbError(e) => internal_error(&e),
        }
    }
}
