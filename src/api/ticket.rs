use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::db;

pub use crate::db::ticket::{Id, Priority, Status};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Ticket {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<db::Ticket> for Ticket {
    fn from(ticket: db::Ticket) -> Self {
        Self {
            id: ticket.id,
            title: ticket.title,
            description: ticket.description,
            priority: ticket.priority,
            status: ticket.status,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        }
    }
}

/// Body of a successful `POST /tickets` and `GET /tickets/:id`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Single {
    pub status: bool,
    pub ticket: Ticket,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Updated {
    pub status: bool,
    pub ticket: Ticket,
    pub message: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct List {
    pub status: bool,
    pub tickets: Vec<Ticket>,
    pub counts: Counts,
    pub message: String,
}

/// Number of tickets in each lifecycle stage.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Counts {
    pub open: usize,
    pub in_progress: usize,
    pub closed: usize,
}

impl<'a> FromIterator<&'a db::Ticket> for Counts {
    fn from_iter<I: IntoIterator<Item = &'a db::Ticket>>(iter: I) -> Self {
        iter.into_iter().fold(Self::default(), |mut counts, ticket| {
            match ticket.status {
                Status::Open => counts.open += 1,
                Status::InProgress => counts.in_progress += 1,
                Status::Closed => counts.closed += 1,
            }
            counts
        })
    }
}
