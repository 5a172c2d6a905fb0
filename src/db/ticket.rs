use std::{error::Error as StdError, str::FromStr};

use async_trait::async_trait;
use derive_more::Display;
use enum_utils::TryFromRepr;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    Row,
};
use uuid::Uuid;

use super::{Client, Error, Store};

#[derive(Clone, Debug, PartialEq)]
pub struct Ticket {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Ticket {
    /// Builds a freshly created ticket stamped with `now`.
    pub fn new(new: NewTicket, now: OffsetDateTime) -> Self {
        Self {
            id: Id::new(),
            title: new.title,
            description: new.description,
            priority: new.priority,
            status: new.status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites the fields present in `changes`, leaving the rest as is.
    pub fn apply(&mut self, changes: &Changes, now: OffsetDateTime) {
        if let Some(title) = &changes.title {
            self.title.clone_from(title);
        }
        if let Some(description) = &changes.description {
            self.description.clone_from(description);
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        self.updated_at = next_updated_at(self.updated_at, now);
    }
}

/// Already validated fields of a ticket about to be created.
#[derive(Clone, Debug, PartialEq)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
}

/// Already validated partial update. [`None`] means "leave untouched".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Changes {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
}

/// Keeps `updated_at` strictly increasing even if the clock did not move
/// (or moved backwards) since the previous write.
pub fn next_updated_at(
    prev: OffsetDateTime,
    now: OffsetDateTime,
) -> OffsetDateTime {
    if now > prev {
        now
    } else {
        prev + Duration::MICROSECOND
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    Hash,
    PartialEq,
    Serialize,
)]
pub struct Id(Uuid);

impl Id {
    pub fn new() -> Self {
        Id(Uuid::new_v4())
    }
}

impl From<u128> for Id {
    fn from(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl FromSql<'_> for Id {
    accepts!(UUID);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        Uuid::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for Id {
    accepts!(UUID);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, out)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    PartialEq,
    Serialize,
    TryFromRepr,
)]
#[repr(u8)]
pub enum Priority {
    #[default]
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Priority {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.to_string() == s)
            .ok_or(UnknownVariant)
    }
}

impl FromSql<'_> for Priority {
    accepts!(INT2);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        let repr = i16::from_sql(ty, raw)?;
        let repr = u8::try_from(repr)?;
        let priority =
            Self::try_from(repr).map_err(|_| "invalid priority")?;
        Ok(priority)
    }
}

impl ToSql for Priority {
    accepts!(INT2);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        let repr = i16::from((*self) as u8);
        repr.to_sql(ty, out)
    }
}

/// Lifecycle stage of a ticket.
///
/// Any stage may follow any other: a ticket can be closed straight from
/// [`Status::Open`] and reopened from [`Status::Closed`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    PartialEq,
    Serialize,
    TryFromRepr,
)]
#[repr(u8)]
pub enum Status {
    /// Ticket is waiting for someone to pick it up.
    #[default]
    Open = 1,

    /// Somebody is working on the ticket.
    #[display("In Progress")]
    #[serde(rename = "In Progress")]
    InProgress = 2,

    /// Ticket is resolved. It may still be reopened.
    Closed = 3,
}

impl Status {
    pub const ALL: [Self; 3] = [Self::Open, Self::InProgress, Self::Closed];

    /// Parses either the display spelling (`In Progress`) or the snake-cased
    /// key the frontend tabs use (`in_progress`).
    pub fn from_key(s: &str) -> Option<Self> {
        s.parse().ok().or_else(|| {
            Self::ALL.into_iter().find(|status| {
                status.to_string().to_lowercase().replace(' ', "_") == s
            })
        })
    }
}

impl FromStr for Status {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.to_string() == s)
            .ok_or(UnknownVariant)
    }
}

impl FromSql<'_> for Status {
    accepts!(INT2);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        let repr = i16::from_sql(ty, raw)?;
        let repr = u8::try_from(repr)?;
        let status = Self::try_from(repr).map_err(|_| "invalid status")?;
        Ok(status)
    }
}

impl ToSql for Status {
    accepts!(INT2);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        let repr = i16::from((*self) as u8);
        repr.to_sql(ty, out)
    }
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[display("unknown variant")]
pub struct UnknownVariant;

impl StdError for UnknownVariant {}

fn ticket_from_row(row: &Row) -> Ticket {
    Ticket {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        priority: row.get("priority"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl Client {
    /// Creates the `tickets` table and its ordering index if they are
    /// missing. Existing data is left alone.
    pub async fn sync_schema(&self) -> Result<(), Error> {
        const SQL: &str = "\
            CREATE TABLE IF NOT EXISTS tickets ( \
                id UUID PRIMARY KEY, \
                title VARCHAR(255) NOT NULL CHECK (title <> ''), \
                description TEXT NOT NULL CHECK (description <> ''), \
                priority INT2 NOT NULL DEFAULT 1, \
                status INT2 NOT NULL DEFAULT 1, \
                created_at TIMESTAMPTZ NOT NULL, \
                updated_at TIMESTAMPTZ NOT NULL \
            ); \
            CREATE INDEX IF NOT EXISTS tickets_created_at_idx \
                ON tickets (created_at DESC, id DESC);";

        self.0.batch_execute(SQL).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for Client {
    async fn insert_ticket(&self, new: NewTicket) -> Result<Ticket, Error> {
        // Postgres keeps microseconds only, so two inserts within the same
        // microsecond would tie on `created_at`. Stepping past the newest
        // row keeps the listing in insertion order.
        const SQL: &str = "\
            INSERT INTO tickets (id, title, description, priority, status, \
                                 created_at, updated_at) \
            SELECT $1, $2, $3, $4, $5, stamp.at, stamp.at \
            FROM (SELECT GREATEST($6::TIMESTAMPTZ, \
                                  MAX(created_at) \
                                      + INTERVAL '1 microsecond') AS at \
                  FROM tickets) AS stamp \
            RETURNING id, title, description, priority, status, \
                      created_at, updated_at";

        let ticket = Ticket::new(new, OffsetDateTime::now_utc());
        let row = self
            .0
            .query_one(
                SQL,
                &[
                    &ticket.id,
                    &ticket.title,
                    &ticket.description,
                    &ticket.priority,
                    &ticket.status,
                    &ticket.created_at,
                ],
            )
            .await?;
        Ok(ticket_from_row(&row))
    }

    async fn list_tickets(&self) -> Result<Vec<Ticket>, Error> {
        const SQL: &str = "\
            SELECT id, title, description, priority, status, \
                   created_at, updated_at \
            FROM tickets \
            ORDER BY created_at DESC, \
                     id DESC";
        Ok(self
            .0
            .query(SQL, &[])
            .await?
            .iter()
            .map(ticket_from_row)
            .collect())
    }

    async fn get_ticket_by_id(
        &self,
        id: Id,
    ) -> Result<Option<Ticket>, Error> {
        const SQL: &str = "\
            SELECT id, title, description, priority, status, \
                   created_at, updated_at \
            FROM tickets \
            WHERE id = $1";
        Ok(self.0.query_opt(SQL, &[&id]).await?.as_ref().map(ticket_from_row))
    }

    async fn update_ticket(
        &self,
        id: Id,
        changes: &Changes,
    ) -> Result<Option<Ticket>, Error> {
        // Postgres keeps microseconds, so that is the smallest step that
        // still moves `updated_at` forward.
        const SQL: &str = "\
            UPDATE tickets \
            SET title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                priority = COALESCE($4, priority), \
                status = COALESCE($5, status), \
                updated_at = GREATEST($6, \
                                      updated_at + INTERVAL '1 microsecond') \
            WHERE id = $1 \
            RETURNING id, title, description, priority, status, \
                      created_at, updated_at";

        let now = OffsetDateTime::now_utc();
        Ok(self
            .0
            .query_opt(
                SQL,
                &[
                    &id,
                    &changes.title,
                    &changes.description,
                    &changes.priority,
                    &changes.status,
                    &now,
                ],
            )
            .await?
            .as_ref()
            .map(ticket_from_row))
    }
}
