pub mod memory;
pub mod ticket;

use std::error::Error as StdError;

use async_trait::async_trait;
use derive_more::{Display, From};
use tokio_postgres::{tls::NoTlsStream, NoTls, Socket};

use crate::config;

pub use self::{
    memory::Memory,
    ticket::{Changes, NewTicket, Ticket},
};

pub type Connection = tokio_postgres::Connection<Socket, NoTlsStream>;

#[derive(Debug, Display, From)]
pub enum Error {
    #[from]
    #[display("postgres: {_0}")]
    Postgres(tokio_postgres::Error),

    /// In-memory store reached its configured ticket limit.
    #[display("store is full ({_0} tickets)")]
    Full(usize),
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Postgres(e) => Some(e),
            Self::Full(_) => None,
        }
    }
}

pub async fn connect(
    config: config::Postgres,
) -> Result<(Client, Connection), Error> {
    let mut pg = config.url.parse::<tokio_postgres::Config>()?;
    if let Some(timeout) = config.connect_timeout {
        pg.connect_timeout(timeout);
    }
    let (client, connection) = pg.connect(NoTls).await?;
    Ok((Client(client), connection))
}

pub struct Client(tokio_postgres::Client);

/// Persistence operations the HTTP layer needs from a ticket backend.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_ticket(&self, new: NewTicket) -> Result<Ticket, Error>;

    /// Returns every ticket, newest first.
    async fn list_tickets(&self) -> Result<Vec<Ticket>, Error>;

    async fn get_ticket_by_id(
        &self,
        id: ticket::Id,
    ) -> Result<Option<Ticket>, Error>;

    /// Applies the present fields of `changes` and bumps `updated_at`.
    ///
    /// Returns [`None`] if no ticket has the given `id`.
    async fn update_ticket(
        &self,
        id: ticket::Id,
        changes: &Changes,
    ) -> Result<Option<Ticket>, Error>;
}
