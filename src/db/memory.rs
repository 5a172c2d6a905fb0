use async_trait::async_trait;
use itertools::Itertools as _;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{ticket, Changes, Error, NewTicket, Store, Ticket};

/// [`Store`] keeping tickets in process memory.
///
/// Used for local runs without a database and by tests.
#[derive(Debug, Default)]
pub struct Memory {
    /// Tickets in insertion order.
    tickets: RwLock<Vec<Ticket>>,

    /// Inserts beyond this many tickets fail with [`Error::Full`].
    max_tickets: Option<usize>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_tickets: usize) -> Self {
        Self {
            tickets: RwLock::default(),
            max_tickets: Some(max_tickets),
        }
    }
}

#[async_trait]
impl Store for Memory {
    async fn insert_ticket(&self, new: NewTicket) -> Result<Ticket, Error> {
        let mut tickets = self.tickets.write().await;
        if let Some(max) = self.max_tickets {
            if tickets.len() >= max {
                return Err(Error::Full(max));
            }
        }
        // Later inserts never sort before earlier ones, whatever the clock
        // does in between.
        let now = OffsetDateTime::now_utc();
        let now = match tickets.last() {
            Some(last) => ticket::next_updated_at(last.created_at, now),
            None => now,
        };
        let ticket = Ticket::new(new, now);
        tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn list_tickets(&self) -> Result<Vec<Ticket>, Error> {
        Ok(self
            .tickets
            .read()
            .await
            .iter()
            .rev()
            .sorted_by(|a, b| b.created_at.cmp(&a.created_at))
            .cloned()
            .collect())
    }

    async fn get_ticket_by_id(
        &self,
        id: ticket::Id,
    ) -> Result<Option<Ticket>, Error> {
        Ok(self
            .tickets
            .read()
            .await
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn update_ticket(
        &self,
        id: ticket::Id,
        changes: &Changes,
    ) -> Result<Option<Ticket>, Error> {
        let mut tickets = self.tickets.write().await;
        let Some(ticket) = tickets.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        ticket.apply(changes, OffsetDateTime::now_utc());
        Ok(Some(ticket.clone()))
    }
}
