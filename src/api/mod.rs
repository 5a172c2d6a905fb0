pub mod input;
pub mod ticket;

use serde::{Deserialize, Serialize};

pub use self::{
    input::{Input, Invalid},
    ticket::Ticket,
};

/// Body of every non-validation failure.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Failure {
    pub status: bool,
    pub error: String,
}

/// Body of a request rejected by validation.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Rejected {
    pub status: bool,
    pub errors: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Health {
    pub status: String,
    pub message: String,
}
