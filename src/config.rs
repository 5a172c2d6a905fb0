use std::{net, time};

use serde::Deserialize;

#[derive(Deserialize)]
pub struct Config {
    pub db: Db,
    pub http: Http,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase", tag = "backend")]
pub enum Db {
    Postgres(Postgres),

    /// Keeps tickets in process memory, losing them on restart.
    Memory(Memory),
}

#[derive(Deserialize)]
pub struct Postgres {
    pub url: String,
    #[serde(default, with = "humantime_serde")]
    pub connect_timeout: Option<time::Duration>,
}

#[derive(Default, Deserialize)]
pub struct Memory {
    /// Unlimited when absent.
    pub max_tickets: Option<usize>,
}

#[derive(Deserialize)]
pub struct Http {
    pub server: Server,
    pub cors: Cors,
}

#[derive(Deserialize)]
pub struct Server {
    pub addr: net::SocketAddr,
}

#[derive(Deserialize)]
pub struct Cors {
    pub allowed_origins: Vec<String>,
}
