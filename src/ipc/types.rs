use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use crate::api::memory::MemoryTransport;
use crate::api::ApiClient;
use crate::config::Config;
use crate::model::Role;
use crate::store::QueryStore;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Http,
    Memory,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Http => "http",
            BackendKind::Memory => "memory",
        }
    }
}

/// Who is connected and through what. Replaced wholesale on reconnect.
pub struct Session {
    pub role: Role,
    pub user: Option<String>,
    pub backend: BackendKind,
    pub api: ApiClient,
    /// The in-memory backend behind `api`, kept so a reconnect can reuse it.
    pub memory: Option<Rc<RefCell<MemoryTransport>>>,
    pub connected_at: String,
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub session: Option<Session>,
    pub store: QueryStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        AppState {
            config,
            workspace: None,
            db: None,
            session: None,
            store: QueryStore::new(),
        }
    }
}
