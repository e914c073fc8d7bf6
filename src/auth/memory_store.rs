//! In-memory storage
//! Mission: Satisfy every storage port without a database (tests, local runs)

use crate::auth::{
    models::{App, AppId, NewUser, User, UserId, UserInfo},
    ports::{AppProvider, StoreError, UserProvider, UserSaver},
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    ids_by_email: HashMap<String, UserId>,
    apps: HashMap<AppId, App>,
    last_user_id: UserId,
}

/// All three ports behind one lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision or replace an app.
    pub fn insert_app(&self, app: App) {
        self.tables.write().apps.insert(app.id, app);
    }
}

#[async_trait]
impl UserSaver for MemoryStore {
    async fn save_user(&self, user: NewUser) -> Result<UserId, StoreError> {
        // Check and insert under one write guard
        let mut tables = self.tables.write();
        if tables.ids_by_email.contains_key(&user.email) {
            return Err(StoreError::AlreadyExists);
        }

        tables.last_user_id += 1;
        let id = tables.last_user_id;
        tables.ids_by_email.insert(user.email.clone(), id);
        tables.users.insert(
            id,
            User {
                id,
                name: user.name,
                email: user.email,
                password_hash: user.password_hash,
                role: user.role,
                is_admin: user.is_admin,
            },
        );

        Ok(id)
    }
}

#[async_trait]
impl UserProvider for MemoryStore {
    async fn user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let tables = self.tables.read();
        tables
            .ids_by_email
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn user_by_id(&self, user_id: UserId) -> Result<UserInfo, StoreError> {
        self.tables
            .read()
            .users
            .get(&user_id)
            .map(User::info)
            .ok_or(StoreError::NotFound)
    }

    async fn is_admin(&self, user_id: UserId) -> Result<bool, StoreError> {
        self.tables
            .read()
            .users
            .get(&user_id)
            .map(|user| user.is_admin)
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl AppProvider for MemoryStore {
    async fn app(&self, app_id: AppId) -> Result<App, StoreError> {
        self.tables
            .read()
            .apps
            .get(&app_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}
