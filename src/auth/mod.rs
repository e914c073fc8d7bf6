//! Authentication Module
//! Mission: Register users, check passwords, and issue per-app signed tokens

pub mod api;
pub mod error;
pub mod jwt;
pub mod memory_store;
pub mod models;
pub mod observer;
pub mod password;
pub mod ports;
pub mod service;
pub mod user_store;

pub use api::AuthState;
pub use error::{AuthError, Resource};
pub use jwt::TokenCodec;
pub use memory_store::MemoryStore;
pub use observer::{AuthObserver, Operation, TracingObserver};
pub use password::PasswordHasher;
pub use ports::{AppProvider, StoreError, UserProvider, UserSaver};
pub use service::AuthService;
pub use user_store::UserStore;
