//! modelkit: model-driven CRUD, query compilation, and authentication core
//! for MySQL-backed web applications.
//!
//! The HTTP dispatch layer is an external collaborator: it hands this crate
//! already-parsed filter/field descriptors and a live pool handle, and gets
//! rows, errors, and session tokens back.

pub mod auth;
pub mod codec;
pub mod context;
pub mod error;
pub mod model;
pub mod query;
pub mod ratelimit;
pub mod session;
pub mod sql;

pub use auth::{hash_password, verify_password, AuthController, AuthSettings, Condition, LoginOutcome};
pub use codec::{decode_literal, decode_row, ResultRow, SqlValue};
pub use context::{AppContext, RateLimitSettings};
pub use error::{CodecError, Error};
pub use model::{Model, Relation, ResultStyle};
pub use query::QueryBuilder;
pub use ratelimit::{RateLimiter, RateLimiterStats, SweeperGuard};
pub use session::{MemorySessionStore, SessionStore};
pub use sql::{Filter, GroupBy, Join, JoinKind, Logic, Op, OrderBy, SortDir, SqlField, SqlParam, Statement};
