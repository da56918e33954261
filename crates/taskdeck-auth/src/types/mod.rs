//! Domain types for the auth core.

pub mod blacklist;
pub mod refresh_token;
pub mod role;
pub mod user;

pub use blacklist::{BlacklistEntry, BlacklistReason, FORCE_LOGOUT_SENTINEL};
pub use refresh_token::RefreshTokenRecord;
pub use role::{PermissionLevel, ProjectRole, Role};
pub use user::User;
