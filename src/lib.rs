use diesel_migrations::{EmbeddedMigrations, embed_migrations};

pub mod config;
pub mod error;
pub mod schema;
pub mod state;
pub mod store;
pub mod tournaments;
pub mod util_resp;
pub mod validation;
pub mod workbook;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
