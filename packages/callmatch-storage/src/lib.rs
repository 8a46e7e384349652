pub mod calls;
pub mod db;
pub mod models;
pub mod pending;
pub mod schema;
pub mod unmatched;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
