mod db;
mod error;
mod helpers;
mod ledger;
mod provider;
mod schema;

pub use db::*;
pub use error::*;
pub use helpers::*;
pub use ledger::*;
pub use provider::*;
pub use schema::*;
