mod topup;
mod transaction;
mod users;
mod wallet;

pub use topup::*;
pub use transaction::*;
pub use users::*;
pub use wallet::*;
