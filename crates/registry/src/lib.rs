mod coinset;
mod error;
mod fee;
mod ledger;
mod registry;
mod wallet;

pub use coinset::*;
pub use error::*;
pub use fee::*;
pub use ledger::*;
pub use registry::*;
pub use wallet::*;
