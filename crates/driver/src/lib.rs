mod conditions;
mod error;
mod mirror;
mod runner;
mod selection;
mod spend;

pub use conditions::*;
pub use error::*;
pub use mirror::*;
pub use runner::*;
pub use selection::*;
pub use spend::*;
