mod coin_record;
mod server_record;

pub use coin_record::*;
pub use server_record::*;
