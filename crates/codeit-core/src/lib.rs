pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod evictor;
pub mod guild_lock;
pub mod ledger;
pub mod parser;
pub mod prompt;
pub mod registry;
pub mod store;

pub use command::*;
pub use config::*;
pub use dispatcher::*;
pub use error::*;
pub use evictor::*;
pub use guild_lock::*;
pub use ledger::*;
pub use parser::*;
pub use registry::*;
pub use store::*;
