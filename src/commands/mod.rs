//! CLI commands implementation

pub mod chat;
pub mod init;
pub mod process;
pub mod search;
pub mod tools;

pub use chat::*;
pub use init::*;
pub use process::*;
pub use search::*;
pub use tools::*;
