//! trenditools: a searchable directory of digital tools
//!
//! The crate has two halves. The read side is a search aggregator over
//! per-field full-text indexes with cursor pagination, bookmarks, and a
//! recommendation chat assistant. The write side is a resumable batch
//! pipeline that enriches raw URLs into catalog records: structured
//! extraction, screenshot capture, asset upload, and persistence.

pub mod assets;
pub mod capture;
pub mod chat;
pub mod commands;
pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod progress;
pub mod search;
pub mod storage;
pub mod store;

pub use error::{Error, Result};
