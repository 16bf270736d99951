//! Idempotent EDINET securities report downloader
//!
//! Walks a range of submission dates, picks annual securities reports of
//! listed companies out of each daily listing, stores their archives under
//! `<download_dir>/<YYYY>/<MM>/<DD>/` and records every stored document in
//! a SQLite ledger so that repeated runs never download a document twice.

pub mod config;
pub mod edinet;
pub mod ledger;
pub mod persist;
pub mod pipeline;
pub mod setup;

pub use config::Config;
pub use edinet::EdinetError;
pub use ledger::Ledger;
pub use persist::{PersistOutcome, Persister};
pub use pipeline::{Pipeline, RunSummary};
