//! # Conveyor
//!
//! Record-keeping and provisioning core of a CI service: the build/job/log
//! ledger, repository provisioning, signed hook tokens, and encrypted
//! repository secrets. Usable as a library and through the `conveyor`
//! operator binary.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! conveyor = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use conveyor::config::Config;
//! use conveyor::provision::Provisioner;
//! use conveyor::remote::Detached;
//! use conveyor::store::{SqliteStore, Store};
//!
//! let config = Config::default();
//! let store = SqliteStore::open(&config).unwrap();
//! store.initialize().unwrap();
//!
//! let provisioner = Provisioner::new(Arc::new(store), Arc::new(Detached), config);
//! let out = provisioner.provision(&user, "octocat/hello-world", false).unwrap();
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod feed;
pub mod provision;
pub mod remote;
pub mod secrets;
pub mod store;
pub mod types;
pub mod users;
