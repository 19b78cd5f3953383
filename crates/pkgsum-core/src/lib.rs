//! pkgsum-core: installed-package inventory with on-demand SHA-256 checksums.
//!
//! The [`registry::PackageRegistry`] owns an immutable snapshot of the
//! inventory and publishes every change through [`state::StateChannel`];
//! checksums of installer files are streamed by [`checksum`] at most once
//! per package.

pub mod config;
pub mod logging;

pub mod checksum;
pub mod error;
pub mod inventory;
pub mod model;
pub mod registry;
pub mod state;

pub use error::{Error, Result};
pub use model::{AppRecord, Snapshot};
pub use registry::PackageRegistry;
pub use state::{InventoryState, StateSubscription};
