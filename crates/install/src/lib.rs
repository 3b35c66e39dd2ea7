#![warn(clippy::pedantic)]
#![deny(clippy::all)]

//! Package installation sessions for firstrun
//!
//! This crate streams one archive at a time into a system installer through
//! a create / write / fsync / commit session, and abandons the session on
//! any write failure so nothing half-written is ever committed. The system
//! installer sits behind the [`PackageInstaller`] trait; [`StagingInstaller`]
//! implements it on a plain directory tree.

#[macro_use]
mod macros;
mod backend;
mod context;
mod session;
mod staging;

pub use backend::{
    CommitOutcome, CommitSender, CommitStatus, DefaultHandlerRegistry, InstallSession,
    PackageAdded, PackageInstaller, SessionMode, SessionParams, SessionWriter,
};
pub use context::ArchiveInstallContext;
pub use session::{install_archive, InstallReceipt};
pub use staging::{InstalledRecord, StagingInstaller};

// Re-export EventSender for use by macros and contexts
pub use firstrun_events::EventSender;
