#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! App selection model
//!
//! Keeps repository apps sorted by display name, merges re-inserted apps by
//! package id and reports every visible change as a [`SelectionChange`] so
//! a list view can update incrementally. [`SelectionOwner`] runs the model
//! on its own task; every mutation is posted to it.

mod model;
mod owner;

pub use model::{SelectionChange, SelectionModel};
pub use owner::{SelectionCommand, SelectionOwner, SelectionPoster};
