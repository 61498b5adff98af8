//! # naja-std
//!
//! Built-in extensions for the Naja AJAX layer.
//!
//! This crate provides:
//! - **Interaction**: [`UiHandler`], [`FormsHandler`]
//! - **Content**: [`SnippetHandler`], [`ScriptLoader`]
//! - **Navigation**: [`RedirectHandler`], [`HistoryHandler`]
//! - **Request control**: [`AbortHandler`], [`UniqueHandler`]
//! - **Scheduling**: [`TokioSpawner`]
//! - **Testing**: an in-memory document, a scripted transport and friends in
//!   [`testing`]
//!
//! # Registration Order
//!
//! Extension hooks run in registration order, which matters on `success`:
//! [`RedirectHandler`] must come before [`SnippetHandler`] so a redirecting
//! payload is never applied, and [`HistoryHandler`] after it so history
//! snapshots contain the updated snippets.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use naja_core;

pub mod abort;
pub mod forms;
pub mod history;
pub mod redirect;
pub mod script;
pub mod snippet;
pub mod spawn;
pub mod testing;
pub mod ui;
pub mod unique;

pub use abort::AbortHandler;
pub use forms::{FormValidator, FormsHandler};
pub use history::{BuildState, HistoryHandler, HistoryPhase, RestoreState};
pub use redirect::{Redirect, RedirectHandler};
pub use script::ScriptLoader;
pub use snippet::{AfterUpdate, BeforeUpdate, SnippetHandler};
pub use spawn::TokioSpawner;
pub use ui::{RequestFuture, UiHandler};
pub use unique::UniqueHandler;
