//! Tripaint session - the controlling thread's view of the application
//!
//! This crate ties the core crates together:
//! - [`session::Session`] - Committed mesh, load continuations, edits and saving
//! - [`tools::ToolRegistry`] - Tool selection gated by mesh capabilities
//! - [`notice::NoticeQueue`] - Severity-ordered user notices
//!
//! Everything here runs on one thread. Background work lives in
//! `tripaint-loading` and reaches the session only through its controller
//! queue, drained by [`session::Session::pump`].

pub mod error;
pub mod notice;
pub mod session;
pub mod tools;

pub use error::SessionError;
pub use notice::{Notice, NoticeQueue, Severity};
pub use session::Session;
pub use tools::{StandardTool, Tool, ToolClass, ToolRegistry};
