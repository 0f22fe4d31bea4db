//! # sage-error
//!
//! Unified error handling for sage - following OpenDAL's error handling practices.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., FileNotFound, ConfigInvalid)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary, Persistent)
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use sage_error::Error;
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::tool_unknown("delete_files").with_operation("Tool::parse"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All fallible core functions return `Result<T, sage_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Tool execution converts errors to result strings at the registry
//!   boundary; errors never cross into the conversation as panics

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using sage Error
pub type Result<T> = std::result::Result<T, Error>;
