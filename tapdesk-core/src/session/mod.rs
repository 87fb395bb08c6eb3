//! Session lookup for `Tapdesk`
//!
//! This module provides the registry that maps session IDs to live
//! sessions for callbacks arriving from protocol threads.

mod registry;

pub use registry::SessionRegistry;
