//! # Child abstractions and specifications.
//!
//! This module provides the child-process-facing types:
//! - [`Child`] - trait for implementing async cancelable child bodies
//! - [`ChildFn`] - function-backed child implementation
//! - [`ChildRef`] - shared reference to a child body (`Arc<dyn Child>`)
//! - [`ChildSpec`] - specification bundling a child with its policies
//! - [`ChildProcess`] - the closed set of shapes accepted by the tree
//!   (spec / bare closure / nested tree)

mod child;
mod child_fn;
mod process;
mod spec;

pub use child::{Child, ChildRef};
pub use child_fn::ChildFn;
pub use process::ChildProcess;
pub use spec::ChildSpec;
