//! Type definitions for value paths.

/// A single step in a path: an object key or a decimal array index.
pub type PathStep = String;

/// An ordered sequence of steps from the root of a value to one of its nodes.
///
/// The empty path addresses the root itself.
pub type Path = Vec<PathStep>;
