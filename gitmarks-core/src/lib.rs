//! Grading engine and REST client for the GitMarks classroom platform.

pub mod api;
pub mod cache;
pub mod db;
pub mod diff_memo;
pub mod error;
pub mod feedback;
pub mod lang;
pub mod roles;
pub mod rubric;
pub mod schema;
pub mod tree;
pub mod types;
pub mod validation;
