//! ANPTOP Execution Engine Library
//!
//! This library provides the security tool catalog, command building from
//! templates, and audited subprocess execution with evidence artifacts.

pub mod audit;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod policy;
pub mod tools;
