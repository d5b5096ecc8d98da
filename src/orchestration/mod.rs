//! Orchestration layer for rescoping and publishing
//!
//! This module provides the high-level workflow that ties directory
//! discovery, manifest rewriting and package manager invocations together.

pub mod plan;
pub mod rescope_publisher;

pub use plan::{PlannedPackage, RunPlan, plan};
pub use rescope_publisher::{PackageRewrite, RescopePublisher, RescopedPackage, RunReport};
