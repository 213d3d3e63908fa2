//! Contains the building blocks the scheduler is made of.
//!
//! This module provides the task itself (its timing state, its callback and
//! the per-tick state machine) and the ordered registry that holds live tasks.
//! The `Scheduler` ties the two together.

pub mod registry;
pub mod task;
