//! Engine module for FlowEngine implementation
//!
//! Provides the core engine and a flow context for linear stop-on-failure
//! execution.

pub mod core;
pub mod flow_ctx;

pub use core::FlowEngine;
pub use flow_ctx::FlowCtx;
