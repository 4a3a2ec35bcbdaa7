//! The `service` module decides whether the background streaming process
//! should run at all, and starts or stops it without redundant churn.

pub mod controller;

pub use controller::{
    RunState, ServiceCommand, ServiceController, ServiceLifecycle, decide_run_state,
};
