pub mod billing_service;
pub mod scheduler;

pub use billing_service::{BillingPolicy, BillingService, ReactivationPolicy, ReconcileReport};
pub use scheduler::HorizonScheduler;
