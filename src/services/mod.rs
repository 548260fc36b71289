pub mod association_index;
pub mod dashboard_service;
pub mod event_filter;
pub mod loader;
pub mod metrics;
pub mod presentation;
pub mod snapshot_service;
