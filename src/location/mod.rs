mod service;

pub use service::{CheckError, CheckRequest, CheckResponse, CheckedIncident, LocationService};
