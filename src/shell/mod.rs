// Composition root for the trips bounded context.
//
// Responsibilities
// - Read config from environment.
// - Declare how every service is built and share one instance of each.
// - Wire handlers into the command bus and spawn the event listener.

pub mod config;
pub mod services;
pub mod workers;
