//! Shared building blocks for the EduTrack client: wire types for the
//! classroom backend and the code executor, configuration, endpoint
//! builders and the persisted session store.

pub mod config;
pub mod endpoints;
pub mod session;
pub mod types;
