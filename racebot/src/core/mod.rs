pub mod controller;
pub mod race_error;
pub mod registry;
pub mod session;
