pub mod general;
pub mod timefmt;
