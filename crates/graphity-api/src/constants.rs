//! Route paths served by the API.

pub const CREATE_PATH: &str = "/create";

pub const HEALTH_PATH: &str = "/health";
