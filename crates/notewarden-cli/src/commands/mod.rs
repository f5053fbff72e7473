pub mod agent;
pub mod credential;
pub mod session;
pub mod utils;
