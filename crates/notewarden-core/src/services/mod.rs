//! Operations exposed to the UI layer, as free functions over `AppCore`.

pub mod agent;
pub mod credentials;
pub mod sessions;
