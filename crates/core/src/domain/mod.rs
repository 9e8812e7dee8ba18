pub mod profile;
pub mod request;
pub mod stats;
pub mod status;
