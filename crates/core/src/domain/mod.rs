pub mod status;
pub mod travel_request;
pub mod user;
