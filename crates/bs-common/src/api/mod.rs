pub mod connection;
pub mod daily_match;
pub mod feedback_request;
pub mod feedback_response;
pub mod match_request;
pub mod match_response;
pub mod notification;
pub mod profile_request;
pub mod recommendation;
pub mod ship;
pub mod stats;
