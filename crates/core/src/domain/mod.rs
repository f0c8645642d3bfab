pub mod job;
pub mod recommendation;
pub mod request;
pub mod upload;
