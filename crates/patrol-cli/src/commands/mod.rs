pub mod common;
pub mod history;
pub mod list;
pub mod request;
pub mod update;
pub mod upload;
