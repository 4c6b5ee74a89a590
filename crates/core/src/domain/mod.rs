pub mod comment;
pub mod item_group;
pub mod project;
pub mod request;
pub mod status;
pub mod user;
