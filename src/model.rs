pub mod source;
pub mod user;
pub mod view;
