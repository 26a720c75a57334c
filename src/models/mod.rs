pub mod driver;
pub mod location;
pub mod notification;
pub mod ride;
pub mod user;
