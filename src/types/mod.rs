pub mod device;
pub mod member;
pub mod notification;
