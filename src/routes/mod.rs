pub mod account;
pub mod job;
pub mod notification;
pub mod review;
