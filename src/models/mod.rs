pub mod user;
pub mod worker;
pub mod job;
pub mod review;
pub mod notification;

pub use user::*;
pub use worker::*;
pub use job::*;
pub use review::*;
pub use notification::*;
