pub mod accounts;
pub mod matching;
pub mod notify;
pub mod rating;

pub use accounts::AccountDirectory;
pub use notify::Notifier;
