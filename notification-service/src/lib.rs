pub mod app;
pub mod config;
pub mod dispatcher;
pub mod mailer;

pub use dispatcher::{order_received, DispatchError, DispatchOutcome, Dispatcher, ORDER_RECEIVED_SUBJECT};
pub use mailer::{HttpMailer, LogMailer, MailError, Mailer, Notification};
