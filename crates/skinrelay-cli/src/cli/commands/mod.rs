pub mod detect;
mod dispatch;
pub mod list;
pub mod output;
pub mod purge;
pub mod reset;
pub mod resolve;
pub mod session;
pub mod set;
pub mod show;

pub use dispatch::dispatch;
