pub mod master;
pub mod worker;

pub use master::Master;
pub use worker::{handle_connection, ProxyContext, ProxyError};
