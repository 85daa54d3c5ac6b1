pub mod config;
pub mod error;
pub mod notification;
pub mod result;
pub mod rule;

pub use config::Config;
pub use error::*;
pub use notification::*;
pub use result::*;
pub use rule::*;
