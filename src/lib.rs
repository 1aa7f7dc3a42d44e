mod condition;
mod connection;
mod dispatch;
mod error;
mod expression;
mod instance;
mod mapper;
mod model;
mod query;
mod value;

pub use ::anyhow::Context;
pub use condition::*;
pub use connection::*;
pub use dispatch::*;
pub use error::*;
pub use expression::*;
pub use instance::*;
pub use mapper::*;
pub use model::*;
pub use query::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
