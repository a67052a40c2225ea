// Library entry so integration tests can reach the zkouska core without a gateway.
// The binary (`main.rs`) wires the same modules to a serenity client.
pub mod config;
pub mod error;
pub mod handler;
pub mod model;
pub mod zkouska;

pub use error::ZkouskaError;
pub use model::AppState;
