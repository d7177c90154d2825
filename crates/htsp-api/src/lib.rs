// htsp-api: Async Rust client for the HTSP television backend protocol

pub mod codec;
pub mod connection;
pub mod correlator;
pub mod error;
pub mod message;

pub use codec::HtsmsgCodec;
pub use connection::{ConnectOptions, DiskSpace, HtspConnection, ServerInfo};
pub use correlator::{Correlator, Dispatch, EventListener, ResponseHandler};
pub use error::Error;
pub use message::{HtspMessage, Value};
