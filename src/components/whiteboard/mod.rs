mod component;
mod transport;

pub use component::SyncSurface;
pub use transport::WebSocketTransport;
