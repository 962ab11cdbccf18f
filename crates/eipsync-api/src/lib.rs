// eipsync-api: Async Rust clients for the SOLIDserver and Nautobot REST APIs

pub mod error;
pub mod nautobot;
pub mod solidserver;
pub mod transport;

pub use error::Error;
pub use nautobot::NautobotClient;
pub use solidserver::{IpVersion, RawRecord, SolidServerClient};
pub use transport::{TlsMode, TransportConfig};
