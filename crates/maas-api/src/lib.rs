// maas-api: Async HTTP clients for the collaborators of the link engine
// (DHCP host-map agent) and the boot subsystem (Ubuntu ports archive).

pub mod agent;
pub mod archive;
pub mod error;
pub mod packages;
pub mod transport;

pub use agent::{DhcpAgentClient, HostMapEntry};
pub use archive::ArchiveClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
