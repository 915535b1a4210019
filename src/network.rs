pub mod interface_selector;
pub mod types;

pub use interface_selector::{InterfaceProvider, InterfaceSelector, PcapInterfaceProvider};
pub use types::NetworkInterface;
