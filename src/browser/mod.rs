pub mod manager;
pub mod sniffer;

pub use manager::{BrowserSession, NavigationResult};
pub use sniffer::NetworkSniffer;
