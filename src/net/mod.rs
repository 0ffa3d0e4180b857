//! Network collaborators of the logging pipeline

pub mod wifi;

pub use wifi::{
    Addressing, AuthMode, StaticAddress, WifiAction, WifiConfig, WifiEvent, WifiMonitor,
    WifiState,
};
