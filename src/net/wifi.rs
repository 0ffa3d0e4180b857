//! Wifi connection supervision
//!
//! The radio itself is driven by the platform layer. [`WifiMonitor`] owns the
//! connection state and turns radio and gateway-probe events into the
//! actions the platform must take next: start the station, bring up the
//! fallback access point, probe the gateway, reconnect after a lost probe,
//! and run the once-per-boot time sync and data file check.

use crate::core::error::{Result, UtilsError};
use crate::core::{LogArg, Logger};
use crate::util::Clock;
use crate::{log_dbg, log_inf, log_wrn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

/// Default interval between gateway probes
pub const DEFAULT_WIFI_TIMEOUT_SECS: u64 = 30;

/// Default wait for a reply from a remote FTP or SMTP server
pub const DEFAULT_RESPONSE_TIMEOUT_SECS: u64 = 10;

/// Longest hostname or SSID the radio accepts
pub const MAX_NAME_LEN: usize = 31;

/// Longest WPA passphrase
pub const MAX_PASSWORD_LEN: usize = 63;

/// Longest mDNS host label advertised
pub const MAX_MDNS_NAME_LEN: usize = 14;

const DEFAULT_SUBNET: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);

/// Wifi station and access point settings
///
/// Blank address fields mean DHCP for the station and the radio's default
/// address for the access point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiConfig {
    pub hostname: String,
    pub station_ssid: String,
    pub station_password: String,
    pub station_ip: String,
    pub station_subnet: String,
    pub station_gateway: String,
    pub station_dns1: String,
    pub station_dns2: String,
    pub ap_ssid: String,
    pub ap_password: String,
    pub ap_ip: String,
    pub ap_subnet: String,
    pub ap_gateway: String,
    /// Bring up the access point alongside the station
    pub allow_ap: bool,
    pub wifi_timeout_secs: u64,
    pub response_timeout_secs: u64,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            station_ssid: String::new(),
            station_password: String::new(),
            station_ip: String::new(),
            station_subnet: String::new(),
            station_gateway: String::new(),
            station_dns1: String::new(),
            station_dns2: String::new(),
            ap_ssid: String::new(),
            ap_password: String::new(),
            ap_ip: String::new(),
            ap_subnet: String::new(),
            ap_gateway: String::new(),
            allow_ap: true,
            wifi_timeout_secs: DEFAULT_WIFI_TIMEOUT_SECS,
            response_timeout_secs: DEFAULT_RESPONSE_TIMEOUT_SECS,
        }
    }
}

/// Fixed IPv4 settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticAddress {
    pub ip: Ipv4Addr,
    pub subnet: Ipv4Addr,
    pub gateway: Option<Ipv4Addr>,
    pub dns: Vec<Ipv4Addr>,
}

/// How the station obtains its address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addressing {
    Dhcp,
    Static(StaticAddress),
}

fn parse_ip(field: &str, value: &str) -> Result<Option<Ipv4Addr>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| UtilsError::address(field, value))
}

fn parse_static(
    prefix: &str,
    ip: &str,
    subnet: &str,
    gateway: &str,
    dns: &[&str],
) -> Result<Option<StaticAddress>> {
    let Some(ip) = parse_ip(&format!("{}_ip", prefix), ip)? else {
        return Ok(None);
    };
    let subnet = parse_ip(&format!("{}_subnet", prefix), subnet)?.unwrap_or(DEFAULT_SUBNET);
    let gateway = parse_ip(&format!("{}_gateway", prefix), gateway)?;

    let mut servers = Vec::new();
    for (i, value) in dns.iter().enumerate() {
        if let Some(server) = parse_ip(&format!("{}_dns{}", prefix, i + 1), value)? {
            servers.push(server);
        }
    }

    Ok(Some(StaticAddress {
        ip,
        subnet,
        gateway,
        dns: servers,
    }))
}

impl WifiConfig {
    /// Whether a station network is configured
    pub fn has_station(&self) -> bool {
        !self.station_ssid.is_empty()
    }

    /// Station addressing, DHCP unless a static IP is set
    pub fn station_addressing(&self) -> Result<Addressing> {
        let address = parse_static(
            "station",
            &self.station_ip,
            &self.station_subnet,
            &self.station_gateway,
            &[self.station_dns1.as_str(), self.station_dns2.as_str()],
        )?;
        Ok(address.map_or(Addressing::Dhcp, Addressing::Static))
    }

    /// Access point static address, `None` for the radio default
    pub fn ap_address(&self) -> Result<Option<StaticAddress>> {
        parse_static("ap", &self.ap_ip, &self.ap_subnet, &self.ap_gateway, &[])
    }

    /// Hostname cut to the mDNS label limit
    pub fn mdns_name(&self) -> &str {
        match self.hostname.char_indices().nth(MAX_MDNS_NAME_LEN) {
            Some((end, _)) => &self.hostname[..end],
            None => &self.hostname,
        }
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.wifi_timeout_secs)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    /// Check name lengths, probe interval and addresses
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("hostname", &self.hostname),
            ("station_ssid", &self.station_ssid),
            ("ap_ssid", &self.ap_ssid),
        ] {
            if value.len() > MAX_NAME_LEN {
                return Err(UtilsError::config(
                    "wifi",
                    format!("{} longer than {} bytes", field, MAX_NAME_LEN),
                ));
            }
        }
        for (field, value) in [
            ("station_password", &self.station_password),
            ("ap_password", &self.ap_password),
        ] {
            if value.len() > MAX_PASSWORD_LEN {
                return Err(UtilsError::config(
                    "wifi",
                    format!("{} longer than {} bytes", field, MAX_PASSWORD_LEN),
                ));
            }
        }
        if self.wifi_timeout_secs == 0 {
            return Err(UtilsError::config("wifi", "wifi_timeout_secs must be > 0"));
        }
        self.station_addressing()?;
        self.ap_address()?;
        Ok(())
    }
}

/// Encryption of a scanned network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Open,
    Wep,
    WpaPsk,
    Wpa2Psk,
    WpaWpa2Psk,
    Wpa2Enterprise,
    Max,
    Other(u8),
}

impl AuthMode {
    /// Map the radio driver's numeric auth mode
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => AuthMode::Open,
            1 => AuthMode::Wep,
            2 => AuthMode::WpaPsk,
            3 => AuthMode::Wpa2Psk,
            4 => AuthMode::WpaWpa2Psk,
            5 => AuthMode::Wpa2Enterprise,
            8 => AuthMode::Max,
            other => AuthMode::Other(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AuthMode::Open => "Open",
            AuthMode::Wep => "WEP",
            AuthMode::WpaPsk => "WPA_PSK",
            AuthMode::Wpa2Psk => "WPA2_PSK",
            AuthMode::WpaWpa2Psk => "WPA_WPA2_PSK",
            AuthMode::Wpa2Enterprise => "WPA2_ENTERPRISE",
            AuthMode::Max => "AUTH_MAX",
            AuthMode::Other(_) => "Not listed",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting,
    Connected,
    /// Station is up but the gateway stopped answering or the link dropped
    Degraded,
}

impl fmt::Display for WifiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WifiState::Disconnected => "disconnected",
            WifiState::Connecting => "connecting",
            WifiState::Connected => "connected",
            WifiState::Degraded => "degraded",
        };
        f.write_str(name)
    }
}

/// Input from the radio or the gateway probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WifiEvent {
    Start,
    GotIp(Ipv4Addr),
    ConnectTimeout,
    ProbeSuccess,
    ProbeTimeout,
    StationDisconnected,
    Stop,
    /// Platform finished checking data files
    DataFilesChecked,
}

/// Work for the platform layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiAction {
    BeginStation,
    StartAccessPoint,
    StartProbe,
    Reconnect,
    SyncTime,
    CheckDataFiles,
}

/// Station supervision state machine
pub struct WifiMonitor {
    config: WifiConfig,
    state: WifiState,
    first_start: bool,
    probing: bool,
    data_files_checked: bool,
    clock: Arc<Clock>,
    logger: Option<Arc<Logger>>,
}

impl WifiMonitor {
    pub fn new(config: WifiConfig, clock: Arc<Clock>) -> Self {
        Self {
            config,
            state: WifiState::Disconnected,
            first_start: true,
            probing: false,
            data_files_checked: false,
            clock,
            logger: None,
        }
    }

    /// Log transitions through `logger`
    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn config(&self) -> &WifiConfig {
        &self.config
    }

    pub fn is_probing(&self) -> bool {
        self.probing
    }

    /// Advance the state machine and return the actions to perform
    pub fn handle(&mut self, event: WifiEvent) -> Vec<WifiAction> {
        let mut actions = Vec::new();

        match event {
            WifiEvent::Start => {
                let station = self.config.has_station();
                if station {
                    if let Some(logger) = &self.logger {
                        log_inf!(
                            logger,
                            "Wifi Station started, connecting to: {}",
                            self.config.station_ssid.as_str()
                        );
                    }
                    actions.push(WifiAction::BeginStation);
                    self.transition(WifiState::Connecting);
                }
                if self.first_start && (!station || self.config.allow_ap) {
                    if let Some(logger) = &self.logger {
                        log_inf!(logger, "Wifi AP SSID: {} started", self.config.ap_ssid.as_str());
                    }
                    actions.push(WifiAction::StartAccessPoint);
                }
                self.first_start = false;
            }
            WifiEvent::GotIp(ip) => {
                if let Some(logger) = &self.logger {
                    log_inf!(logger, "Wifi Station IP, use 'http://{}' to connect", LogArg::display(ip));
                }
                self.transition(WifiState::Connected);
                self.start_probe(&mut actions);
            }
            WifiEvent::ConnectTimeout => {
                if self.state == WifiState::Connecting {
                    if let Some(logger) = &self.logger {
                        log_wrn!(
                            logger,
                            "Wifi Station {} not connected, retry on next probe",
                            self.config.station_ssid.as_str()
                        );
                    }
                    self.transition(WifiState::Degraded);
                    self.start_probe(&mut actions);
                }
            }
            WifiEvent::ProbeSuccess => {
                if matches!(self.state, WifiState::Connecting | WifiState::Degraded) {
                    self.transition(WifiState::Connected);
                }
                if !self.clock.is_synchronized() {
                    actions.push(WifiAction::SyncTime);
                }
                if !self.data_files_checked {
                    actions.push(WifiAction::CheckDataFiles);
                }
            }
            WifiEvent::ProbeTimeout => {
                if let Some(logger) = &self.logger {
                    log_wrn!(logger, "Failed to ping gateway, restart wifi ...");
                }
                self.transition(WifiState::Degraded);
                actions.push(WifiAction::Reconnect);
            }
            WifiEvent::StationDisconnected => {
                if let Some(logger) = &self.logger {
                    log_inf!(logger, "WiFi Station disconnected");
                }
                if self.state == WifiState::Connected {
                    self.transition(WifiState::Degraded);
                }
            }
            WifiEvent::Stop => {
                if let Some(logger) = &self.logger {
                    log_inf!(logger, "Wifi Station stopped");
                }
                self.probing = false;
                self.transition(WifiState::Disconnected);
            }
            WifiEvent::DataFilesChecked => {
                self.data_files_checked = true;
            }
        }

        actions
    }

    fn start_probe(&mut self, actions: &mut Vec<WifiAction>) {
        if !self.probing {
            self.probing = true;
            if let Some(logger) = &self.logger {
                log_inf!(logger, "Started ping monitoring");
            }
            actions.push(WifiAction::StartProbe);
        }
    }

    fn transition(&mut self, next: WifiState) {
        if self.state == next {
            return;
        }
        if let Some(logger) = &self.logger {
            log_dbg!(
                logger,
                "Wifi state {} -> {}",
                LogArg::display(self.state),
                LogArg::display(next)
            );
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::ChannelBroadcaster;
    use crate::LogLevel;

    fn station_config() -> WifiConfig {
        WifiConfig {
            hostname: "camera".into(),
            station_ssid: "office".into(),
            station_password: "secret".into(),
            ap_ssid: "camera-ap".into(),
            ..WifiConfig::default()
        }
    }

    fn monitor(config: WifiConfig) -> WifiMonitor {
        WifiMonitor::new(config, Arc::new(Clock::new()))
    }

    #[test]
    fn test_defaults() {
        let config = WifiConfig::default();
        assert!(config.allow_ap);
        assert_eq!(config.probe_interval(), Duration::from_secs(30));
        assert_eq!(config.response_timeout(), Duration::from_secs(10));
        assert_eq!(config.station_addressing().unwrap(), Addressing::Dhcp);
        assert_eq!(config.ap_address().unwrap(), None);
    }

    #[test]
    fn test_static_addressing() {
        let config = WifiConfig {
            station_ip: "192.168.1.50".into(),
            station_gateway: "192.168.1.1".into(),
            station_dns1: "192.168.1.1".into(),
            station_dns2: "8.8.8.8".into(),
            ..WifiConfig::default()
        };
        let Addressing::Static(addr) = config.station_addressing().unwrap() else {
            panic!("expected static addressing");
        };
        assert_eq!(addr.ip, Ipv4Addr::new(192, 168, 1, 50));
        assert_eq!(addr.subnet, Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(addr.gateway, Some(Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(addr.dns.len(), 2);
    }

    #[test]
    fn test_bad_address_rejected() {
        let config = WifiConfig {
            station_ip: "192.168.1.300".into(),
            ..WifiConfig::default()
        };
        let err = config.station_addressing().unwrap_err();
        assert!(matches!(err, UtilsError::AddressParse { ref field, .. } if field == "station_ip"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_lengths() {
        assert!(station_config().validate().is_ok());

        let config = WifiConfig {
            station_password: "x".repeat(64),
            ..WifiConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_json() {
        let config: WifiConfig =
            serde_json::from_str(r#"{"station_ssid":"home","allow_ap":false}"#).unwrap();
        assert_eq!(config.station_ssid, "home");
        assert!(!config.allow_ap);
        assert_eq!(config.wifi_timeout_secs, DEFAULT_WIFI_TIMEOUT_SECS);
    }

    #[test]
    fn test_mdns_name_truncated() {
        let config = WifiConfig {
            hostname: "esp32-camera-garden".into(),
            ..WifiConfig::default()
        };
        assert_eq!(config.mdns_name(), "esp32-camera-g");
        assert_eq!(station_config().mdns_name(), "camera");
    }

    #[test]
    fn test_auth_mode_names() {
        assert_eq!(AuthMode::from_raw(0).name(), "Open");
        assert_eq!(AuthMode::from_raw(3).name(), "WPA2_PSK");
        assert_eq!(AuthMode::from_raw(8).to_string(), "AUTH_MAX");
        assert_eq!(AuthMode::from_raw(42).name(), "Not listed");
    }

    #[test]
    fn test_first_start_brings_up_ap() {
        let mut wifi = monitor(station_config());
        let actions = wifi.handle(WifiEvent::Start);
        assert_eq!(actions, vec![WifiAction::BeginStation, WifiAction::StartAccessPoint]);
        assert_eq!(wifi.state(), WifiState::Connecting);

        // restarts never bring the AP up again
        wifi.handle(WifiEvent::Stop);
        assert_eq!(wifi.handle(WifiEvent::Start), vec![WifiAction::BeginStation]);
    }

    #[test]
    fn test_ap_only_without_station() {
        let config = WifiConfig {
            allow_ap: false,
            ..WifiConfig::default()
        };
        let mut wifi = monitor(config);
        assert_eq!(wifi.handle(WifiEvent::Start), vec![WifiAction::StartAccessPoint]);
        assert_eq!(wifi.state(), WifiState::Disconnected);
    }

    #[test]
    fn test_station_without_ap() {
        let config = WifiConfig {
            allow_ap: false,
            ..station_config()
        };
        let mut wifi = monitor(config);
        assert_eq!(wifi.handle(WifiEvent::Start), vec![WifiAction::BeginStation]);
    }

    #[test]
    fn test_connect_and_probe() {
        let mut wifi = monitor(station_config());
        wifi.handle(WifiEvent::Start);

        let actions = wifi.handle(WifiEvent::GotIp(Ipv4Addr::new(10, 0, 0, 5)));
        assert_eq!(actions, vec![WifiAction::StartProbe]);
        assert_eq!(wifi.state(), WifiState::Connected);
        assert!(wifi.is_probing());

        let actions = wifi.handle(WifiEvent::ProbeSuccess);
        assert_eq!(actions, vec![WifiAction::SyncTime, WifiAction::CheckDataFiles]);
    }

    #[test]
    fn test_probe_success_stops_after_done() {
        let clock = Arc::new(Clock::new());
        let mut wifi = WifiMonitor::new(station_config(), Arc::clone(&clock));
        wifi.handle(WifiEvent::Start);
        wifi.handle(WifiEvent::GotIp(Ipv4Addr::new(10, 0, 0, 5)));

        clock.mark_synchronized();
        assert_eq!(wifi.handle(WifiEvent::ProbeSuccess), vec![WifiAction::CheckDataFiles]);

        wifi.handle(WifiEvent::DataFilesChecked);
        assert!(wifi.handle(WifiEvent::ProbeSuccess).is_empty());
    }

    #[test]
    fn test_connect_timeout_degrades_and_probes() {
        let mut wifi = monitor(station_config());
        wifi.handle(WifiEvent::Start);

        assert_eq!(wifi.handle(WifiEvent::ConnectTimeout), vec![WifiAction::StartProbe]);
        assert_eq!(wifi.state(), WifiState::Degraded);

        // the probe keeps running; a lost probe asks for a reconnect
        assert_eq!(wifi.handle(WifiEvent::ProbeTimeout), vec![WifiAction::Reconnect]);
        let actions = wifi.handle(WifiEvent::GotIp(Ipv4Addr::new(10, 0, 0, 5)));
        assert!(actions.is_empty());
        assert_eq!(wifi.state(), WifiState::Connected);
    }

    #[test]
    fn test_disconnect_degrades() {
        let mut wifi = monitor(station_config());
        wifi.handle(WifiEvent::Start);
        wifi.handle(WifiEvent::GotIp(Ipv4Addr::new(10, 0, 0, 5)));

        assert!(wifi.handle(WifiEvent::StationDisconnected).is_empty());
        assert_eq!(wifi.state(), WifiState::Degraded);

        wifi.handle(WifiEvent::ProbeSuccess);
        assert_eq!(wifi.state(), WifiState::Connected);
    }

    #[test]
    fn test_transitions_logged() {
        let hub = Arc::new(ChannelBroadcaster::new(32));
        let rx = hub.subscribe();
        let logger = Arc::new(
            Logger::builder()
                .monitor_open(false)
                .min_level(LogLevel::Info)
                .broadcaster(hub)
                .build()
                .unwrap(),
        );

        let mut wifi = monitor(station_config()).with_logger(logger);
        wifi.handle(WifiEvent::Start);
        wifi.handle(WifiEvent::ProbeTimeout);

        let lines: Vec<String> = rx.try_iter().collect();
        assert!(lines[0].ends_with("Wifi Station started, connecting to: office"));
        assert!(lines.iter().any(|l| l.contains(" WRN ") && l.ends_with("Failed to ping gateway, restart wifi ...")));
    }
}
