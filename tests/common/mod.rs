//! Common test utilities for wlan_inventory integration tests.
//!
//! This module provides:
//! - Tracing initialization for test output
//! - Replay sessions built from fixtures
//! - Captured AireOS output fixtures

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use wi_collect::ReplaySession;

static INIT: Once = Once::new();

/// Initialize tracing once for integration tests.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::registry()
            .with(fmt::layer().with_test_writer())
            .with(filter)
            .init();
    });
}

/// Replay session answering from `(command, output)` pairs
pub fn replay(device: &str, responses: &[(&str, &str)]) -> ReplaySession {
    ReplaySession::from_map(
        device,
        responses
            .iter()
            .map(|(cmd, out)| ((*cmd).to_string(), (*out).to_string()))
            .collect::<HashMap<_, _>>(),
    )
}

// =============================================================================
// AireOS Output Fixtures
// =============================================================================

/// show sysinfo
pub const SYSINFO_FIXTURE: &str = "\
Manufacturer's Name.............................. Cisco Systems Inc.
Product Name..................................... Cisco Controller
Product Version.................................. 8.10.185.0
System Name...................................... wlc-lab
System Location.................................. Lab rack 4
";

/// show version from an IOS switch
pub const IOS_SYSINFO_FIXTURE: &str = "\
Cisco IOS Software, C3750E Software (C3750E-UNIVERSALK9-M), Version 15.0(2)SE11
% Invalid input detected at '^' marker.
";

/// show wlan summary with two WLANs
pub const WLAN_SUMMARY_FIXTURE: &str = "\
Number of WLANs.................................. 2

WLAN ID  WLAN Profile Name / SSID               Status    Interface Name        PMIPv6 Mobility
-------  -------------------------------------  --------  --------------------  ---------------
1        corp / corp                            Enabled   management            none
2        guest / Guest WiFi                     Disabled  guest-vlan            none

";

/// show remote-lan summary with none configured
pub const REMOTE_LAN_SUMMARY_EMPTY_FIXTURE: &str = "\
Number of Remote LANs............................ 0

RLAN ID  RLAN Profile Name      Status    Interface Name
-------  ---------------------  --------  -----------------

";

/// show remote-lan summary with one remote LAN
pub const REMOTE_LAN_SUMMARY_FIXTURE: &str = "\
Number of Remote LANs............................ 1

RLAN ID  RLAN Profile Name      Status    Interface Name
-------  ---------------------  --------  -----------------
5        rlan-test              Enabled   rlan-vlan

";

/// show guest-lan summary with one guest LAN
pub const GUEST_LAN_SUMMARY_FIXTURE: &str = "\
Number of Guest LANs............................. 1

GLAN ID  GLAN Profile Name      Status    Interface Name
-------  ---------------------  --------  -----------------
3        lobby-wired            Enabled   guest-wired

";

/// Rejected command on controllers without remote LAN support
pub const INCORRECT_USAGE_FIXTURE: &str = "\
Incorrect usage. Use the '?' or <TAB> key to list commands.
";

/// show wlan 1
pub const WLAN_1_DETAIL_FIXTURE: &str = "\
WLAN Identifier.................................. 1
Profile Name..................................... corp
Network Name (SSID).............................. corp
Status........................................... Enabled
MAC Filtering.................................... Disabled
Broadcast SSID................................... Enabled
AAA Policy Override.............................. Disabled
Network Admission Control
  Client Profiling Status
    Radius Profiling ............................ Disabled
Number of Active Clients......................... 12
Exclusionlist Timeout............................ 60 seconds
Session Timeout.................................. 1800 seconds
User Idle Timeout................................ Disabled
Interface........................................ management
Multicast Interface.............................. Not Configured
WLAN IPv4 ACL.................................... unconfigured
Ingress Interface................................ N/A
DHCP Server...................................... Default
DHCP Address Assignment Required................. Disabled
Quality of Service............................... Silver
Radio Policy..................................... All
Security

   802.11 Authentication:........................ Open System
   FT Support.................................... Adaptive
   Static WEP Keys............................... Disabled
   802.1X........................................ Disabled
   Wi-Fi Protected Access (WPA/WPA2)............. Enabled
      WPA (SSN IE)............................... Disabled
      WPA2 (RSN IE).............................. Enabled
         TKIP Cipher............................. Disabled
         AES Cipher.............................. Enabled
      Auth Key Management
         802.1x.................................. Enabled
         PSK..................................... Disabled
   Web Based Authentication...................... Disabled
Band Select...................................... Enabled
Load Balancing................................... Enabled
";

/// show wlan 2
pub const WLAN_2_DETAIL_FIXTURE: &str = "\
WLAN Identifier.................................. 2
Profile Name..................................... guest
Network Name (SSID).............................. Guest WiFi
Status........................................... Disabled
MAC Filtering.................................... Disabled
Broadcast SSID................................... Enabled
AAA Policy Override.............................. Enabled
Number of Active Clients......................... 0
Session Timeout.................................. Infinity
Interface........................................ guest-vlan
Multicast Interface.............................. Not Configured
Ingress Interface................................ N/A
DHCP Server...................................... 10.20.0.1
DHCP Address Assignment Required................. Enabled
Quality of Service............................... Bronze
Radio Policy..................................... 802.11a only
Security

   802.11 Authentication:........................ Open System
   802.1X........................................ Disabled
   Wi-Fi Protected Access (WPA/WPA2)............. Enabled
      WPA (SSN IE)............................... Disabled
      WPA2 (RSN IE).............................. Enabled
         TKIP Cipher............................. Disabled
         AES Cipher.............................. Enabled
      Auth Key Management
         802.1x.................................. Disabled
         PSK..................................... Enabled
   Web Based Authentication...................... Enabled
Band Select...................................... Disabled
Load Balancing................................... Disabled
";

/// show remote-lan 5
pub const REMOTE_LAN_5_DETAIL_FIXTURE: &str = "\
Remote LAN Identifier............................ 5
Profile Name..................................... rlan-test
Network Name (SSID).............................. rlan-test
Status........................................... Enabled
MAC Filtering.................................... Enabled
Number of Active Clients......................... 2
Session Timeout.................................. 1800 seconds
Interface........................................ rlan-vlan
DHCP Server...................................... Default
DHCP Address Assignment Required................. Disabled
Quality of Service............................... Silver
Security

   802.1X........................................ Enabled
   Web Based Authentication...................... Disabled
";

/// show guest-lan 3
pub const GUEST_LAN_3_DETAIL_FIXTURE: &str = "\
Guest LAN Identifier............................. 3
Profile Name..................................... lobby-wired
Network Name (SSID).............................. lobby-wired
Status........................................... Enabled
AAA Policy Override.............................. Disabled
Number of Active Clients......................... 1
Session Timeout.................................. 1800 seconds
Interface........................................ guest-wired
Ingress Interface................................ lobby-ingress
DHCP Server...................................... Default
DHCP Address Assignment Required................. Disabled
Quality of Service............................... Silver
Security

   Web Based Authentication...................... Enabled
";

/// Detail output mangled by a dropped connection
pub const GARBLED_DETAIL_FIXTURE: &str = "\
\x1b[2K\r--More-- or (q)uit
@@@@ ### ~~~~ partial line without any known label
ntifier.....
";

/// Two WLANs, no remote LANs and one guest LAN
pub fn scenario_responses() -> Vec<(&'static str, &'static str)> {
    vec![
        ("show sysinfo", SYSINFO_FIXTURE),
        ("show wlan summary", WLAN_SUMMARY_FIXTURE),
        ("show remote-lan summary", REMOTE_LAN_SUMMARY_EMPTY_FIXTURE),
        ("show guest-lan summary", GUEST_LAN_SUMMARY_FIXTURE),
        ("show wlan 1", WLAN_1_DETAIL_FIXTURE),
        ("show wlan 2", WLAN_2_DETAIL_FIXTURE),
        ("show guest-lan 3", GUEST_LAN_3_DETAIL_FIXTURE),
    ]
}

/// One entity in every category
pub fn all_categories_responses() -> Vec<(&'static str, &'static str)> {
    vec![
        ("show sysinfo", SYSINFO_FIXTURE),
        ("show wlan summary", WLAN_SUMMARY_FIXTURE),
        ("show remote-lan summary", REMOTE_LAN_SUMMARY_FIXTURE),
        ("show guest-lan summary", GUEST_LAN_SUMMARY_FIXTURE),
        ("show wlan 1", WLAN_1_DETAIL_FIXTURE),
        ("show wlan 2", WLAN_2_DETAIL_FIXTURE),
        ("show remote-lan 5", REMOTE_LAN_5_DETAIL_FIXTURE),
        ("show guest-lan 3", GUEST_LAN_3_DETAIL_FIXTURE),
    ]
}
