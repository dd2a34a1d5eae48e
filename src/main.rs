//! ESPSense Firmware — Main Entry Point
//!
//! Single-threaded cooperative loop around a hexagonal core.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SensorTable   LogEventSink   MonotonicClock   WifiAdapter     │
//! │  (SensorPort)  (EventSink)    (ClockPort)      (Connectivity)  │
//! │  UdpTransport  TcpTransport   Watchdog                         │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            EmulatorService (pure logic)                │    │
//! │  │  Registry · Telemetry · Discovery · Commands           │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use espsense::adapters::device_id;
use espsense::adapters::log_sink::LogEventSink;
use espsense::adapters::sensors::SensorTable;
#[cfg(not(target_os = "espidf"))]
use espsense::adapters::sensors::SimulatedMeter;
use espsense::adapters::time::MonotonicClock;
use espsense::adapters::wifi::{ConnectivityPort, WifiAdapter};
use espsense::app::ports::ClockPort;
use espsense::app::service::EmulatorService;
use espsense::config::EmulatorConfig;
use espsense::drivers::watchdog::Watchdog;
use espsense::error::Error;
use espsense::net::server::Server;
use espsense::net::tcp::TcpTransport;
use espsense::net::udp::UdpTransport;
use espsense::plug::registry::PlugRegistry;

// ── Bootstrap ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn init_platform() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn init_platform() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    Ok(())
}

/// The compiled-in document on the device; on the host, the file named
/// by the first argument if any.
#[cfg(target_os = "espidf")]
fn load_config() -> Result<EmulatorConfig> {
    Ok(EmulatorConfig::from_json(espsense::config::DEFAULT_CONFIG_JSON).map_err(Error::from)?)
}

#[cfg(not(target_os = "espidf"))]
fn load_config() -> Result<EmulatorConfig> {
    let json = match std::env::args().nth(1) {
        Some(path) => {
            info!("Config: loading {}", path);
            std::fs::read_to_string(&path)?
        }
        None => espsense::config::DEFAULT_CONFIG_JSON.to_owned(),
    };
    Ok(EmulatorConfig::from_json(&json).map_err(Error::from)?)
}

#[cfg(target_os = "espidf")]
fn attach_wifi_driver(wifi: &mut WifiAdapter, hostname: &str) -> Result<()> {
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let mut driver = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?;
    driver.sta_netif_mut().set_hostname(hostname)?;
    wifi.attach(BlockingWifi::wrap(driver, sysloop)?);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn attach_wifi_driver(_wifi: &mut WifiAdapter, _hostname: &str) -> Result<()> {
    Ok(())
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Platform bootstrap ─────────────────────────────────
    init_platform()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  ESPSense v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let clock = MonotonicClock::new();

    // ── 2. Configuration ──────────────────────────────────────
    let config = load_config()?;
    info!(
        "Config: {} plug(s), port {}, tcp={}",
        config.plugs.len(),
        config.port,
        config.tcp_enabled
    );

    // ── 3. Device identity + network ──────────────────────────
    let mac = device_id::read_mac();
    let host = device_id::hostname(&mac);
    info!("Device: hostname {}", host);

    let mut wifi = WifiAdapter::new();
    attach_wifi_driver(&mut wifi, &host)?;
    match &config.wifi {
        Some(creds) => {
            wifi.set_credentials(&creds.ssid, &creds.password)?;
            // A failed first attempt falls through to the backoff retries.
            if let Err(e) = wifi.connect(clock.uptime_ms()) {
                warn!("WiFi: initial connect failed ({}), retrying in background", e);
            }
        }
        None => info!("WiFi: no credentials configured, using platform network"),
    }

    // ── 4. Plugs + service ────────────────────────────────────
    let registry = PlugRegistry::from_config(&config, mac).map_err(Error::from)?;
    let mut service = EmulatorService::new(registry);
    let mut log_sink = LogEventSink::new();
    service.start(&mut log_sink);

    // On the device, slots stay empty until a metering driver publishes.
    #[cfg_attr(target_os = "espidf", allow(unused_mut))]
    let mut sensors = SensorTable::new();
    #[cfg(not(target_os = "espidf"))]
    let meter = SimulatedMeter::from_config(&config);

    // ── 5. Transports ─────────────────────────────────────────
    let budget = config.max_datagrams_per_tick;
    let udp_socket = UdpTransport::bind(config.port).map_err(Error::from)?;
    let mut udp = Server::new("UDP", udp_socket, budget);
    let mut tcp = if config.tcp_enabled {
        let listener = TcpTransport::bind(config.port).map_err(Error::from)?;
        Some(Server::new("TCP", listener, budget))
    } else {
        None
    };

    // Subscribed after bring-up: a blocking Wi-Fi connect must not trip it.
    let mut watchdog = Watchdog::default();
    info!("System ready. Entering emulator loop.");

    // ── 6. Emulator loop ──────────────────────────────────────
    let tick = std::time::Duration::from_millis(u64::from(config.tick_interval_ms));
    loop {
        let now_ms = clock.uptime_ms();
        #[cfg(not(target_os = "espidf"))]
        meter.update(&mut sensors, now_ms);

        udp.poll(&mut service, &sensors, &clock, &mut log_sink);
        if let Some(tcp) = tcp.as_mut() {
            tcp.poll(&mut service, &sensors, &clock, &mut log_sink);
        }

        wifi.poll(now_ms);
        watchdog.feed();
        std::thread::sleep(tick);
    }
}
