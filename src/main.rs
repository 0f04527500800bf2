//! Tapper firmware entry point
//!
//! Hexagonal architecture with a cooperative polling loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HBridge           LogEventSink   StatusPublisher   SystemClock│
//! │  (ActuatorPort)    (EventSink)    (EventSink→MQTT)  (ClockPort)│
//! │  MqttTransport ──▶ inbox                                       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            TapperService (pure logic)                  │    │
//! │  │  Watchdog · Timed drive · Legacy tap · Sequencer FSM   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyOutputPin, PinDriver};
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};

use tapper::adapters::device_id;
use tapper::adapters::log_sink::LogEventSink;
use tapper::adapters::mqtt::MqttTransport;
use tapper::adapters::status_publisher::{StatusPublisher, command_topic};
use tapper::adapters::time::SystemClock;
use tapper::app::commands::TapperCommand;
use tapper::app::ports::ClockPort;
use tapper::app::service::TapperService;
use tapper::config::TapperConfig;
use tapper::drivers::hbridge::HBridge;
use tapper::{inbox, pins};

/// Build-time network settings.  Provisioning is out of scope.
const WIFI_SSID: &str = match option_env!("TAPPER_WIFI_SSID") {
    Some(s) => s,
    None => "",
};
const WIFI_PASS: &str = match option_env!("TAPPER_WIFI_PASS") {
    Some(s) => s,
    None => "",
};
const MQTT_URL: &str = match option_env!("TAPPER_MQTT_URL") {
    Some(s) => s,
    None => "mqtt://192.168.1.100:1883",
};

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Tapper v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration (build-time override or defaults) ────
    let config = match option_env!("TAPPER_CONFIG_JSON") {
        Some(json) => TapperConfig::from_json(json).unwrap_or_else(|e| {
            warn!("Config override rejected ({}), using defaults", e);
            TapperConfig::default()
        }),
        None => TapperConfig::default(),
    };
    info!(
        "Config: loop {}ms, watchdog {}ms, drift {}ms/tap (cap {}ms), power {}",
        config.control_loop_interval_ms,
        config.safety_timeout_ms,
        config.drift_per_tap_ms,
        config.max_drift_ms,
        config.power_source
    );

    // ── 3. H-bridge ───────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    // SAFETY: `peripherals.pins` is never used, so these are the only
    // drivers for the two motor GPIOs.
    let in1 = PinDriver::output(unsafe { AnyOutputPin::new(pins::MOTOR_IN1_GPIO) })?;
    let in2 = PinDriver::output(unsafe { AnyOutputPin::new(pins::MOTOR_IN2_GPIO) })?;
    let mut bridge = HBridge::new(in1, in2);
    info!(
        "H-bridge on IN1=GPIO{} IN2=GPIO{}",
        pins::MOTOR_IN1_GPIO,
        pins::MOTOR_IN2_GPIO
    );

    // ── 4. Network ────────────────────────────────────────────
    let dev_id = device_id::device_id(&device_id::read_mac());
    info!("Device ID: {}", dev_id);

    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?,
        sysloop,
    )?;
    let network_up = match connect_wifi(&mut wifi) {
        Ok(()) => true,
        Err(e) => {
            warn!("WiFi unavailable ({}), running without MQTT", e);
            false
        }
    };

    let mqtt = if network_up {
        let topic = command_topic(&config.status_topic_prefix, &dev_id);
        MqttTransport::connect(MQTT_URL, &dev_id, topic)
            .inspect_err(|e| warn!("MQTT unavailable: {}", e))
            .ok()
    } else {
        None
    };

    let publisher = StatusPublisher::new(mqtt, &config.status_topic_prefix, &dev_id);
    info!("Status topic: {}", publisher.topic());
    let mut sink = (LogEventSink::new(), publisher);

    // ── 5. Tapper service ─────────────────────────────────────
    let clock = SystemClock::new();
    let mut svc = TapperService::new(&config);
    svc.start(clock.now(), &mut bridge, &mut sink);

    info!("System ready. Entering control loop.");

    // ── 6. Control loop ───────────────────────────────────────
    loop {
        if let Err(e) = sink.1.poll(svc.state_label()) {
            warn!("MQTT poll: {}", e);
        }

        let now = clock.now();
        inbox::drain_commands(|payload| match TapperCommand::decode(payload) {
            Ok(cmd) => svc.handle_command(cmd, now, &mut bridge, &mut sink),
            Err(e) => warn!("Command '{}' ignored: {}", payload, e),
        });

        svc.update(clock.now(), &mut bridge, &mut sink);

        FreeRtos::delay_ms(config.control_loop_interval_ms);
    }
}

fn connect_wifi(wifi: &mut BlockingWifi<EspWifi<'static>>) -> Result<()> {
    if WIFI_SSID.is_empty() {
        anyhow::bail!("no SSID configured");
    }
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: WIFI_SSID
            .try_into()
            .map_err(|_| anyhow::anyhow!("SSID too long"))?,
        password: WIFI_PASS
            .try_into()
            .map_err(|_| anyhow::anyhow!("password too long"))?,
        auth_method: if WIFI_PASS.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        ..Default::default()
    }))?;
    wifi.start()?;
    wifi.connect()?;
    wifi.wait_netif_up()?;
    info!("WiFi connected to '{}'", WIFI_SSID);
    Ok(())
}
