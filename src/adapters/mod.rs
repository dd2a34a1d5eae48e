//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements       | Connects to                  |
//! |-------------|------------------|------------------------------|
//! | `device_id` | —                | ESP32 eFuse factory MAC      |
//! | `log_sink`  | EventSink        | Serial log output            |
//! | `sensors`   | SensorPort       | In-memory sensor table       |
//! | `time`      | ClockPort        | ESP32 system timer           |
//! | `wifi`      | ConnectivityPort | ESP-IDF WiFi STA             |

pub mod device_id;
pub mod log_sink;
pub mod sensors;
pub mod time;
pub mod wifi;
