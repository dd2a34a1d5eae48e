//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the device if the emulator loop stops polling its sockets for
//! longer than the configured timeout. The loop calls [`Watchdog::feed`]
//! once per tick. On the host every call is a no-op apart from the feed
//! counter.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{
    ESP_OK, esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure,
    esp_task_wdt_reset,
};
use log::{info, warn};

/// Default stall window before a reset.
pub const DEFAULT_TIMEOUT_MS: u32 = 10_000;

pub struct Watchdog {
    timeout_ms: u32,
    subscribed: bool,
    feeds: u32,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_MS)
    }
}

impl Watchdog {
    /// Configure the TWDT and subscribe the calling task.
    #[cfg(target_os = "espidf")]
    pub fn new(timeout_ms: u32) -> Self {
        let cfg = esp_task_wdt_config_t {
            timeout_ms,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        let ret = unsafe { esp_task_wdt_reconfigure(&cfg) };
        if ret != ESP_OK {
            warn!("Watchdog: reconfigure returned {} (may already be configured)", ret);
        }

        let ret = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
        let subscribed = ret == ESP_OK;
        if subscribed {
            info!("Watchdog: subscribed ({} ms timeout)", timeout_ms);
        } else {
            warn!("Watchdog: failed to subscribe ({})", ret);
        }
        Self {
            timeout_ms,
            subscribed,
            feeds: 0,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(timeout_ms: u32) -> Self {
        if timeout_ms < 1_000 {
            warn!("Watchdog(sim): {} ms timeout is shorter than any sane tick", timeout_ms);
        }
        info!("Watchdog(sim): no-op ({} ms)", timeout_ms);
        Self {
            timeout_ms,
            subscribed: false,
            feeds: 0,
        }
    }

    /// Reset the countdown.
    pub fn feed(&mut self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            unsafe {
                esp_task_wdt_reset();
            }
        }
        self.feeds = self.feeds.wrapping_add(1);
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Feeds since construction.
    pub fn feeds(&self) -> u32 {
        self.feeds
    }
}
