//! WiFi console firmware binary.

#[cfg(feature = "esp32")]
fn main() {
    // Link ESP-IDF patches (must be first!)
    esp_idf_sys::link_patches();

    // Initialize ESP-IDF logger for log crate integration
    esp_idf_svc::log::EspLogger::initialize_default();

    if let Err(e) = firmware::run() {
        log::error!("firmware start failed: {}", e);
    }
}

#[cfg(feature = "esp32")]
mod firmware {
    use std::error::Error;
    use std::time::Duration;

    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_hal::gpio::AnyIOPin;
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_hal::uart::{config::Config as UartConfig, UartDriver};
    use esp_idf_hal::units::Hertz;
    use esp_idf_svc::eventloop::EspSystemEventLoop;

    use wifi_console_esp32::config::{DEFAULT_BAUD_RATE, NVS_NAMESPACE, STATUS_POLL_INTERVAL_MS};
    use wifi_console_esp32::console::ConsoleSession;
    use wifi_console_esp32::hal::esp32::{EspRadio, NeoPixel, NvsStore, UartConsole};
    use wifi_console_esp32::hal::RadioControl;
    use wifi_console_esp32::indicator::StatusIndicator;
    use wifi_console_esp32::poll::PollLoop;
    use wifi_console_esp32::supervisor::ConnectionSupervisor;

    /// One WS2812 status pixel on GPIO 48 (devkit on-board LED).
    const STATUS_PIXEL_COUNT: usize = 1;
    const STATUS_PIXEL_BRIGHTNESS: u8 = 10;

    /// Outer-loop idle delay between input polls.
    const IDLE_DELAY_MS: u32 = 10;

    pub fn run() -> Result<(), Box<dyn Error>> {
        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;

        let uart = UartDriver::new(
            peripherals.uart0,
            peripherals.pins.gpio43,
            peripherals.pins.gpio44,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &UartConfig::default().baudrate(Hertz(DEFAULT_BAUD_RATE)),
        )?;
        let mut session = ConsoleSession::new(UartConsole::new(uart));

        let pixel = NeoPixel::new(
            peripherals.rmt.channel0,
            peripherals.pins.gpio48,
            STATUS_PIXEL_COUNT,
            STATUS_PIXEL_BRIGHTNESS,
        )?;
        let mut indicator = StatusIndicator::new(pixel);
        indicator.show_initializing();

        let mut radio = EspRadio::new(peripherals.modem, sysloop)?;
        // Forget any association left over from a previous boot; reconnecting
        // is the supervisor's decision, made from the stored credential.
        let _ = radio.disconnect(true);

        let store = NvsStore::open(NVS_NAMESPACE)?;
        let mut supervisor = ConnectionSupervisor::new(radio, store);
        let mut poll = PollLoop::new(Duration::from_millis(STATUS_POLL_INTERVAL_MS));

        log::info!("console ready at {} baud", DEFAULT_BAUD_RATE);
        session.auto_reconnect(&mut supervisor);

        loop {
            while let Some(line) = session.poll_line() {
                session.handle_line(&line, &mut supervisor);
            }
            poll.tick(&mut supervisor, &mut indicator, session.in_menu());
            FreeRtos::delay_ms(IDLE_DELAY_MS);
        }
    }
}

#[cfg(not(feature = "esp32"))]
fn main() {
    println!("This binary requires the 'esp32' feature.");
    println!("Use 'cargo test --no-default-features' for host testing.");
}
