use clap::Parser;
use embedded_hal::delay::DelayNs;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::{CdevPin, Delay};
use onewire_node::ds18x20::CONVERSION_WAIT_MS;
use onewire_node::ntp::{NtpClient, NtpConfig, NTP_SERVER};
use onewire_node::{BusScanner, Driver, ScanConfig, ScanEvent};
use std::time::{Duration, Instant};

mod net;

/// Scans a bit-banged 1-Wire bus and keeps time through NTP
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to GPIO chip (e.g., /dev/gpiochip0)
    #[arg(short, long, default_value = "/dev/gpiochip0")]
    chip: String,
    /// Line offset of the 1-Wire data pin
    #[arg(short, long)]
    line: u32,
    /// NTP server host name
    #[arg(short, long, default_value = NTP_SERVER)]
    ntp_server: String,
    /// Pause between two serviced devices, in milliseconds
    #[arg(long, default_value_t = 1000)]
    scan_interval_ms: u32,
    /// Time between NTP synchronizations, in seconds
    #[arg(long, default_value_t = 3600)]
    ntp_interval_s: u64,
    /// Wait for temperature conversions, in milliseconds
    #[arg(long, default_value_t = CONVERSION_WAIT_MS)]
    conversion_wait_ms: u32,
}

fn main() {
    // Initialize the logger
    env_logger::init();
    // Parse command line arguments
    let args = Args::parse();

    // Open the data line as open-drain output, released (high)
    let mut chip = Chip::new(&args.chip).expect("Failed to open GPIO chip");
    let handle = chip
        .get_line(args.line)
        .expect("Failed to get GPIO line")
        .request(
            LineRequestFlags::OUTPUT | LineRequestFlags::OPEN_DRAIN,
            1,
            "onewire-node",
        )
        .expect("Failed to request GPIO line");
    let pin = CdevPin::new(handle).expect("Failed to wrap GPIO line");
    let mut bus = Driver::new((pin,));
    let mut delay = Delay;

    let mut scanner = BusScanner::with_config(
        ScanConfig::default().with_conversion_wait_ms(args.conversion_wait_ms),
    );
    let ntp = NtpClient::with_config(NtpConfig::default().with_server(&args.ntp_server));
    let mut network = net::StdNetwork;
    let mut clock = net::MonotonicClock::new();
    let ntp_interval = Duration::from_secs(args.ntp_interval_s);

    let mut last_sync: Option<Instant> = None;
    // unix seconds at the moment of the last successful sync
    let mut wall_clock: Option<(u32, Instant)> = None;

    loop {
        if last_sync.map_or(true, |at| at.elapsed() >= ntp_interval) {
            match ntp.sync(&mut network, &mut clock, &mut delay) {
                Ok(seconds) => {
                    log::info!("Time synchronized: {}", seconds);
                    wall_clock = Some((seconds, Instant::now()));
                }
                Err(error) if error.is_timeout_like() => {
                    log::warn!("Time not synchronized this cycle: {:?}", error)
                }
                Err(error) => log::error!("Time sync failed: {:?}", error),
            }
            last_sync = Some(Instant::now());
        }

        match scanner.service_next(&mut bus, &mut delay) {
            Ok(ScanEvent::Serviced {
                address,
                family,
                reading: Ok(reading),
            }) => {
                let now = wall_clock
                    .map(|(seconds, at)| seconds as u64 + at.elapsed().as_secs())
                    .unwrap_or(0);
                println!("{} {} {} {}", now, address, family, reading);
            }
            Ok(_) => {}
            Err(error) => log::error!("1-Wire bus failure: {:?}", error),
        }

        delay.delay_ms(args.scan_interval_ms);
    }
}
