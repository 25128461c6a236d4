use color_eyre::{eyre::eyre, Result};
use opengamepad::config::GamepadConfig;
use opengamepad::device::{Attached, GamepadDevice};
use opengamepad::dispatch::DeferredQueue;
use opengamepad::gamepad::{DPadDirection, XboxButton};
use opengamepad::report::OutputReportCommand;
use opengamepad::transport::LoopbackTransport;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = Arc::new(load_config()?);
    info!("Using gamepad config: {:?}", config);

    let cancel = CancellationToken::new();
    let (queue, worker_handle) =
        DeferredQueue::spawn(config.deferred_queue_capacity, cancel.clone());

    let transport = LoopbackTransport::new(true);
    let device = Arc::new(
        GamepadDevice::create(config.clone(), Some(queue)).attach(Arc::new(transport.clone())),
    );

    device.on_vibrate().subscribe(|command| {
        info!(
            "Rumble: weak {} strong {} for {} (delay {}, loops {})",
            command.weak_motor_magnitude,
            command.strong_motor_magnitude,
            command.duration,
            command.start_delay,
            command.loop_count
        );
    });
    let (_subscription, mut rumble_rx) = device.on_vibrate().subscribe_channel(16);

    // application context
    let script_device = device.clone();
    let script = tokio::task::spawn_blocking(move || run_input_script(&script_device));

    // transport context, concurrently
    let rumble = OutputReportCommand {
        actuator_enable: 0x03,
        weak_motor_magnitude: 0x40,
        strong_motor_magnitude: 0x80,
        duration: 0x20,
        ..OutputReportCommand::default()
    };
    transport.host_write(&rumble.to_bytes());
    transport.host_write(&[0xFF; 4]);

    script
        .await
        .map_err(|e| eyre!("Input script panicked: {}", e))??;

    match tokio::time::timeout(Duration::from_secs(1), rumble_rx.recv()).await {
        Ok(Some(event)) => info!(
            "Rumble event received at {}",
            event.received_at.format("%H:%M:%S.%3f")
        ),
        _ => warn!("No rumble event received"),
    }

    // give deferred sends a moment to flush
    tokio::time::sleep(Duration::from_millis(50)).await;

    info!("Host received {} reports", transport.transmission_count());
    if let Some(state) = transport.last_state() {
        info!(
            "Last report: left stick {:?}, right stick {:?}, triggers {}/{}, d-pad {}, buttons {:#06x}",
            state.left_thumbstick(),
            state.right_thumbstick(),
            state.brake(),
            state.accelerator(),
            state.dpad(),
            state.buttons()
        );
    }

    cancel.cancel();
    worker_handle
        .await
        .map_err(|e| eyre!("Deferred worker failed: {}", e))?;
    Ok(())
}

fn run_input_script(device: &GamepadDevice<Attached>) -> Result<()> {
    info!("Running input script");
    device.press_button(XboxButton::A);
    device.set_left_thumbstick(0, 0);
    device.set_left_thumbstick(12000, -8000);
    device.set_right_trigger(2000);
    device.press_dpad(DPadDirection::North | DPadDirection::East)?;
    device.press_button(XboxButton::Share);
    device.release_button(XboxButton::A);

    // batch of changes sent once
    device.set_right_thumbstick(-20000, 20000);
    device.set_left_trigger(700);
    device.send_gamepad_report(true);

    device.release_dpad();
    device.release_button(XboxButton::Share);
    info!("Input script finished");
    Ok(())
}

fn load_config() -> Result<GamepadConfig> {
    let config = match std::env::args().nth(1) {
        Some(path) => GamepadConfig::load(&PathBuf::from(path))?,
        None => GamepadConfig::load_or_default()?,
    };
    Ok(config)
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
