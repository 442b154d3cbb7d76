use mesh_model_common::core::MessageMeta;
use mesh_model_common::protocol::{TransitionParams, TransactionTracker};
use mesh_model_common::time::sim::{fire_next, SimClock, SimConfig, SimHardwareTimer};
use mesh_model_common::time::{
    ticks_to_ms, Binding, HardwareTimer, LogicalTimer, TimerControl, TimerMode,
};

fn on_period(timer: &mut TimerControl<SimHardwareTimer>, periods: &mut u32) -> Binding {
    *periods += 1;
    println!(
        "period {} elapsed after {} ms",
        periods,
        ticks_to_ms(timer.elapsed_ticks(), timer.hardware().frequency_hz())
    );
    if *periods == 3 {
        timer.abort();
    }
    Binding::Keep
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // A 24-bit RTC at 32768 Hz wraps after ~512 s, so a 20 minute period
    // needs several arm-cycles.
    let config = SimConfig::default();
    let clock = SimClock::new(config.counter_mask);
    let hw = SimHardwareTimer::with_config(clock.clone(), config);

    let mut timer = LogicalTimer::new(hw, TimerMode::Repeating, 0u32);
    timer.bind(on_period);
    if let Err(e) = timer.create() {
        eprintln!("Timer creation failed: {}", e);
        return;
    }

    let params = TransitionParams::from_ms(20 * 60 * 1000, 0);
    let period_ms = match params.transition_time_ms() {
        Some(ms) => ms,
        None => {
            eprintln!("Transition time not representable");
            return;
        }
    };
    println!("Encoded transition time 0x{:02x} = {} ms", params.transition_time, period_ms);

    timer.set_timeout_ms(period_ms);
    if let Err(e) = timer.schedule() {
        eprintln!("Scheduling failed: {}", e);
        return;
    }

    while fire_next(&mut timer) {}
    println!("Arm-cycles used: {:?}", timer.hardware().arms());

    println!("\nTransaction tracking:");
    let mut tracker = match TransactionTracker::new(SimHardwareTimer::with_config(clock, config)) {
        Ok(tracker) => tracker,
        Err(e) => {
            eprintln!("Tracker creation failed: {}", e);
            return;
        }
    };
    let meta = MessageMeta::new(0x0010, 0x0020);
    println!("- first:      new = {}", tracker.validate(&meta, 5, 3));
    println!("- retransmit: new = {}", tracker.validate(&meta, 5, 3));
    while tracker.expiry_timer().hardware().advance_to_expiry() {
        tracker.on_timer_expiry();
    }
    println!("- after 6 s:  new = {}", tracker.validate(&meta, 5, 3));
}
