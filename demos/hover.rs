// demos/hover.rs

use vtol_flight_core::{
    mixer::TiltRotorMixerConfig, CycleInput, FailureFlags, FlightController,
    FlightControllerConfig, ImuSample, StickInput, TiltRotorMixer, Vector3,
};

fn main() {
    let config = FlightControllerConfig::tilt_rotor();
    let period_us = u64::from(config.loop_period_us);
    let mixer = TiltRotorMixer::new(TiltRotorMixerConfig::default());
    let mut controller = match FlightController::new(config, mixer) {
        Ok(controller) => controller,
        Err(error) => {
            eprintln!("invalid configuration: {}", error);
            return;
        }
    };

    // Hover in autolevel with a roll command, then switch to forward flight.
    let mut sticks = StickInput {
        throttle: 20.0,
        roll: 50.0,
        pitch: 0.0,
        yaw: 0.0,
        flight_mode_switch: 100.0,
        control_mode_switch: 100.0,
    };

    // Crude airframe response: body rates follow the PID outputs.
    let mut gyro = Vector3::ZERO;

    println!("   t      mode       prog     roll    pitch  tgt roll   pid roll  r motor  r tilt");
    for cycle in 0..=150u64 {
        if cycle == 50 {
            sticks.flight_mode_switch = -100.0;
            sticks.roll = 0.0;
        }
        let input = CycleInput {
            time_us: cycle * period_us,
            sticks,
            imu: Some(ImuSample::new(gyro, Vector3::new(0.0, 0.0, 1.0))),
            flags: FailureFlags::NONE,
        };
        let output = controller.cycle(&input);
        let telemetry = controller.telemetry();

        if cycle % 10 == 0 {
            println!(
                "{:5.2} {:>10} {:6} {:8.3} {:8.3} {:9.3} {:10.3} {:8.2} {:7.2}",
                telemetry.time_us as f32 * 1e-6,
                format!("{:?}", telemetry.flight_mode),
                telemetry.progress,
                telemetry.attitude.roll,
                telemetry.attitude.pitch,
                telemetry.target.roll,
                telemetry.outputs.roll,
                output.right_motor,
                output.right_tilt,
            );
        }

        gyro = Vector3::new(
            telemetry.outputs.roll,
            telemetry.outputs.pitch,
            -telemetry.outputs.yaw,
        );
    }
}
