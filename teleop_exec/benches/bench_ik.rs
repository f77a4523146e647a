//! Benchmark of the inverse kinematics hot path.
//!
//! The solver runs once per control tick, the full solve must stay far below
//! the cycle period.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::{Translation3, UnitQuaternion};

use teleop_lib::arm_kin::{ArmConfig, ArmKin, Kinematics, Params, Pose};

fn bench_params() -> Params {
    Params {
        lift_base_height_m: 0.19,
        lift_base_height_ground_m: 0.05,
        ground_mode: false,
        arm_mount_offset_m: 0.26,
        tool_offset_m: 0.23,
        lift_min_m: 0.0,
        lift_max_m: 1.1,
        arm_ext_min_m: 0.0,
        arm_ext_max_m: 0.52,
        wrist_yaw_min_rad: -1.39,
        wrist_yaw_max_rad: 4.42,
        wrist_pitch_min_rad: -2.0,
        wrist_pitch_max_rad: 2.0,
        wrist_roll_min_rad: -3.14,
        wrist_roll_max_rad: 3.14,
        singularity_cos_limit: 0.015,
    }
}

fn bench_inverse(c: &mut Criterion) {
    let kin = ArmKin::new(bench_params()).unwrap();
    let seed = ArmConfig::default();

    let target = Pose::from_parts(
        Translation3::new(0.55, 0.1, 0.65),
        UnitQuaternion::from_euler_angles(0.4, -0.3, 0.8),
    );

    c.bench_function("inverse", |b| {
        b.iter(|| kin.inverse(black_box(&target), black_box(0.5), black_box(&seed)))
    });
}

fn bench_forward_inverse_round_trip(c: &mut Criterion) {
    let kin = ArmKin::new(bench_params()).unwrap();

    let config = ArmConfig {
        lift_m: 0.6,
        arm_ext_m: 0.3,
        wrist_yaw_rad: 0.5,
        wrist_pitch_rad: -0.4,
        wrist_roll_rad: 1.2,
        gripper: 0.5,
    };

    c.bench_function("forward_inverse_round_trip", |b| {
        b.iter(|| {
            let pose = kin.forward(black_box(&config));
            kin.inverse(&pose, config.gripper, &config)
        })
    });
}

criterion_group!(benches, bench_inverse, bench_forward_inverse_round_trip);
criterion_main!(benches);
