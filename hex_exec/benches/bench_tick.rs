//! # Motion Control Tick Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use comms_if::tc::GaitType;
use hex_lib::{
    gait_ctrl::TravelVector,
    motion_ctrl::MotionCtrl,
    request::MotionRequest
};
use util::module::State;

fn tick_benchmark(c: &mut Criterion) {
    let mut ctrl = MotionCtrl::default();

    let mut request = MotionRequest {
        enabled: true,
        gait_type: GaitType::Ripple12,
        travel: TravelVector {
            x: 10.0,
            z: -40.0,
            rot_y: 5.0
        },
        ..MotionRequest::default()
    };
    request.body.rot_x = 4.0;
    request.body.rot_z = -3.0;

    c.bench_function("motion_ctrl_tick", |b| b.iter(|| {
        ctrl.proc(black_box(&request)).ok()
    }));
}

criterion_group!(benches, tick_benchmark);
criterion_main!(benches);
