//! Benchmarks for the hot pose path: hierarchical composition plus vertex
//! application, and curve evaluation feeding it.

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use mc3_figure::action::{MotionChannel, ScalarTrack, Vec3Track};
use mc3_figure::math::Mat3x4;
use mc3_figure::model::ModelBone;
use mc3_figure::transform::apply_pose;

const BONES: usize = 32;
const VERTICES_PER_BONE: usize = 256;

fn skeleton() -> Vec<ModelBone> {
    (0..BONES)
        .map(|i| {
            let mut matrix = Mat3x4::IDENTITY;
            matrix.set_translation(i as i32 * 16, 0, 0);
            ModelBone {
                vertex_count: VERTICES_PER_BONE,
                parent: i as i32 - 1,
                matrix,
            }
        })
        .collect()
}

fn channels() -> Vec<MotionChannel> {
    (0..BONES)
        .map(|i| MotionChannel::Full {
            translate: Vec3Track::new(
                vec![0, 8, 16],
                vec![[0, 0, 0], [i as i32, 10, 0], [0, 20, 0]],
            )
            .expect("track"),
            scale: Vec3Track::constant([4096, 4096, 4096]),
            rotate: Vec3Track::new(vec![0, 16], vec![[0, 0, 4096], [4096, 0, 0]]).expect("track"),
            roll: ScalarTrack::new(vec![0, 16], vec![0, 2048]).expect("track"),
        })
        .collect()
}

fn bench_apply_pose(c: &mut Criterion) {
    let bones = skeleton();
    let vertex_count = BONES * VERTICES_PER_BONE;
    let src_vertices: Vec<i16> = (0..vertex_count * 3).map(|i| (i % 512) as i16 - 256).collect();
    let mut dst_vertices = vec![0i16; src_vertices.len()];
    let src_normals: Vec<i8> = (0..vertex_count * 3).map(|i| (i % 128) as i8 - 64).collect();
    let mut dst_normals = vec![0i8; src_normals.len()];
    let mut world = Vec::with_capacity(BONES);

    let channels = channels();
    let mut pose = vec![Mat3x4::IDENTITY; BONES];

    c.bench_function("evaluate_channels", |b| {
        b.iter(|| {
            for (channel, matrix) in channels.iter().zip(pose.iter_mut()) {
                channel.evaluate(black_box(7), matrix);
            }
        });
    });

    c.bench_function("apply_pose_bind", |b| {
        b.iter(|| {
            apply_pose(
                black_box(&bones),
                None,
                &mut world,
                &src_vertices,
                &mut dst_vertices,
                Some(&src_normals),
                Some(&mut dst_normals),
            );
        });
    });

    c.bench_function("apply_pose_with_overrides", |b| {
        b.iter(|| {
            apply_pose(
                black_box(&bones),
                Some(&pose),
                &mut world,
                &src_vertices,
                &mut dst_vertices,
                Some(&src_normals),
                Some(&mut dst_normals),
            );
        });
    });
}

criterion_group!(benches, bench_apply_pose);
criterion_main!(benches);
