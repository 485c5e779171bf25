//! Collision benchmarks (criterion - wall-clock time).
//!
//! Run all:    cargo bench --manifest-path benchmarks/Cargo.toml --bench collide
//! Filter:     cargo bench --manifest-path benchmarks/Cargo.toml --bench collide -- traverse

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Mat4, Vec3};
use rein_collide::ecs::components::Transform;
use rein_collide::{
    shared, CollisionEntry, EntrySide, IntersectionEngine, PusherHandler, QueueHandler, Shape,
    Traverser,
};
use rein_collide_bench::*;
use std::hint::black_box;
use std::sync::Arc;

fn side(shape: Shape, net: Mat4) -> EntrySide {
    EntrySide {
        shape: Arc::new(shape),
        node: hecs::Entity::DANGLING,
        index: 0,
        net,
        prev_net: net,
    }
}

// ---------------------------------------------------------------------------
// Pair tests
// ---------------------------------------------------------------------------

fn bench_pairs(c: &mut Criterion) {
    let mut group = c.benchmark_group("pairs");
    let mut engine = IntersectionEngine::default();
    let square = Shape::polygon(&[
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(-1.0, 1.0, 0.0),
    ])
    .expect("square is a valid polygon");

    let cases = [
        ("sphere_sphere", Shape::sphere(Vec3::ZERO, 1.0), Shape::sphere(Vec3::X, 1.0)),
        ("sphere_polygon", Shape::sphere(Vec3::new(0.2, 0.1, 0.5), 1.0), square.clone()),
        ("ray_polygon", Shape::ray(Vec3::new(0.2, 0.1, 3.0), -Vec3::Z), square),
        (
            "sphere_box",
            Shape::sphere(Vec3::new(0.0, 0.0, 1.2), 0.5),
            Shape::cuboid(Vec3::splat(-1.0), Vec3::splat(1.0)),
        ),
        (
            "capsule_capsule",
            Shape::capsule(Vec3::ZERO, Vec3::Z, 0.5),
            Shape::capsule(Vec3::new(0.8, -1.0, 0.5), Vec3::new(0.8, 1.0, 0.5), 0.5),
        ),
    ];

    for (name, from, into) in cases {
        let entry = CollisionEntry::new(side(from, Mat4::IDENTITY), side(into, Mat4::IDENTITY), false);
        group.bench_function(name, |b| {
            b.iter(|| black_box(engine.test(black_box(&entry))));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Heightfield
// ---------------------------------------------------------------------------

fn bench_heightfield(c: &mut Criterion) {
    let mut group = c.benchmark_group("heightfield/ray");
    let mut rng = Lcg::new(7);
    let rays: Vec<(Vec3, Vec3)> = (0..256)
        .map(|_| {
            let origin = Vec3::new(rng.range(0.0, 250.0), rng.range(0.0, 250.0), 20.0);
            let direction = Vec3::new(rng.range(-1.0, 1.0), rng.range(-1.0, 1.0), -4.0).normalize();
            (origin, direction)
        })
        .collect();

    for &subdivisions in &[0, 2, 4, 6] {
        let field = terrain(256, subdivisions).expect("terrain grid is valid");
        group.bench_with_input(BenchmarkId::new("quadtree", subdivisions), &field, |b, field| {
            b.iter(|| {
                for &(origin, direction) in &rays {
                    black_box(field.first_line_hit(origin, direction, 0.0, f32::INFINITY));
                }
            });
        });
    }

    let field = terrain(256, 4).expect("terrain grid is valid");
    group.bench_function("brute_force", |b| {
        b.iter(|| {
            for &(origin, direction) in &rays {
                black_box(field.first_line_hit_brute_force(origin, direction, 0.0, f32::INFINITY));
            }
        });
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

fn bench_traverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("traverse/queue");
    for &n in &[100, 1000, 5000] {
        let mut scene = Scene::new();
        let mut rng = Lcg::new(42);
        scatter_spheres(&mut scene, n, 200.0, &mut rng).expect("scene builds");
        add_sphere_movers(&mut scene, 32, 200.0, &mut rng).expect("scene builds");

        let queue = shared(QueueHandler::new());
        let mut traverser = Traverser::default();
        for &collider in &scene.colliders {
            traverser.add_collider(collider, queue.clone());
        }
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| traverser.traverse(&mut scene.world, scene.root));
        });
    }
    group.finish();

    let mut group = c.benchmark_group("traverse/pusher");
    for &movers in &[8, 64, 200] {
        let mut scene = Scene::new();
        let mut rng = Lcg::new(9);
        scatter_spheres(&mut scene, 1000, 200.0, &mut rng).expect("scene builds");
        add_sphere_movers(&mut scene, movers, 200.0, &mut rng).expect("scene builds");
        let start: Vec<(hecs::Entity, Transform)> = scene
            .colliders
            .iter()
            .map(|&e| (e, *scene.world.get::<&Transform>(e).expect("mover has a transform")))
            .collect();

        let pusher = shared(PusherHandler::default());
        let mut traverser = Traverser::default();
        for &collider in &scene.colliders {
            pusher.borrow_mut().add_collider(collider, collider);
            traverser.add_collider(collider, pusher.clone());
        }
        group.bench_with_input(BenchmarkId::from_parameter(movers), &movers, |b, _| {
            b.iter(|| {
                for (entity, transform) in &start {
                    if let Ok(mut t) = scene.world.get::<&mut Transform>(*entity) {
                        *t = *transform;
                    }
                }
                traverser.traverse(&mut scene.world, scene.root);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pairs, bench_heightfield, bench_traverse);
criterion_main!(benches);
