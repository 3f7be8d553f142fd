use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use step_table::StepTable;
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn bench_insert(c: &mut Criterion) {
    let keys: Vec<_> = lcg(1).take(10_000).map(key).collect();
    c.bench_function("step_table_insert_10k", |b| {
        b.iter_batched(
            || keys.clone(),
            |keys| {
                let mut m = StepTable::<String, u64>::new();
                for (i, k) in keys.into_iter().enumerate() {
                    m.insert(k, i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("hashbrown_insert_10k", |b| {
        b.iter_batched(
            || keys.clone(),
            |keys| {
                let mut m = hashbrown::HashMap::<String, u64>::new();
                for (i, k) in keys.into_iter().enumerate() {
                    m.insert(k, i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_hit(c: &mut Criterion) {
    let keys: Vec<_> = lcg(7).take(20_000).map(key).collect();
    let mut m = StepTable::new();
    let mut h = hashbrown::HashMap::new();
    for (i, k) in keys.iter().enumerate() {
        m.insert(k.clone(), i as u64).unwrap();
        h.insert(k.clone(), i as u64);
    }
    c.bench_function("step_table_get_hit", |b| {
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(m.get(k.as_str()));
        })
    });
    c.bench_function("hashbrown_get_hit", |b| {
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(h.get(k.as_str()));
        })
    });
}

fn bench_get_miss(c: &mut Criterion) {
    let mut m = StepTable::new();
    for (i, x) in lcg(11).take(10_000).enumerate() {
        m.insert(key(x), i as u64).unwrap();
    }
    let mut miss = lcg(0xdead_beef);
    c.bench_function("step_table_get_miss", |b| {
        b.iter(|| {
            // generate keys unlikely in map
            let k = key(miss.next().unwrap());
            black_box(m.get(k.as_str()));
        })
    });
}

// Delete-heavy workload: tombstones accumulate between resizes.
fn bench_insert_remove_churn(c: &mut Criterion) {
    c.bench_function("step_table_churn_10k", |b| {
        b.iter_batched(
            StepTable::<String, u64>::new,
            |mut m| {
                for (i, x) in lcg(3).take(10_000).enumerate() {
                    let k = key(x);
                    m.insert(k.clone(), i as u64).unwrap();
                    if i % 2 == 0 {
                        m.remove(k.as_str()).unwrap();
                    }
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_insert, bench_get_hit, bench_get_miss, bench_insert_remove_churn
}
criterion_main!(benches);
