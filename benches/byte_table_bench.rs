use byte_table::{ByteTable, Flags};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use hashbrown::HashMap;
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> Vec<u8> {
    format!("k{:016x}", n).into_bytes()
}

fn filled(seed: u64, n: usize) -> (ByteTable<'static>, Vec<Vec<u8>>) {
    let mut t = ByteTable::new();
    let keys: Vec<_> = lcg(seed).take(n).map(key).collect();
    for (i, k) in keys.iter().enumerate() {
        t.insert(k.clone(), (i as u64).to_le_bytes().to_vec()).unwrap();
    }
    (t, keys)
}

fn bench_insert(c: &mut Criterion) {
    let keys: Vec<_> = lcg(1).take(10_000).map(key).collect();
    c.bench_function("byte_table_insert_10k", |b| {
        b.iter_batched(
            || ByteTable::with_flags(Flags::KEY_BORROWED | Flags::VALUE_BORROWED, 0.05).unwrap(),
            |mut t| {
                for k in &keys {
                    t.insert(k.as_slice(), k.as_slice()).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("byte_table_insert_owned_10k", |b| {
        b.iter_batched(
            ByteTable::new,
            |mut t| {
                for k in &keys {
                    t.insert(k.clone(), k.clone()).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("hashbrown_insert_10k", |b| {
        b.iter_batched(
            HashMap::<Vec<u8>, Vec<u8>>::new,
            |mut m| {
                for k in &keys {
                    m.insert(k.clone(), k.clone());
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_hit(c: &mut Criterion) {
    c.bench_function("byte_table_get_hit", |b| {
        let (t, keys) = filled(7, 20_000);
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(t.get(k).unwrap());
        })
    });
}

fn bench_get_miss(c: &mut Criterion) {
    c.bench_function("byte_table_get_miss", |b| {
        let (t, _) = filled(11, 10_000);
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            // Keys from another sequence are almost surely absent.
            let k = key(miss.next().unwrap());
            black_box(t.get(&k));
        })
    });
}

fn bench_resize(c: &mut Criterion) {
    c.bench_function("byte_table_resize_10k", |b| {
        let (mut t, _) = filled(13, 10_000);
        let mut grow = true;
        b.iter(|| {
            let cap = if grow { 1 << 16 } else { 1 << 12 };
            grow = !grow;
            t.resize(cap).unwrap();
            black_box(t.capacity());
        })
    });
}

fn bench_remove_reinsert(c: &mut Criterion) {
    c.bench_function("byte_table_remove_reinsert", |b| {
        let (mut t, keys) = filled(17, 10_000);
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            let e = t.remove_entry(k).unwrap();
            black_box(t.insert_entry(e).unwrap());
        })
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
    targets = bench_insert, bench_get_hit, bench_get_miss, bench_resize, bench_remove_reinsert
}
criterion_main!(benches);
