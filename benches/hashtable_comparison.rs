use core::hash::BuildHasher;
use core::hash::Hash;
use core::hint::black_box;
use std::collections::HashMap as StdHashMap;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use hashbrown::HashMap as HashbrownMap;
use probe_map::OpenAddressingMap;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;

#[derive(Clone, Default)]
struct SipBuildHasher;

impl BuildHasher for SipBuildHasher {
    type Hasher = SipHasher;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher::new()
    }
}

trait BenchKey: Clone + Hash + Eq {
    fn new(key: u64) -> Self;
}

impl BenchKey for u64 {
    fn new(key: u64) -> Self {
        black_box(key)
    }
}

impl BenchKey for String {
    fn new(key: u64) -> Self {
        black_box(format!("key_{:016X}", key))
    }
}

/// The map operations every benchmark drives, so one benchmark body covers
/// all three implementations.
trait BenchMap<K> {
    const NAME: &'static str;

    fn with_capacity(capacity: usize) -> Self;
    fn insert(&mut self, key: K, value: u64) -> Option<u64>;
    fn get(&self, key: &K) -> Option<&u64>;
    fn remove(&mut self, key: &K) -> Option<u64>;
}

impl<K: BenchKey> BenchMap<K> for OpenAddressingMap<K, u64, SipBuildHasher> {
    const NAME: &'static str = "probe_map";

    fn with_capacity(capacity: usize) -> Self {
        OpenAddressingMap::with_capacity_and_hasher(capacity, SipBuildHasher)
    }

    fn insert(&mut self, key: K, value: u64) -> Option<u64> {
        OpenAddressingMap::insert(self, key, value)
    }

    fn get(&self, key: &K) -> Option<&u64> {
        OpenAddressingMap::get(self, key)
    }

    fn remove(&mut self, key: &K) -> Option<u64> {
        OpenAddressingMap::remove(self, key)
    }
}

impl<K: BenchKey> BenchMap<K> for HashbrownMap<K, u64, SipBuildHasher> {
    const NAME: &'static str = "hashbrown";

    fn with_capacity(capacity: usize) -> Self {
        HashbrownMap::with_capacity_and_hasher(capacity, SipBuildHasher)
    }

    fn insert(&mut self, key: K, value: u64) -> Option<u64> {
        HashbrownMap::insert(self, key, value)
    }

    fn get(&self, key: &K) -> Option<&u64> {
        HashbrownMap::get(self, key)
    }

    fn remove(&mut self, key: &K) -> Option<u64> {
        HashbrownMap::remove(self, key)
    }
}

impl<K: BenchKey> BenchMap<K> for StdHashMap<K, u64, SipBuildHasher> {
    const NAME: &'static str = "std";

    fn with_capacity(capacity: usize) -> Self {
        StdHashMap::with_capacity_and_hasher(capacity, SipBuildHasher)
    }

    fn insert(&mut self, key: K, value: u64) -> Option<u64> {
        StdHashMap::insert(self, key, value)
    }

    fn get(&self, key: &K) -> Option<&u64> {
        StdHashMap::get(self, key)
    }

    fn remove(&mut self, key: &K) -> Option<u64> {
        StdHashMap::remove(self, key)
    }
}

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 12),
    (1 << 14),
    (1 << 16),
    (1 << 18),
];

#[derive(Clone, Copy)]
enum Operation {
    Insert,
    Find,
    Remove,
}

fn random_keys<K: BenchKey>(count: usize) -> Vec<K> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| K::new(rng.try_next_u64().unwrap()))
        .collect()
}

fn filled<K: BenchKey, M: BenchMap<K>>(keys: &[K]) -> M {
    let mut map = M::with_capacity(0);
    for (i, key) in keys.iter().enumerate() {
        map.insert(key.clone(), i as u64);
    }
    map
}

fn run_insert<K: BenchKey, M: BenchMap<K>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    keys: &[K],
    preallocate: bool,
) {
    group.bench_function(M::NAME, |b| {
        b.iter_batched(
            || {
                let mut keys = keys.to_vec();
                keys.shuffle(&mut SmallRng::from_os_rng());
                keys
            },
            |keys| {
                let capacity = if preallocate { keys.len() } else { 0 };
                let mut map = M::with_capacity(capacity);
                for (i, key) in keys.into_iter().enumerate() {
                    black_box(map.insert(key, i as u64));
                }
                black_box(map)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_random<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    for preallocate in [false, true] {
        let mut group = c.benchmark_group(format!(
            "insert_random{}_{}",
            if preallocate { "_preallocated" } else { "" },
            core::any::type_name::<K>()
        ));
        group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

        for &size in SIZES[..=MAX_SIZE].iter() {
            let keys = random_keys::<K>(size);
            group.throughput(Throughput::Elements(size as u64));

            run_insert::<K, OpenAddressingMap<K, u64, SipBuildHasher>>(&mut group, &keys, preallocate);
            run_insert::<K, HashbrownMap<K, u64, SipBuildHasher>>(&mut group, &keys, preallocate);
            run_insert::<K, StdHashMap<K, u64, SipBuildHasher>>(&mut group, &keys, preallocate);
        }

        group.finish();
    }
}

fn run_find<K: BenchKey, M: BenchMap<K>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    stored: &[K],
    probes: &[K],
) {
    let map: M = filled(stored);
    group.bench_function(M::NAME, |b| {
        b.iter(|| {
            for key in probes {
                black_box(map.get(key));
            }
        })
    });
}

fn bench_find_hit_miss<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    for (label, hit_ratio) in [("hit", 1.0), ("miss", 0.0), ("hit_miss", 0.5)] {
        let mut group = c.benchmark_group(format!(
            "find_{}_{}",
            label,
            core::any::type_name::<K>()
        ));
        group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

        for &size in SIZES[..=MAX_SIZE].iter() {
            let stored = random_keys::<K>(size);
            let absent = random_keys::<K>(size);

            let hits = (size as f64 * hit_ratio) as usize;
            let mut probes = stored[..hits]
                .iter()
                .chain(absent[..size - hits].iter())
                .cloned()
                .collect::<Vec<K>>();
            probes.shuffle(&mut SmallRng::from_os_rng());

            group.throughput(Throughput::Elements(size as u64));
            run_find::<K, OpenAddressingMap<K, u64, SipBuildHasher>>(&mut group, &stored, &probes);
            run_find::<K, HashbrownMap<K, u64, SipBuildHasher>>(&mut group, &stored, &probes);
            run_find::<K, StdHashMap<K, u64, SipBuildHasher>>(&mut group, &stored, &probes);
        }

        group.finish();
    }
}

fn run_remove<K: BenchKey, M: BenchMap<K> + Clone>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    keys: &[K],
) {
    let map: M = filled(keys);
    group.bench_function(M::NAME, |b| {
        b.iter_batched(
            || {
                let mut keys = keys.to_vec();
                keys.shuffle(&mut SmallRng::from_os_rng());
                (map.clone(), keys)
            },
            |(mut map, keys)| {
                for key in &keys {
                    black_box(map.remove(key));
                }
                black_box(map)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_remove<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("remove_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let keys = random_keys::<K>(size);
        group.throughput(Throughput::Elements(size as u64));

        run_remove::<K, OpenAddressingMap<K, u64, SipBuildHasher>>(&mut group, &keys);
        run_remove::<K, HashbrownMap<K, u64, SipBuildHasher>>(&mut group, &keys);
        run_remove::<K, StdHashMap<K, u64, SipBuildHasher>>(&mut group, &keys);
    }

    group.finish();
}

fn run_churn<K: BenchKey, M: BenchMap<K>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    toggles: &[K],
) {
    group.bench_function(M::NAME, |b| {
        b.iter_batched(
            || {
                let mut toggles = toggles.to_vec();
                toggles.shuffle(&mut SmallRng::from_os_rng());
                toggles
            },
            |toggles| {
                let mut map = M::with_capacity(0);
                for key in toggles {
                    if map.remove(&key).is_none() {
                        map.insert(key, 0);
                    }
                }
                black_box(map)
            },
            BatchSize::SmallInput,
        )
    });
}

/// Every key is inserted and removed once, in shuffled order. This leaves a
/// trail of removed slots behind, which the open addressing table has to
/// probe through until its next growth.
fn bench_churn<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("churn_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let toggles = random_keys::<K>(size)
            .into_iter()
            .flat_map(|key| [key.clone(), key])
            .collect::<Vec<K>>();

        group.throughput(Throughput::Elements(size as u64 * 2));
        run_churn::<K, OpenAddressingMap<K, u64, SipBuildHasher>>(&mut group, &toggles);
        run_churn::<K, HashbrownMap<K, u64, SipBuildHasher>>(&mut group, &toggles);
        run_churn::<K, StdHashMap<K, u64, SipBuildHasher>>(&mut group, &toggles);
    }

    group.finish();
}

fn run_mixed<K: BenchKey, M: BenchMap<K>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    operations: &[(Operation, K)],
) {
    group.bench_function(M::NAME, |b| {
        b.iter(|| {
            let mut map = M::with_capacity(0);
            for (operation, key) in operations {
                match operation {
                    Operation::Insert => {
                        black_box(map.insert(key.clone(), 1));
                    }
                    Operation::Find => {
                        black_box(map.get(key));
                    }
                    Operation::Remove => {
                        black_box(map.remove(key));
                    }
                }
            }
            black_box(map)
        })
    });
}

fn bench_mixed_probabilistic_zipf<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    const KEY_SPACE_MULTIPLIER: usize = 2;

    for exponent in [1.0, 1.3] {
        let mut group = c.benchmark_group(format!(
            "mixed_probabilistic_zipf_{:.01}_{}",
            exponent,
            core::any::type_name::<K>()
        ));
        group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

        for &size in SIZES[..=MAX_SIZE].iter() {
            let mut rng = SmallRng::from_os_rng();
            let op_distr = Zipf::new(3.0, exponent).unwrap();
            let insert_distr = Zipf::new(size as f64, 1.0).unwrap();
            let find_remove_distr = Zipf::new((size * KEY_SPACE_MULTIPLIER) as f64, 1.0).unwrap();

            let operations = (0..size * 3)
                .map(|_| {
                    let op_choice: f64 = rng.sample(op_distr);
                    if op_choice <= 1.0 {
                        let key: f64 = rng.sample(find_remove_distr);
                        (Operation::Find, K::new(key as u64))
                    } else if op_choice <= 2.0 {
                        let key: f64 = rng.sample(insert_distr);
                        (Operation::Insert, K::new(key as u64))
                    } else {
                        let key: f64 = rng.sample(find_remove_distr);
                        (Operation::Remove, K::new(key as u64))
                    }
                })
                .collect::<Vec<(Operation, K)>>();

            group.throughput(Throughput::Elements(operations.len() as u64));
            run_mixed::<K, OpenAddressingMap<K, u64, SipBuildHasher>>(&mut group, &operations);
            run_mixed::<K, HashbrownMap<K, u64, SipBuildHasher>>(&mut group, &operations);
            run_mixed::<K, StdHashMap<K, u64, SipBuildHasher>>(&mut group, &operations);
        }

        group.finish();
    }
}

criterion_group!(
    benches,
    bench_mixed_probabilistic_zipf::<u64, 4>,
    bench_mixed_probabilistic_zipf::<String, 4>,
    bench_churn::<u64, 4>,
    bench_churn::<String, 4>,
    bench_insert_random::<u64, 4>,
    bench_insert_random::<String, 4>,
    bench_find_hit_miss::<u64, 4>,
    bench_find_hit_miss::<String, 4>,
    bench_remove::<u64, 4>,
    bench_remove::<String, 4>,
);

criterion_main!(benches);
