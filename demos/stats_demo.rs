use std::hash::BuildHasher;

use clap::Parser;
use probe_map::OpenAddressingMap;
use siphasher::sip::SipHasher;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    #[arg(short = 'l', long = "max_load_factor", default_value_t = 0.75)]
    max_load_factor: f64,

    /// Percentage of inserted keys to remove again before reporting.
    #[arg(short = 'r', long = "remove_percent", default_value_t = 25)]
    remove_percent: u64,
}

#[derive(Default)]
struct SipBuildHasher;

impl BuildHasher for SipBuildHasher {
    type Hasher = SipHasher;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher::new()
    }
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating map with target capacity {} and max load factor {}",
        args.target_capacity, args.max_load_factor
    );

    let mut map: OpenAddressingMap<u64, u64, SipBuildHasher> =
        OpenAddressingMap::with_capacity_and_max_load_factor(
            args.target_capacity,
            args.max_load_factor,
        );

    println!(
        "Actual capacity: {}, max load factor: {:.2}, growth threshold: {}",
        map.capacity(),
        map.max_load_factor(),
        map.growth_threshold()
    );

    let num_values = map.growth_threshold().saturating_sub(1) as u64;
    println!("Filling map with {} u64 keys...", num_values);

    let mut num_failures = 0;
    for key in 0..num_values {
        if map.try_insert(key, key * 2).is_err() {
            num_failures += 1;
        }
    }

    let removals = num_values * args.remove_percent.min(100) / 100;
    for key in 0..removals {
        map.remove(&(key * 100 / args.remove_percent.clamp(1, 100)));
    }

    println!("Map holds {} entries after removals", map.len());
    println!(
        "Final load factor: {:.2}%",
        map.current_load_factor() * 100.0
    );

    map.probe_histogram().print();
    map.debug_stats().print();
    println!(
        "Number of failed try_insert attempts: {} ({:.02}%)",
        num_failures,
        num_failures as f64 / num_values.max(1) as f64 * 100.0
    );
}
