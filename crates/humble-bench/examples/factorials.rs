//! Factorial table on the heap and on a 10-slot Humble block.
//!
//! Builds the same `(i, i!)` list twice, once per allocator, prints both,
//! then shows the block refusing an eleventh entry. Finishes with the same
//! table as a map keyed by `i`.
//!
//! ```sh
//! RUST_LOG=humble_arena=trace cargo run -p humble-bench --example factorials
//! ```

use humble_arena::{HeapAllocator, HumbleAllocator};
use humble_bench::{factorial_pairs, fill_list};
use humble_list::ForwardList;
use humble_tree::TreeMap;

type Pair = (u32, u64);

fn print_table<A: humble_core::ElementAllocator<Pair>>(title: &str, list: &ForwardList<Pair, A>) {
    println!("\n{title}");
    for (i, fact) in list {
        println!("{i} - {fact}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("humble_arena=debug".parse()?),
        )
        .init();

    let (heap, err) = fill_list(factorial_pairs(10), HeapAllocator::<Pair>::new());
    if let Some(err) = err {
        return Err(err.into());
    }
    print_table("heap", &heap);

    let (mut humble, err) = fill_list(factorial_pairs(10), HumbleAllocator::<Pair, 10>::new());
    if let Some(err) = err {
        return Err(err.into());
    }
    print_table("humble<_, 10>", &humble);
    assert!(heap == humble);

    if let Some(stats) = humble.allocator().stats() {
        tracing::info!(
            occupied = stats.occupied_bytes,
            capacity = stats.capacity_bytes,
            "block filled"
        );
    }

    humble.pop_front();
    match humble.push_back((10, 3_628_800)) {
        Ok(()) => println!("\nunexpected: block accepted an eleventh entry"),
        Err(err) => println!("\neleventh entry refused: {err}"),
    }

    let mut map = TreeMap::try_from_iter_in(factorial_pairs(10), HumbleAllocator::<Pair, 10>::new())?;
    println!("\nmap<_, 10>: {map:?}");
    map.try_insert(0, 0)?;
    if let Err(err) = map.try_insert(10, 3_628_800) {
        println!("eleventh key refused: {err}");
    }

    Ok(())
}
