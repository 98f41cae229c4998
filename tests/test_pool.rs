use std::collections::HashSet;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};

use frame_pool::{Builder, Error, ObjectFactory, Pool};

#[derive(Debug)]
struct BigStruct {
    _slice: [u8; 2048],
    _heap: Vec<u8>,
    str: String,
}

impl Default for BigStruct {
    fn default() -> Self {
        Self {
            _slice: [0; 2048],
            _heap: vec![0; 2048],
            str: "Hello".to_string(),
        }
    }
}

/// Increments `live` on construction, decrements it on drop.
#[derive(Debug)]
struct Tracked {
    live: Arc<AtomicUsize>,
}

impl Tracked {
    fn new(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self { live: live.clone() }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[test]
fn pool_with_big_struct() {
    let pool = Pool::<BigStruct>::new();
    let item = pool.get().unwrap();
    assert_eq!(item.str.as_str(), "Hello");
}

#[test]
fn fixed_growth_replenishes_whole_batches() {
    let pool = Pool::<u32>::with_growth(5).unwrap();
    let mut items = Vec::new();
    for i in 1..=10 {
        items.push(pool.get().unwrap());
        // Two replenishments of five each over ten acquisitions.
        let expected = if i <= 5 { 5 } else { 10 };
        assert_eq!(pool.allocated(), expected);
    }
    assert_eq!(pool.allocated(), 10);
    assert_eq!(pool.available(), 0);
}

#[test]
fn geometric_growth_doubles_until_capped() {
    let pool = Pool::<u32>::new();
    let mut items = Vec::new();
    let mut total = 0;
    for batch in [1, 2, 4, 8, 16, 32, 32] {
        assert_eq!(pool.available(), 0);
        // One acquisition against an empty pool triggers one batch...
        items.push(pool.get().unwrap());
        total += batch;
        assert_eq!(pool.allocated(), total);
        // ...then drain it so the next acquisition misses again.
        for _ in 1..batch {
            items.push(pool.get().unwrap());
        }
    }
}

#[test]
fn geometric_growth_from_larger_start() {
    let pool = Pool::<u32>::with_growth(-3).unwrap();
    let mut items = Vec::new();
    let mut total = 0;
    for batch in [3, 6, 12, 24, 48, 48] {
        items.push(pool.get().unwrap());
        total += batch;
        assert_eq!(pool.allocated(), total);
        for _ in 1..batch {
            items.push(pool.get().unwrap());
        }
    }
}

#[test]
fn reserve_rounds_up_to_batch_multiple() {
    let pool = Pool::<u32>::with_growth(3).unwrap();
    pool.reserve(7).unwrap();
    assert_eq!(pool.allocated(), 9);
    assert!(pool.available() >= 7);

    // Already satisfied; nothing changes.
    pool.reserve(7).unwrap();
    assert_eq!(pool.allocated(), 9);
}

#[test]
fn grow_exact_bypasses_policy() {
    let pool = Pool::<u32>::with_growth(10).unwrap();
    pool.grow_exact(4).unwrap();
    assert_eq!(pool.allocated(), 4);
    assert_eq!(pool.available(), 4);

    pool.grow_exact(1).unwrap();
    assert_eq!(pool.allocated(), 5);

    // Draining the reserve still grows by whole policy batches.
    let items: Vec<_> = (0..6).map(|_| pool.get().unwrap()).collect();
    assert_eq!(pool.allocated(), 15);
    drop(items);
}

#[test]
fn allocated_count_never_decreases() {
    let pool = Pool::<BigStruct>::with_growth(-2).unwrap();
    let mut high_water = 0;
    for _ in 0..50 {
        let item = pool.get().unwrap();
        assert!(pool.allocated() >= high_water);
        high_water = pool.allocated();
        drop(item);
        assert_eq!(pool.allocated(), high_water);
    }
}

#[test]
fn resetter_runs_once_per_release() {
    let resets = Arc::new(AtomicUsize::new(0));
    let counter = resets.clone();
    let pool: Pool<String> = Pool::builder()
        .growth(2)
        .resetter(move |s: &mut String| {
            s.clear();
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    let mut item = pool.get().unwrap();
    item.push_str("dirty");
    assert_eq!(resets.load(Ordering::SeqCst), 0);
    drop(item);
    assert_eq!(resets.load(Ordering::SeqCst), 1);

    // The reused object was reset before it became acquirable.
    let item = pool.get().unwrap();
    assert_eq!(&*item, "");
    drop(item);
    assert_eq!(resets.load(Ordering::SeqCst), 2);
}

#[test]
fn concurrent_holders_never_share_an_object() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 100;

    let pool: Arc<Pool<u64>> = Arc::new(Pool::new());
    let (tx, rx) = mpsc::channel();
    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let pool = pool.clone();
        let tx = tx.clone();
        handles.push(std::thread::spawn(move || {
            for _ in 0..PER_THREAD {
                tx.send(pool.get_owned().unwrap()).unwrap();
            }
        }));
    }
    drop(tx);

    // Hold every lease until all threads are done, then compare addresses.
    let items: Vec<_> = rx.iter().collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(items.len(), THREADS * PER_THREAD);
    let addresses: HashSet<usize> = items.iter().map(|i| &**i as *const u64 as usize).collect();
    assert_eq!(addresses.len(), items.len());
}

#[test]
fn stress_paired_acquire_release() {
    const THREADS: usize = 8;
    const CYCLES: usize = 1000;

    let pool: Arc<Pool<BigStruct>> = Arc::new(Pool::builder().growth(-2).build().unwrap());
    let mut handles = Vec::new();
    for id in 0..THREADS {
        let pool = pool.clone();
        handles.push(std::thread::spawn(move || {
            for i in 0..CYCLES {
                let mut item = pool.get_owned().unwrap();
                item.str = format!("{id}:{i}");
                drop(item);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(pool.allocated() > 0);
    assert_eq!(pool.available(), pool.allocated());
}

#[test]
fn failed_batch_leaves_pool_unchanged() {
    let live = Arc::new(AtomicUsize::new(0));
    let attempts = Arc::new(AtomicUsize::new(0));
    let creator_live = live.clone();
    let creator_attempts = attempts.clone();
    let pool = Builder::with_try_creator(move || {
        if creator_attempts.fetch_add(1, Ordering::SeqCst) == 3 {
            return Err("transient resource shortage".into());
        }
        Ok(Tracked::new(&creator_live))
    })
    .growth(5)
    .build()
    .unwrap();

    // Fails on the fourth object of the first batch of five.
    let err = pool.get().unwrap_err();
    assert!(matches!(err, Error::Construction(_)));
    assert_eq!(pool.allocated(), 0);
    assert_eq!(pool.available(), 0);
    // The three objects constructed before the failure were destroyed.
    assert_eq!(live.load(Ordering::SeqCst), 0);

    // The failure was transient; a retry succeeds with a full batch.
    let item = pool.get().unwrap();
    assert_eq!(pool.allocated(), 5);
    assert_eq!(live.load(Ordering::SeqCst), 5);
    drop(item);
}

#[test]
fn failed_reserve_keeps_earlier_batches() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let creator_attempts = attempts.clone();
    let pool = Builder::with_try_creator(move || {
        if creator_attempts.fetch_add(1, Ordering::SeqCst) == 4 {
            return Err("fifth object refused".into());
        }
        Ok(0u32)
    })
    .growth(3)
    .build()
    .unwrap();

    // First batch of three succeeds; the second fails on its second object.
    assert!(pool.reserve(6).is_err());
    assert_eq!(pool.allocated(), 3);
    assert_eq!(pool.available(), 3);
}

#[test]
fn dropping_the_pool_destroys_every_object() {
    let live = Arc::new(AtomicUsize::new(0));
    let creator_live = live.clone();
    let pool = Builder::with_creator(move || Tracked::new(&creator_live))
        .growth(4)
        .build()
        .unwrap();

    let held = pool.get().unwrap();
    let released = pool.get().unwrap();
    drop(released);
    assert_eq!(live.load(Ordering::SeqCst), 4);

    drop(held);
    drop(pool);
    assert_eq!(live.load(Ordering::SeqCst), 0);
}

#[test]
fn dropping_the_pool_destroys_raw_lent_objects() {
    let live = Arc::new(AtomicUsize::new(0));
    let creator_live = live.clone();
    let pool = Builder::with_creator(move || Tracked::new(&creator_live))
        .growth(2)
        .build()
        .unwrap();

    // Lent through the raw factory interface and never returned.
    let _leaked = pool.create_object().unwrap();
    assert_eq!(live.load(Ordering::SeqCst), 2);
    drop(pool);
    assert_eq!(live.load(Ordering::SeqCst), 0);
}

#[test]
fn factory_interface_round_trips() {
    fn exercise<F: ObjectFactory<String>>(factory: &F) {
        let object = factory.create_object().unwrap();
        unsafe {
            (*object.as_ptr()).push_str("via factory");
            factory.delete_object(object);
        }
    }

    let pool: Pool<String> = Pool::new();
    exercise(&pool);
    assert_eq!(pool.allocated(), 1);
    assert_eq!(pool.available(), 1);
    assert_eq!(&*pool.get().unwrap(), "via factory");
}

#[test]
fn objects_are_aligned_and_evenly_spaced() {
    #[repr(align(64))]
    #[derive(Default)]
    struct Aligned(#[allow(dead_code)] u8);

    let pool = Pool::<Aligned>::with_growth(4).unwrap();
    let items: Vec<_> = (0..4).map(|_| pool.get().unwrap()).collect();
    assert_eq!(pool.allocated(), 4);

    let addresses: Vec<usize> = items
        .iter()
        .map(|i| &**i as *const Aligned as usize)
        .collect();
    for &address in &addresses {
        assert_eq!(address % 64, 0);
    }
    // All four came from one block: consecutive frames, constant stride.
    let stride = addresses[1] - addresses[0];
    assert!(stride >= mem::size_of::<Aligned>());
    for pair in addresses.windows(2) {
        assert_eq!(pair[1] - pair[0], stride);
    }
}

#[test]
fn leases_compare_and_display_as_their_objects() {
    let pool = Pool::<String>::new();
    let mut a = pool.get().unwrap();
    a.push_str("same");
    let mut b = pool.get().unwrap();
    b.push_str("same");
    assert_eq!(a, b);
    assert_eq!(format!("{a}"), "same");
    assert_eq!(format!("{a:?}"), "\"same\"");
}
