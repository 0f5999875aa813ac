//! Ringchannel - Benchmark Throughput SPSC
//!
//! Satu thread producer dan satu thread consumer, masing-masing di-pin ke
//! core sendiri, memindahkan `0..iterations` lewat channel dengan busy retry
//! saat penuh/kosong.
//!
//! Usage:
//!   cargo run --release -- [--iterations N] [--capacity N] [--producer-cpu N] [--consumer-cpu N]

use std::thread;
use std::time::{Duration, Instant};

use ringchannel::core::{
    Branch, HeapChannel, InlineChannel, Mask, MappedChannel, RingChannel, Storage, Wrap,
};
use ringchannel::trace::init_tracing;
use ringchannel::Result;

/// Inline channels need their size at compile time.
const INLINE_CAPACITY: usize = 1024;

/// Ring dengan 1 slot selalu penuh; butuh minimal 2 agar ada 1 slot terpakai.
const MIN_CAPACITY: usize = 2;

/// Benchmark configuration
struct BenchConfig {
    iterations: u32,
    capacity: usize,
    producer_cpu: usize,
    consumer_cpu: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: 100_000_000,
            capacity: 1024,
            producer_cpu: 1,
            consumer_cpu: 2,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();
    let config = parse_args(&args);

    println!("🚀 Ringchannel SPSC Throughput");
    println!("==============================\n");
    println!("📊 Konfigurasi");
    println!("  Iterations:   {}", config.iterations);
    println!("  Capacity:     {} (inline {})", config.capacity, INLINE_CAPACITY);
    println!(
        "  CPUs:         producer {}, consumer {}\n",
        config.producer_cpu, config.consumer_cpu
    );

    let mut baseline: HeapChannel<u32, Branch> = RingChannel::with_capacity(config.capacity)?;
    let elapsed = benchmark(&mut baseline, &config);
    report(&baseline, elapsed, &config);

    let mut inline: InlineChannel<u32, INLINE_CAPACITY, Mask> = RingChannel::new()?;
    let elapsed = benchmark(&mut inline, &config);
    report(&inline, elapsed, &config);

    // Mask wraparound: a non power-of-two --capacity only skips this run.
    match MappedChannel::<u32, Mask>::mapped(config.capacity) {
        Ok(mut mapped) => {
            let elapsed = benchmark(&mut mapped, &config);
            report(&mapped, elapsed, &config);
        }
        Err(e) => eprintln!("  ⚠️  mapped/mask dilewati: {}", e),
    }

    println!("\n✅ Semua benchmark selesai!");
    Ok(())
}

/// Run one producer/consumer pair to completion and return the wall time.
fn benchmark<S, W>(channel: &mut RingChannel<u32, S, W>, config: &BenchConfig) -> Duration
where
    S: Storage<u32> + Send,
    W: Wrap,
{
    let iterations = config.iterations;
    let (producer_cpu, consumer_cpu) = (config.producer_cpu, config.consumer_cpu);
    let (mut tx, mut rx) = channel.split();

    let start = Instant::now();
    thread::scope(|s| {
        s.spawn(move || {
            if !pin_current_thread(producer_cpu) {
                eprintln!("  could not pin producer to cpu {}", producer_cpu);
            }
            for i in 0..iterations {
                while tx.try_push(i).is_err() {}
            }
        });
        s.spawn(move || {
            if !pin_current_thread(consumer_cpu) {
                eprintln!("  could not pin consumer to cpu {}", consumer_cpu);
            }
            let mut expected = 0u32;
            while expected < iterations {
                if let Some(value) = rx.try_pop() {
                    debug_assert_eq!(value, expected);
                    expected += 1;
                }
            }
        });
    });
    start.elapsed()
}

fn report<S, W>(channel: &RingChannel<u32, S, W>, elapsed: Duration, config: &BenchConfig)
where
    S: Storage<u32>,
    W: Wrap,
{
    let secs = elapsed.as_secs_f64();
    println!(
        "  {}/{:<8} {:>5} slots: {:.3} s  ({:.2} M ops/sec)",
        S::KIND,
        W::NAME,
        channel.capacity(),
        secs,
        config.iterations as f64 / secs / 1_000_000.0
    );
}

#[cfg(target_os = "linux")]
fn pin_current_thread(cpu: usize) -> bool {
    // SAFETY: cpu_set_t is plain data; sched_setaffinity(0, ..) targets the calling thread.
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(cpu, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) == 0
    }
}

#[cfg(not(target_os = "linux"))]
fn pin_current_thread(_cpu: usize) -> bool {
    false
}

fn parse_args(args: &[String]) -> BenchConfig {
    let mut config = BenchConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--iterations" | "-n" => {
                if i + 1 < args.len() {
                    config.iterations = args[i + 1].parse().unwrap_or(config.iterations);
                    i += 1;
                }
            }
            "--capacity" | "-c" => {
                if i + 1 < args.len() {
                    match args[i + 1].parse::<usize>() {
                        Ok(capacity) if capacity >= MIN_CAPACITY => config.capacity = capacity,
                        _ => eprintln!(
                            "⚠️  --capacity {} ditolak (minimal {}), pakai {}",
                            args[i + 1],
                            MIN_CAPACITY,
                            config.capacity
                        ),
                    }
                    i += 1;
                }
            }
            "--producer-cpu" => {
                if i + 1 < args.len() {
                    config.producer_cpu = args[i + 1].parse().unwrap_or(config.producer_cpu);
                    i += 1;
                }
            }
            "--consumer-cpu" => {
                if i + 1 < args.len() {
                    config.consumer_cpu = args[i + 1].parse().unwrap_or(config.consumer_cpu);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Ringchannel SPSC throughput benchmark");
                println!();
                println!("Usage: ringchannel [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --iterations <N>    Values to transfer (default: 100000000)");
                println!("  -c, --capacity <N>      Heap/mapped ring slots, >= 2 (default: 1024)");
                println!("      --producer-cpu <N>  Core for the producer thread (default: 1)");
                println!("      --consumer-cpu <N>  Core for the consumer thread (default: 2)");
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
            }
        }
        i += 1;
    }

    config
}
