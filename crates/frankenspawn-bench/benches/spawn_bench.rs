//! End-to-end spawn latency: create, exec `/bin/true`, reap.
//!
//! Set `FRANKENSPAWN_BENCH_PIN=1` to pin the benchmark thread to CPU 0.

use std::time::{Duration, Instant};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use frankenspawn_abi::{SpawnRequest, wait_for_exit};
use frankenspawn_core::spawn::SpawnAttributes;
use frankenspawn_core::spawn::flags::POSIX_SPAWN_RESETIDS;
use frankenspawn_membrane::config::SafetyLevel;

fn maybe_pin_thread() {
    if std::env::var("FRANKENSPAWN_BENCH_PIN").ok().as_deref() != Some("1") {
        return;
    }

    #[cfg(target_os = "linux")]
    unsafe {
        // SAFETY: best-effort pinning; failure is reported and ignored.
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(0, &mut set);
        let rc = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set);
        if rc != 0 {
            let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
            eprintln!("SPAWN_BENCH_META pinning_failed errno={errno}");
        }
    }
}

fn request(force_fork: bool) -> SpawnRequest {
    let mut req = SpawnRequest::new("/bin/true").expect("static path");
    if force_fork {
        let mut attrs = SpawnAttributes::new();
        attrs
            .set_flags(POSIX_SPAWN_RESETIDS)
            .expect("known flag");
        req.attributes(attrs);
    }
    req
}

fn spawn_and_reap(req: &SpawnRequest, mode: SafetyLevel) {
    let pid = req.spawn_in(mode).expect("spawn /bin/true");
    wait_for_exit(pid).expect("reap child");
}

fn bench_spawn(c: &mut Criterion) {
    maybe_pin_thread();

    let mut group = c.benchmark_group("spawn_true");
    group.sample_size(30);
    for (mode, label) in [
        (SafetyLevel::Strict, "strict"),
        (SafetyLevel::Hardened, "hardened"),
    ] {
        for force_fork in [false, true] {
            let req = request(force_fork);
            let id = format!("{label}/{}", req.strategy().as_str());
            group.bench_function(BenchmarkId::from_parameter(id), |b| {
                b.iter_custom(|iters| {
                    let start = Instant::now();
                    for _ in 0..iters {
                        spawn_and_reap(&req, mode);
                    }
                    start.elapsed().max(Duration::from_nanos(1))
                });
            });
        }
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(200))
        .measurement_time(Duration::from_secs(3));
    targets = bench_spawn
);
criterion_main!(benches);
