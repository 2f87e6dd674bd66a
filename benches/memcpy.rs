use core::ffi::c_void;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::time::Duration;
use tunedcopy::{Router, TuningConfig, kernels};

unsafe extern "C" {
    #[link_name = "memcpy"]
    fn libc_memcpy(dest: *mut c_void, src: *const c_void, n: usize) -> *mut c_void;
}

struct Buffers {
    src: Vec<u8>,
    dst: Vec<u8>,
}

impl Buffers {
    fn new(len: usize) -> Self {
        let alloc_len = len + 64;
        Self {
            src: (0..alloc_len).map(|i| (i % 251) as u8).collect(),
            dst: vec![0u8; alloc_len],
        }
    }

    fn ptrs(&mut self, src_off: usize, dst_off: usize) -> (*mut u8, *const u8) {
        unsafe {
            (
                self.dst.as_mut_ptr().add(dst_off),
                self.src.as_ptr().add(src_off),
            )
        }
    }
}

fn configure_group_for_len(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    len: usize,
) {
    if len >= 1 << 20 {
        group.sample_size(20);
        group.warm_up_time(Duration::from_millis(300));
        group.measurement_time(Duration::from_millis(900));
    } else if len >= 1 << 15 {
        group.sample_size(30);
        group.warm_up_time(Duration::from_millis(250));
        group.measurement_time(Duration::from_millis(700));
    } else {
        group.sample_size(40);
        group.warm_up_time(Duration::from_millis(200));
        group.measurement_time(Duration::from_millis(500));
    }
}

/// glibc vs `copy_nonoverlapping` vs the router, across every band boundary.
fn router_benches(c: &mut Criterion) {
    let router = Router::host(TuningConfig::default()).unwrap();

    let sizes = [
        1usize,
        4,
        8,
        15,
        16,
        17,
        64,
        127,
        128,
        129,
        255,
        256,
        1024,
        4096,
        16_384,
        29_999,
        30_000,
        65_536,
        262_144,
        1 << 20,
        8 << 20,
    ];

    let mut group = c.benchmark_group("router");

    for len in sizes {
        for (src_off, dst_off) in [(0usize, 0usize), (15, 7)] {
            let label = format!("len{len}_s{src_off}_d{dst_off}");
            let mut buffers = Buffers::new(len);
            let (dst_ptr, src_ptr) = buffers.ptrs(src_off, dst_off);

            configure_group_for_len(&mut group, len);
            group.throughput(Throughput::Bytes(len as u64));

            group.bench_with_input(BenchmarkId::new("glibc", &label), &len, |b, &n| {
                b.iter(|| unsafe {
                    libc_memcpy(
                        black_box(dst_ptr as *mut c_void),
                        black_box(src_ptr as *const c_void),
                        black_box(n),
                    );
                    black_box(core::ptr::read_volatile(dst_ptr));
                });
            });

            group.bench_with_input(BenchmarkId::new("std", &label), &len, |b, &n| {
                b.iter(|| unsafe {
                    kernels::STD.copy(black_box(dst_ptr), black_box(src_ptr), black_box(n));
                    black_box(core::ptr::read_volatile(dst_ptr));
                });
            });

            group.bench_with_input(BenchmarkId::new("selftuned", &label), &len, |b, &n| {
                b.iter(|| unsafe {
                    router.route(black_box(dst_ptr), black_box(src_ptr), black_box(n));
                    black_box(core::ptr::read_volatile(dst_ptr));
                });
            });
        }
    }

    group.finish();
}

/// Each candidate kernel on its own, at sizes the dispatcher sees.
fn kernel_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernels");

    for len in [30_000usize, 262_144, 4 << 20] {
        let mut buffers = Buffers::new(len);
        let (dst_ptr, src_ptr) = buffers.ptrs(3, 0);

        configure_group_for_len(&mut group, len);
        group.throughput(Throughput::Bytes(len as u64));

        for kernel in kernels::host_kernels() {
            if kernel.name() == "bytewise" && len > 262_144 {
                continue;
            }
            group.bench_with_input(BenchmarkId::new(kernel.name(), len), &len, |b, &n| {
                b.iter(|| unsafe {
                    kernel.copy(black_box(dst_ptr), black_box(src_ptr), black_box(n));
                    black_box(core::ptr::read_volatile(dst_ptr));
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, router_benches, kernel_benches);
criterion_main!(benches);
