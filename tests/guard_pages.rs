//! Copies into and out of windows that touch inaccessible pages.
//!
//! Each buffer is an anonymous mapping whose first and last pages are
//! `PROT_NONE`. A window placed flush against either fence faults on the
//! first byte read or written outside `[ptr, ptr + n)`.

#![cfg(unix)]

use std::slice;

use memmap2::MmapMut;
use tunedcopy::{Router, TuningConfig, kernels};

const FILL: u8 = 0xEE;

fn page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    assert!(size > 0, "sysconf(_SC_PAGESIZE) failed");
    size as usize
}

/// `len` usable bytes between two inaccessible pages.
struct Fenced {
    map: MmapMut,
    page: usize,
    body: usize,
}

impl Fenced {
    fn new(len: usize) -> Self {
        let page = page_size();
        let body = len.div_ceil(page).max(1) * page;
        let mut map = MmapMut::map_anon(body + 2 * page).unwrap();

        let base = map.as_mut_ptr();
        for fence in [base, unsafe { base.add(page + body) }] {
            let rc = unsafe { libc::mprotect(fence.cast::<libc::c_void>(), page, libc::PROT_NONE) };
            assert_eq!(rc, 0, "mprotect failed");
        }

        Self { map, page, body }
    }

    fn body_mut(&mut self) -> &mut [u8] {
        &mut self.map[self.page..self.page + self.body]
    }

    /// Window starting right after the leading fence.
    fn front(&mut self) -> *mut u8 {
        self.body_mut().as_mut_ptr()
    }

    /// Window of `n` bytes ending right before the trailing fence.
    fn back(&mut self, n: usize) -> *mut u8 {
        let body = self.body;
        unsafe { self.body_mut().as_mut_ptr().add(body - n) }
    }
}

fn sizes() -> Vec<usize> {
    let mut sizes: Vec<usize> = (0..=1024).collect();
    sizes.extend([
        4_095,
        4_096,
        4_097,
        29_999,
        30_000,
        30_001,
        65_536 + 7,
        (1 << 20) + 3,
    ]);
    sizes
}

/// Runs `copy` with the source against one fence and the destination against
/// the other, in both arrangements.
fn check_fenced(
    label: &str,
    n: usize,
    src: &mut Fenced,
    dst: &mut Fenced,
    copy: &dyn Fn(*mut u8, *const u8, usize) -> *mut u8,
) {
    for src_at_back in [true, false] {
        for (i, byte) in src.body_mut().iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }
        dst.body_mut().fill(FILL);

        let (s, d) = if src_at_back {
            (src.back(n), dst.front())
        } else {
            (src.front(), dst.back(n))
        };

        let ret = copy(d, s, n);
        assert_eq!(ret, d, "{label} returned the wrong pointer at size {n}");

        let copied = unsafe { slice::from_raw_parts(d, n) };
        let expected = unsafe { slice::from_raw_parts(s, n) };
        assert_eq!(
            copied, expected,
            "{label} failed at size {n} (source against the {} fence)",
            if src_at_back { "trailing" } else { "leading" }
        );
    }
}

#[test]
fn kernels_stay_inside_fenced_windows() {
    let host = kernels::host_kernels();
    for n in sizes() {
        let mut src = Fenced::new(n);
        let mut dst = Fenced::new(n);
        for kernel in &host {
            let copy = |d: *mut u8, s: *const u8, len: usize| unsafe { kernel.copy(d, s, len) };
            check_fenced(kernel.name(), n, &mut src, &mut dst, &copy);
        }
    }
}

#[test]
fn router_bands_stay_inside_fenced_windows() {
    let router = Router::host(TuningConfig::default()).unwrap();
    for n in sizes() {
        let mut src = Fenced::new(n);
        let mut dst = Fenced::new(n);
        let copy = |d: *mut u8, s: *const u8, len: usize| unsafe { router.route(d, s, len) };
        check_fenced("router", n, &mut src, &mut dst, &copy);
    }
    assert!(router.dispatcher().calls() > 0);
}

#[test]
fn fence_window_positions() {
    let page = page_size();
    let mut region = Fenced::new(100);
    let front = region.front() as usize;
    let back = region.back(100) as usize;
    assert_eq!(front % page, 0);
    assert_eq!(back + 100, front + page);
}
