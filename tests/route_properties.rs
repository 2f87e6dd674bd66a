//! Property tests: the router and every host kernel produce the same bytes as
//! `copy_from_slice` and never write outside the destination.

use std::sync::OnceLock;

use proptest::{
    collection::vec,
    prelude::{Just, Strategy, any, prop_assert, prop_assert_eq, prop_oneof},
    proptest,
    test_runner::{Config as ProptestConfig, FileFailurePersistence},
};
use tunedcopy::{Kernel, Router, TuningConfig, kernels};

const PROP_CASES: u32 = 256;
const GUARD: usize = 64;
const GUARD_BYTE: u8 = 0xA5;

/// Low dispatcher threshold so large-band behaviour is cheap to reach.
fn router() -> &'static Router {
    static ROUTER: OnceLock<Router> = OnceLock::new();
    ROUTER.get_or_init(|| {
        Router::host(TuningConfig {
            large_threshold: 512,
            bucket_size: 16,
            exploration_horizon: 8,
            ..TuningConfig::default()
        })
        .unwrap()
    })
}

fn length_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![
        Just(0_usize),
        Just(1_usize),
        Just(15_usize),
        Just(16_usize),
        Just(17_usize),
        Just(128_usize),
        Just(129_usize),
        Just(511_usize),
        Just(512_usize),
        Just(513_usize),
        0_usize..=256,
        0_usize..=20_000,
    ]
}

fn case_strategy() -> impl Strategy<Value = (Vec<u8>, usize, usize)> {
    (length_strategy(), 0_usize..64, 0_usize..64).prop_flat_map(|(len, src_off, dst_off)| {
        (vec(any::<u8>(), src_off + len), Just(src_off), Just(dst_off))
    })
}

fn proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: PROP_CASES,
        failure_persistence: Some(Box::new(FileFailurePersistence::WithSource(
            "route-property-regressions",
        ))),
        ..ProptestConfig::default()
    }
}

/// Runs `copy` into a guarded destination and returns the whole buffer plus
/// the start offset of the copied region.
fn guarded_copy(
    src: &[u8],
    dst_off: usize,
    copy: impl FnOnce(*mut u8, *const u8, usize) -> *mut u8,
) -> (Vec<u8>, usize, bool) {
    let n = src.len();
    let start = GUARD + dst_off;
    let mut buf = vec![GUARD_BYTE; start + n + GUARD];
    let dest = unsafe { buf.as_mut_ptr().add(start) };
    let returned = copy(dest, src.as_ptr(), n);
    (buf, start, returned == dest)
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn router_matches_copy_from_slice((data, src_off, dst_off) in case_strategy()) {
        let src = &data[src_off..];
        let (buf, start, returned_dest) = guarded_copy(src, dst_off, |d, s, n| unsafe {
            router().route(d, s, n)
        });

        let mut expected = vec![0u8; src.len()];
        expected.copy_from_slice(src);

        prop_assert!(returned_dest);
        prop_assert_eq!(&buf[start..start + src.len()], &expected[..]);
        prop_assert!(buf[..start].iter().all(|&b| b == GUARD_BYTE));
        prop_assert!(buf[start + src.len()..].iter().all(|&b| b == GUARD_BYTE));
    }

    #[test]
    fn kernels_match_copy_from_slice(
        (data, src_off, dst_off) in case_strategy(),
        pick in any::<usize>(),
    ) {
        let host = kernels::host_kernels();
        let kernel: Kernel = host[pick % host.len()];
        let src = &data[src_off..];
        let (buf, start, returned_dest) = guarded_copy(src, dst_off, |d, s, n| unsafe {
            kernel.copy(d, s, n)
        });

        prop_assert!(returned_dest, "{} returned the wrong pointer", kernel.name());
        prop_assert_eq!(&buf[start..start + src.len()], src, "{} corrupted the copy", kernel.name());
        prop_assert!(buf[..start].iter().all(|&b| b == GUARD_BYTE), "{} underflowed", kernel.name());
        prop_assert!(buf[start + src.len()..].iter().all(|&b| b == GUARD_BYTE), "{} overflowed", kernel.name());
    }

    #[test]
    fn copy_slice_copies_the_shorter_length(
        src in vec(any::<u8>(), 0..2_000),
        dst_len in 0_usize..2_000,
    ) {
        let mut dst = vec![0u8; dst_len];
        let copied = router().copy_slice(&mut dst, &src);
        let n = src.len().min(dst_len);
        prop_assert_eq!(copied, n);
        prop_assert_eq!(&dst[..n], &src[..n]);
        prop_assert!(dst[n..].iter().all(|&b| b == 0));
    }
}

#[test]
fn dispatcher_keeps_a_valid_selection_under_random_traffic() {
    let dispatcher = router().dispatcher();
    let before = dispatcher.calls();
    let src = vec![0x3C_u8; 4_096];
    let mut dst = vec![0u8; 4_096];
    for _ in 0..500 {
        router().copy_slice(&mut dst, &src);
    }
    assert!(dispatcher.calls() >= before + 500);
    assert!(dispatcher.selected_index() < dispatcher.registry().len());
    assert_eq!(dst, src);
}
