#![no_main]

use std::cmp::Ordering;
use std::str::FromStr;

use apicompat_repository::{MavenVersion, VersionRange};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (&str, &str, &str, u16)| {
    let (a, b, range, major) = data;
    let va = MavenVersion::parse(a);
    let vb = MavenVersion::parse(b);

    // Ordering must be antisymmetric.
    assert_eq!(va.cmp(&vb), vb.cmp(&va).reverse());
    if va.cmp(&vb) == Ordering::Equal {
        assert_eq!(va, vb);
    }

    let _ = VersionRange::from_str(range);

    let series = VersionRange::for_major(u64::from(major));
    if series.contains(&va)
        && let Some(lower) = series.lower()
    {
        assert!(&va >= lower);
    }
});
