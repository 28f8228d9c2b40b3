//! Static algorithm registry.
//!
//! Maps a pool algorithm name plus `(ways, soft_aes)` to a fully specialized
//! hash handle, and a name to its scratchpad size. Every family is listed
//! under both its `cn*` short form and `cryptonight*` long form; the bare
//! family name aliases the variant pools actually run by default.

use cn_hash::{CnHash, Family, Variant, MAX_WAYS};

#[rustfmt::skip]
static ALGORITHMS: &[(&str, Family, Variant)] = &[
    ("cn",                     Family::Cn,      Variant::V1),
    ("cryptonight",            Family::Cn,      Variant::V1),
    ("cn/0",                   Family::Cn,      Variant::V0),
    ("cryptonight/0",          Family::Cn,      Variant::V0),
    ("cn/1",                   Family::Cn,      Variant::V1),
    ("cryptonight/1",          Family::Cn,      Variant::V1),
    ("cn/xtl",                 Family::Cn,      Variant::Xtl),
    ("cryptonight/xtl",        Family::Cn,      Variant::Xtl),
    ("cn/msr",                 Family::Cn,      Variant::Msr),
    ("cryptonight/msr",        Family::Cn,      Variant::Msr),
    ("cn/xao",                 Family::Cn,      Variant::Xao),
    ("cryptonight/xao",        Family::Cn,      Variant::Xao),
    ("cn/rto",                 Family::Cn,      Variant::Rto),
    ("cryptonight/rto",        Family::Cn,      Variant::Rto),
    ("cn-lite",                Family::CnLite,  Variant::V1),
    ("cryptonight-lite",       Family::CnLite,  Variant::V1),
    ("cn-lite/0",              Family::CnLite,  Variant::V0),
    ("cryptonight-lite/0",     Family::CnLite,  Variant::V0),
    ("cn-lite/1",              Family::CnLite,  Variant::V1),
    ("cryptonight-lite/1",     Family::CnLite,  Variant::V1),
    ("cn-heavy",               Family::CnHeavy, Variant::V0),
    ("cryptonight-heavy",      Family::CnHeavy, Variant::V0),
    ("cn-heavy/0",             Family::CnHeavy, Variant::V0),
    ("cryptonight-heavy/0",    Family::CnHeavy, Variant::V0),
    ("cn-heavy/xhv",           Family::CnHeavy, Variant::Xhv),
    ("cryptonight-heavy/xhv",  Family::CnHeavy, Variant::Xhv),
    ("cn-heavy/tube",          Family::CnHeavy, Variant::Tube),
    ("cryptonight-heavy/tube", Family::CnHeavy, Variant::Tube),
];

fn find(algo: &str) -> Option<(Family, Variant)> {
    ALGORITHMS
        .iter()
        .find(|(name, _, _)| *name == algo)
        .map(|&(_, family, variant)| (family, variant))
}

/// Resolve `(algo, ways, soft_aes)` to a hash handle.
///
/// `ways` outside `1..=MAX_WAYS` is a lookup miss, exactly like an unknown
/// name.
pub fn lookup(algo: &str, ways: usize, soft_aes: bool) -> Option<CnHash> {
    if !(1..=MAX_WAYS).contains(&ways) {
        return None;
    }
    find(algo).map(|(family, variant)| CnHash::new(family, variant, soft_aes, ways))
}

/// Scratchpad bytes one way of `algo` needs.
pub fn mem_size(algo: &str) -> Option<usize> {
    find(algo).map(|(family, _)| family.mem())
}
