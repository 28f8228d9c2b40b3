//! Portable CryptoNight hashing.
//!
//! Implements the cryptonight, cryptonight-lite and cryptonight-heavy
//! families with their pool-facing variants, over either a hardware-backed
//! or a pure-software AES round. A [`CnHash`] handle is a fully specialized
//! instance (family, variant, AES path, number of ways) whose [`CnHash::hash`]
//! call turns `ways` back-to-back input blobs into `ways` 32-byte hashes,
//! one page-aligned [`Scratchpad`] per way.
//!
//! ```
//! use cn_hash::{CnHash, Family, Scratchpad, Variant};
//!
//! let h = CnHash::new(Family::Cn, Variant::V0, false, 1);
//! let mut pads = vec![Scratchpad::new(Family::Cn.mem())];
//! let mut out = [0u8; 32];
//! h.hash(b"This is a test", 14, &mut out, &mut pads);
//! ```

mod aes;
mod scratchpad;
mod slow_hash;

pub use scratchpad::Scratchpad;

use slow_hash::Params;

/// Hash output length in bytes.
pub const HASH_LEN: usize = 32;
/// Scratchpad alignment in bytes.
pub const SCRATCHPAD_ALIGN: usize = 4096;
/// Most parallel lanes a single handle will compute per call.
pub const MAX_WAYS: usize = 5;

/// cryptonight scratchpad size.
pub const CN_MEM: usize = 2 * 1024 * 1024;
/// cryptonight-lite scratchpad size.
pub const CN_LITE_MEM: usize = 1024 * 1024;
/// cryptonight-heavy scratchpad size.
pub const CN_HEAVY_MEM: usize = 4 * 1024 * 1024;

/// CryptoNight algorithm family, fixing memory size and loop geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Cn,
    CnLite,
    CnHeavy,
}

impl Family {
    /// Scratchpad bytes one way of this family needs.
    pub fn mem(self) -> usize {
        match self {
            Family::Cn => CN_MEM,
            Family::CnLite => CN_LITE_MEM,
            Family::CnHeavy => CN_HEAVY_MEM,
        }
    }

    pub(crate) fn mask(self) -> u64 {
        match self {
            Family::Cn => 0x1F_FFF0,
            Family::CnLite => 0xF_FFF0,
            Family::CnHeavy => 0x3F_FFF0,
        }
    }

    pub(crate) fn iterations(self) -> usize {
        match self {
            Family::Cn => 0x8_0000,
            Family::CnLite => 0x4_0000,
            Family::CnHeavy => 0x4_0000,
        }
    }
}

/// Per-coin variant of a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// The original CNS008 algorithm.
    V0,
    /// Monero v7 tweaks.
    V1,
    /// Stellite: v1 with a wider tweak-table shift.
    Xtl,
    /// Masari: v1 at half the iterations.
    Msr,
    /// Alloy: v0 at double the iterations.
    Xao,
    /// Arto: v1 with the IPBC-style second-word xor.
    Rto,
    /// Haven: heavy with a negated division mix.
    Xhv,
    /// BitTube: heavy core with v1 tweaks.
    Tube,
}

/// A fully specialized hash function handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CnHash {
    family: Family,
    variant: Variant,
    soft_aes: bool,
    ways: usize,
}

impl CnHash {
    /// Specialize a handle.
    ///
    /// # Panics
    ///
    /// If `ways` is outside `1..=MAX_WAYS`.
    pub fn new(family: Family, variant: Variant, soft_aes: bool, ways: usize) -> Self {
        assert!((1..=MAX_WAYS).contains(&ways), "ways out of range");
        CnHash {
            family,
            variant,
            soft_aes,
            ways,
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn ways(&self) -> usize {
        self.ways
    }

    /// Bytes of scratchpad each way needs.
    pub fn mem(&self) -> usize {
        self.family.mem()
    }

    /// Hash `ways` lanes in one call.
    ///
    /// `input` holds `ways` back-to-back copies of a `blob_len`-byte blob;
    /// `output` receives `ways` 32-byte hashes; `scratchpads` must hold
    /// exactly `ways` pads of this family's size. Pad contents on entry are
    /// irrelevant.
    ///
    /// # Panics
    ///
    /// If a buffer violates the contract above.
    pub fn hash(
        &self,
        input: &[u8],
        blob_len: usize,
        output: &mut [u8],
        scratchpads: &mut [Scratchpad],
    ) {
        assert!(blob_len > 0, "empty blob");
        assert!(input.len() >= self.ways * blob_len, "input too short");
        assert!(output.len() >= self.ways * HASH_LEN, "output too short");
        assert_eq!(scratchpads.len(), self.ways, "one scratchpad per way");

        let params = Params::new(self.family, self.variant);
        for (way, pad) in scratchpads.iter_mut().enumerate() {
            let blob = &input[way * blob_len..(way + 1) * blob_len];
            let digest = slow_hash::hash_one(blob, self.soft_aes, &params, pad.as_mut_slice());
            output[way * HASH_LEN..(way + 1) * HASH_LEN].copy_from_slice(&digest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pads(family: Family, n: usize) -> Vec<Scratchpad> {
        (0..n).map(|_| Scratchpad::new(family.mem())).collect()
    }

    fn one(h: CnHash, input: &[u8]) -> [u8; 32] {
        let mut pads = pads(h.family(), 1);
        let mut out = [0u8; 32];
        h.hash(input, input.len(), &mut out, &mut pads);
        out
    }

    #[test]
    fn cn_v0_known_answer() {
        // CNS008 test vector
        let hash = one(CnHash::new(Family::Cn, Variant::V0, false, 1), b"This is a test");
        assert_eq!(
            hex::encode(hash),
            "a084f01d1437a09c6985401b60d43554ae105802c5f5d8a9b3253649c0be6605"
        );
    }

    #[test]
    fn cn_v0_known_answer_soft_aes() {
        let hash = one(CnHash::new(Family::Cn, Variant::V0, true, 1), b"This is a test");
        assert_eq!(
            hex::encode(hash),
            "a084f01d1437a09c6985401b60d43554ae105802c5f5d8a9b3253649c0be6605"
        );
    }

    #[test]
    fn soft_and_hardware_aes_agree_per_family() {
        let blob = [0x3Au8; 76];
        for family in [Family::Cn, Family::CnLite, Family::CnHeavy] {
            let hard = one(CnHash::new(family, Variant::V1, false, 1), &blob);
            let soft = one(CnHash::new(family, Variant::V1, true, 1), &blob);
            assert_eq!(hard, soft, "family {:?}", family);
        }
    }

    #[test]
    fn variants_produce_distinct_hashes() {
        let blob = [0x11u8; 76];
        let variants = [
            Variant::V0,
            Variant::V1,
            Variant::Xtl,
            Variant::Msr,
            Variant::Xao,
            Variant::Rto,
        ];
        let mut seen = std::collections::HashSet::new();
        for v in variants {
            let hash = one(CnHash::new(Family::Cn, v, false, 1), &blob);
            assert!(seen.insert(hash), "variant {:?} collided", v);
        }
    }

    #[test]
    fn heavy_variants_are_deterministic_and_distinct() {
        let blob = [0x77u8; 76];
        let v0a = one(CnHash::new(Family::CnHeavy, Variant::V0, false, 1), &blob);
        let v0b = one(CnHash::new(Family::CnHeavy, Variant::V0, false, 1), &blob);
        assert_eq!(v0a, v0b);
        let xhv = one(CnHash::new(Family::CnHeavy, Variant::Xhv, false, 1), &blob);
        let tube = one(CnHash::new(Family::CnHeavy, Variant::Tube, false, 1), &blob);
        assert_ne!(v0a, xhv);
        assert_ne!(v0a, tube);
        assert_ne!(xhv, tube);
    }

    #[test]
    fn lite_differs_from_cn() {
        let blob = [0x42u8; 76];
        let cn = one(CnHash::new(Family::Cn, Variant::V1, false, 1), &blob);
        let lite = one(CnHash::new(Family::CnLite, Variant::V1, false, 1), &blob);
        assert_ne!(cn, lite);
    }

    #[test]
    fn multi_way_matches_single_way() {
        let ways = 3;
        let blob_len = 76;
        let mut input = vec![0u8; ways * blob_len];
        for (i, byte) in input.iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }

        let multi = CnHash::new(Family::CnLite, Variant::V1, false, ways);
        let mut multi_pads = pads(Family::CnLite, ways);
        let mut multi_out = vec![0u8; ways * HASH_LEN];
        multi.hash(&input, blob_len, &mut multi_out, &mut multi_pads);

        let single = CnHash::new(Family::CnLite, Variant::V1, false, 1);
        for way in 0..ways {
            let lane = &input[way * blob_len..(way + 1) * blob_len];
            let expected = one(single, lane);
            assert_eq!(&multi_out[way * HASH_LEN..(way + 1) * HASH_LEN], &expected);
        }
    }

    #[test]
    #[should_panic(expected = "ways out of range")]
    fn zero_ways_is_rejected() {
        CnHash::new(Family::Cn, Variant::V0, false, 0);
    }

    #[test]
    #[should_panic(expected = "one scratchpad per way")]
    fn scratchpad_count_must_match_ways() {
        let h = CnHash::new(Family::CnLite, Variant::V0, false, 2);
        let mut out = [0u8; 64];
        let mut only_one = pads(Family::CnLite, 1);
        h.hash(&[0u8; 152], 76, &mut out, &mut only_one);
    }
}
