//! The CryptoNight core: Keccak absorb, scratchpad explode, memory-hard
//! loop, scratchpad implode and result selection.
//!
//! One set of code drives every family; the per-family and per-variant
//! differences (memory size, iteration count, address mask, the v1 tweaks,
//! the heavy division mix) are captured in [`Params`].

use blake_hash::Blake256;
use digest::generic_array::typenum::U32;
use digest::generic_array::GenericArray;
use digest::Digest;
use groestl::Groestl256;
use jh_x86_64::Jh256;
use sha3::Keccak256Full;

use crate::aes::{expand_key, AesRound, HwAes, SoftAes};
use crate::{Family, Variant};

/// Fully resolved algorithm parameters for one hash invocation.
pub(crate) struct Params {
    pub mem: usize,
    pub mask: u64,
    pub iterations: usize,
    pub heavy: bool,
    /// Heavy only: negate the low mix word before deriving the next address.
    pub xhv: bool,
    /// Monero v7 tweak family (applies to cn/1, xtl, msr, rto and tube).
    pub v1: bool,
    /// Bit shift in the v1 byte-11 tweak; 4 for xtl, 3 everywhere else.
    pub v1_shift: u32,
    /// rto/tube flavour of the second v1 tweak: also xor the low store word.
    pub v1_low_xor: bool,
}

impl Params {
    pub fn new(family: Family, variant: Variant) -> Self {
        let mut p = Params {
            mem: family.mem(),
            mask: family.mask(),
            iterations: family.iterations(),
            heavy: family == Family::CnHeavy,
            xhv: false,
            v1: false,
            v1_shift: 3,
            v1_low_xor: false,
        };
        match variant {
            Variant::V0 => {}
            Variant::V1 => p.v1 = true,
            Variant::Xtl => {
                p.v1 = true;
                p.v1_shift = 4;
            }
            Variant::Msr => {
                p.v1 = true;
                p.iterations /= 2;
            }
            Variant::Xao => p.iterations = 0x10_0000,
            Variant::Rto => {
                p.v1 = true;
                p.v1_low_xor = true;
            }
            Variant::Xhv => p.xhv = true,
            Variant::Tube => {
                p.v1 = true;
                p.v1_low_xor = true;
            }
        }
        p
    }
}

/// Hash one blob into one 32-byte output using the given scratchpad.
pub(crate) fn hash_one(input: &[u8], soft_aes: bool, params: &Params, pad: &mut [u8]) -> [u8; 32] {
    if soft_aes {
        hash_impl::<SoftAes>(input, params, pad)
    } else {
        hash_impl::<HwAes>(input, params, pad)
    }
}

fn hash_impl<A: AesRound>(input: &[u8], p: &Params, pad: &mut [u8]) -> [u8; 32] {
    assert_eq!(pad.len(), p.mem, "scratchpad size does not match algorithm");
    assert!(
        !p.v1 || input.len() >= 43,
        "v1 tweak needs at least 43 input bytes"
    );

    let mut state = [0u8; 200];
    {
        let mut keccak = Keccak256Full::new();
        keccak.input(input);
        state.copy_from_slice(&keccak.result());
    }

    // Monero v7 nonce tweak: input bytes 35..43 xored with the state tail.
    let tweak = if p.v1 {
        read_u64(&input[35..]) ^ read_u64(&state[192..])
    } else {
        0
    };

    explode::<A>(&state, pad, p.heavy);
    memory_loop::<A>(&state, pad, p, tweak);
    implode::<A>(&mut state, pad, p.heavy);

    keccak_permute(&mut state);
    select_result(&state)
}

/// Fill the scratchpad from the Keccak state (CNS008 step 1).
fn explode<A: AesRound>(state: &[u8; 200], pad: &mut [u8], heavy: bool) {
    let keys = expand_key(&key32(&state[..32]));
    let mut blocks = [[0u8; 16]; 8];
    for (b, chunk) in blocks.iter_mut().zip(state[64..192].chunks_exact(16)) {
        b.copy_from_slice(chunk);
    }

    if heavy {
        for _ in 0..16 {
            for b in blocks.iter_mut() {
                for k in &keys {
                    A::round(b, k);
                }
            }
            mix_and_propagate(&mut blocks);
        }
    }

    for chunk in pad.chunks_exact_mut(128) {
        for (b, slot) in blocks.iter_mut().zip(chunk.chunks_exact_mut(16)) {
            for k in &keys {
                A::round(b, k);
            }
            slot.copy_from_slice(b);
        }
    }
}

/// The memory-hard loop (CNS008 step 2 plus variant tweaks).
fn memory_loop<A: AesRound>(state: &[u8; 200], pad: &mut [u8], p: &Params, tweak: u64) {
    // 16-byte blocks viewed as u64 pairs; the pad is page-aligned so the
    // cast is always aligned.
    let words: &mut [u64] = unsafe {
        std::slice::from_raw_parts_mut(pad.as_mut_ptr().cast::<u64>(), pad.len() / 8)
    };

    let mut a = [
        read_u64(&state[0..]) ^ read_u64(&state[32..]),
        read_u64(&state[8..]) ^ read_u64(&state[40..]),
    ];
    let mut b = [
        read_u64(&state[16..]) ^ read_u64(&state[48..]),
        read_u64(&state[24..]) ^ read_u64(&state[56..]),
    ];
    let mut idx = a[0];

    for _ in 0..p.iterations {
        // first transfer: AES round keyed with a, store b ^ cx
        let j = block_index(idx, p.mask);
        let mut cx = [words[j], words[j + 1]];
        aes_round_words::<A>(&mut cx, &a);
        words[j] = b[0] ^ cx[0];
        words[j + 1] = b[1] ^ cx[1];
        if p.v1 {
            words[j + 1] = tweak_high_word(words[j + 1], p.v1_shift);
        }

        // second transfer: 8byte_mul/8byte_add against the cx address
        let k = block_index(cx[0], p.mask);
        let d = [words[k], words[k + 1]];
        let product = u128::from(cx[0]) * u128::from(d[0]);
        a[0] = a[0].wrapping_add((product >> 64) as u64);
        a[1] = a[1].wrapping_add(product as u64);
        words[k] = a[0];
        words[k + 1] = if p.v1 {
            if p.v1_low_xor {
                a[1] ^ tweak ^ a[0]
            } else {
                a[1] ^ tweak
            }
        } else {
            a[1]
        };
        a[0] ^= d[0];
        a[1] ^= d[1];
        idx = a[0];

        if p.heavy {
            let m = block_index(idx, p.mask);
            let n = words[m] as i64;
            let div = words[m + 1] as u32 as i32;
            let q = n.wrapping_div(i64::from(div | 5));
            words[m] = (n ^ q) as u64;
            let mixed = if p.xhv { !div } else { div };
            idx = (i64::from(mixed) ^ q) as u64;
        }

        b = cx;
    }
}

/// Fold the scratchpad back into the Keccak state (CNS008 step 3).
fn implode<A: AesRound>(state: &mut [u8; 200], pad: &[u8], heavy: bool) {
    let keys = expand_key(&key32(&state[32..64]));
    let mut blocks = [[0u8; 16]; 8];
    for (b, chunk) in blocks.iter_mut().zip(state[64..192].chunks_exact(16)) {
        b.copy_from_slice(chunk);
    }

    implode_pass::<A>(&mut blocks, pad, &keys, heavy);
    if heavy {
        implode_pass::<A>(&mut blocks, pad, &keys, true);
        for _ in 0..16 {
            for b in blocks.iter_mut() {
                for k in &keys {
                    A::round(b, k);
                }
            }
            mix_and_propagate(&mut blocks);
        }
    }

    for (b, chunk) in blocks.iter().zip(state[64..192].chunks_exact_mut(16)) {
        chunk.copy_from_slice(b);
    }
}

fn implode_pass<A: AesRound>(
    blocks: &mut [[u8; 16]; 8],
    pad: &[u8],
    keys: &[[u8; 16]; 10],
    mix: bool,
) {
    for chunk in pad.chunks_exact(128) {
        for (b, slot) in blocks.iter_mut().zip(chunk.chunks_exact(16)) {
            for (x, s) in b.iter_mut().zip(slot) {
                *x ^= s;
            }
            for k in keys {
                A::round(b, k);
            }
        }
        if mix {
            mix_and_propagate(blocks);
        }
    }
}

/// Heavy-family block diffusion: each block absorbs its right neighbour,
/// the last absorbs the original first.
fn mix_and_propagate(blocks: &mut [[u8; 16]; 8]) {
    let first = blocks[0];
    for i in 0..7 {
        let next = blocks[i + 1];
        for (b, n) in blocks[i].iter_mut().zip(&next) {
            *b ^= n;
        }
    }
    for (b, n) in blocks[7].iter_mut().zip(&first) {
        *b ^= n;
    }
}

fn keccak_permute(state: &mut [u8; 200]) {
    let mut words = [0u64; 25];
    for (w, chunk) in words.iter_mut().zip(state.chunks_exact(8)) {
        *w = read_u64(chunk);
    }
    tiny_keccak::keccakf(&mut words);
    for (w, chunk) in words.iter().zip(state.chunks_exact_mut(8)) {
        chunk.copy_from_slice(&w.to_le_bytes());
    }
}

/// Final hash selection by the two low bits of the permuted state.
fn select_result(state: &[u8; 200]) -> [u8; 32] {
    let mut out = [0u8; 32];
    match state[0] & 3 {
        0 => {
            let digest: GenericArray<u8, U32> = Blake256::digest(&state[..]);
            out.copy_from_slice(&digest);
        }
        1 => {
            let digest: GenericArray<u8, U32> = Groestl256::digest(&state[..]);
            out.copy_from_slice(&digest);
        }
        2 => {
            let digest: GenericArray<u8, U32> = Jh256::digest(&state[..]);
            out.copy_from_slice(&digest);
        }
        3 => {
            let skein: digest09::generic_array::GenericArray<u8, digest09::generic_array::typenum::U32> =
                <skein_hash::Skein512<digest09::generic_array::typenum::U32> as digest09::Digest>::digest(
                    &state[..],
                );
            out.copy_from_slice(&skein);
        }
        _ => unreachable!(),
    }
    out
}

/// Monero v7 byte-11 tweak, expressed on the high store word.
#[inline]
fn tweak_high_word(vh: u64, shift: u32) -> u64 {
    let x = (vh >> 24) as u8;
    let index = (((x >> shift) & 6) | (x & 1)) << 1;
    vh ^ ((0x7531_u64 >> index) & 0x3) << 28
}

#[inline]
fn block_index(addr: u64, mask: u64) -> usize {
    (((addr & mask) >> 4) as usize) * 2
}

#[inline]
fn aes_round_words<A: AesRound>(block: &mut [u64; 2], key: &[u64; 2]) {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&block[0].to_le_bytes());
    bytes[8..].copy_from_slice(&block[1].to_le_bytes());
    let mut key_bytes = [0u8; 16];
    key_bytes[..8].copy_from_slice(&key[0].to_le_bytes());
    key_bytes[8..].copy_from_slice(&key[1].to_le_bytes());
    A::round(&mut bytes, &key_bytes);
    block[0] = read_u64(&bytes[..8]);
    block[1] = read_u64(&bytes[8..]);
}

#[inline]
fn read_u64(bytes: &[u8]) -> u64 {
    let mut tmp = [0u8; 8];
    tmp.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(tmp)
}

fn key32(bytes: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes[..32]);
    key
}
