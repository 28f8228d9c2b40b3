//! AES round primitives shared by every CryptoNight family.
//!
//! CryptoNight never runs full AES. It uses the bare round function
//! (SubBytes, ShiftRows, MixColumns, AddRoundKey; one AESENC)
//! with a 32-byte key expanded into exactly ten round keys. The hardware path
//! goes through the `aes` crate's hazmat round, which picks AES-NI when the
//! CPU has it; the software path is a portable table implementation selected
//! by the job's `soft_aes` flag.

use aes::hazmat::cipher_round;
use aes::Block;

/// One AES encryption round over a 16-byte block.
pub(crate) trait AesRound {
    fn round(block: &mut [u8; 16], key: &[u8; 16]);
}

/// Hardware-backed round (AES-NI or the `aes` crate's bitsliced fallback).
pub(crate) struct HwAes;

impl AesRound for HwAes {
    #[inline]
    fn round(block: &mut [u8; 16], key: &[u8; 16]) {
        cipher_round(
            Block::from_mut_slice(block),
            Block::from_slice(key),
        );
    }
}

/// Portable software round.
pub(crate) struct SoftAes;

impl AesRound for SoftAes {
    #[inline]
    fn round(block: &mut [u8; 16], key: &[u8; 16]) {
        sub_bytes(block);
        shift_rows(block);
        mix_columns(block);
        for (b, k) in block.iter_mut().zip(key) {
            *b ^= k;
        }
    }
}

#[rustfmt::skip]
const SBOX: [u8; 256] = [
    0x63, 0x7c, 0x77, 0x7b, 0xf2, 0x6b, 0x6f, 0xc5, 0x30, 0x01, 0x67, 0x2b, 0xfe, 0xd7, 0xab, 0x76,
    0xca, 0x82, 0xc9, 0x7d, 0xfa, 0x59, 0x47, 0xf0, 0xad, 0xd4, 0xa2, 0xaf, 0x9c, 0xa4, 0x72, 0xc0,
    0xb7, 0xfd, 0x93, 0x26, 0x36, 0x3f, 0xf7, 0xcc, 0x34, 0xa5, 0xe5, 0xf1, 0x71, 0xd8, 0x31, 0x15,
    0x04, 0xc7, 0x23, 0xc3, 0x18, 0x96, 0x05, 0x9a, 0x07, 0x12, 0x80, 0xe2, 0xeb, 0x27, 0xb2, 0x75,
    0x09, 0x83, 0x2c, 0x1a, 0x1b, 0x6e, 0x5a, 0xa0, 0x52, 0x3b, 0xd6, 0xb3, 0x29, 0xe3, 0x2f, 0x84,
    0x53, 0xd1, 0x00, 0xed, 0x20, 0xfc, 0xb1, 0x5b, 0x6a, 0xcb, 0xbe, 0x39, 0x4a, 0x4c, 0x58, 0xcf,
    0xd0, 0xef, 0xaa, 0xfb, 0x43, 0x4d, 0x33, 0x85, 0x45, 0xf9, 0x02, 0x7f, 0x50, 0x3c, 0x9f, 0xa8,
    0x51, 0xa3, 0x40, 0x8f, 0x92, 0x9d, 0x38, 0xf5, 0xbc, 0xb6, 0xda, 0x21, 0x10, 0xff, 0xf3, 0xd2,
    0xcd, 0x0c, 0x13, 0xec, 0x5f, 0x97, 0x44, 0x17, 0xc4, 0xa7, 0x7e, 0x3d, 0x64, 0x5d, 0x19, 0x73,
    0x60, 0x81, 0x4f, 0xdc, 0x22, 0x2a, 0x90, 0x88, 0x46, 0xee, 0xb8, 0x14, 0xde, 0x5e, 0x0b, 0xdb,
    0xe0, 0x32, 0x3a, 0x0a, 0x49, 0x06, 0x24, 0x5c, 0xc2, 0xd3, 0xac, 0x62, 0x91, 0x95, 0xe4, 0x79,
    0xe7, 0xc8, 0x37, 0x6d, 0x8d, 0xd5, 0x4e, 0xa9, 0x6c, 0x56, 0xf4, 0xea, 0x65, 0x7a, 0xae, 0x08,
    0xba, 0x78, 0x25, 0x2e, 0x1c, 0xa6, 0xb4, 0xc6, 0xe8, 0xdd, 0x74, 0x1f, 0x4b, 0xbd, 0x8b, 0x8a,
    0x70, 0x3e, 0xb5, 0x66, 0x48, 0x03, 0xf6, 0x0e, 0x61, 0x35, 0x57, 0xb9, 0x86, 0xc1, 0x1d, 0x9e,
    0xe1, 0xf8, 0x98, 0x11, 0x69, 0xd9, 0x8e, 0x94, 0x9b, 0x1e, 0x87, 0xe9, 0xce, 0x55, 0x28, 0xdf,
    0x8c, 0xa1, 0x89, 0x0d, 0xbf, 0xe6, 0x42, 0x68, 0x41, 0x99, 0x2d, 0x0f, 0xb0, 0x54, 0xbb, 0x16,
];

fn sub_bytes(block: &mut [u8; 16]) {
    for b in block.iter_mut() {
        *b = SBOX[*b as usize];
    }
}

/// Rotate row `r` of the column-major state left by `r` positions.
fn shift_rows(block: &mut [u8; 16]) {
    // row 1
    let tmp = block[1];
    block[1] = block[5];
    block[5] = block[9];
    block[9] = block[13];
    block[13] = tmp;
    // row 2
    block.swap(2, 10);
    block.swap(6, 14);
    // row 3
    let tmp = block[15];
    block[15] = block[11];
    block[11] = block[7];
    block[7] = block[3];
    block[3] = tmp;
}

/// Multiply by x in GF(2^8).
#[inline]
fn xtime(a: u8) -> u8 {
    (a << 1) ^ (((a >> 7) & 1) * 0x1B)
}

fn mix_columns(block: &mut [u8; 16]) {
    for col in block.chunks_exact_mut(4) {
        let a = [col[0], col[1], col[2], col[3]];
        let b = [xtime(a[0]), xtime(a[1]), xtime(a[2]), xtime(a[3])];
        col[0] = b[0] ^ a[3] ^ a[2] ^ b[1] ^ a[1];
        col[1] = b[1] ^ a[0] ^ a[3] ^ b[2] ^ a[2];
        col[2] = b[2] ^ a[1] ^ a[0] ^ b[3] ^ a[3];
        col[3] = b[3] ^ a[2] ^ a[1] ^ b[0] ^ a[0];
    }
}

/// Expand a 32-byte key into the ten round keys CryptoNight uses.
///
/// This is the AES-256 schedule cut short at 40 words; both AES paths share
/// the same expansion.
pub(crate) fn expand_key(key: &[u8; 32]) -> [[u8; 16]; 10] {
    let mut buf = [0u8; 160];
    buf[..32].copy_from_slice(key);

    let mut rcon: u8 = 1;
    for off in (32..160).step_by(4) {
        let mut word = [buf[off - 4], buf[off - 3], buf[off - 2], buf[off - 1]];
        if off % 32 == 0 {
            word.rotate_left(1);
            for b in &mut word {
                *b = SBOX[*b as usize];
            }
            word[0] ^= rcon;
            rcon = xtime(rcon);
        } else if off % 32 == 16 {
            for b in &mut word {
                *b = SBOX[*b as usize];
            }
        }
        for i in 0..4 {
            buf[off + i] = word[i] ^ buf[off - 32 + i];
        }
    }

    let mut keys = [[0u8; 16]; 10];
    for (k, chunk) in keys.iter_mut().zip(buf.chunks_exact(16)) {
        k.copy_from_slice(chunk);
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn sbox_known_values() {
        // FIPS-197 figure 7
        assert_eq!(SBOX[0x00], 0x63);
        assert_eq!(SBOX[0x01], 0x7c);
        assert_eq!(SBOX[0x53], 0xed);
        assert_eq!(SBOX[0xd0], 0x70);
        assert_eq!(SBOX[0xff], 0x16);
    }

    #[test]
    fn shift_rows_permutation() {
        let mut block = [
            0x0, 0x1, 0x2, 0x3, 0x4, 0x5, 0x6, 0x7, 0x8, 0x9, 0xA, 0xB, 0xC, 0xD, 0xE, 0xF,
        ];
        shift_rows(&mut block);
        let expected = [
            0x0, 0x5, 0xA, 0xF, 0x4, 0x9, 0xE, 0x3, 0x8, 0xD, 0x2, 0x7, 0xC, 0x1, 0x6, 0xB,
        ];
        assert_eq!(block, expected);
    }

    #[test]
    fn mix_columns_known_column() {
        // Test column from the MixColumns reference tables
        let mut block = [0u8; 16];
        block[..4].copy_from_slice(&hex!("db 13 53 45"));
        mix_columns(&mut block);
        assert_eq!(&block[..4], &hex!("8e 4d a1 bc"));
    }

    #[test]
    fn expand_key_fips_197_vector() {
        let key = hex!("00 01 02 03 04 05 06 07 08 09 0a 0b 0c 0d 0e 0f 10 11 12 13 14 15 16 17 18 19 1a 1b 1c 1d 1e 1f");
        let expected: [[u8; 16]; 10] = [
            hex!("00 01 02 03 04 05 06 07 08 09 0a 0b 0c 0d 0e 0f"),
            hex!("10 11 12 13 14 15 16 17 18 19 1a 1b 1c 1d 1e 1f"),
            hex!("a5 73 c2 9f a1 76 c4 98 a9 7f ce 93 a5 72 c0 9c"),
            hex!("16 51 a8 cd 02 44 be da 1a 5d a4 c1 06 40 ba de"),
            hex!("ae 87 df f0 0f f1 1b 68 a6 8e d5 fb 03 fc 15 67"),
            hex!("6d e1 f1 48 6f a5 4f 92 75 f8 eb 53 73 b8 51 8d"),
            hex!("c6 56 82 7f c9 a7 99 17 6f 29 4c ec 6c d5 59 8b"),
            hex!("3d e2 3a 75 52 47 75 e7 27 bf 9e b4 54 07 cf 39"),
            hex!("0b dc 90 5f c2 7b 09 48 ad 52 45 a4 c1 87 1c 2f"),
            hex!("45 f5 a6 60 17 b2 d3 87 30 0d 4d 33 64 0a 82 0a"),
        ];
        assert_eq!(expand_key(&key), expected);
    }

    #[test]
    fn soft_round_matches_hardware_round() {
        let mut soft = hex!("00 11 22 33 44 55 66 77 88 99 aa bb cc dd ee ff");
        let mut hard = soft;
        let key = hex!("0f 0e 0d 0c 0b 0a 09 08 07 06 05 04 03 02 01 00");
        SoftAes::round(&mut soft, &key);
        HwAes::round(&mut hard, &key);
        assert_eq!(soft, hard);
    }
}
