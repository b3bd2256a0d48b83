//! Checksum-structured national identity numbers
//!
//! An identifier has eleven digits `d0..d10` with `d0 != 0`:
//!
//! - `d9  = (7 * (d0 + d2 + d4 + d6 + d8) - (d1 + d3 + d5 + d7)) mod 10`
//! - `d10 = (d0 + ... + d9) mod 10`

use rand::Rng;

/// Number of digits in an identifier
pub const ID_LENGTH: usize = 11;

/// Produces and validates checksum-valid identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumIdentityGenerator;

impl ChecksumIdentityGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a fresh valid identifier
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let mut digits = [0u32; ID_LENGTH];
        digits[0] = rng.gen_range(1..=9);
        for d in digits.iter_mut().take(9).skip(1) {
            *d = rng.gen_range(0..=9);
        }
        digits[9] = tenth_digit(&digits[..9]);
        digits[10] = eleventh_digit(&digits[..10]);

        digits
            .iter()
            .filter_map(|&d| char::from_digit(d, 10))
            .collect()
    }

    /// Whether `candidate` is exactly eleven digits with valid check digits
    pub fn validate(&self, candidate: &str) -> bool {
        if candidate.len() != ID_LENGTH || !candidate.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        let digits: Vec<u32> = candidate.bytes().map(|b| u32::from(b - b'0')).collect();
        if digits[0] == 0 {
            return false;
        }
        digits[9] == tenth_digit(&digits[..9]) && digits[10] == eleventh_digit(&digits[..10])
    }
}

fn tenth_digit(first_nine: &[u32]) -> u32 {
    let odd: i64 = first_nine.iter().step_by(2).map(|&d| i64::from(d)).sum();
    let even: i64 = first_nine.iter().skip(1).step_by(2).map(|&d| i64::from(d)).sum();
    // rem_euclid keeps the result in 0..10 when the even sum dominates
    (7 * odd - even).rem_euclid(10) as u32
}

fn eleventh_digit(first_ten: &[u32]) -> u32 {
    first_ten.iter().sum::<u32>() % 10
}
