use crate::clock::Clock;
use crate::{CouponError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Number of random uppercase letters after the hyphen.
pub const LETTER_COUNT: usize = 3;

/// Number of digits in the random numeric tail.
pub const NUMBER_DIGITS: usize = 3;

const NUMBER_MIN: u16 = 100;
const NUMBER_MAX: u16 = 999;

/// Batches grow past this instead of reserving the whole count up front.
const INITIAL_BATCH_CAPACITY: usize = 1024;

/// Characters in the `DDMM` date stamp.
const DATE_DIGITS: usize = 4;

/// The parser always treats the first two characters as the prefix, whatever
/// prefix the code was generated with.
pub const PARSED_PREFIX_LEN: usize = 2;

/// Distinct codes one prefix can produce on a single day: 26^3 letter
/// combinations times 900 numbers.
pub const KEYSPACE: u64 = 26 * 26 * 26 * (NUMBER_MAX - NUMBER_MIN + 1) as u64;

/// Generate one code in `PREFIX` + `DDMM` + `-` + `ABC` + `123` format.
///
/// No collision checking happens here; see [`generate_batch`].
pub fn generate_code<C, R>(prefix: &str, clock: &C, rng: &mut R) -> String
where
    C: Clock + ?Sized,
    R: Rng,
{
    let day_month = clock.today().format("%d%m");
    let letters: String = (0..LETTER_COUNT)
        .map(|_| rng.random_range(b'A'..=b'Z') as char)
        .collect();
    let number = rng.random_range(NUMBER_MIN..=NUMBER_MAX);
    let code = format!("{prefix}{day_month}-{letters}{number}");
    tracing::debug!(%code, "generated coupon code");
    code
}

/// Generate `count` distinct codes.
///
/// Zero or negative counts give an empty list. Order of the result is
/// unspecified. `max_attempts` caps the number of generator calls; `None`
/// retries collisions until the batch is full.
pub fn generate_batch<C, R>(
    count: i64,
    prefix: &str,
    clock: &C,
    rng: &mut R,
    max_attempts: Option<u64>,
) -> Result<Vec<String>>
where
    C: Clock + ?Sized,
    R: Rng,
{
    if count <= 0 {
        return Ok(Vec::new());
    }
    let requested = count as u64;
    if requested > KEYSPACE {
        return Err(CouponError::KeyspaceExhausted {
            requested,
            available: KEYSPACE,
        });
    }

    let wanted = requested as usize;
    let mut codes = HashSet::with_capacity(wanted.min(INITIAL_BATCH_CAPACITY));
    let mut attempts: u64 = 0;
    while codes.len() < wanted {
        if max_attempts.is_some_and(|max| attempts >= max) {
            return Err(CouponError::AttemptsExhausted {
                produced: codes.len(),
                requested,
                attempts,
            });
        }
        attempts += 1;
        codes.insert(generate_code(prefix, clock, rng));
    }

    tracing::debug!(count = codes.len(), attempts, "generated coupon batch");
    Ok(codes.into_iter().collect())
}

/// Check that `code` is exactly `prefix` + 4 digits + `-` + 3 uppercase
/// ASCII letters + 3 digits. The prefix is compared literally.
pub fn validate_code_format(code: &str, prefix: &str) -> bool {
    let Some(rest) = code.strip_prefix(prefix) else {
        return false;
    };
    let bytes = rest.as_bytes();
    if bytes.len() != DATE_DIGITS + 1 + LETTER_COUNT + NUMBER_DIGITS {
        return false;
    }

    let (date, rest) = bytes.split_at(DATE_DIGITS);
    let (dash, rest) = rest.split_at(1);
    let (letters, numbers) = rest.split_at(LETTER_COUNT);

    date.iter().all(u8::is_ascii_digit)
        && dash == b"-"
        && letters.iter().all(u8::is_ascii_uppercase)
        && numbers.iter().all(u8::is_ascii_digit)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseCodeError {
    #[error("code has no hyphen separator")]
    MissingHyphen,
}

/// A code split into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCode {
    pub prefix: String,
    pub date: String,
    pub letters: String,
    pub numbers: String,
    pub full_code: String,
}

/// Split a code at its first hyphen.
///
/// The prefix is always the first [`PARSED_PREFIX_LEN`] characters, so codes
/// generated with a longer or shorter prefix come back with the boundary
/// between `prefix` and `date` in the wrong place. Short input is never an
/// error: every cut clamps to the end of the string, the prefix may swallow
/// the hyphen (leaving `date` empty), and `numbers` is whatever follows the
/// letters.
pub fn parse_code(code: &str) -> std::result::Result<ParsedCode, ParseCodeError> {
    let dash = code.find('-').ok_or(ParseCodeError::MissingHyphen)?;

    let prefix_end = char_boundary(code, PARSED_PREFIX_LEN);
    let date = code.get(prefix_end..dash).unwrap_or_default();

    let tail = &code[dash + 1..];
    let letters_end = char_boundary(tail, LETTER_COUNT);

    Ok(ParsedCode {
        prefix: code[..prefix_end].to_string(),
        date: date.to_string(),
        letters: tail[..letters_end].to_string(),
        numbers: tail[letters_end..].to_string(),
        full_code: code.to_string(),
    })
}

/// Byte offset just after the first `n` characters, or the end of `s` if it
/// is shorter.
fn char_boundary(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}
