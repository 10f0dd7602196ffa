//! Record identifiers.
//!
//! Ids are the creation instant in epoch milliseconds followed by nine
//! lowercase base-36 characters, e.g. `1744977600000k3j9x0q2a`.

use chrono::{DateTime, Utc};
use rand::Rng;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

pub fn new_id(at: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}{}", at.timestamp_millis(), suffix)
}
