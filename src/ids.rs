use chrono::Utc;
use uuid::Uuid;

pub const TICKET_TAG: &str = "SOS";
pub const RESCUER_TAG: &str = "RES";
pub const DISPATCH_TAG: &str = "DSP";

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SUFFIX_LEN: usize = 6;

/// Mints an uppercase id: tag, creation time in base-36 millis, random suffix.
pub fn new_id(tag: &str) -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    format!("{}-{}-{}", tag, base36(millis), random_suffix())
}

fn base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    // u64::MAX is 13 base-36 digits.
    let mut digits = [0u8; 13];
    let mut start = digits.len();
    while value > 0 {
        start -= 1;
        digits[start] = ALPHABET[(value % 36) as usize];
        value /= 36;
    }

    digits[start..].iter().map(|&b| b as char).collect()
}

fn random_suffix() -> String {
    Uuid::new_v4()
        .into_bytes()
        .iter()
        .take(SUFFIX_LEN)
        .map(|&b| ALPHABET[(b % 36) as usize] as char)
        .collect()
}
