//! Identifier generation
//!
//! Random lowercase hex strings for resource ids, plus the synthetic values
//! the fake hands out for elastic IPs and private DNS names. Nothing here
//! checks for collisions.

use rand::Rng;

const HEX_ALPHABET: &[u8] = b"0123456789abcdef";

/// Length of the hex part of every generated resource id
pub const ID_HEX_LEN: usize = 8;

/// Resource id prefixes
pub const INSTANCE_PREFIX: &str = "i-";
pub const RESERVATION_PREFIX: &str = "r-";
pub const KERNEL_PREFIX: &str = "aki-";
pub const RAMDISK_PREFIX: &str = "ari-";
pub const VOLUME_PREFIX: &str = "vol-";
pub const SNAPSHOT_PREFIX: &str = "snap-";

/// Generate `length` random characters from `0-9a-f`
pub fn hex(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| HEX_ALPHABET[rng.random_range(0..HEX_ALPHABET.len())] as char)
        .collect()
}

/// Generate a prefixed resource id, e.g. `vol-1a2b3c4d`
pub fn prefixed(prefix: &str) -> String {
    format!("{}{}", prefix, hex(ID_HEX_LEN))
}

/// Generate a dotted-quad IPv4 value with uniform octets
pub fn random_ip() -> String {
    let mut rng = rand::rng();
    let octets: [u8; 4] = rng.random();
    octets
        .iter()
        .map(|o| o.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Generate a private DNS name like `private-10-042-117-953.aws.amazon.com`
pub fn private_dns_name() -> String {
    let mut rng = rand::rng();
    format!(
        "private-10-{:03}-{:03}-{:03}.aws.amazon.com",
        rng.random_range(0..1000),
        rng.random_range(0..1000),
        rng.random_range(0..1000)
    )
}
