pub fn format_bases(bases: u64) -> String {
    const UNITS: [&str; 4] = ["bp", "kbp", "Mbp", "Gbp"];

    let mut value = bases as f64;
    let mut unit = 0usize;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bases, UNITS[unit])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

/// Shortens long sequences for display, keeping both ends.
pub fn abbreviate_sequence(sequence: &str, max_len: usize) -> String {
    if sequence.len() <= max_len || max_len < 5 || !sequence.is_ascii() {
        return sequence.to_owned();
    }

    let keep = (max_len - 3) / 2;
    format!(
        "{}...{}",
        &sequence[..keep],
        &sequence[sequence.len() - keep..]
    )
}

/// First 16 hex digits of the BLAKE3 digest of `value`. Identical on every
/// build and platform, so it may name persisted files.
pub fn stable_digest(value: &str) -> String {
    blake3::hash(value.as_bytes()).to_hex()[..16].to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bases_switch_to_decimal_units() {
        assert_eq!(format_bases(999), "999 bp");
        assert_eq!(format_bases(1_500), "1.50 kbp");
        assert_eq!(format_bases(3_200_000_000), "3.20 Gbp");
    }

    #[test]
    fn long_sequences_keep_both_ends() {
        assert_eq!(abbreviate_sequence("ACGT", 10), "ACGT");
        assert_eq!(abbreviate_sequence("AAAACCCCGGGGTTTT", 9), "AAA...TTT");
    }

    #[test]
    fn digest_is_pinned() {
        assert_eq!(stable_digest("/data/sample.gfa"), "9ed11fe36e43e1f0");
        assert_eq!(stable_digest(""), "af1349b9f5f9a1a6");
    }
}
