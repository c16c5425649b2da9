use std::time::Duration;

/// Single rounded component in one of: us, ms, s.
pub(crate) fn format_duration_single(d: Duration) -> String {
    let total_ns = d.as_nanos();

    const NS_PER_US: u128 = 1_000;
    const NS_PER_MS: u128 = 1_000_000;
    const NS_PER_S: u128 = 1_000_000_000;

    // Ties round up.
    fn round_div(value: u128, unit: u128) -> u128 {
        (value + (unit / 2)) / unit
    }

    if total_ns >= NS_PER_S {
        return format!("{}s", round_div(total_ns, NS_PER_S));
    }
    if total_ns >= NS_PER_MS {
        return format!("{}ms", round_div(total_ns, NS_PER_MS));
    }
    format!("{}us", round_div(total_ns, NS_PER_US))
}

/// Whole-second `1m30s` style; sub-second durations fall back to [`format_duration_single`].
pub(crate) fn format_duration(d: Duration) -> String {
    if d < Duration::from_secs(1) {
        return format_duration_single(d);
    }

    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if s > 0 || out.is_empty() {
        out.push_str(&format!("{s}s"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_component_rounds_to_nearest_unit() {
        assert_eq!(format_duration_single(Duration::from_micros(1500)), "2ms");
        assert_eq!(format_duration_single(Duration::from_millis(1499)), "1s");
        assert_eq!(format_duration_single(Duration::from_nanos(400)), "0us");
    }

    #[test]
    fn compound_durations_skip_empty_components() {
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2m");
        assert_eq!(format_duration(Duration::from_secs(3605)), "1h5s");
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
    }
}
