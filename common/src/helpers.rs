use chrono::Utc;
use uuid::Uuid;

/// Builds the provider-facing reference for one purchase attempt.
/// Format: `VTU-<unix millis>-<8 hex chars>`, unique per attempt.
pub fn generate_reference() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("VTU-{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_has_expected_shape() {
        let reference = generate_reference();
        let parts: Vec<&str> = reference.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "VTU");
        assert!(parts[1].parse::<i64>().unwrap() > 0);
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn references_do_not_collide() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            assert!(seen.insert(generate_reference()));
        }
    }
}
