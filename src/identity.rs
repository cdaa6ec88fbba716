use serde::Serialize;

/// Identity of the running workload instance.
///
/// Replicated workloads (StatefulSets) number their pods with a trailing
/// `-<digits>` suffix; the ordinal lets hook code tell instances apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadIdentity {
    /// Full workload name as supplied (may be empty)
    pub name: String,

    /// Ordinal parsed from the trailing `-<digits>` suffix, 0 if absent
    pub ordinal: u32,
}

impl WorkloadIdentity {
    /// Derive an identity from a workload name.
    pub fn from_name<S: Into<String>>(name: S) -> Self {
        let name = name.into();
        let ordinal = trailing_ordinal(&name);
        Self { name, ordinal }
    }
}

/// Parse the trailing `-<digits>` suffix of a workload name.
///
/// A missing or non-numeric suffix yields 0.
fn trailing_ordinal(name: &str) -> u32 {
    name.rsplit_once('-')
        .and_then(|(_, suffix)| suffix.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinal_from_numeric_suffix() {
        let identity = WorkloadIdentity::from_name("worker-7");
        assert_eq!(identity.name, "worker-7");
        assert_eq!(identity.ordinal, 7);
    }

    #[test]
    fn test_ordinal_without_suffix() {
        assert_eq!(WorkloadIdentity::from_name("worker").ordinal, 0);
    }

    #[test]
    fn test_ordinal_non_numeric_suffix() {
        assert_eq!(WorkloadIdentity::from_name("worker-abc").ordinal, 0);
    }

    #[test]
    fn test_ordinal_from_multi_dash_name() {
        assert_eq!(WorkloadIdentity::from_name("queue-consumer-12").ordinal, 12);
    }

    #[test]
    fn test_ordinal_empty_name() {
        assert_eq!(WorkloadIdentity::from_name("").ordinal, 0);
    }

    #[test]
    fn test_ordinal_dangling_dash() {
        assert_eq!(WorkloadIdentity::from_name("worker-").ordinal, 0);
    }
}
