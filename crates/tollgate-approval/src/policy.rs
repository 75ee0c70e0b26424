//! The autonomy policy matrix.
//!
//! | mode         | SAFE  | ELEVATED | EXFIL    | SENSITIVE_DOMAIN |
//! |--------------|-------|----------|----------|------------------|
//! | unrestricted | allow | allow    | allow    | allow            |
//! | guided       | allow | allow    | approval | approval         |
//! | safe         | allow | approval | approval | approval         |

use tollgate_core::{AutonomyMode, RiskLevel};

/// Whether a call at `risk` needs a human decision under `mode`.
#[must_use]
pub fn requires_approval(mode: AutonomyMode, risk: RiskLevel) -> bool {
    match (mode, risk) {
        (AutonomyMode::Unrestricted, _)
        | (_, RiskLevel::Safe)
        | (AutonomyMode::Guided, RiskLevel::Elevated) => false,
        (AutonomyMode::Guided | AutonomyMode::Safe, _) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrestricted_never_requires_approval() {
        for risk in RiskLevel::ALL {
            assert!(!requires_approval(AutonomyMode::Unrestricted, risk));
        }
    }

    #[test]
    fn test_safe_risk_never_requires_approval() {
        for mode in [
            AutonomyMode::Unrestricted,
            AutonomyMode::Guided,
            AutonomyMode::Safe,
        ] {
            assert!(!requires_approval(mode, RiskLevel::Safe));
        }
    }

    #[test]
    fn test_guided() {
        assert!(!requires_approval(AutonomyMode::Guided, RiskLevel::Elevated));
        assert!(requires_approval(AutonomyMode::Guided, RiskLevel::Exfil));
        assert!(requires_approval(
            AutonomyMode::Guided,
            RiskLevel::SensitiveDomain
        ));
    }

    #[test]
    fn test_safe_mode() {
        assert!(requires_approval(AutonomyMode::Safe, RiskLevel::Elevated));
        assert!(requires_approval(AutonomyMode::Safe, RiskLevel::Exfil));
        assert!(requires_approval(
            AutonomyMode::Safe,
            RiskLevel::SensitiveDomain
        ));
    }
}
