//! Declarative rule tables for the risk classifier.
//!
//! Shell rules are `(regex, label)` pairs matched against the lowercased
//! command. Domain rules are plain substrings matched against the lowercased
//! URL. The built-in tables can be extended at startup with extra entries from
//! configuration via [`RuleSet::extended`].

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ApprovalError, ApprovalResult};

/// Privilege escalation, package management and destructive operations.
const ELEVATED_PATTERNS: &[(&str, &str)] = &[
    (r"\bsudo\b", "privilege escalation (sudo)"),
    (r"\bapt(?:-get)?\b", "package manager (apt)"),
    (r"\bbrew\b", "package manager (brew)"),
    (r"\bpip3?\b", "package manager (pip)"),
    (r"\b(?:npm|yarn|pnpm)\b", "package manager (npm/yarn/pnpm)"),
    (
        r"\brm\s+(?:-\S+\s+)*(?:-[a-z]*r[a-z]*|--recursive)\b",
        "recursive delete (rm -r)",
    ),
    (r"\bmkfs(?:\.\w+)?\b", "filesystem format (mkfs)"),
    (r"\bdd\b", "raw disk copy (dd)"),
    (r"\bpasswd\b", "password change (passwd)"),
    (r"\bchown\b", "ownership change (chown)"),
    (r"\bchmod\b", "permission change (chmod)"),
    (r"\bsystemctl\b", "service control (systemctl)"),
    (r"\bsysctl\b", "kernel parameter change (sysctl)"),
];

/// Network egress tools.
const EXFIL_PATTERNS: &[(&str, &str)] = &[
    (r"\bcurl\b", "network egress (curl)"),
    (r"\bwget\b", "network egress (wget)"),
    (r"(?:^|[\s;&|(])(?:httpie|https?)\s", "network egress (httpie)"),
    (r"\b(?:nc|ncat|netcat)\b", "raw socket (nc)"),
    (r"\bscp\b", "remote copy (scp)"),
    (r"\brsync\b", "remote sync (rsync)"),
    (r"\bssh\b", "remote shell (ssh)"),
    (r"upload", "upload"),
];

/// Banking, payment, crypto, personal email, cloud consoles, government and
/// health portals.
const SENSITIVE_DOMAINS: &[&str] = &[
    // Banking and payment
    "paypal.com",
    "stripe.com",
    "chase.com",
    "bankofamerica.com",
    "wellsfargo.com",
    "citi.com",
    "capitalone.com",
    "americanexpress.com",
    "venmo.com",
    "wise.com",
    // Crypto
    "coinbase.com",
    "binance.com",
    "kraken.com",
    "metamask.io",
    // Personal email
    "mail.google.com",
    "outlook.live.com",
    "outlook.office.com",
    "mail.yahoo.com",
    "proton.me",
    "protonmail.com",
    "icloud.com/mail",
    // Cloud consoles
    "console.aws.amazon.com",
    "portal.azure.com",
    "console.cloud.google.com",
    "dash.cloudflare.com",
    // Government and health
    ".gov",
    "irs.gov",
    "ssa.gov",
    "healthcare.gov",
    "mychart",
    "patient portal",
];

static BUILTIN: LazyLock<RuleSet> = LazyLock::new(|| RuleSet {
    elevated: compile_builtin(ELEVATED_PATTERNS),
    exfil: compile_builtin(EXFIL_PATTERNS),
    sensitive_domains: SENSITIVE_DOMAINS.iter().map(|d| (*d).to_string()).collect(),
});

fn compile_builtin(table: &[(&str, &str)]) -> Vec<PatternRule> {
    table
        .iter()
        .map(|(pattern, label)| PatternRule {
            regex: Regex::new(pattern).expect("invalid regex"),
            label: (*label).to_string(),
        })
        .collect()
}

/// A compiled shell pattern and the label reported when it matches.
#[derive(Debug, Clone)]
pub struct PatternRule {
    regex: Regex,
    label: String,
}

impl PatternRule {
    /// Compile a rule.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::InvalidPattern`] if `pattern` is not a valid
    /// regular expression.
    pub fn new(
        table: &'static str,
        pattern: &str,
        label: impl Into<String>,
    ) -> ApprovalResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| ApprovalError::InvalidPattern {
            table,
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            regex,
            label: label.into(),
        })
    }

    /// Label reported in the classification detail.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Whether the (already lowercased) input matches.
    #[must_use]
    pub fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }
}

/// The full set of classifier rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    elevated: Vec<PatternRule>,
    exfil: Vec<PatternRule>,
    sensitive_domains: Vec<String>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleSet {
    /// The built-in tables.
    #[must_use]
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// The built-in tables plus extra entries, typically from configuration.
    ///
    /// Extra patterns are labelled `custom rule: <pattern>`. Extra domains are
    /// lowercased; blank entries are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::InvalidPattern`] for the first extra pattern
    /// that fails to compile.
    pub fn extended(
        extra_elevated: &[String],
        extra_exfil: &[String],
        extra_domains: &[String],
    ) -> ApprovalResult<Self> {
        let mut rules = Self::builtin();
        for pattern in extra_elevated {
            rules.elevated.push(PatternRule::new(
                "elevated",
                pattern,
                format!("custom rule: {pattern}"),
            )?);
        }
        for pattern in extra_exfil {
            rules.exfil.push(PatternRule::new(
                "exfil",
                pattern,
                format!("custom rule: {pattern}"),
            )?);
        }
        rules.sensitive_domains.extend(
            extra_domains
                .iter()
                .map(|d| d.trim().to_lowercase())
                .filter(|d| !d.is_empty()),
        );
        Ok(rules)
    }

    /// First ELEVATED rule matching `command`.
    #[must_use]
    pub fn match_elevated(&self, command: &str) -> Option<&PatternRule> {
        self.elevated.iter().find(|r| r.is_match(command))
    }

    /// First EXFIL rule matching `command`.
    #[must_use]
    pub fn match_exfil(&self, command: &str) -> Option<&PatternRule> {
        self.exfil.iter().find(|r| r.is_match(command))
    }

    /// First sensitive domain contained in `url`.
    #[must_use]
    pub fn match_sensitive_domain(&self, url: &str) -> Option<&str> {
        self.sensitive_domains
            .iter()
            .find(|d| url.contains(d.as_str()))
            .map(String::as_str)
    }

    /// Number of rules in each table: (elevated, exfil, domains).
    #[must_use]
    pub fn table_sizes(&self) -> (usize, usize, usize) {
        (
            self.elevated.len(),
            self.exfil.len(),
            self.sensitive_domains.len(),
        )
    }
}
