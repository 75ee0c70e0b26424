//! CLI theme and styling.

use colored::Colorize;
use tollgate_core::{AutonomyMode, RiskLevel, Timestamp};
use tollgate_executor::{ActionStatus, PlanStatus};

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(50).dimmed().to_string()
    }

    /// Draw a box around an approval request, tinted by risk.
    pub(crate) fn approval_box(title: &str, content: &str, risk: RiskLevel) -> String {
        let tint = |s: &str| -> String {
            match risk {
                RiskLevel::Safe => s.green().to_string(),
                RiskLevel::Elevated => s.yellow().to_string(),
                RiskLevel::Exfil | RiskLevel::SensitiveDomain => s.red().to_string(),
            }
        };

        let width: usize = 64;
        let inner = width.saturating_sub(2);
        let top = format!("╭{}╮", "─".repeat(inner));
        let bottom = format!("╰{}╯", "─".repeat(inner));
        let empty = format!("│{:w$}│", "", w = inner);

        let pad_line = |text: &str| -> String {
            let visible_len = strip_ansi(text).chars().count();
            let padding = width.saturating_sub(4).saturating_sub(visible_len);
            format!("│ {text}{:p$} │", "", p = padding)
        };

        let mut lines = vec![tint(&top), pad_line(&title.bold().to_string()), tint(&empty)];
        for line in content.lines() {
            lines.push(pad_line(line));
        }
        lines.push(tint(&bottom));
        lines.join("\n")
    }

    /// Format a key-value pair.
    pub(crate) fn kv(key: &str, value: &str) -> String {
        format!("{}: {}", key.bold(), value)
    }

    /// Format a risk level.
    pub(crate) fn risk_level(level: RiskLevel) -> String {
        match level {
            RiskLevel::Safe => level.as_str().green().to_string(),
            RiskLevel::Elevated => level.as_str().yellow().to_string(),
            RiskLevel::Exfil => level.as_str().red().to_string(),
            RiskLevel::SensitiveDomain => level.as_str().red().bold().to_string(),
        }
    }

    /// Format an autonomy mode.
    pub(crate) fn mode(mode: AutonomyMode) -> String {
        match mode {
            AutonomyMode::Safe => mode.as_str().green().to_string(),
            AutonomyMode::Guided => mode.as_str().yellow().to_string(),
            AutonomyMode::Unrestricted => mode.as_str().red().to_string(),
        }
    }

    /// Format a plan status.
    pub(crate) fn plan_status(status: PlanStatus) -> String {
        match status {
            PlanStatus::Draft => status.as_str().dimmed().to_string(),
            PlanStatus::Executing => status.as_str().yellow().to_string(),
            PlanStatus::Done => status.as_str().green().to_string(),
            PlanStatus::Failed => status.as_str().red().to_string(),
        }
    }

    /// Format an action status.
    pub(crate) fn action_status(status: ActionStatus) -> String {
        match status {
            ActionStatus::Pending => status.as_str().dimmed().to_string(),
            ActionStatus::Executed => status.as_str().green().to_string(),
            ActionStatus::Failed => status.as_str().red().to_string(),
            ActionStatus::RolledBack => status.as_str().blue().to_string(),
        }
    }

    /// Format an ID (shortened).
    pub(crate) fn short_id(id: &str) -> String {
        let raw = id.split_once(':').map_or(id, |(_, rest)| rest);
        let short = raw.get(..8).unwrap_or(raw);
        format!("{}", short.cyan())
    }

    /// Format a timestamp.
    pub(crate) fn timestamp(ts: &Timestamp) -> String {
        ts.0.format("%Y-%m-%d %H:%M").to_string().dimmed().to_string()
    }
}

/// Strip ANSI escape codes from a string for visible-length calculation.
fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_escape = false;
    for c in s.chars() {
        if in_escape {
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if c == '\x1b' {
            in_escape = true;
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi() {
        colored::control::set_override(true);
        let styled = "hello".red().bold().to_string();
        assert_eq!(strip_ansi(&styled), "hello");
        colored::control::unset_override();
    }

    #[test]
    fn test_short_id_drops_prefix() {
        colored::control::set_override(false);
        assert_eq!(
            Theme::short_id("plan:0a1b2c3d-0000-0000-0000-000000000000"),
            "0a1b2c3d"
        );
        assert_eq!(Theme::short_id("abc"), "abc");
        colored::control::unset_override();
    }
}
