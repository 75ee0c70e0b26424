//! Plan command - build, run and undo action plans.

use anyhow::{Context, Result, bail};
use colored::Colorize;
use serde_json::{Value, json};
use tollgate_core::PlanId;
use tollgate_executor::{ActionExecutor, ActionLedger, ActionPayload, ActionPlan, PlanStatus};

use super::{OutputFormat, print_json};
use crate::theme::Theme;

fn parse_plan_id(raw: &str) -> Result<PlanId> {
    Ok(raw.parse()?)
}

async fn load_plan(ledger: &dyn ActionLedger, plan_id: PlanId) -> Result<ActionPlan> {
    ledger
        .get_plan(plan_id)
        .await?
        .with_context(|| format!("plan not found: {plan_id}"))
}

/// Create a draft plan.
pub(crate) async fn create_plan(
    ledger: &dyn ActionLedger,
    description: &str,
    format: OutputFormat,
) -> Result<()> {
    let plan = ledger.create_plan(description).await?;
    match format {
        OutputFormat::Json => print_json(&plan),
        OutputFormat::Pretty => {
            println!("{}", Theme::success(&format!("Created {}", plan.id)));
            Ok(())
        },
    }
}

/// Append an action to a draft plan.
///
/// Without `sequence` the action goes after the current last one.
pub(crate) async fn add_action(
    ledger: &dyn ActionLedger,
    plan: &str,
    action_type: &str,
    payload: &str,
    sequence: Option<u32>,
    format: OutputFormat,
) -> Result<()> {
    let plan = load_plan(ledger, parse_plan_id(plan)?).await?;
    if plan.status != PlanStatus::Draft {
        bail!(
            "plan {} is {}; actions can only be added to draft plans",
            plan.id,
            plan.status
        );
    }

    let data: Value = serde_json::from_str(payload).context("payload is not valid JSON")?;
    let payload = ActionPayload::decode(action_type, data)?;

    let sequence = match sequence {
        Some(sequence) => sequence,
        None => ledger
            .get_actions(plan.id)
            .await?
            .last()
            .map_or(1, |a| a.sequence_order.saturating_add(1)),
    };

    let item = ledger.add_action(plan.id, payload, sequence).await?;
    match format {
        OutputFormat::Json => print_json(&item),
        OutputFormat::Pretty => {
            println!(
                "{}",
                Theme::success(&format!(
                    "Added {} as step {} of {}",
                    item.action_type(),
                    item.sequence_order,
                    plan.id
                ))
            );
            Ok(())
        },
    }
}

/// List every plan.
pub(crate) async fn list_plans(ledger: &dyn ActionLedger, format: OutputFormat) -> Result<()> {
    let plans = ledger.list_plans().await?;

    if format == OutputFormat::Json {
        return print_json(&plans);
    }

    if plans.is_empty() {
        println!("{}", Theme::info("No plans found"));
        return Ok(());
    }

    println!("\n{}", Theme::header("Plans"));
    println!(
        "{:>8} {:>16} {:>10} {}",
        "ID".dimmed(),
        "CREATED".dimmed(),
        "STATUS".dimmed(),
        "DESCRIPTION".dimmed()
    );
    println!("{}", Theme::separator());
    for plan in plans {
        println!(
            "{:>8} {:>16} {:>10} {}",
            Theme::short_id(&plan.id.to_string()),
            Theme::timestamp(&plan.created_at),
            Theme::plan_status(plan.status),
            plan.description
        );
    }
    println!();
    Ok(())
}

/// Show a plan and its actions.
pub(crate) async fn show_plan(
    ledger: &dyn ActionLedger,
    plan: &str,
    format: OutputFormat,
) -> Result<()> {
    let plan = load_plan(ledger, parse_plan_id(plan)?).await?;
    let actions = ledger.get_actions(plan.id).await?;

    if format == OutputFormat::Json {
        return print_json(&json!({ "plan": plan, "actions": actions }));
    }

    println!("\n{}", Theme::header(&plan.description));
    println!("{}", Theme::kv("ID", &plan.id.to_string()));
    println!("{}", Theme::kv("Status", &Theme::plan_status(plan.status)));
    println!("{}", Theme::kv("Created", &Theme::timestamp(&plan.created_at)));
    println!("{}", Theme::separator());

    if actions.is_empty() {
        println!("{}", Theme::dimmed("  (no actions)"));
    }
    for action in &actions {
        println!(
            "{:>4}  {:<10} {:<12} {}",
            action.sequence_order,
            action.action_type(),
            Theme::action_status(action.status),
            Theme::dimmed(&action.payload.data().to_string())
        );
        if let Some(message) = &action.error_message {
            println!("      {}", Theme::error(message));
        }
    }
    println!();
    Ok(())
}

/// Execute a plan.
pub(crate) async fn run_plan(
    executor: &ActionExecutor,
    plan: &str,
    format: OutputFormat,
) -> Result<()> {
    let plan_id = parse_plan_id(plan)?;
    let report = executor
        .execute_plan(plan_id)
        .await
        .with_context(|| format!("execution of {plan_id} stopped"))?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "plan_id": report.plan_id,
            "status": report.status,
            "executed": report.executed,
            "skipped": report.skipped,
        })),
        OutputFormat::Pretty => {
            println!(
                "{}",
                Theme::success(&format!(
                    "{} executed ({} applied, {} already done)",
                    report.plan_id,
                    report.executed.len(),
                    report.skipped.len()
                ))
            );
            Ok(())
        },
    }
}

/// Undo a plan. Returns whether every executed action was reversed.
pub(crate) async fn undo_plan(
    executor: &ActionExecutor,
    plan: &str,
    format: OutputFormat,
) -> Result<bool> {
    let plan_id = parse_plan_id(plan)?;
    let report = executor.undo_plan(plan_id).await?;

    match format {
        OutputFormat::Json => {
            let failed: Vec<Value> = report
                .failed
                .iter()
                .map(|(id, message)| json!({ "action_id": id, "error": message }))
                .collect();
            print_json(&json!({
                "plan_id": report.plan_id,
                "status": report.status,
                "rolled_back": report.rolled_back,
                "failed": failed,
            }))?;
        },
        OutputFormat::Pretty => {
            if report.is_complete() {
                println!(
                    "{}",
                    Theme::success(&format!(
                        "{} rolled back ({} actions)",
                        report.plan_id,
                        report.rolled_back.len()
                    ))
                );
            } else {
                println!(
                    "{}",
                    Theme::warning(&format!(
                        "{} partially rolled back; {} action(s) could not be reversed",
                        report.plan_id,
                        report.failed.len()
                    ))
                );
                for (id, message) in &report.failed {
                    println!("  {} {}", Theme::short_id(&id.to_string()), message);
                }
            }
        },
    }
    Ok(report.is_complete())
}

/// Remove a plan's quarantined backups.
///
/// Backups of `failed` or `executing` plans are still needed by undo, so
/// those are refused unless `force` is set.
pub(crate) async fn purge_plan(
    executor: &ActionExecutor,
    plan: &str,
    force: bool,
    format: OutputFormat,
) -> Result<()> {
    let plan = load_plan(executor.ledger().as_ref(), parse_plan_id(plan)?).await?;
    let needs_backups = matches!(plan.status, PlanStatus::Failed | PlanStatus::Executing);
    if needs_backups && !force {
        bail!(
            "plan {} is {}; its backups are still needed for undo (use --force to purge anyway)",
            plan.id,
            plan.status
        );
    }

    let removed = executor.quarantine().purge_plan(plan.id).await?;
    match format {
        OutputFormat::Json => print_json(&json!({ "plan_id": plan.id, "purged": removed })),
        OutputFormat::Pretty => {
            if removed {
                println!("{}", Theme::success(&format!("Purged backups of {}", plan.id)));
            } else {
                println!("{}", Theme::info(&format!("{} has no backups", plan.id)));
            }
            Ok(())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tollgate_executor::{ActionStatus, MemoryLedger, QuarantineStore};

    struct Fixture {
        dir: tempfile::TempDir,
        executor: ActionExecutor,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let executor = ActionExecutor::new(
                Arc::new(MemoryLedger::new()),
                QuarantineStore::new(dir.path().join("quarantine")),
            );
            Self { dir, executor }
        }

        fn ledger(&self) -> &dyn ActionLedger {
            self.executor.ledger().as_ref()
        }

        async fn draft(&self) -> PlanId {
            self.ledger().create_plan("test plan").await.unwrap().id
        }
    }

    #[tokio::test]
    async fn test_add_assigns_next_sequence() {
        let fx = Fixture::new();
        let plan_id = fx.draft().await;
        let target = fx.dir.path().join("a.txt");
        let payload = json!({ "path": target, "content": "x" }).to_string();

        for _ in 0..2 {
            add_action(
                fx.ledger(),
                &plan_id.to_string(),
                "fs_write",
                &payload,
                None,
                OutputFormat::Json,
            )
            .await
            .unwrap();
        }

        let orders: Vec<u32> = fx
            .ledger()
            .get_actions(plan_id)
            .await
            .unwrap()
            .iter()
            .map(|a| a.sequence_order)
            .collect();
        assert_eq!(orders, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_payload() {
        let fx = Fixture::new();
        let plan_id = fx.draft().await;

        let result = add_action(
            fx.ledger(),
            &plan_id.to_string(),
            "fs_move",
            r#"{"source": "a.txt"}"#,
            None,
            OutputFormat::Json,
        )
        .await;
        assert!(result.is_err());
        assert!(fx.ledger().get_actions(plan_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_refused_after_execution() {
        let fx = Fixture::new();
        let plan_id = fx.draft().await;
        fx.executor.execute_plan(plan_id).await.unwrap();

        let result = add_action(
            fx.ledger(),
            &plan_id.to_string(),
            "fs_delete",
            r#"{"path": "/tmp/nothing"}"#,
            Some(1),
            OutputFormat::Json,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_run_and_undo_round_trip() {
        let fx = Fixture::new();
        let plan_id = fx.draft().await;
        let target = fx.dir.path().join("note.txt");
        let payload = json!({ "path": target, "content": "hello" }).to_string();
        add_action(
            fx.ledger(),
            &plan_id.to_string(),
            "fs_write",
            &payload,
            Some(1),
            OutputFormat::Json,
        )
        .await
        .unwrap();

        run_plan(&fx.executor, &plan_id.to_string(), OutputFormat::Json)
            .await
            .unwrap();
        assert!(target.exists());

        let complete = undo_plan(&fx.executor, &plan_id.to_string(), OutputFormat::Json)
            .await
            .unwrap();
        assert!(complete);
        assert!(!target.exists());

        let actions = fx.ledger().get_actions(plan_id).await.unwrap();
        assert_eq!(actions[0].status, ActionStatus::RolledBack);
    }

    #[tokio::test]
    async fn test_purge_refused_for_failed_plan() {
        let fx = Fixture::new();
        let plan_id = fx.draft().await;
        fx.ledger()
            .update_plan_status(plan_id, PlanStatus::Failed)
            .await
            .unwrap();

        assert!(
            purge_plan(&fx.executor, &plan_id.to_string(), false, OutputFormat::Json)
                .await
                .is_err()
        );
        purge_plan(&fx.executor, &plan_id.to_string(), true, OutputFormat::Json)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_plan_reported() {
        let fx = Fixture::new();
        let missing = PlanId::new().to_string();
        assert!(show_plan(fx.ledger(), &missing, OutputFormat::Json).await.is_err());
        assert!(parse_plan_id("not-a-plan").is_err());
    }
}
