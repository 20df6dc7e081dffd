//! Stokvel inspection CLI.
//!
//! # Responsibility
//! - Open a stokvel database and print read-side aggregates as stable
//!   `key=value` lines.
//! - Exit with status 2 when the requested club does not exist, 1 on any
//!   other failure.

use log::{info, warn};
use std::process::ExitCode;
use stokvel_core::{
    core_version, open_db, parse_stokvel_id, LogSettings, RuleKind, RuleRecord,
    SqliteStokvelRepository, StokvelListQuery, StokvelSummaryProvider, SummaryError,
};

const USAGE: &str = "usage:
  stokvel_cli version
  stokvel_cli <db_path> list
  stokvel_cli <db_path> summary <stokvel_id>
  stokvel_cli <db_path> members <stokvel_id>
  stokvel_cli <db_path> setup <stokvel_id>
  stokvel_cli <db_path> rules <contribution|penalty> <stokvel_id> [limit]";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Version,
    List { db_path: String },
    Summary { db_path: String, stokvel_id: String },
    Members { db_path: String, stokvel_id: String },
    Setup { db_path: String, stokvel_id: String },
    Rules {
        db_path: String,
        kind: RuleKind,
        stokvel_id: String,
        limit: Option<u32>,
    },
}

#[derive(Debug)]
enum CliError {
    Usage(String),
    NotFound(String),
    Failed(String),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::NotFound(_) => 2,
            Self::Usage(_) | Self::Failed(_) => 1,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::Usage(message) | Self::NotFound(message) | Self::Failed(message) => message,
        }
    }
}

impl From<SummaryError> for CliError {
    fn from(value: SummaryError) -> Self {
        match value {
            SummaryError::StokvelNotFound(_) => Self::NotFound(value.to_string()),
            SummaryError::Repo(err) => Self::Failed(err.to_string()),
        }
    }
}

fn main() -> ExitCode {
    match LogSettings::from_env() {
        Ok(Some(settings)) => {
            if let Err(err) = stokvel_core::logging::start(settings) {
                eprintln!("warning=logging_disabled reason={err}");
            }
        }
        Ok(None) => {}
        Err(err) => eprintln!("warning=logging_disabled reason={err}"),
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let outcome = parse_args(&args).and_then(|command| run(&command));
    match outcome {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            warn!("event=cli_command module=cli status=error error={}", err.message());
            eprintln!("error={}", err.message());
            if matches!(err, CliError::Usage(_)) {
                eprintln!("{USAGE}");
            }
            ExitCode::from(err.exit_code())
        }
    }
}

fn parse_args(args: &[String]) -> Result<Command, CliError> {
    let words: Vec<&str> = args.iter().map(String::as_str).collect();
    let command = match words.as_slice() {
        ["version"] => Command::Version,
        [db_path, "list"] => Command::List {
            db_path: db_path.to_string(),
        },
        [db_path, "summary", id] => Command::Summary {
            db_path: db_path.to_string(),
            stokvel_id: id.to_string(),
        },
        [db_path, "members", id] => Command::Members {
            db_path: db_path.to_string(),
            stokvel_id: id.to_string(),
        },
        [db_path, "setup", id] => Command::Setup {
            db_path: db_path.to_string(),
            stokvel_id: id.to_string(),
        },
        [db_path, "rules", kind, id, rest @ ..] if rest.len() <= 1 => {
            let kind = RuleKind::from_label(kind)
                .ok_or_else(|| CliError::Usage(format!("unknown rule kind `{kind}`")))?;
            let limit = match rest.first() {
                Some(value) => Some(
                    value
                        .parse::<u32>()
                        .map_err(|_| CliError::Usage(format!("invalid limit `{value}`")))?,
                ),
                None => None,
            };
            Command::Rules {
                db_path: db_path.to_string(),
                kind,
                stokvel_id: id.to_string(),
                limit,
            }
        }
        _ => return Err(CliError::Usage("unrecognized arguments".to_string())),
    };
    Ok(command)
}

fn run(command: &Command) -> Result<Vec<String>, CliError> {
    let db_path = match command {
        Command::Version => return Ok(vec![format!("stokvel_core version={}", core_version())]),
        Command::List { db_path }
        | Command::Summary { db_path, .. }
        | Command::Members { db_path, .. }
        | Command::Setup { db_path, .. }
        | Command::Rules { db_path, .. } => db_path,
    };

    let conn = open_db(db_path).map_err(|err| CliError::Failed(err.to_string()))?;
    let repo =
        SqliteStokvelRepository::try_new(&conn).map_err(|err| CliError::Failed(err.to_string()))?;
    let provider = StokvelSummaryProvider::new(repo);
    info!("event=cli_command module=cli status=start db_path={db_path}");

    let lines = match command {
        Command::Version => Vec::new(),
        Command::List { .. } => {
            let result = provider.list_stokvels(StokvelListQuery::default())?;
            let mut lines = vec![format!("count={}", result.items.len())];
            lines.extend(result.items.iter().map(|stokvel| {
                format!(
                    "stokvel id={} name={:?} active={} accepting={}",
                    stokvel.id, stokvel.name, stokvel.is_active, stokvel.is_accepting_members
                )
            }));
            lines
        }
        Command::Summary { stokvel_id, .. } => {
            let summary = provider.compute_summary(parse_stokvel_id(stokvel_id)?)?;
            let current_cycle = summary
                .current_cycle
                .as_ref()
                .map(|cycle| cycle.name.clone())
                .unwrap_or_else(|| "None".to_string());
            vec![
                format!("stokvel_id={}", summary.stokvel_id),
                format!("total_members={}", summary.total_members),
                format!("active_members={}", summary.active_members),
                format!("contribution_rules_count={}", summary.contribution_rules_count),
                format!("penalty_rules_count={}", summary.penalty_rules_count),
                format!("current_cycle={current_cycle}"),
                format!("total_cycles={}", summary.total_cycles),
                format!("bank_accounts_count={}", summary.bank_accounts_count),
                format!("has_constitution={}", summary.has_constitution),
            ]
        }
        Command::Members { stokvel_id, .. } => {
            let stats = provider.compute_member_stats(parse_stokvel_id(stokvel_id)?)?;
            vec![
                format!("total_members={}", stats.total_members),
                format!("active_members={}", stats.active_members),
                format!("pending_members={}", stats.pending_members),
                format!("probation_members={}", stats.probation_members),
            ]
        }
        Command::Setup { stokvel_id, .. } => {
            let validation = provider.validate_setup(parse_stokvel_id(stokvel_id)?)?;
            let mut lines = vec![format!("setup_valid={}", validation.setup_valid)];
            lines.extend(validation.issues.iter().map(|issue| format!("issue={issue}")));
            lines
        }
        Command::Rules {
            kind,
            stokvel_id,
            limit,
            ..
        } => {
            let records = provider.recent_rules(parse_stokvel_id(stokvel_id)?, *kind, *limit)?;
            let mut lines = vec![format!("count={}", records.len())];
            lines.extend(records.iter().map(format_rule));
            lines
        }
    };
    Ok(lines)
}

fn format_rule(record: &RuleRecord) -> String {
    format!(
        "rule id={} name={:?} type={} amount={} active={}",
        record.id,
        record.name,
        record.category.label(),
        record.amount,
        record.is_active
    )
}

#[cfg(test)]
mod tests {
    use super::{parse_args, CliError, Command};
    use stokvel_core::RuleKind;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_rules_with_optional_limit() {
        let command = parse_args(&args(&["club.db", "rules", "penalty", "abc", "7"]))
            .expect("valid rules command");
        assert_eq!(
            command,
            Command::Rules {
                db_path: "club.db".to_string(),
                kind: RuleKind::Penalty,
                stokvel_id: "abc".to_string(),
                limit: Some(7),
            }
        );

        let command = parse_args(&args(&["club.db", "rules", "contribution", "abc"]))
            .expect("limit is optional");
        assert!(matches!(command, Command::Rules { limit: None, .. }));
    }

    #[test]
    fn rejects_unknown_kind_and_bad_limit() {
        assert!(matches!(
            parse_args(&args(&["club.db", "rules", "bonus", "abc"])),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            parse_args(&args(&["club.db", "rules", "penalty", "abc", "-1"])),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn not_found_exits_with_two() {
        assert_eq!(CliError::NotFound("x".to_string()).exit_code(), 2);
        assert_eq!(CliError::Usage("x".to_string()).exit_code(), 1);
        assert!(matches!(parse_args(&args(&[])), Err(CliError::Usage(_))));
    }
}
