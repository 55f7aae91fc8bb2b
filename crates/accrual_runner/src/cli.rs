//! Command-line parsing for `accrual-sweep`

use std::str::FromStr;

use anyhow::{anyhow, bail, Context};

use core_kernel::{DebtorId, LeaseId, MonthKey};
use domain_ledger::GenerationMode;

pub const USAGE: &str = "\
usage: accrual-sweep <command>

commands:
  audit [--dry-run] [--window <months>]   sweep every debtor for missing monthly accruals
  backfill <debtor-id> [mode]             post every missing record for one debtor
                                          (mode: bulk|manual|auto|inline)
  diagnose <debtor-id> <YYYY-MM>          explain whether a month is owed and what matches it
  reconcile <debtor-id>                   recompute a debtor's totals and history from the ledger
  open <lease-id>                         open (or fetch) the debtor for an approved lease
  health                                  check database connectivity";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Audit { dry_run: bool, window_months: Option<u32> },
    Backfill { debtor_id: DebtorId, mode: GenerationMode },
    Diagnose { debtor_id: DebtorId, month: MonthKey },
    Reconcile { debtor_id: DebtorId },
    Open { lease_id: LeaseId },
    Health,
}

impl Command {
    /// Parses the arguments after the program name
    pub fn parse<I>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let (name, rest) = args.split_first().ok_or_else(|| anyhow!("missing command"))?;

        match name.as_str() {
            "audit" => parse_audit(rest),
            "backfill" => {
                let debtor_id = debtor_arg(rest.first())?;
                let mode = match rest.get(1) {
                    Some(raw) => GenerationMode::from_str(raw)?,
                    None => GenerationMode::Manual,
                };
                no_more(rest, 2)?;
                Ok(Command::Backfill { debtor_id, mode })
            }
            "diagnose" => {
                let debtor_id = debtor_arg(rest.first())?;
                let raw = rest.get(1).ok_or_else(|| anyhow!("diagnose needs a month (YYYY-MM)"))?;
                let month =
                    MonthKey::from_str(raw).with_context(|| format!("invalid month '{}'", raw))?;
                no_more(rest, 2)?;
                Ok(Command::Diagnose { debtor_id, month })
            }
            "reconcile" => {
                let debtor_id = debtor_arg(rest.first())?;
                no_more(rest, 1)?;
                Ok(Command::Reconcile { debtor_id })
            }
            "open" => {
                let raw = rest.first().ok_or_else(|| anyhow!("open needs a lease id"))?;
                let lease_id =
                    LeaseId::from_str(raw).with_context(|| format!("invalid lease id '{}'", raw))?;
                no_more(rest, 1)?;
                Ok(Command::Open { lease_id })
            }
            "health" => {
                no_more(rest, 0)?;
                Ok(Command::Health)
            }
            other => bail!("unknown command '{}'", other),
        }
    }
}

fn parse_audit(rest: &[String]) -> anyhow::Result<Command> {
    let mut dry_run = false;
    let mut window_months = None;
    let mut iter = rest.iter();

    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--dry-run" => dry_run = true,
            "--window" => {
                let raw = iter.next().ok_or_else(|| anyhow!("--window needs a number of months"))?;
                let months: u32 = raw.parse().with_context(|| format!("invalid window '{}'", raw))?;
                window_months = Some(months);
            }
            other => bail!("unknown audit option '{}'", other),
        }
    }

    Ok(Command::Audit { dry_run, window_months })
}

fn debtor_arg(raw: Option<&String>) -> anyhow::Result<DebtorId> {
    let raw = raw.ok_or_else(|| anyhow!("a debtor id is required"))?;
    DebtorId::from_str(raw).with_context(|| format!("invalid debtor id '{}'", raw))
}

fn no_more(rest: &[String], expected: usize) -> anyhow::Result<()> {
    if rest.len() > expected {
        bail!("unexpected argument '{}'", rest[expected]);
    }
    Ok(())
}
