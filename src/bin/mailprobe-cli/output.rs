use anyhow::{Result, bail};

use crate::args::Cli;
use mailprobe_lib::{VerificationReport, VerificationResult, VerifyOptions};

/// Une ligne de sortie: rapport du pipeline, adresse ignorée ou erreur interne.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct OutputRow {
    pub email: String,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub report: Option<VerificationReport>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub skipped: Option<String>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub error: Option<String>,
}

impl OutputRow {
    pub fn check(email: &str, options: &VerifyOptions) -> Self {
        check_with(email, |address| {
            mailprobe_lib::verify_with_options(address, options).map_err(|err| err.to_string())
        })
    }

    pub fn result(&self) -> Option<&VerificationResult> {
        self.report.as_ref().map(|report| &report.result)
    }

    pub fn is_valid(&self) -> bool {
        self.result().is_some_and(|result| result.valid)
    }

    pub fn human_summary(&self) -> String {
        if let Some(report) = &self.report {
            let mut line = report.result.reason.to_string();
            if !report.syntax_errors.is_empty() {
                line.push_str(&format!(" ({})", report.syntax_errors.join("; ")));
            }
            line
        } else if let Some(reason) = &self.skipped {
            reason.clone()
        } else if let Some(error) = &self.error {
            format!("Internal error: {error}")
        } else {
            "unknown".to_string()
        }
    }
}

fn check_with<F>(email: &str, verify: F) -> OutputRow
where
    F: Fn(&str) -> Result<VerificationReport, String>,
{
    let email = email.trim();
    let mut row = OutputRow {
        email: email.to_string(),
        report: None,
        skipped: None,
        error: None,
    };
    if email.is_empty() {
        row.skipped = Some("Email is required".to_string());
        return row;
    }
    match verify(email) {
        Ok(report) => row.report = Some(report),
        Err(error) => {
            tracing::error!(email, %error, "verification failed");
            row.error = Some(error);
        }
    }
    row
}

fn flag(value: bool) -> &'static str {
    if value { "ok" } else { "--" }
}

fn responder(report: &VerificationReport) -> Option<&str> {
    report
        .attempts
        .iter()
        .find(|attempt| attempt.outcome.is_success())
        .map(|attempt| attempt.exchange.hostname.as_str())
}

pub fn print_human(rows: &[OutputRow], transcript: bool) {
    for row in rows {
        let tag = if row.is_valid() {
            "[VALID]  "
        } else if row.error.is_some() {
            "[ERROR]  "
        } else {
            "[INVALID]"
        };
        println!("{tag} {} :: {}", row.email, row.human_summary());
        let Some(report) = &row.report else { continue };
        let result = &report.result;
        println!(
            "          syntax={} mail_server={} mailbox={} not_catch_all={}",
            flag(result.syntax_ok),
            flag(result.mail_server_ok),
            flag(result.mailbox_ok),
            flag(result.not_catch_all)
        );
        if !report.exchanges.is_empty() {
            let list = report
                .exchanges
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            println!("          mx: {list}");
        }
        if let Some(host) = responder(report) {
            println!("          accepted by: {host}");
        }
        if transcript {
            print_transcript(report);
        }
    }
}

fn print_transcript(report: &VerificationReport) {
    let catch_all = report.catch_all.iter().map(|probe| &probe.attempt);
    for attempt in report.attempts.iter().chain(catch_all) {
        let peer = attempt.address.as_deref().unwrap_or("-");
        println!(
            "          [{} {}] RCPT <{}> -> {}",
            attempt.exchange.hostname, peer, attempt.recipient, attempt.outcome
        );
        for event in &attempt.events {
            println!("            {event}");
        }
    }
}

pub fn emit(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    match cli.format.as_str() {
        "human" => {
            print_human(rows, cli.transcript);
            Ok(())
        }
        "json" => emit_json(rows, cli.out.as_deref()),
        "ndjson" => emit_ndjson(rows, cli.out.as_deref()),
        "csv" => emit_csv(rows, cli.out.as_deref()),
        other => bail!("unknown --format '{other}', use: human|json|ndjson|csv"),
    }
}

#[cfg(feature = "with-serde")]
fn emit_json(rows: &[OutputRow], out: Option<&str>) -> Result<()> {
    let s = serde_json::to_string_pretty(rows)?;
    match out {
        Some(path) => write_all_atomically(path, s.as_bytes()),
        None => {
            println!("{s}");
            Ok(())
        }
    }
}

#[cfg(not(feature = "with-serde"))]
fn emit_json(_rows: &[OutputRow], _out: Option<&str>) -> Result<()> {
    bail!("format=json nécessite la feature 'with-serde'")
}

#[cfg(feature = "with-serde")]
fn emit_ndjson(rows: &[OutputRow], out: Option<&str>) -> Result<()> {
    let mut buf = Vec::new();
    for row in rows {
        buf.extend_from_slice(serde_json::to_string(row)?.as_bytes());
        buf.push(b'\n');
    }
    match out {
        Some(path) => write_all_atomically(path, &buf),
        None => {
            print!("{}", String::from_utf8_lossy(&buf));
            Ok(())
        }
    }
}

#[cfg(not(feature = "with-serde"))]
fn emit_ndjson(_rows: &[OutputRow], _out: Option<&str>) -> Result<()> {
    bail!("format=ndjson nécessite la feature 'with-serde'")
}

#[cfg(feature = "with-csv")]
fn emit_csv(rows: &[OutputRow], out: Option<&str>) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record([
        "email",
        "valid",
        "reason",
        "syntax_ok",
        "mail_server_ok",
        "mailbox_ok",
        "not_catch_all",
        "exchange",
        "note",
    ])?;
    for row in rows {
        let bool_str = |value: bool| if value { "true" } else { "false" };
        let (reason, flags) = match row.result() {
            Some(result) => (
                format!("{:?}", result.reason),
                [
                    bool_str(result.syntax_ok),
                    bool_str(result.mail_server_ok),
                    bool_str(result.mailbox_ok),
                    bool_str(result.not_catch_all),
                ],
            ),
            None => (String::new(), ["", "", "", ""]),
        };
        let exchange = row.report.as_ref().and_then(responder).unwrap_or_default();
        let note = row
            .skipped
            .as_deref()
            .or(row.error.as_deref())
            .unwrap_or_default();
        wtr.write_record([
            row.email.as_str(),
            bool_str(row.is_valid()),
            reason.as_str(),
            flags[0],
            flags[1],
            flags[2],
            flags[3],
            exchange,
            note,
        ])?;
    }
    let data = wtr.into_inner()?;
    match out {
        Some(path) => write_all_atomically(path, &data),
        None => {
            print!("{}", String::from_utf8_lossy(&data));
            Ok(())
        }
    }
}

#[cfg(not(feature = "with-csv"))]
fn emit_csv(_rows: &[OutputRow], _out: Option<&str>) -> Result<()> {
    bail!("format=csv nécessite la feature 'with-csv'")
}

#[cfg(any(feature = "with-serde", feature = "with-csv"))]
fn write_all_atomically(path: &str, bytes: &[u8]) -> Result<()> {
    use anyhow::Context;
    use std::io::Write;
    let tmp = format!("{}.tmp", path);
    {
        let mut f = std::fs::File::create(&tmp).with_context(|| format!("create {tmp}"))?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path).with_context(|| format!("rename {tmp} -> {path}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailprobe_lib::Reason;

    fn report(reason: Reason) -> VerificationReport {
        VerificationReport {
            email: "user@example.com".to_string(),
            ascii_domain: "example.com".to_string(),
            result: VerificationResult::new(reason),
            syntax_errors: Vec::new(),
            exchanges: Vec::new(),
            attempts: Vec::new(),
            catch_all: None,
        }
    }

    #[test]
    fn empty_address_is_required() {
        let row = check_with("   ", |_| panic!("pipeline must not run"));
        assert_eq!(row.human_summary(), "Email is required");
        assert!(!row.is_valid());
    }

    #[test]
    fn reports_reason() {
        let row = check_with("user@example.com", |_| Ok(report(Reason::ValidAddress)));
        assert!(row.is_valid());
        assert_eq!(row.human_summary(), "Valid email address");
    }

    #[test]
    fn catch_all_is_not_valid() {
        let row = check_with("user@example.com", |_| Ok(report(Reason::CatchAll)));
        assert!(!row.is_valid());
        assert_eq!(row.human_summary(), "Domain is catch-all");
    }

    #[test]
    fn internal_error_is_kept() {
        let row = check_with("user@example.com", |_| Err("resolver unavailable".to_string()));
        assert!(row.report.is_none());
        assert_eq!(row.human_summary(), "Internal error: resolver unavailable");
    }
}
