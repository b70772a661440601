#[cfg(any(feature = "with-serde", feature = "with-csv"))]
use anyhow::Context;
use anyhow::{Result, bail};
use std::time::Instant;

use crate::args::{CheckArgs, Cli};
use mailprobe_lib::{
    CheckOptions, CheckResult, Deadline, ResultState, check_syntax, check_with_options,
    check_without_connect,
};

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
pub struct OutputRow {
    pub address: String,
    pub syntax: bool,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub result: Option<CheckResult>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub error: Option<String>,
    pub elapsed_ms: u128,
}

pub fn syntax_row(address: &str) -> OutputRow {
    let start = Instant::now();
    let syntax = check_syntax(address);
    OutputRow {
        address: address.to_string(),
        syntax,
        result: None,
        error: None,
        elapsed_ms: start.elapsed().as_millis(),
    }
}

pub fn check_row(address: &str, args: &CheckArgs, options: &CheckOptions) -> OutputRow {
    let start = Instant::now();
    let outcome = if args.no_connect {
        check_without_connect(address)
    } else {
        let deadline = Deadline::after(options.timeout);
        check_with_options(&deadline, &args.sender_for(address), address, options)
    };
    let (result, error) = outcome.into_parts();
    OutputRow {
        address: address.to_string(),
        syntax: check_syntax(address),
        result: Some(result),
        error: error.map(|err| err.to_string()),
        elapsed_ms: start.elapsed().as_millis(),
    }
}

/// 2 dès qu'une adresse est invalide, 3 si seules des erreurs de vérification.
pub fn exit_code(rows: &[OutputRow]) -> i32 {
    let state = |row: &OutputRow| match &row.result {
        Some(result) => result.state(),
        None if row.syntax => ResultState::Valid,
        None => ResultState::Invalid,
    };
    if rows.iter().any(|row| state(row) == ResultState::Invalid) {
        2
    } else if rows.iter().any(|row| state(row) == ResultState::Error) {
        3
    } else {
        0
    }
}

pub fn write_reports(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    match cli.format.as_str() {
        "human" => write_human(rows),
        "json" => write_json(rows, cli),
        "ndjson" => write_ndjson(rows, cli),
        "csv" => write_csv(rows, cli),
        other => bail!("unknown --format '{other}', use: human|json|ndjson|csv"),
    }
}

fn write_human(rows: &[OutputRow]) -> Result<()> {
    for row in rows {
        match &row.result {
            None if row.syntax => println!("[OK]      {}", row.address),
            None => println!("[INVALID] {} :: syntax", row.address),
            Some(result) => {
                let tag = match result.state() {
                    ResultState::Valid => "[OK]     ",
                    ResultState::Invalid => "[INVALID]",
                    ResultState::Error => "[ERROR]  ",
                };
                println!("{tag} {} :: {} ({} ms)", row.address, result.code(), row.elapsed_ms);
                println!("          {}", result.detail());
                if let Some(error) = &row.error {
                    println!("          cause: {error}");
                }
            }
        }
    }
    Ok(())
}

#[cfg(feature = "with-serde")]
fn write_json(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    let s = serde_json::to_string_pretty(rows)?;
    if let Some(path) = &cli.out {
        write_all_atomically(path, s.as_bytes())?;
    } else {
        println!("{s}");
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_json(_: &[OutputRow], _: &Cli) -> Result<()> {
    bail!("format=json nécessite la feature 'with-serde'")
}

#[cfg(feature = "with-serde")]
fn write_ndjson(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.out {
        let mut buf = Vec::new();
        for row in rows {
            let line = serde_json::to_string(row)?;
            buf.extend_from_slice(line.as_bytes());
            buf.push(b'\n');
        }
        write_all_atomically(path, &buf)?;
    } else {
        for row in rows {
            println!("{}", serde_json::to_string(row)?);
        }
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_ndjson(_: &[OutputRow], _: &Cli) -> Result<()> {
    bail!("format=ndjson nécessite la feature 'with-serde'")
}

#[cfg(feature = "with-csv")]
const CSV_HEADER: [&str; 7] = [
    "address", "syntax", "code", "state", "detail", "error", "elapsed_ms",
];

#[cfg(feature = "with-csv")]
fn write_csv(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.out {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(CSV_HEADER)?;
        for row in rows {
            wtr.write_record(csv_record(row))?;
        }
        let data = wtr.into_inner()?;
        write_all_atomically(path, &data)?;
    } else {
        let mut wtr = csv::Writer::from_writer(std::io::stdout());
        wtr.write_record(CSV_HEADER)?;
        for row in rows {
            wtr.write_record(csv_record(row))?;
        }
        wtr.flush()?;
    }
    Ok(())
}

#[cfg(not(feature = "with-csv"))]
fn write_csv(_: &[OutputRow], _: &Cli) -> Result<()> {
    bail!("format=csv nécessite la feature 'with-csv'")
}

#[cfg(feature = "with-csv")]
fn csv_record(row: &OutputRow) -> Vec<String> {
    let (code, state, detail) = match &row.result {
        Some(result) => (
            result.code().to_string(),
            result.state().to_string(),
            result.detail().to_string(),
        ),
        None => (String::new(), String::new(), String::new()),
    };
    vec![
        row.address.clone(),
        row.syntax.to_string(),
        code,
        state,
        detail,
        row.error.clone().unwrap_or_default(),
        row.elapsed_ms.to_string(),
    ]
}

#[cfg(any(feature = "with-serde", feature = "with-csv"))]
fn write_all_atomically(path: &str, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    let tmp = format!("{path}.tmp");
    {
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path).with_context(|| format!("rename {tmp} -> {path}"))?;
    Ok(())
}
