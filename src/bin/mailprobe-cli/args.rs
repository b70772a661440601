use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use mailprobe_lib::validator::domain_of;
use mailprobe_lib::{CheckOptions, DEFAULT_SMTP_PORT};

#[derive(Parser)]
#[command(name = "mailprobe-cli", version)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,

    /// lit des adresses depuis stdin (une par ligne)
    #[arg(long, global = true)]
    pub stdin: bool,

    /// write report to file (JSON/NDJSON/CSV selon --format)
    #[arg(long, global = true)]
    pub out: Option<String>,

    /// format: human|json|ndjson|csv
    #[arg(long, default_value = "human", global = true)]
    pub format: String,

    /// logs détaillés sur stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// vérifie uniquement la syntaxe
    Syntax { email: Option<String> },
    /// syntaxe, domaine jetable, MX puis sonde SMTP (sans DATA)
    Check(CheckArgs),
}

impl Commands {
    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Syntax { email } => email.as_deref(),
            Self::Check(args) => args.email.as_deref(),
        }
    }
}

#[derive(Args)]
pub struct CheckArgs {
    /// adresse e-mail à tester
    pub email: Option<String>,

    /// enveloppe MAIL FROM (par défaut postmaster@domaine)
    #[arg(long = "from")]
    pub mail_from: Option<String>,

    /// n'ouvre aucune connexion (syntaxe + domaine jetable)
    #[arg(long = "no-connect")]
    pub no_connect: bool,

    /// port SMTP
    #[arg(long, default_value_t = DEFAULT_SMTP_PORT)]
    pub port: u16,

    /// nom utilisé pour EHLO/HELO
    #[arg(long, default_value = "localhost")]
    pub helo: String,

    /// budget global par adresse (ms)
    #[arg(long, default_value_t = 10_000)]
    pub timeout_ms: u64,
}

impl CheckArgs {
    pub fn options(&self) -> CheckOptions {
        CheckOptions::default()
            .with_port(self.port)
            .with_helo_name(self.helo.clone())
            .with_timeout(Duration::from_millis(self.timeout_ms))
    }

    pub fn sender_for(&self, target: &str) -> String {
        self.mail_from
            .as_ref()
            .filter(|value| !value.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("postmaster@{}", domain_of(target).unwrap_or("localhost")))
    }
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn clap_command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }
}
