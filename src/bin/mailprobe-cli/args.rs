use std::time::Duration;

use anyhow::{Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use mailprobe_lib::{
    CatchAllFallback, ProbeOptions, ValidationMode, VerifyOptions, is_command_argument,
};

#[derive(Parser)]
#[command(name = "mailprobe-cli", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,

    /// lit des adresses depuis stdin (une par ligne)
    #[arg(long)]
    pub stdin: bool,

    /// write report to file (JSON/NDJSON/CSV selon --format)
    #[arg(long)]
    pub out: Option<String>,

    /// mode: strict|relaxed
    #[arg(long, default_value = "strict", env = "MAILPROBE_MODE")]
    pub mode: String,

    /// format: human|json|ndjson|csv
    #[arg(long, default_value = "human")]
    pub format: String,

    /// nom annoncé dans EHLO/HELO
    #[arg(long, default_value = "localhost", env = "MAILPROBE_HELO")]
    pub helo: String,

    /// enveloppe MAIL FROM (vide = expéditeur nul <>)
    #[arg(long = "from", default_value = "test@example.com", env = "MAILPROBE_FROM")]
    pub mail_from: String,

    /// port SMTP des serveurs MX
    #[arg(long, default_value_t = 25, env = "MAILPROBE_PORT")]
    pub port: u16,

    /// délai max par connexion et par commande (ms)
    #[arg(long = "timeout", default_value_t = 5_000, env = "MAILPROBE_TIMEOUT_MS")]
    pub timeout_ms: u64,

    /// considère un test catch-all inabouti comme un catch-all
    #[arg(long)]
    pub strict_catch_all: bool,

    /// affiche la transcription SMTP (format human)
    #[arg(long)]
    pub transcript: bool,

    /// verbosité des logs sur stderr (-v info, -vv debug); RUST_LOG prime
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// vérifie une adresse
    Verify {
        /// mode: strict|relaxed (prend le pas sur l'option globale)
        #[arg(long)]
        mode: Option<String>,
        email: String,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn clap_command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }

    pub fn verify_options(&self) -> Result<VerifyOptions> {
        let mode_arg = match &self.cmd {
            Some(Commands::Verify {
                mode: Some(mode), ..
            }) => mode.as_str(),
            _ => self.mode.as_str(),
        };
        if self.timeout_ms == 0 {
            bail!("--timeout must be greater than 0");
        }
        // une valeur avec CR/LF injecterait des commandes SMTP
        if !is_command_argument(self.helo.trim()) {
            bail!("--helo must not contain spaces or control characters");
        }
        if !is_command_argument(self.mail_from.trim()) || self.mail_from.contains(['<', '>']) {
            bail!("--from must be a bare address without spaces, '<', '>' or control characters");
        }
        let probe = ProbeOptions {
            port: self.port,
            helo_name: self.helo.clone(),
            mail_from: self.mail_from.clone(),
            ..ProbeOptions::default()
        }
        .with_timeout(Duration::from_millis(self.timeout_ms));

        Ok(VerifyOptions {
            validation_mode: mode_from_str(mode_arg)?,
            probe,
            catch_all_fallback: if self.strict_catch_all {
                CatchAllFallback::AssumeCatchAll
            } else {
                CatchAllFallback::AssumeNotCatchAll
            },
        })
    }

    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

pub fn mode_from_str(s: &str) -> Result<ValidationMode> {
    match s {
        "strict" => Ok(ValidationMode::Strict),
        "relaxed" => Ok(ValidationMode::Relaxed),
        other => bail!("unknown --mode '{other}', use: strict|relaxed"),
    }
}
