//! CLI command definitions and argument parsing

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sft_core::{
    tasks, Authenticity, ChannelAdapter, OutboundFile, Rejection, TransferEnvelope, TransferError,
    TransferSession,
};
use sft_crypto::hash::{fingerprint, short_fingerprint};
use sft_crypto::{public_key_from_private, EncodedBytes, EncodedPrivateKey, SignatureAlgorithm};
use sft_transport::TcpChannel;

use crate::config::Config;
use crate::keyfile;
use crate::output::{
    FingerprintReport, KeygenReport, OutputFormat, OutputFormatter, SealReport, TransferReport,
};
use crate::ExitCode;

/// sft - signed file transfer
#[derive(Parser, Debug)]
#[command(name = "sft")]
#[command(version, about = "Sign, send, receive and verify files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: table, json, quiet
    #[arg(long, global = true)]
    pub output: Option<OutputFormat>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Relay address as host:port
    #[arg(long, global = true, env = "SFT_RELAY")]
    pub relay: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a signing key pair
    Keygen(KeygenArgs),
    /// Show the fingerprint of a key
    Fingerprint(FingerprintArgs),
    /// Sign a file into an envelope on disk
    Seal(SealArgs),
    /// Verify an envelope on disk and optionally extract its file
    Open(OpenArgs),
    /// Sign a file and send it through the relay
    Send(SendArgs),
    /// Receive files from the relay
    Receive(ReceiveArgs),
}

impl Cli {
    /// Execute the CLI command with a pre-loaded configuration
    pub async fn execute_with_config(self, config: Config) -> anyhow::Result<ExitCode> {
        let formatter = OutputFormatter::new(config.output_format(), config.output.verbose);
        match self.command {
            Commands::Keygen(args) => args.execute(&config, &formatter).await,
            Commands::Fingerprint(args) => args.execute(&formatter),
            Commands::Seal(args) => args.execute(&config, &formatter).await,
            Commands::Open(args) => args.execute(&formatter).await,
            Commands::Send(args) => args.execute(&config, &formatter).await,
            Commands::Receive(args) => args.execute(&config, &formatter).await,
        }
    }
}

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Signature algorithm: rsa or ed25519
    #[arg(long, short)]
    pub algorithm: Option<SignatureAlgorithm>,

    /// RSA modulus length
    #[arg(long)]
    pub bits: Option<usize>,

    /// Private key output path
    #[arg(long, short = 'o', visible_alias = "out", default_value = "sft_key")]
    pub private_out: PathBuf,

    /// Public key output path [default: <private-out>.pub]
    #[arg(long)]
    pub public_out: Option<PathBuf>,

    /// Replace existing key files
    #[arg(long)]
    pub force: bool,
}

impl KeygenArgs {
    pub async fn execute(self, config: &Config, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        let mut params = config.key_params();
        if let Some(algorithm) = self.algorithm {
            params.algorithm = algorithm;
        }
        if let Some(bits) = self.bits {
            params.rsa_modulus_bits = bits;
        }
        params.validate()?;

        let public_out = self
            .public_out
            .unwrap_or_else(|| keyfile::default_public_path(&self.private_out));
        if !self.force {
            for path in [&self.private_out, &public_out] {
                if path.exists() {
                    return Err(keyfile::KeyFileError::Exists(path.clone()).into());
                }
            }
        }

        formatter.progress(&format!("Generating {} key pair", params.algorithm));
        let pair = tasks::generate_key_pair(params).await?;

        keyfile::write_private_key(&self.private_out, pair.private_key(), self.force)?;
        keyfile::write_public_key(&public_out, pair.public_key(), self.force)?;

        let report = KeygenReport {
            algorithm: pair.algorithm().to_string(),
            fingerprint: fingerprint(pair.public_key())?,
            public_key_path: public_out.display().to_string(),
            private_key_path: self.private_out.display().to_string(),
        };
        formatter.print(&formatter.format_keygen(&report));
        Ok(ExitCode::Success)
    }
}

#[derive(Args, Debug)]
pub struct FingerprintArgs {
    /// Key file
    pub key: PathBuf,

    /// The file holds a private key; derive its public key first
    #[arg(long)]
    pub private: bool,
}

impl FingerprintArgs {
    pub fn execute(self, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        let public_key = if self.private {
            let (_, public_key, _) = load_signing_key(&self.key, None)?;
            public_key
        } else {
            keyfile::read_public_key(&self.key)?
        };

        let report = FingerprintReport {
            key_path: self.key.display().to_string(),
            fingerprint: fingerprint(&public_key)?,
            short_fingerprint: short_fingerprint(&public_key)?,
        };
        formatter.print(&formatter.format_fingerprint(&report));
        Ok(ExitCode::Success)
    }
}

#[derive(Args, Debug)]
pub struct SealArgs {
    /// File to sign
    pub file: PathBuf,

    /// Private key file
    #[arg(long, short = 'k')]
    pub private_key: PathBuf,

    /// Signature algorithm [default: inferred from the key]
    #[arg(long, short)]
    pub algorithm: Option<SignatureAlgorithm>,

    /// Envelope output path [default: <file>.envelope.json]
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

impl SealArgs {
    pub async fn execute(self, config: &Config, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        let (algorithm, public_key, private_key) = load_signing_key(&self.private_key, self.algorithm)?;
        let file = OutboundFile::read(&self.file, config.transfer.max_file_size).await?;
        let out = self.out.unwrap_or_else(|| envelope_path_for(&self.file));

        formatter.progress(&format!("Signing {} ({} bytes)", file.name, file.len()));
        let mut report = seal_report(&file, algorithm, &public_key)?;
        let envelope = tasks::seal(file, algorithm, private_key).await?;

        tokio::fs::write(&out, envelope.to_json_pretty()?)
            .await
            .with_context(|| format!("Failed to write envelope {}", out.display()))?;

        report.envelope_path = Some(out.display().to_string());
        formatter.print(&formatter.format_seal(&report, "seal"));
        Ok(ExitCode::Success)
    }
}

#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Envelope file
    pub envelope: PathBuf,

    /// Verify against this public key instead of the one in the envelope
    #[arg(long, short = 'p')]
    pub public_key: Option<PathBuf>,

    /// Directory to extract the file into
    #[arg(long, short)]
    pub save_to: Option<PathBuf>,

    /// Skip signature verification
    #[arg(long, conflicts_with = "public_key")]
    pub no_verify: bool,
}

impl OpenArgs {
    pub async fn execute(self, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        let pinned = self.public_key.as_deref().map(keyfile::read_public_key).transpose()?;
        let raw = tokio::fs::read(&self.envelope)
            .await
            .with_context(|| format!("Failed to read envelope {}", self.envelope.display()))?;

        let envelope = TransferEnvelope::from_slice(&raw)?;
        let session = TransferSession::open(envelope)?;
        let (report, code) = settle(
            session,
            &Receipt {
                verify: !self.no_verify,
                pinned,
                save_to: self.save_to,
            },
            formatter,
        )
        .await?;

        formatter.print(&formatter.format_transfers(&[report], "open"));
        Ok(code)
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// File to send
    pub file: PathBuf,

    /// Private key file [default: a fresh key pair for this transfer]
    #[arg(long, short = 'k')]
    pub private_key: Option<PathBuf>,

    /// Signature algorithm [default: inferred from the key, or from config]
    #[arg(long, short)]
    pub algorithm: Option<SignatureAlgorithm>,
}

impl SendArgs {
    pub async fn execute(self, config: &Config, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        let file = OutboundFile::read(&self.file, config.transfer.max_file_size).await?;

        let ephemeral = self.private_key.is_none();
        let (algorithm, public_key, private_key) = match &self.private_key {
            Some(path) => load_signing_key(path, self.algorithm)?,
            None => {
                let mut params = config.key_params();
                if let Some(algorithm) = self.algorithm {
                    params.algorithm = algorithm;
                }
                formatter.progress(&format!("Generating ephemeral {} key pair", params.algorithm));
                let pair = tasks::generate_key_pair(params).await?;
                let algorithm = pair.algorithm();
                let (public_key, private_key) = pair.into_parts();
                (algorithm, public_key, private_key)
            }
        };

        let relay = config.transport.relay_addr.clone();
        formatter.progress(&format!("Connecting to relay {relay}"));
        let adapter = connect(config).await?;

        let mut report = seal_report(&file, algorithm, &public_key)?;
        report.relay = Some(relay);
        report.ephemeral_key = ephemeral;

        let result = adapter.send_file(file, algorithm, private_key).await;
        let _ = adapter.close().await;
        result?;

        if ephemeral {
            formatter.warning("Sent with an ephemeral key; the receiver can only check integrity, not identity");
        }
        formatter.print(&formatter.format_seal(&report, "send"));
        Ok(ExitCode::Success)
    }
}

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    /// Number of files to receive before exiting
    #[arg(long, short = 'n', default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub count: u32,

    /// Directory to save verified files into
    #[arg(long, short)]
    pub save_to: Option<PathBuf>,

    /// Verify against this public key instead of the one in each envelope
    #[arg(long, short = 'p')]
    pub public_key: Option<PathBuf>,

    /// Skip signature verification
    #[arg(long, conflicts_with = "public_key")]
    pub no_verify: bool,

    /// Seconds to wait for each file
    #[arg(long, short)]
    pub timeout: Option<u64>,
}

impl ReceiveArgs {
    pub async fn execute(self, config: &Config, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        let receipt = Receipt {
            verify: !self.no_verify,
            pinned: self.public_key.as_deref().map(keyfile::read_public_key).transpose()?,
            save_to: self.save_to,
        };
        let wait = self.timeout.map(Duration::from_secs);

        formatter.progress(&format!("Connecting to relay {}", config.transport.relay_addr));
        let adapter = connect(config).await?;

        let mut reports = Vec::new();
        let mut worst = ExitCode::Success;

        while reports.len() < self.count as usize {
            let next = match wait {
                Some(wait) => match tokio::time::timeout(wait, adapter.receive_next()).await {
                    Ok(next) => next,
                    Err(elapsed) if reports.is_empty() => {
                        let _ = adapter.close().await;
                        return Err(elapsed).context("No file arrived");
                    }
                    Err(_) => {
                        formatter.warning(&format!(
                            "Timed out after {} of {} files",
                            reports.len(),
                            self.count
                        ));
                        worst = worst.max(ExitCode::Timeout);
                        break;
                    }
                },
                None => adapter.receive_next().await,
            };

            let session = match next {
                Ok(session) => session,
                Err(TransferError::Transport(e)) => {
                    let _ = adapter.close().await;
                    return Err(e).context("Relay connection lost");
                }
                Err(e) => {
                    // Anyone on the relay can send garbage; skip it.
                    formatter.warning(&format!("Discarded malformed envelope: {e}"));
                    worst = worst.max(ExitCode::InvalidInput);
                    continue;
                }
            };

            let (report, code) = settle(session, &receipt, formatter).await?;
            worst = worst.max(code);
            reports.push(report);
        }

        let _ = adapter.close().await;
        formatter.print(&formatter.format_transfers(&reports, "receive"));
        Ok(worst)
    }
}

/// What to do with a received file.
struct Receipt {
    verify: bool,
    pinned: Option<EncodedBytes>,
    save_to: Option<PathBuf>,
}

/// Verify and save one received file. Rejected files are never saved.
async fn settle(
    mut session: TransferSession,
    receipt: &Receipt,
    formatter: &OutputFormatter,
) -> anyhow::Result<(TransferReport, ExitCode)> {
    if receipt.verify {
        tasks::verify_session(&mut session, receipt.pinned.clone()).await?;
    } else {
        formatter.warning(&format!("{}: signature not checked", session.file_name()));
    }

    let code = authenticity_code(session.authenticity());
    let saved_to = match &receipt.save_to {
        Some(dir) if code == ExitCode::Success => Some(session.save_to(dir).await?),
        Some(_) => {
            formatter.error(&format!("{}: {}, not saved", session.file_name(), session.authenticity()));
            None
        }
        None => None,
    };

    Ok((TransferReport::new(&session, saved_to.as_deref()), code))
}

/// Exit code for the trust state of a single file.
pub fn authenticity_code(authenticity: &Authenticity) -> ExitCode {
    match authenticity {
        Authenticity::Verified | Authenticity::Unverified => ExitCode::Success,
        Authenticity::Rejected(Rejection::SignatureMismatch) => ExitCode::VerificationFailed,
        Authenticity::Rejected(Rejection::Malformed(_)) => ExitCode::InvalidInput,
    }
}

/// Read a private key and resolve its algorithm and public key.
fn load_signing_key(
    path: &Path,
    algorithm: Option<SignatureAlgorithm>,
) -> anyhow::Result<(SignatureAlgorithm, EncodedBytes, EncodedPrivateKey)> {
    let private_key = keyfile::read_private_key(path)?;
    let algorithm = match algorithm {
        Some(algorithm) => algorithm,
        None => keyfile::infer_algorithm(&private_key)?,
    };
    let public_key = public_key_from_private(algorithm, &private_key)
        .with_context(|| format!("{} is not a {algorithm} private key", path.display()))?;
    Ok((algorithm, public_key, private_key))
}

fn seal_report(
    file: &OutboundFile,
    algorithm: SignatureAlgorithm,
    public_key: &EncodedBytes,
) -> anyhow::Result<SealReport> {
    Ok(SealReport {
        file_name: file.name.clone(),
        media_type: file.media_type.clone(),
        size: file.len(),
        algorithm: algorithm.to_string(),
        fingerprint: fingerprint(public_key)?,
        envelope_path: None,
        relay: None,
        ephemeral_key: false,
    })
}

async fn connect(config: &Config) -> anyhow::Result<ChannelAdapter<TcpChannel>> {
    let channel = TcpChannel::connect_with_retry(
        &config.transport.relay_addr,
        config.connect_policy(),
        config.codec(),
    )
    .await?;
    Ok(ChannelAdapter::new(channel))
}

/// `<file>.envelope.json`
pub fn envelope_path_for(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(".envelope.json");
    PathBuf::from(name)
}
