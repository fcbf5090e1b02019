//! # varmatrix
//!
//! Command-line front end for the varmatrix variant identity engine.
//!
//! ## Overview
//!
//! `varmatrix` reads a declaration of an app's build profiles, resolves the
//! identity every variant will ship with, and checks the Android and iOS
//! native matrices before any native build tool runs:
//!
//! - **Audit** - Resolve every variant and report identity and matrix drift
//! - **Resolve** - Show the identity of one profile
//! - **List** - Show the declared profiles after inheritance
//! - **Init** - Write a starter `varmatrix.toml`
//!
//! ## Quick Start
//!
//! ```bash
//! # Create a starter declaration
//! cargo varmatrix init --app-name "My App"
//!
//! # Audit every variant (exits non-zero when anything needs fixing)
//! cargo varmatrix audit
//!
//! # Resolve the preview identity with an extra binding
//! cargo varmatrix resolve --profile preview --platform ios --env API_URL=https://staging
//! ```
//!
//! ## Environment
//!
//! Environment bindings come only from the declaration's `[environment]`
//! table, `--env-file` and `--env KEY=VALUE`. The process environment is
//! never consulted, so an audit gives the same answer on every machine.
//!
//! ## CLI Flags
//!
//! Global flags available on all commands:
//!
//! - **`--config`** - Declaration file (default: discover `varmatrix.toml`)
//! - **`--env KEY=VALUE`** - Environment binding, repeatable
//! - **`--env-file`** - Dotenv file read into the snapshot
//! - **`--dry-run`** - Preview what would be written without writing it
//! - **`--verbose` / `-v`** - Print where inputs were loaded from
//!
//! ## Modules
//!
//! - [`config`] - Declaration discovery and environment snapshot assembly

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::ffi::OsString;
use std::fmt::Write;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use varmatrix_sdk::{
    BuildProfile, EnvironmentSnapshot, Platform, ProfileRegistry, Report, ResolvedIdentity,
};

pub mod config;

use config::CONFIG_FILE_NAME;

/// Variant identity and native matrix auditor for React Native and Expo apps.
#[derive(Parser, Debug)]
#[command(name = "varmatrix", author, version, about = "Variant identity and native matrix auditor", long_about = None)]
struct Cli {
    /// Declaration file (default: discover varmatrix.toml upwards from the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Environment binding applied to every profile, repeatable
    #[arg(long = "env", value_name = "KEY=VALUE", global = true)]
    env: Vec<String>,

    /// Dotenv file whose bindings are added to the snapshot
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Print what would be written without writing it
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print verbose output including where inputs were loaded from
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve every variant and report identity and matrix drift.
    Audit {
        #[arg(long, help = "Print the report as JSON")]
        json: bool,
        #[arg(long, help = "Also write the JSON report to this path")]
        output: Option<PathBuf>,
    },
    /// Resolve the identity of one profile.
    Resolve {
        #[arg(long)]
        profile: String,
        #[arg(long, value_enum, help = "Platform to resolve (default: every platform the profile targets)")]
        platform: Option<PlatformArg>,
        #[arg(long, help = "Print the identities as JSON")]
        json: bool,
    },
    /// List declared profiles with inheritance applied.
    List {
        #[arg(long, help = "Print the profiles as JSON")]
        json: bool,
    },
    /// Write a starter declaration file.
    Init {
        #[arg(long, default_value = CONFIG_FILE_NAME)]
        output: PathBuf,
        #[arg(long, default_value = "MyApp")]
        app_name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlatformArg {
    Android,
    Ios,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Android => Platform::Android,
            PlatformArg::Ios => Platform::Ios,
        }
    }
}

/// Machine-readable audit output.
#[derive(Debug, Serialize)]
struct AuditOutput<'a> {
    generated_at: String,
    config: &'a Path,
    environment: &'a EnvironmentSnapshot,
    clean: bool,
    report: &'a Report,
}

/// Loaded declaration plus the sealed registry built from it.
struct Session {
    path: PathBuf,
    registry: ProfileRegistry,
}

pub fn run() -> Result<()> {
    execute(Cli::parse())
}

/// Runs the CLI with explicit arguments; the first item is the program name.
pub fn run_from<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    execute(Cli::parse_from(args))
}

/// Drops the subcommand name cargo inserts when invoked as `cargo varmatrix`.
pub fn cargo_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().collect();
    if args.get(1).is_some_and(|arg| arg == "varmatrix") {
        args.remove(1);
    }
    args
}

fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Audit { json, output } => {
            let session = load_session(&cli.config, &cli.env_file, &cli.env, cli.verbose)?;
            cmd_audit(&session, json, output.as_deref(), cli.dry_run)?;
        }
        Command::Resolve {
            profile,
            platform,
            json,
        } => {
            let session = load_session(&cli.config, &cli.env_file, &cli.env, cli.verbose)?;
            cmd_resolve(&session, &profile, platform.map(Platform::from), json)?;
        }
        Command::List { json } => {
            let session = load_session(&cli.config, &cli.env_file, &cli.env, cli.verbose)?;
            cmd_list(&session, json)?;
        }
        Command::Init { output, app_name } => {
            cmd_init(&output, &app_name, cli.dry_run)?;
        }
    }

    Ok(())
}

fn load_session(
    config: &Option<PathBuf>,
    env_file: &Option<PathBuf>,
    env: &[String],
    verbose: bool,
) -> Result<Session> {
    let (declaration, path) = config::resolve_declaration(config.as_deref())?;
    let snapshot = config::build_snapshot(env_file.as_deref(), env)?;

    if verbose {
        eprintln!("Using declaration {:?}", path);
        if let Some(file) = env_file {
            eprintln!("Read environment bindings from {:?}", file);
        }
        eprintln!(
            "{} profile(s), {} caller binding(s)",
            declaration.profiles.len(),
            snapshot.len()
        );
    }

    let registry = declaration
        .into_registry(&snapshot)
        .with_context(|| format!("building profile registry from {:?}", path))?;

    Ok(Session { path, registry })
}

fn cmd_audit(session: &Session, json: bool, output: Option<&Path>, dry_run: bool) -> Result<()> {
    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    audit_to(
        session,
        json,
        output,
        dry_run,
        &mut stdout.lock(),
        &mut stderr.lock(),
    )
}

/// Runs the audit, writing results to `out` and status lines to `out` or,
/// when `json` is set, to `status` so `out` stays a single JSON document.
fn audit_to(
    session: &Session,
    json: bool,
    output: Option<&Path>,
    dry_run: bool,
    out: &mut dyn io::Write,
    status: &mut dyn io::Write,
) -> Result<()> {
    let report = session
        .registry
        .audit()
        .with_context(|| format!("auditing {:?}", session.path))?;

    let generated_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());
    let envelope = AuditOutput {
        generated_at,
        config: &session.path,
        environment: session.registry.environment(),
        clean: report.is_clean(),
        report: &report,
    };
    let contents = serde_json::to_string_pretty(&envelope)?;

    if json {
        writeln!(out, "{}", contents)?;
    } else {
        write!(out, "{}", render_report_text(&report))?;
    }

    if let Some(path) = output {
        let line = if dry_run {
            format!("[dry-run] Would write JSON report to {:?}", path)
        } else {
            ensure_parent_dir(path)?;
            write_file(path, contents.as_bytes())?;
            format!("JSON report written to {:?}", path)
        };
        if json {
            writeln!(status, "{}", line)?;
        } else {
            writeln!(out, "{}", line)?;
        }
    }

    if !report.is_clean() {
        bail!(
            "{} finding(s) in {:?}; fix them before building any variant",
            report.findings.len(),
            session.path
        );
    }
    Ok(())
}

fn cmd_resolve(
    session: &Session,
    profile: &str,
    platform: Option<Platform>,
    json: bool,
) -> Result<()> {
    let platforms = match platform {
        Some(platform) => vec![platform],
        None => session.registry.effective(profile)?.platforms(),
    };

    let identities = platforms
        .into_iter()
        .map(|platform| session.registry.resolve(profile, platform))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("resolving profile '{}'", profile))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&identities)?);
    } else {
        for identity in &identities {
            print!("{}", render_identity(identity));
        }
    }
    Ok(())
}

fn cmd_list(session: &Session, json: bool) -> Result<()> {
    let profiles: Vec<&BuildProfile> = session.registry.effective_profiles()?.collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&profiles)?);
        return Ok(());
    }

    if profiles.is_empty() {
        println!("No profiles declared in {:?}", session.path);
        return Ok(());
    }
    for profile in profiles {
        print!("{}", render_profile(profile));
    }
    Ok(())
}

fn cmd_init(output: &Path, app_name: &str, dry_run: bool) -> Result<()> {
    let contents = config::generate_starter_toml(app_name);

    if dry_run {
        println!("[dry-run] Would write {:?}:", output);
        print!("{}", contents);
        return Ok(());
    }

    ensure_can_write(output)?;
    write_file(output, contents.as_bytes())?;
    println!("Wrote starter declaration to {:?}", output);
    println!("Next: edit the identifiers, then run `varmatrix audit`.");
    Ok(())
}

fn render_report_text(report: &Report) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Resolved identities:");
    if report.identities.is_empty() {
        let _ = writeln!(output, "  (none)");
    }
    for identity in &report.identities {
        let _ = writeln!(
            output,
            "  {:<16} {:<8} {:<40} {}",
            identity.profile, identity.platform, identity.application_id, identity.display_name
        );
    }
    let _ = writeln!(output);

    if report.is_clean() {
        let _ = writeln!(output, "No findings. Every variant is safe to build.");
        return output;
    }

    let _ = writeln!(output, "Findings ({}):", report.findings.len());
    for (kind, count) in report.counts_by_kind() {
        let _ = writeln!(output, "  {}: {}", kind, count);
    }
    let _ = writeln!(output);
    for finding in &report.findings {
        let _ = writeln!(output, "- [{}] {}", finding.kind(), finding);
    }
    output
}

fn render_identity(identity: &ResolvedIdentity) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{} ({})", identity.profile, identity.platform);
    let _ = writeln!(output, "  display name:   {}", identity.display_name);
    let _ = writeln!(
        output,
        "  {}: {}",
        identity.platform.application_id_field(),
        identity.application_id
    );
    let _ = writeln!(output, "  icon:           {}", identity.icon);
    let _ = writeln!(output, "  scheme:         {}", identity.scheme);
    let _ = writeln!(output, "  dev client:     {}", identity.dev_client_scheme);
    output
}

fn render_profile(profile: &BuildProfile) -> String {
    let mut output = String::new();
    let _ = write!(output, "{}", profile.name);
    if let Some(parent) = &profile.extends {
        let _ = write!(output, " (extends {})", parent);
    }
    let _ = writeln!(output);

    if let Some(android) = &profile.android {
        let _ = write!(output, "  android: {} / {}", android.flavor, android.build_type);
        if let Some(command) = &android.native_command {
            let _ = write!(output, "  [{}]", command);
        }
        let _ = writeln!(output);
    }
    if let Some(ios) = &profile.ios {
        let scheme = ios.scheme.as_deref().unwrap_or("-");
        let _ = writeln!(output, "  ios:     {} / {}", scheme, ios.build_configuration);
    }
    if profile.android.is_none() && profile.ios.is_none() {
        let _ = writeln!(output, "  (no native directives; targets android and ios)");
    }
    for (key, value) in &profile.environment_overrides {
        let _ = writeln!(output, "  env:     {}={}", key, value);
    }
    output
}

fn ensure_can_write(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("refusing to overwrite existing file: {:?}", path);
    }
    ensure_parent_dir(path)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating parent directory {:?}", parent))?;
    }
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("writing file {:?}", path))
}
