//! vmcompose - compile VM fleet groups into a compose manifest
//!
//! This is the CLI entry point. With no arguments it reads `groups.yaml` and
//! `templates.yaml` from the working directory and writes
//! `docker-compose.yml` next to them.

use anyhow::Context;
use clap::Parser;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vmcompose::config::settings::parse_env_pair;
use vmcompose::network::SubnetConfig;
use vmcompose::preflight::{self, FilesPresent, ToolAvailable};
use vmcompose::{CompilerConfig, ManifestCompiler};

/// Prefix of process variables forwarded to every service
const ENV_PREFIX: &str = "VMCOMPOSE_ENV_";

/// vmcompose - compile VM fleet groups into a compose manifest
#[derive(Parser)]
#[command(name = "vmcompose")]
#[command(author = "Evoker Industries")]
#[command(version)]
#[command(about = "Compile VM fleet groups into a compose manifest", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Group specification file
    #[arg(short, long)]
    groups: Option<PathBuf>,

    /// Template source file
    #[arg(short, long)]
    templates: Option<PathBuf>,

    /// Manifest output file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Primary network subnet (CIDR, /24)
    #[arg(long)]
    primary_subnet: Option<String>,

    /// Secondary network subnet (CIDR, /24)
    #[arg(long)]
    secondary_subnet: Option<String>,

    /// Environment value for every service (KEY=VALUE)
    #[arg(short, long)]
    env: Vec<String>,

    /// Container tool that must be installed
    #[arg(long, default_value = "docker")]
    tool: String,

    /// Skip the container tool check
    #[arg(long)]
    skip_tool_check: bool,

    /// Print the manifest instead of writing it
    #[arg(long)]
    stdout: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    ExitCode::from(report(run(cli), &mut std::io::stdout()))
}

/// Print a failure to `out` and map the outcome to a process status
fn report(result: anyhow::Result<()>, out: &mut impl Write) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            let _ = writeln!(out, "Error: {:#}", e);
            1
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = build_config(&cli)?;
    config.validate()?;

    let files = FilesPresent::new(vec![config.group_file.clone(), config.template_file.clone()]);
    let tool = ToolAvailable::new(&cli.tool);
    if cli.skip_tool_check {
        preflight::run_all(&[&files])?;
    } else {
        preflight::run_all(&[&files, &tool])?;
    }

    let compiler = ManifestCompiler::new(config);

    if cli.stdout {
        let (spec, registry) = compiler.load()?;
        let (manifest, _) = compiler.render(spec, &registry)?;
        print!("{}", manifest.text);
        return Ok(());
    }

    let summary = compiler.compile().with_context(|| {
        format!(
            "no manifest written to {}",
            compiler.config().output.display()
        )
    })?;

    println!(
        "Wrote {}: {}",
        compiler.config().output.display(),
        summary
    );
    for range in &summary.groups {
        println!("  {}: vm-{} .. vm-{}", range.group, range.first, range.last);
    }

    Ok(())
}

fn build_config(cli: &Cli) -> anyhow::Result<CompilerConfig> {
    let mut config = CompilerConfig::default();

    if let Some(path) = &cli.groups {
        config = config.group_file(path);
    }
    if let Some(path) = &cli.templates {
        config = config.template_file(path);
    }
    if let Some(path) = &cli.output {
        config = config.output(path);
    }

    if let Some(cidr) = &cli.primary_subnet {
        let name = config.networks.primary.name.clone();
        config = config.primary_network(SubnetConfig::parse(&name, cidr)?);
    }
    if let Some(cidr) = &cli.secondary_subnet {
        let name = config.networks.secondary.name.clone();
        config = config.secondary_network(SubnetConfig::parse(&name, cidr)?);
    }

    config.environment = collect_environment(std::env::vars(), &cli.env)?;
    Ok(config)
}

/// Prefixed process variables first, then `--env` pairs, which win
fn collect_environment(
    vars: impl Iterator<Item = (String, String)>,
    pairs: &[String],
) -> anyhow::Result<BTreeMap<String, String>> {
    let mut environment: BTreeMap<String, String> = vars
        .filter_map(|(key, value)| {
            key.strip_prefix(ENV_PREFIX)
                .filter(|name| !name.is_empty())
                .map(|name| (name.to_string(), value))
        })
        .collect();

    for pair in pairs {
        let (key, value) =
            parse_env_pair(pair).with_context(|| format!("invalid --env value '{}'", pair))?;
        environment.insert(key, value);
    }

    Ok(environment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_environment() {
        let vars = vec![
            ("VMCOMPOSE_ENV_HOST_NUMBER".to_string(), "7".to_string()),
            ("VMCOMPOSE_ENV_LAB".to_string(), "west".to_string()),
            ("VMCOMPOSE_ENV_".to_string(), "ignored".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ];
        let pairs = vec!["LAB=east".to_string()];

        let env = collect_environment(vars.into_iter(), &pairs).unwrap();
        assert_eq!(env.len(), 2);
        assert_eq!(env["HOST_NUMBER"], "7");
        assert_eq!(env["LAB"], "east");
    }

    #[test]
    fn test_collect_environment_rejects_bad_pair() {
        let pairs = vec!["NOVALUE".to_string()];
        assert!(collect_environment(std::iter::empty(), &pairs).is_err());
    }

    #[test]
    fn test_missing_input_exits_with_error() {
        let temp = tempfile::tempdir().unwrap();
        let groups = temp.path().join("groups.yaml");
        let templates = temp.path().join("templates.yaml");
        let output = temp.path().join("docker-compose.yml");
        std::fs::write(&templates, "agent_a: 'image: a'\n").unwrap();

        let cli = Cli::parse_from([
            "vmcompose".to_string(),
            "--skip-tool-check".to_string(),
            "--groups".to_string(),
            groups.display().to_string(),
            "--templates".to_string(),
            templates.display().to_string(),
            "--output".to_string(),
            output.display().to_string(),
        ]);

        let mut out = Vec::new();
        assert_eq!(report(run(cli), &mut out), 1);

        let message = String::from_utf8(out).unwrap();
        assert!(message.starts_with("Error: "), "{}", message);
        assert!(message.contains("groups.yaml"), "{}", message);
        assert!(!output.exists());
    }

    #[test]
    fn test_success_exits_cleanly() {
        let mut out = Vec::new();
        assert_eq!(report(Ok(()), &mut out), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["vmcompose"]);
        assert!(!cli.stdout);
        assert_eq!(cli.tool, "docker");

        let config = build_config(&cli).unwrap();
        assert_eq!(config.group_file, PathBuf::from("groups.yaml"));
        assert_eq!(config.output, PathBuf::from("docker-compose.yml"));
    }

    #[test]
    fn test_cli_subnet_override() {
        let cli = Cli::parse_from(["vmcompose", "--primary-subnet", "10.9.8.0/24"]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.networks.primary.cidr(), "10.9.8.0/24");
        assert_eq!(config.networks.primary.name, "vm_net_primary");
    }
}
