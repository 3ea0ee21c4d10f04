use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use job_guard_core::{
    build_client, llm::LlmFileConfig, render_assessment, render_report, validate_report,
    AnalysisMode, BuiltinRuleRepository, CsvScamStore, FileRuleRepository, HttpLegitimacyProbe,
    JobAnalyzer, JobPosting, LegitimacyResult, LlmJudgment, LlmSettings, OutputFormat,
    RecordOutcome, RedFlagChecker, RedFlagDetector, RedFlagRule, RiskAggregator, RiskWeights,
    RuleKind, RuleRepository, ScamCheckResult, ScamContactStore, SignalBundle,
};
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_SCAM_DB: &str = "./data/scam_contacts.csv";
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(
    name = "job-guard",
    author,
    version,
    about = "Job posting fraud risk analyzer"
)]
struct Cli {
    /// Directory containing rule packs (keywords.txt, patterns.json); builtin rules when omitted
    #[arg(long = "rules-dir", value_name = "DIR", global = true)]
    rules_dir: Option<PathBuf>,

    /// CSV registry of reported scam contacts [default: ./data/scam_contacts.csv]
    #[arg(long = "scam-db", value_name = "PATH", global = true)]
    scam_db: Option<PathBuf>,

    /// Optional configuration file (TOML, YAML or JSON)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all loaded rules
    ListRules {
        /// Emit rules as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
    /// Aggregate already-collected signals into a risk assessment
    Score(ScoreArgs),
    /// Analyze a job posting read from a file or stdin
    Analyze(AnalyzeArgs),
    /// Record a scam contact in the registry
    ReportScam {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
}

#[derive(Args, Debug, Clone, Copy)]
struct FormatArgs {
    /// Emit JSON instead of human-readable text
    #[arg(long, conflicts_with = "yaml")]
    json: bool,
    /// Emit YAML instead of human-readable text
    #[arg(long)]
    yaml: bool,
}

impl FormatArgs {
    fn output_format(self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else if self.yaml {
            OutputFormat::Yaml
        } else {
            OutputFormat::Human
        }
    }
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Identifier of a triggered red flag (repeatable)
    #[arg(long = "red-flag", value_name = "ID")]
    red_flags: Vec<String>,
    /// Free-text reasoning returned by an LLM
    #[arg(long, value_name = "TEXT", default_value = "")]
    llm_reasoning: String,
    #[arg(long)]
    email_flagged: bool,
    #[arg(long)]
    phone_flagged: bool,
    #[arg(long)]
    website_exists: bool,
    #[arg(long)]
    linkedin_exists: bool,
    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Read the posting from this file instead of stdin
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
    /// `quick` skips the LLM; `detailed` asks the configured provider
    #[arg(long, value_name = "MODE", default_value = "quick")]
    mode: AnalysisMode,
    /// Company name, overriding the one found in the text
    #[arg(long)]
    company: Option<String>,
    /// Company website, overriding the one found in the text
    #[arg(long)]
    website: Option<String>,
    /// Contact email, overriding the one found in the text
    #[arg(long)]
    email: Option<String>,
    /// Contact phone, overriding the one found in the text
    #[arg(long)]
    phone: Option<String>,
    /// Skip the website and LinkedIn checks
    #[arg(long)]
    no_probe: bool,
    /// Timeout for each legitimacy request, e.g. `5s` or `1500ms`
    #[arg(long, value_name = "DURATION")]
    probe_timeout: Option<humantime::Duration>,
    #[command(flatten)]
    format: FormatArgs,
}

/// Settings read from `--config` and `JOB_GUARD_*` environment variables.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CliConfig {
    rules_dir: Option<PathBuf>,
    scam_db: Option<PathBuf>,
    probe_timeout: Option<String>,
    /// Custom sub-score weights; validated to sum to 100 on load.
    weights: Option<RiskWeights>,
    llm: LlmFileConfig,
}

impl CliConfig {
    fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(config::Environment::with_prefix("JOB_GUARD"))
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }

    fn probe_timeout(&self) -> Result<Option<Duration>> {
        self.probe_timeout
            .as_deref()
            .map(|raw| {
                humantime::parse_duration(raw)
                    .with_context(|| format!("invalid probe_timeout `{raw}`"))
            })
            .transpose()
    }

    fn aggregator(&self) -> RiskAggregator {
        RiskAggregator::new(self.weights.unwrap_or_default())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;
    let rules_dir = cli.rules_dir.or_else(|| config.rules_dir.clone());
    let scam_db = cli
        .scam_db
        .or_else(|| config.scam_db.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCAM_DB));
    debug!(?rules_dir, scam_db = %scam_db.display(), "resolved paths");

    match cli.command.unwrap_or(Commands::ListRules { json: false }) {
        Commands::ListRules { json } => list_rules(rules_dir.as_deref(), json).await?,
        Commands::Score(args) => score(args, config.aggregator())?,
        Commands::Analyze(args) => {
            analyze(args, rules_dir.as_deref(), &scam_db, &config).await?
        }
        Commands::ReportScam { email, phone } => {
            report_scam(&scam_db, email.as_deref(), phone.as_deref()).await?
        }
    }
    Ok(())
}

async fn load_rules(rules_dir: Option<&Path>) -> Result<Vec<RedFlagRule>> {
    match rules_dir {
        Some(dir) => FileRuleRepository::new(dir)
            .load_rules()
            .await
            .with_context(|| format!("failed to load rules from {}", dir.display())),
        None => BuiltinRuleRepository.load_rules().await,
    }
}

fn detector(rules_dir: Option<&Path>) -> Arc<dyn RedFlagDetector> {
    match rules_dir {
        Some(dir) => Arc::new(RedFlagChecker::new(Arc::new(FileRuleRepository::new(dir)))),
        None => Arc::new(RedFlagChecker::new(Arc::new(BuiltinRuleRepository))),
    }
}

async fn list_rules(rules_dir: Option<&Path>, json: bool) -> Result<()> {
    let mut rules = load_rules(rules_dir).await?;
    rules.sort_by(|a, b| a.id.cmp(&b.id));
    if json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
        return Ok(());
    }

    let source = rules_dir
        .map(|dir| dir.display().to_string())
        .unwrap_or_else(|| "builtin table".to_string());
    println!("{} rule(s) loaded from {source}", rules.len());
    for rule in rules {
        let kind = match rule.kind {
            RuleKind::Keyword => "keyword",
            RuleKind::Regex => "regex",
        };
        println!(
            "- {id:<34} [{kind:7}] :: {desc}",
            id = rule.id,
            kind = kind,
            desc = rule.description,
        );
    }
    Ok(())
}

fn score(args: ScoreArgs, aggregator: RiskAggregator) -> Result<()> {
    let signals = SignalBundle::neutral()
        .with_red_flags(args.red_flags)
        .with_llm(LlmJudgment::from_reasoning(args.llm_reasoning))
        .with_scam(ScamCheckResult {
            email_flagged: args.email_flagged,
            phone_flagged: args.phone_flagged,
        })
        .with_legitimacy(LegitimacyResult {
            website_exists: args.website_exists,
            linkedin_exists: args.linkedin_exists,
        });
    let assessment = aggregator.assess(&signals);
    emit(render_assessment(&assessment, args.format.output_format())?);
    Ok(())
}

async fn analyze(
    args: AnalyzeArgs,
    rules_dir: Option<&Path>,
    scam_db: &Path,
    config: &CliConfig,
) -> Result<()> {
    let text = read_posting(args.file.as_deref()).await?;
    let mut posting = JobPosting::from_text(text);
    if let Some(company) = args.company {
        posting = posting.with_company_name(company);
    }
    if let Some(website) = args.website {
        posting = posting.with_website(website);
    }
    if let Some(email) = args.email {
        posting = posting.with_email(email);
    }
    if let Some(phone) = args.phone {
        posting = posting.with_phone(phone);
    }

    let mut analyzer = JobAnalyzer::new(detector(rules_dir)).with_aggregator(config.aggregator());
    match CsvScamStore::open(scam_db) {
        Ok(store) => analyzer = analyzer.with_scam_store(Arc::new(store)),
        Err(err) => warn!(error = %format!("{err:#}"), "scam registry unavailable"),
    }

    if !args.no_probe {
        let timeout = match args.probe_timeout {
            Some(timeout) => timeout.into(),
            None => config.probe_timeout()?.unwrap_or(DEFAULT_PROBE_TIMEOUT),
        };
        let probe = HttpLegitimacyProbe::with_timeout(timeout)?;
        analyzer = analyzer.with_legitimacy_probe(Arc::new(probe));
    }

    if args.mode == AnalysisMode::Detailed {
        let settings = LlmSettings::from_env_and_file(&config.llm)
            .context("failed to load LLM settings")?;
        info!(provider = %settings.provider, "using LLM provider");
        analyzer = analyzer.with_llm(build_client(&settings)?);
    }

    let report = analyzer.analyze(&posting, args.mode).await?;
    emit(render_report(&report, args.format.output_format())?);
    Ok(())
}

async fn report_scam(scam_db: &Path, email: Option<&str>, phone: Option<&str>) -> Result<()> {
    let contact = validate_report(email, phone)?;
    let store = CsvScamStore::open(scam_db)?;
    let outcome = store
        .record(Some(contact.email.as_str()), Some(contact.phone.as_str()))
        .await?;
    match outcome {
        RecordOutcome::Added => println!("Added scam contact to {}", scam_db.display()),
        RecordOutcome::AlreadyKnown => {
            println!("Contact already present in {}", scam_db.display())
        }
    }
    Ok(())
}

async fn read_posting(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read posting from {}", path.display())),
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("failed to read posting from stdin")?;
            Ok(buffer)
        }
    }
}

fn emit(output: String) {
    if output.ends_with('\n') {
        print!("{output}");
    } else {
        println!("{output}");
    }
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tokio=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_flags_select_renderer() {
        let args = FormatArgs {
            json: false,
            yaml: true,
        };
        assert_eq!(args.output_format(), OutputFormat::Yaml);
        let args = FormatArgs {
            json: false,
            yaml: false,
        };
        assert_eq!(args.output_format(), OutputFormat::Human);
    }

    #[test]
    fn config_probe_timeout_uses_humantime() {
        let config = CliConfig {
            probe_timeout: Some("1500ms".into()),
            ..CliConfig::default()
        };
        assert_eq!(
            config.probe_timeout().unwrap(),
            Some(Duration::from_millis(1500))
        );
        let config = CliConfig {
            probe_timeout: Some("soon".into()),
            ..CliConfig::default()
        };
        assert!(config.probe_timeout().is_err());
    }

    #[test]
    fn cli_parses_global_paths_after_subcommand() {
        let cli = Cli::try_parse_from([
            "job-guard",
            "analyze",
            "--mode",
            "detailed",
            "--scam-db",
            "/tmp/scams.csv",
            "--no-probe",
        ])
        .unwrap();
        assert_eq!(cli.scam_db, Some(PathBuf::from("/tmp/scams.csv")));
        match cli.command {
            Some(Commands::Analyze(args)) => {
                assert_eq!(args.mode, AnalysisMode::Detailed);
                assert!(args.no_probe);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
