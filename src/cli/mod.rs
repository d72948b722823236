//! DP-050: CLI subcommands: init, validate, schema, check, request, exec, repeat, apps.

use crate::automation::recording::RecordingSurface;
use crate::automation::xdo::XdoSurface;
use crate::automation::AutomationSurface;
use crate::catalog::LaunchCatalog;
use crate::core::config::{self, DeskplanConfig};
use crate::core::context::PlannerContext;
use crate::core::executor::{self, ExecConfig};
use crate::core::guardrails::validate_guardrails;
use crate::core::orchestrator::{Notifier, Orchestrator};
use crate::core::parser::parse_plan;
use crate::core::prompt::schema_text;
use crate::core::state::{PendingPlan, Session};
use crate::core::sync::MonotonicClock;
use crate::core::types::Plan;
use crate::transport;
use clap::Subcommand;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new deskplan configuration
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate deskplan.yaml
    Validate {
        /// Path to deskplan.yaml (default: --config)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Print the action schema given to the planner
    Schema,

    /// Parse and guardrail-check a plan file without running it
    Check {
        /// Plan JSON file
        plan: PathBuf,
    },

    /// Plan a natural-language request, preview it, then run on confirmation
    Request {
        /// What to do, e.g. "open firefox and go to example.com"
        text: String,

        /// Model name (default: from config)
        #[arg(short, long)]
        model: Option<String>,

        /// Run without asking for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Record automation calls instead of performing them
        #[arg(long)]
        dry_run: bool,

        /// Also write the plan JSON to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Run a plan file
    Exec {
        /// Plan JSON file
        plan: PathBuf,

        /// Record automation calls instead of performing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Re-run the last confirmed plan
    Repeat {
        /// Run without asking for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Record automation calls instead of performing them
        #[arg(long)]
        dry_run: bool,
    },

    /// List launchable applications, ranked by an optional query
    Apps {
        /// Ranking query
        #[arg(default_value = "")]
        query: String,

        /// Maximum entries to print
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

/// Options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub config: PathBuf,
    pub debug: bool,
}

/// Prints notifications to stderr.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str) {
        eprintln!("{}", message);
    }
}

/// Answer to the preview prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Run,
    Copy,
    Cancel,
}

/// `y`/`yes` runs, `c`/`copy` prints the plan JSON, anything else cancels.
pub fn parse_decision(answer: &str) -> Decision {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Decision::Run,
        "c" | "copy" => Decision::Copy,
        _ => Decision::Cancel,
    }
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands, opts: &GlobalOptions) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(file.as_deref().unwrap_or(&opts.config)),
        Commands::Schema => {
            println!("{}", schema_text());
            Ok(())
        }
        Commands::Check { plan } => cmd_check(opts, &plan),
        Commands::Request {
            text,
            model,
            yes,
            dry_run,
            out,
        } => cmd_request(opts, &text, model.as_deref(), yes, dry_run, out.as_deref()),
        Commands::Exec { plan, dry_run } => cmd_exec(opts, &plan, dry_run),
        Commands::Repeat { yes, dry_run } => cmd_repeat(opts, yes, dry_run),
        Commands::Apps { query, limit } => cmd_apps(opts, &query, limit),
    }
}

const CONFIG_TEMPLATE: &str = r#"# deskplan configuration
model: gpt-4o-mini
# api (OpenAI-compatible HTTP) or llm (llm command-line tool)
endpoint: api
api:
  url: https://api.openai.com/v1
  key_env: OPENAI_API_KEY
  timeout_secs: 60
llm:
  command: llm
debug: false
state_dir: state

guardrails:
  max_steps: 12
  max_total_sleep_ms: 2000
  max_insert_chars: 500

sync:
  app_focus_timeout_ms: 3500
  step_settle_ms: 180
  poll_interval_ms: 100
"#;

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join(config::CONFIG_FILE);
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }

    let state_dir = path.join("state");
    std::fs::create_dir_all(&state_dir).map_err(|e| format!("cannot create state dir: {}", e))?;
    std::fs::write(&config_path, CONFIG_TEMPLATE)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    println!("Initialized deskplan at {}", path.display());
    println!("  Created: {}", config_path.display());
    println!("  Created: {}/", state_dir.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let config = config::parse_config_file(file)?;
    let errors = config::validate_config(&config);

    if errors.is_empty() {
        println!(
            "OK: {} via {} (max {} steps)",
            config.model, config.endpoint, config.guardrails.max_steps
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

/// Load the config (defaults if absent), apply `--debug`, and validate.
fn load_and_validate(opts: &GlobalOptions) -> Result<DeskplanConfig, String> {
    let mut config = config::load_config(&opts.config)?;
    config.debug |= opts.debug;
    let errors = config::validate_config(&config);
    if errors.is_empty() {
        return Ok(config);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err("validation failed".to_string())
}

/// Read, parse and guardrail-check a plan file.
fn load_plan_file(config: &DeskplanConfig, path: &Path) -> Result<Plan, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    let plan = parse_plan(&raw).map_err(|e| {
        for msg in &e.errors {
            eprintln!("  ERROR: {}", msg);
        }
        format!("{} is not a valid plan", path.display())
    })?;
    validate_guardrails(&plan, &config.guardrails).map_err(|e| {
        for msg in &e.errors {
            eprintln!("  ERROR: {}", msg);
        }
        format!("{} violates guardrails", path.display())
    })?;
    Ok(plan)
}

fn cmd_check(opts: &GlobalOptions, path: &Path) -> Result<(), String> {
    let config = load_and_validate(opts)?;
    let plan = load_plan_file(&config, path)?;
    match plan.summary() {
        Some(summary) => println!("OK: {} steps ({})", plan.len(), summary),
        None => println!("OK: {} steps", plan.len()),
    }
    Ok(())
}

/// Human-readable preview of a pending plan.
pub fn format_preview(pending: &PendingPlan) -> String {
    let mut lines = vec![format!("Plan for: {}", pending.request)];
    if let Some(summary) = pending.plan.summary() {
        lines.push(format!("Summary: {}", summary));
    }
    for (i, step) in pending.plan.steps().iter().enumerate() {
        lines.push(format!("  {}. {}", i + 1, step));
    }
    lines.join("\n")
}

fn ask_decision(input: &mut dyn BufRead) -> Result<Decision, String> {
    print!("Run this plan? [y]es / [c]opy JSON / [n]o: ");
    std::io::stdout()
        .flush()
        .map_err(|e| format!("stdout error: {}", e))?;
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .map_err(|e| format!("stdin error: {}", e))?;
    Ok(parse_decision(&answer))
}

/// Shared state for commands that drive the orchestrator.
struct Runtime {
    config: DeskplanConfig,
    catalog: LaunchCatalog,
    session: Session,
    transport: Box<dyn transport::CompletionTransport>,
}

impl Runtime {
    fn load(opts: &GlobalOptions) -> Result<Self, String> {
        let config = load_and_validate(opts)?;
        let transport = transport::route(&config).map_err(|e| e.to_string())?;
        let session = Session::load(&config.state_dir).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable last plan");
            Session::new()
        });
        let catalog = LaunchCatalog::new(&config.catalog);
        Ok(Self {
            config,
            catalog,
            session,
            transport,
        })
    }

    /// Preview, confirm, then run or copy or cancel the pending plan.
    fn confirm_and_run(
        &mut self,
        notifier: &dyn Notifier,
        yes: bool,
        dry_run: bool,
        input: &mut dyn BufRead,
    ) -> Result<(), String> {
        let Some(pending) = self.session.pending() else {
            return Ok(());
        };
        println!("{}", format_preview(pending));

        let decision = if yes { Decision::Run } else { ask_decision(input)? };
        let orch = Orchestrator::new(&self.config, self.transport.as_ref(), notifier)
            .with_state_dir(&self.config.state_dir);

        match decision {
            Decision::Cancel => {
                orch.cancel_pending(&mut self.session);
                Ok(())
            }
            Decision::Copy => {
                if let Some(json) = orch.copy_pending(&self.session) {
                    println!("{}", json);
                }
                Ok(())
            }
            Decision::Run if dry_run => {
                let pending = self.session.pending().cloned();
                if let Some(pending) = pending {
                    dry_run_plan(&self.config, &self.catalog, &pending.plan)?;
                }
                Ok(())
            }
            Decision::Run => {
                let clock = MonotonicClock::new();
                let exec = ExecConfig {
                    resolver: &self.catalog,
                    sync: &self.config.sync,
                    clock: &clock,
                };
                let mut surface = XdoSurface::default();
                orch.run_pending(&mut self.session, &mut surface, &exec)
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            }
        }
    }
}

/// Run `plan` against a recording surface and print every call.
fn dry_run_plan(config: &DeskplanConfig, catalog: &LaunchCatalog, plan: &Plan) -> Result<(), String> {
    let clock = MonotonicClock::new();
    let exec = ExecConfig {
        resolver: catalog,
        sync: &config.sync,
        clock: &clock,
    };
    let mut surface = RecordingSurface::new();
    let result = executor::execute(plan, &mut surface, &exec);
    println!("Dry run ({} calls):", surface.calls().len());
    for call in surface.calls() {
        println!("  {}", call);
    }
    result.map_err(|e| e.to_string())
}

fn cmd_request(
    opts: &GlobalOptions,
    text: &str,
    model: Option<&str>,
    yes: bool,
    dry_run: bool,
    out: Option<&Path>,
) -> Result<(), String> {
    let mut rt = Runtime::load(opts)?;
    let notifier = TerminalNotifier;
    let model = model.unwrap_or(rt.config.model.as_str()).to_string();

    let generated = {
        let orch = Orchestrator::new(&rt.config, rt.transport.as_ref(), &notifier)
            .with_state_dir(&rt.config.state_dir);
        let desktop = XdoSurface::default();
        let context = PlannerContext::new(desktop.windowing(), &rt.catalog);
        orch.generate(&mut rt.session, &context, text, &model)
            .map_err(|e| e.to_string())?
    };
    if generated.is_none() {
        return Ok(());
    }

    if let (Some(path), Some(pending)) = (out, rt.session.pending()) {
        std::fs::write(path, pending.to_json())
            .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
        println!("Wrote {}", path.display());
    }

    let stdin = std::io::stdin();
    rt.confirm_and_run(&notifier, yes, dry_run, &mut stdin.lock())
}

fn cmd_exec(opts: &GlobalOptions, path: &Path, dry_run: bool) -> Result<(), String> {
    let mut rt = Runtime::load(opts)?;
    let plan = load_plan_file(&rt.config, path)?;
    if dry_run {
        return dry_run_plan(&rt.config, &rt.catalog, &plan);
    }
    rt.session
        .set_pending(&format!("exec {}", path.display()), plan);
    rt.confirm_and_run(&TerminalNotifier, true, false, &mut std::io::empty())
}

fn cmd_repeat(opts: &GlobalOptions, yes: bool, dry_run: bool) -> Result<(), String> {
    let mut rt = Runtime::load(opts)?;
    let notifier = TerminalNotifier;
    let repeated = {
        let orch = Orchestrator::new(&rt.config, rt.transport.as_ref(), &notifier);
        orch.repeat_last(&mut rt.session)
    };
    if !repeated {
        return Err("no last confirmed plan".to_string());
    }
    let stdin = std::io::stdin();
    rt.confirm_and_run(&notifier, yes, dry_run, &mut stdin.lock())
}

fn cmd_apps(opts: &GlobalOptions, query: &str, limit: usize) -> Result<(), String> {
    let config = load_and_validate(opts)?;
    let catalog = LaunchCatalog::new(&config.catalog);
    let entries = catalog.ranked(query, limit);
    if entries.is_empty() {
        println!("No launchable apps found");
        return Ok(());
    }
    for entry in entries {
        println!("{} => {}", entry.name, entry.command);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state;

    fn opts_in(dir: &Path) -> GlobalOptions {
        GlobalOptions {
            config: dir.join(config::CONFIG_FILE),
            debug: false,
        }
    }

    /// Config whose state lives inside `dir`.
    fn write_config(dir: &Path) -> GlobalOptions {
        let yaml = format!(
            "endpoint: llm\nstate_dir: {}\ncatalog:\n  desktop_dirs: []\n",
            dir.join("state").display()
        );
        std::fs::write(dir.join(config::CONFIG_FILE), yaml).unwrap();
        opts_in(dir)
    }

    fn write_plan(dir: &Path, json: &str) -> PathBuf {
        let path = dir.join("plan.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_dp050_init() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("project");
        std::fs::create_dir_all(&sub).unwrap();
        cmd_init(&sub).unwrap();
        assert!(sub.join("deskplan.yaml").exists());
        assert!(sub.join("state").is_dir());
        cmd_validate(&sub.join("deskplan.yaml")).unwrap();
    }

    #[test]
    fn test_dp050_init_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("deskplan.yaml"), "exists").unwrap();
        assert!(cmd_init(dir.path()).is_err());
    }

    #[test]
    fn test_dp050_template_matches_defaults() {
        let parsed = config::parse_config(CONFIG_TEMPLATE).unwrap();
        assert_eq!(parsed, DeskplanConfig::default());
    }

    #[test]
    fn test_dp050_validate_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deskplan.yaml");
        std::fs::write(&path, "endpoint: smoke-signals\nguardrails:\n  max_steps: 0\n").unwrap();
        let err = cmd_validate(&path).unwrap_err();
        assert_eq!(err, "2 validation error(s)");
    }

    #[test]
    fn test_dp050_check_valid_plan() {
        let dir = tempfile::tempdir().unwrap();
        let opts = write_config(dir.path());
        let plan = write_plan(
            dir.path(),
            r#"{"steps":[{"action":"copy","args":{}}],"summary":"copy"}"#,
        );
        cmd_check(&opts, &plan).unwrap();
    }

    #[test]
    fn test_dp050_check_rejects_blocked_combo() {
        let dir = tempfile::tempdir().unwrap();
        let opts = write_config(dir.path());
        let plan = write_plan(dir.path(), r#"{"steps":[{"action":"key","args":{"combo":"ctrl-q"}}]}"#);
        let err = cmd_check(&opts, &plan).unwrap_err();
        assert!(err.contains("violates guardrails"));
    }

    #[test]
    fn test_dp050_check_rejects_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let opts = write_config(dir.path());
        let plan = write_plan(dir.path(), r#"{"steps":"nope"}"#);
        let err = cmd_check(&opts, &plan).unwrap_err();
        assert!(err.contains("is not a valid plan"));
    }

    #[test]
    fn test_dp050_exec_dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let opts = write_config(dir.path());
        let plan = write_plan(
            dir.path(),
            r#"{"steps":[{"action":"go_url","args":{"url":"https://example.com"}}]}"#,
        );
        cmd_exec(&opts, &plan, true).unwrap();
        assert!(!state::last_plan_path(&dir.path().join("state")).exists());
    }

    #[test]
    fn test_dp050_corrupt_last_plan_starts_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let opts = write_config(dir.path());
        let state_dir = dir.path().join("state");
        std::fs::create_dir_all(&state_dir).unwrap();
        std::fs::write(state::last_plan_path(&state_dir), "{not json").unwrap();

        let rt = Runtime::load(&opts).unwrap();
        assert_eq!(rt.session, Session::new());

        let plan = write_plan(
            dir.path(),
            r#"{"steps":[{"action":"copy","args":{}}]}"#,
        );
        cmd_exec(&opts, &plan, true).unwrap();
        assert_eq!(cmd_repeat(&opts, true, true).unwrap_err(), "no last confirmed plan");
    }

    #[test]
    fn test_dp050_repeat_without_history() {
        let dir = tempfile::tempdir().unwrap();
        let opts = write_config(dir.path());
        let err = cmd_repeat(&opts, true, true).unwrap_err();
        assert_eq!(err, "no last confirmed plan");
    }

    #[test]
    fn test_dp050_parse_decision() {
        assert_eq!(parse_decision("y\n"), Decision::Run);
        assert_eq!(parse_decision(" YES "), Decision::Run);
        assert_eq!(parse_decision("c"), Decision::Copy);
        assert_eq!(parse_decision("n"), Decision::Cancel);
        assert_eq!(parse_decision(""), Decision::Cancel);
    }

    #[test]
    fn test_dp050_format_preview() {
        let pending = PendingPlan {
            request: "open site".to_string(),
            plan: parse_plan(
                r#"{"steps":[{"action":"switch_app","args":{"app_name":"Firefox"}},{"action":"sleep","args":{"ms":100}}],"summary":"open it"}"#,
            )
            .unwrap(),
        };
        assert_eq!(
            format_preview(&pending),
            "Plan for: open site\nSummary: open it\n  1. switch_app(app_name=\"Firefox\")\n  2. sleep(ms=100)"
        );
    }

    #[test]
    fn test_dp050_confirm_cancel_and_copy() {
        let dir = tempfile::tempdir().unwrap();
        let opts = write_config(dir.path());
        let mut rt = Runtime::load(&opts).unwrap();
        let plan = parse_plan(r#"{"steps":[{"action":"copy","args":{}}]}"#).unwrap();

        rt.session.set_pending("copy", plan.clone());
        rt.confirm_and_run(&TerminalNotifier, false, false, &mut "c\n".as_bytes())
            .unwrap();
        assert!(rt.session.pending().is_some());

        rt.confirm_and_run(&TerminalNotifier, false, false, &mut "n\n".as_bytes())
            .unwrap();
        assert!(rt.session.pending().is_none());
        assert!(rt.session.last_confirmed().is_none());
    }

    #[test]
    fn test_dp050_confirm_dry_run_keeps_history_clean() {
        let dir = tempfile::tempdir().unwrap();
        let opts = write_config(dir.path());
        let mut rt = Runtime::load(&opts).unwrap();
        let plan = parse_plan(r#"{"steps":[{"action":"paste","args":{}}]}"#).unwrap();
        rt.session.set_pending("paste", plan);
        rt.confirm_and_run(&TerminalNotifier, true, true, &mut std::io::empty())
            .unwrap();
        assert!(rt.session.last_confirmed().is_none());
        assert!(!state::last_plan_path(&dir.path().join("state")).exists());
    }
}
