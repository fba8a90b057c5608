mod logic;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use logic::{LogicTester, expand_scenarios, get_scenario, list_scenarios, resolve_seed_inputs};
use shiai_game::{BoutConfig, RngStream, demo::random_roster, resolve_bout};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "shiai-tester",
    about = "Seed-sweep invariant checks for the Shiai bout and sponsorship engine"
)]
struct Args {
    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "all")]
    scenarios: String,

    /// List available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to sweep (comma-separated; decimal or 0x hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Iterations per seed; iteration `i` runs with `seed + i`
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Print per-iteration progress
    #[arg(short, long)]
    verbose: bool,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Fight one exhibition bout between two random demo warriors and exit
    #[arg(long)]
    demo: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;

    if args.demo {
        return run_demo(&args, seeds[0]);
    }

    let start_time = Instant::now();
    let scenarios = expand_scenarios(&args.scenarios);
    let results = run_logic_scenarios(&args, &scenarios, &seeds);

    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:15} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🥋 Shiai Engine Tester".bright_cyan().bold());
    println!("{}", "======================".cyan());
}

fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
) -> Vec<logic::ScenarioResult> {
    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let tester = LogicTester::new(args.verbose);
    let mut results = Vec::new();

    for scenario_name in scenarios {
        if let Some(scenario) = get_scenario(scenario_name) {
            results.extend(tester.run_scenario(scenario, seeds, args.iterations));
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }

    results
}

fn run_demo(args: &Args, seed: u64) -> Result<()> {
    let roster = random_roster(2);
    let (east, west) = match roster.as_slice() {
        [east, west] => (east, west),
        _ => anyhow::bail!("demo roster came back short"),
    };
    let cfg = BoutConfig::load_from_static();
    let outcome = resolve_bout(east, west, &cfg, &mut RngStream::from_user_seed(seed))
        .context("demo bout failed")?;

    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(
        output_target,
        "{} ({}) vs {} ({}), seed {seed}",
        east.name, east.plan.style, west.name, west.plan.style
    )?;
    for event in outcome.events() {
        writeln!(output_target, "  [{:>2}] {}", event.minute(), event.text())?;
    }
    let verdict = outcome
        .winner_id()
        .map_or_else(|| String::from("no winner"), |id| format!("winner {id}"));
    writeln!(
        output_target,
        "Result: {} after {} minutes, {verdict}",
        outcome.method(),
        outcome.minutes()
    )?;
    output_target.flush_inner()?;
    Ok(())
}

fn write_reports(
    args: &Args,
    results: &[logic::ScenarioResult],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut output_target, results)?;
            }
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Shiai Logic Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No logic scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(
                &mut output_target,
                "🏁 Total time: {:?}",
                start_time.elapsed()
            )?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::ScenarioResult;
    use std::time::Duration;

    fn base_args() -> Args {
        Args {
            scenarios: "all".to_string(),
            list_scenarios: false,
            seeds: "1337".to_string(),
            iterations: 1,
            report: "json".to_string(),
            verbose: false,
            output: None,
            demo: false,
        }
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("shiai-tester-{}-{name}", std::process::id()))
    }

    fn sample_result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "meta".to_string(),
            seed: 42,
            passed,
            iterations_run: 2,
            successful_iterations: if passed { 2 } else { 1 },
            failures: if passed {
                Vec::new()
            } else {
                vec!["failure".to_string()]
            },
            average_duration: Duration::from_millis(3),
            performance_data: vec![Duration::from_millis(3)],
        }
    }

    #[test]
    fn parses_cli_flags() {
        let args = Args::try_parse_from([
            "shiai-tester",
            "--scenarios",
            "determinism,meta",
            "--seeds",
            "1,0x2",
            "--iterations",
            "3",
            "--report",
            "markdown",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.scenarios, "determinism,meta");
        assert_eq!(args.iterations, 3);
        assert_eq!(args.report, "markdown");
        assert!(args.verbose);
        assert!(Args::try_parse_from(["shiai-tester", "--report", "csv"]).is_err());
    }

    #[test]
    fn split_csv_trims_and_filters() {
        assert_eq!(split_csv(" 1, ,0x2 "), vec!["1", "0x2"]);
    }

    #[test]
    fn run_logic_scenarios_skips_unknown_names() {
        let args = base_args();
        let results = run_logic_scenarios(
            &args,
            &["weather".to_string(), "duration".to_string()],
            &[7],
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].scenario_name, "duration");
        assert!(results[0].passed);
    }

    #[test]
    fn write_reports_emits_json_for_results() {
        let temp = temp_file("report.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(true)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("\"scenario_name\": \"meta\""));
    }

    #[test]
    fn write_reports_markdown_empty_results() {
        let temp = temp_file("empty.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("_No scenarios executed._"));
    }

    #[test]
    fn write_reports_console_includes_failures() {
        let temp = temp_file("console.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(false)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("failure"));
        assert!(content.contains("Total time"));
    }

    #[test]
    fn maybe_list_scenarios_writes_output() {
        let temp = temp_file("scenarios.txt");
        let args = Args {
            list_scenarios: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available scenarios"));
        assert!(content.contains("allocation"));
        assert!(!maybe_list_scenarios(&base_args()).unwrap());
    }

    #[test]
    fn demo_writes_a_bout_log() {
        let temp = temp_file("demo.txt");
        let args = Args {
            demo: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        run_demo(&args, 9).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains(" vs "));
        assert!(content.contains("Result: "));
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}
