use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the field unit workspace",
    long_about = "A unified CLI for running the field unit, benchmarks,\n\
                  CI checks and packaging in the field unit workspace."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the field unit against a dispatch backend
    Run {
        /// Backend base URL including the API prefix
        #[arg(long, env = "FIELD_UNIT_BACKEND_URL")]
        backend_url: Option<String>,
        /// Vehicle id to register as
        #[arg(long, env = "FIELD_UNIT_VEHICLE_ID")]
        vehicle_id: Option<String>,
        /// Optional JSON config file
        #[arg(long)]
        config: Option<String>,
    },
    /// Run Criterion benchmarks
    Bench,
    /// Compare benchmarks: stash changes, create baseline, restore, compare
    BenchCompare,
    /// Run CI checks (fmt, clippy, tests, benchmarks)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Build the field unit and package it with a sample config
    Package {
        /// Compilation target triple for the field device
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for the binary
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Run benchmarks
    Bench,
    /// Run check + bench
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

const SAMPLE_CONFIG: &str = r#"{
  "vehicle": {
    "vehicle_id": "RICK001",
    "operator_name": "Abdul Karim",
    "phone_number": "01712345678"
  },
  "backend": {
    "base_url": "http://127.0.0.1:3000/api"
  },
  "motion": {
    "speed_kmh": 15.0
  }
}
"#;

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn git(args: &[&str]) -> ExitStatus {
    eprintln!("+ git {}", args.join(" "));
    Command::new("git")
        .args(args)
        .status()
        .expect("failed to execute git")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn run_git(args: &[&str]) {
    let status = git(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn binary_name(bin_name: &str, target: &str) -> String {
    if target.contains("windows") {
        format!("{bin_name}.exe")
    } else {
        bin_name.to_string()
    }
}

fn package_field_unit(target: &str, profile: BuildProfile) {
    step("Build field unit binary");
    let mut cargo_args = vec!["build", "-p", "field_unit", "--target", target];
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args);

    step("Package field unit archive");
    let binary_path = Path::new("target")
        .join(target)
        .join(profile.dir_name())
        .join(binary_name("field_unit", target));
    if !binary_path.exists() {
        panic!("expected field unit binary at '{}'", binary_path.display());
    }

    let dist_dir = Path::new("dist");
    fs::create_dir_all(dist_dir).expect("failed to create dist directory");
    let zip_path = dist_dir.join(format!("field_unit-{target}.zip"));

    let binary = fs::read(&binary_path).expect("failed to read field unit binary");
    let file = fs::File::create(&zip_path).expect("failed to create field unit zip");
    let mut zip = ZipWriter::new(file);
    let executable = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file(binary_name("field_unit", target), executable)
        .expect("failed to start binary entry");
    zip.write_all(&binary).expect("failed to write binary entry");

    let config = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    zip.start_file("field_unit.json", config)
        .expect("failed to start config entry");
    zip.write_all(SAMPLE_CONFIG.as_bytes())
        .expect("failed to write config entry");
    zip.finish().expect("failed to finish field unit zip");

    eprintln!("\nPackaged artifact:\n- {}", zip_path.display());
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test field_core");
    run_cargo(&["test", "-p", "field_core"]);

    step("Test field_unit");
    run_cargo(&["test", "-p", "field_unit"]);
}

fn ci_bench() {
    step("Run benchmarks");
    run_cargo(&["bench", "--package", "field_core", "--bench", "performance"]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            backend_url,
            vehicle_id,
            config,
        } => {
            let mut args = vec!["run".to_string(), "-p".into(), "field_unit".into(), "--".into()];
            if let Some(path) = config {
                args.extend(["--config".into(), path]);
            }
            if let Some(url) = backend_url {
                args.extend(["--backend-url".into(), url]);
            }
            if let Some(id) = vehicle_id {
                args.extend(["--vehicle-id".into(), id]);
            }
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            run_cargo(&args);
        }
        Commands::Bench => {
            run_cargo(&["bench", "--package", "field_core", "--bench", "performance"]);
        }
        Commands::BenchCompare => {
            let baseline_dir = Path::new("target/criterion");
            if baseline_dir.exists() {
                step("Removing existing benchmark data");
                std::fs::remove_dir_all(baseline_dir).expect("failed to remove target/criterion");
            }

            step("Stashing current changes");
            run_git(&[
                "stash",
                "push",
                "-m",
                "Temporary stash for benchmark comparison",
            ]);

            step("Running benchmark to create baseline");
            run_cargo(&[
                "bench",
                "--package",
                "field_core",
                "--bench",
                "performance",
                "--",
                "--save-baseline",
                "main",
            ]);

            step("Reapplying changes");
            run_git(&["stash", "pop"]);

            step("Running benchmark comparing against baseline");
            run_cargo(&[
                "bench",
                "--package",
                "field_core",
                "--bench",
                "performance",
                "--",
                "--baseline",
                "main",
            ]);

            eprintln!("\nDone! Check the output above to see performance comparison.");
        }
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::Bench => ci_bench(),
                CiJob::All => {
                    ci_check();
                    ci_bench();
                }
            }
            eprintln!("\nCI job passed.");
        }
        Commands::Package { target, profile } => {
            package_field_unit(&target, profile);
        }
    }
}
