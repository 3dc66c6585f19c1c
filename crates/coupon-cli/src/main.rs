use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use coupon_core::{
    Clock, CouponService, FixedClock, GeneratorConfig, Response, Result, SystemClock,
    parse_code, validate_code_format,
};
use serde_json::json;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(name = "coupon")]
#[command(about = "Generate and inspect coupon codes like CP2106-ABC123")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML file with default prefix, action, count and batch limits
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Stamp codes with this date (YYYY-MM-DD) instead of today
    #[arg(long, global = true, value_parser = parse_date)]
    date: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JSON request through the callback handler
    Handle {
        /// Request JSON; read from stdin when omitted
        request: Option<String>,
    },
    /// Generate one code, or a batch when --count is given
    Generate {
        /// Code prefix
        #[arg(long, short)]
        prefix: Option<String>,
        /// Number of unique codes to generate
        #[arg(long, short = 'n', allow_negative_numbers = true)]
        count: Option<i64>,
    },
    /// Check a code against the expected format
    Validate {
        /// Code to check
        code: String,
        /// Expected prefix
        #[arg(long, short)]
        prefix: Option<String>,
    },
    /// Split a code into prefix, date, letters and numbers
    Parse {
        /// Code to split
        code: String,
    },
    /// Run the sample single and batch requests
    Demo,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn run_command(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };

    match cli.date {
        Some(date) => dispatch(cli.command, config, FixedClock(date)),
        None => dispatch(cli.command, config, SystemClock),
    }
}

fn dispatch<C: Clock>(command: Commands, config: GeneratorConfig, clock: C) -> Result<ExitCode> {
    let mut service = CouponService::with_sources(config, clock, rand::rng());

    match command {
        Commands::Handle { request } => {
            let request = match request {
                Some(request) => request,
                None => io::read_to_string(io::stdin())?,
            };
            Ok(print_response(&service.respond(request)))
        }
        Commands::Generate { prefix, count } => {
            let prefix = prefix.unwrap_or_else(|| service.config().default_prefix.clone());
            let request = match count {
                Some(count) => {
                    json!({"action": "generate_multiple", "count": count, "prefix": prefix})
                }
                None => json!({"action": "generate_single", "prefix": prefix}),
            };
            Ok(print_response(&service.respond(request)))
        }
        Commands::Validate { code, prefix } => {
            let prefix = prefix.unwrap_or_else(|| service.config().default_prefix.clone());
            if validate_code_format(&code, &prefix) {
                println!("valid");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("invalid");
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Parse { code } => match parse_code(&code) {
            Ok(parsed) => {
                println!("{}", serde_json::to_string_pretty(&parsed)?);
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                Ok(ExitCode::FAILURE)
            }
        },
        Commands::Demo => {
            let single = service.respond(json!({"action": "generate_single", "prefix": "CP"}));
            println!("Результат для Salebot:");
            println!("{}", single.to_json());

            let multiple = service.respond(json!({
                "action": "generate_multiple",
                "count": 5,
                "prefix": "QR"
            }));
            println!("\nРезультат генерации нескольких кодов:");
            println!("{}", multiple.to_json());

            Ok(exit_code(single.is_success() && multiple.is_success()))
        }
    }
}

fn print_response(response: &Response) -> ExitCode {
    println!("{}", response.to_json());
    exit_code(response.is_success())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
