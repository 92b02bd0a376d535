use facet::Facet;
use figue as args;
use linetrace::SessionConfig;

mod scenarios;

type AnyResult<T> = Result<T, String>;

#[derive(Facet, Debug)]
struct Cli {
    #[facet(flatten)]
    builtins: args::FigueBuiltins,
    /// Overrides LINETRACE_UPDATES_PER_SECOND.
    #[facet(args::named, default)]
    updates_per_second: Option<u32>,
    #[facet(args::named, default)]
    case_insensitive: bool,
    #[facet(args::subcommand)]
    command: CommandKind,
}

#[derive(Facet, Debug)]
#[repr(u8)]
enum CommandKind {
    Replay,
    Restart,
    StaleFile,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run() -> AnyResult<()> {
    let cli = parse_cli()?;
    let config = config_from_cli(&cli);

    match cli.command {
        CommandKind::Replay => scenarios::replay::run(config).await,
        CommandKind::Restart => scenarios::restart::run(config).await,
        CommandKind::StaleFile => scenarios::stale_file::run(config).await,
    }
}

fn parse_cli() -> AnyResult<Cli> {
    let figue_config = args::builder::<Cli>()
        .map_err(|e| format!("failed to build CLI schema: {e}"))?
        .cli(|cli| cli.strict())
        .help(|h| {
            h.program_name("linetrace-examples")
                .description("Drive a linetrace session with scripted programs")
                .version(option_env!("CARGO_PKG_VERSION").unwrap_or("dev"))
        })
        .build();

    args::Driver::new(figue_config)
        .run()
        .into_result()
        .map(|v| v.value)
        .map_err(|e| e.to_string())
}

fn config_from_cli(cli: &Cli) -> SessionConfig {
    let mut config = SessionConfig::from_env();
    if let Some(rate) = cli.updates_per_second {
        config.updates_per_second = rate;
    }
    if cli.case_insensitive {
        config.case_insensitive_paths = true;
    }
    config
}
