use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use vitals_fill::{Config, FillMode, Runner, StdoutNotifier, WatchOptions};

#[derive(Parser)]
#[command(name = "vitals-fill")]
#[command(about = "Fill vitals forms on browser pages from stored templates")]
#[command(version)]
struct Cli {
    /// Config file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Page to open (overrides target.url)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Run in headless mode (overrides config)
    #[arg(long, global = true)]
    headless: bool,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the config without opening a browser
    Check,
    /// Open the target page and report whether the vitals form is there
    Detect,
    /// Fill the vitals form from a stored template
    Fill {
        /// Template name
        template: String,
        /// Fill only the temperature and Prior rows
        #[arg(long)]
        partial: bool,
    },
    /// Keep the page open and surface the entry point whenever the form appears
    Watch {
        /// Template to fill when the form appears or the entry point is clicked
        #[arg(long, value_name = "TEMPLATE")]
        auto_fill: Option<String>,
        /// Fill only the temperature and Prior rows
        #[arg(long)]
        partial: bool,
    },
    /// List stored templates
    Templates,
    /// List saved snippets
    Snippets {
        /// Only snippets whose title or text contains this
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Serve the MCP tools over stdio
    Serve,
}

fn mode(partial: bool) -> FillMode {
    if partial {
        FillMode::Partial
    } else {
        FillMode::Full
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // MCP clients own stdout, so the server only logs errors
    let level = if cli.quiet || matches!(cli.command, Command::Serve) {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let mut config = match cli.config {
        Some(ref path) => Config::load(path)?,
        None => Config::default(),
    };
    if cli.headless {
        config.browser.headless = true;
    }
    if let Some(url) = cli.url {
        config.target = Some(vitals_fill::config::TargetUrl { url });
    }

    match cli.command {
        Command::Check => {
            println!("Config valid");
            match config.target {
                Some(ref target) => println!("  Target: {}", target.url),
                None => println!("  Target: (none)"),
            }
            match config.store.path {
                Some(ref path) => println!("  Store: {}", path.display()),
                None => println!("  Store: in memory"),
            }
            println!(
                "  Watch: first check after {}ms, debounce {}ms, poll {}ms",
                config.watch.initial_delay_ms, config.watch.debounce_ms, config.watch.poll_ms
            );
            if config.fill.require_signature {
                println!("  Fills require the form signature");
            }
        }
        Command::Detect => {
            let runner = Runner::new(&config).await?;
            runner.goto(config.target_url()?).await?;
            let detection = runner.detect().await?;
            if detection.detected {
                println!("✓ Vitals form detected on {}", detection.url);
                println!("  Signatures: {}", detection.matched.join(", "));
            } else {
                println!("✗ No vitals form on {}", detection.url);
            }
            runner.close().await?;
            if !detection.detected {
                std::process::exit(1);
            }
        }
        Command::Fill { template, partial } => {
            let mut runner = Runner::new(&config).await?;
            runner.set_notifier(Box::new(StdoutNotifier::detailed()));
            runner.goto(config.target_url()?).await?;
            let outcome = runner.fill(&template, mode(partial)).await?;
            if outcome.commit.missing > 0 {
                println!(
                    "  {} writes missed: the page changed during the fill",
                    outcome.commit.missing
                );
            }
            runner.close().await?;
            if outcome.report.filled() == 0 {
                std::process::exit(1);
            }
        }
        Command::Watch { auto_fill, partial } => {
            let mut runner = Runner::new(&config).await?;
            runner.set_notifier(Box::new(StdoutNotifier::default()));
            runner.goto(config.target_url()?).await?;
            let options = WatchOptions {
                auto_fill,
                mode: mode(partial),
            };
            println!("Watching {} (Ctrl+C to stop)", config.target_url()?);
            tokio::select! {
                result = vitals_fill::watch(&runner, &config.watch, &options) => result?,
                _ = tokio::signal::ctrl_c() => println!(),
            }
            runner.close().await?;
        }
        Command::Templates => {
            let store = vitals_fill::open_store(&config.store).await?;
            let templates = vitals_store::load_templates(store.as_ref()).await?;
            if templates.is_empty() {
                println!("No templates stored.");
            }
            for template in templates {
                println!("{}", template.name);
                println!("  {}", template.preview(FillMode::Full));
            }
        }
        Command::Snippets { search } => {
            let store = vitals_fill::open_store(&config.store).await?;
            let book = vitals_store::load_snippets(store.as_ref()).await?;
            let categories = vitals_store::load_categories(store.as_ref()).await?;
            let hits =
                vitals_store::search_snippets(&book, &categories, search.as_deref().unwrap_or(""));
            if hits.is_empty() {
                println!("No snippets found.");
            }
            for hit in hits {
                println!("[{}] {}", hit.category_label, hit.snippet.title);
                println!("  {}", hit.snippet.text);
            }
        }
        Command::Serve => {
            let store = vitals_fill::open_store(&config.store).await?;
            vitals_fill::mcp::run_server(config, store).await?;
        }
    }

    Ok(())
}
