use std::error::Error;
use std::path::PathBuf;

use atty::Stream;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use step_passage::{
    DisplayOption, ExtraVersions, InterlinearMode, PassageResolver, PassageState, SearchUrlState,
    StepConfig, VersionCatalog, build_search_url, normalize_bookmark_key, parse_query_into_state,
};
use termimad::{FmtText, MadSkin, terminal_size};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "step-passage",
    about = "Resolve STEP passage display state and search URLs",
    version
)]
pub struct Cli {
    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    /// JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON version catalog, overriding the configured one.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the interlinear mode to store for a set of versions.
    Resolve(PassageArgs),
    /// Print the passage location for a column.
    Path(PassageArgs),
    /// Build or parse search URLs.
    #[command(subcommand)]
    Url(UrlCommand),
    /// Normalize `|`-separated search arguments into a bookmark key.
    BookmarkKey {
        /// Raw arguments, e.g. `q=hello|version=NIV|version=ESV`.
        args: String,
    },
    /// Serve the HTTP API.
    #[cfg(feature = "web")]
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,
    },
}

#[derive(Args, Debug)]
struct PassageArgs {
    /// Column id.
    #[arg(long, default_value_t = 0)]
    id: u32,
    /// Primary version.
    #[arg(long = "primary", default_value = "KJV")]
    version: String,
    /// Scripture reference.
    #[arg(long, default_value = "Mat 1")]
    reference: String,
    /// Comma-separated comparison versions.
    #[arg(long, default_value = "")]
    extra: String,
    /// Requested interlinear mode, as a code or a display label.
    #[arg(long)]
    mode: Option<String>,
    /// Detail level: 0 hides comparison, 1 picks the best mode, 2 honours `--mode`.
    #[arg(long, default_value_t = 2)]
    detail: u8,
    /// Display option letters, e.g. `HVN`.
    #[arg(long, default_value = "")]
    options: String,
}

#[derive(Subcommand, Debug)]
enum UrlCommand {
    /// Build a search query string.
    Build {
        #[arg(long)]
        q: String,
        #[arg(long, default_value = "")]
        options: String,
        #[arg(long, default_value = "")]
        display: String,
        #[arg(long, default_value = "")]
        page: String,
        #[arg(long, default_value_t = 0)]
        context: u32,
        #[arg(long, default_value = "")]
        filter: String,
        #[arg(long, default_value = "")]
        sort: String,
        #[arg(long, default_value_t = 0)]
        pos: u32,
        /// Append the debug flag.
        #[arg(long)]
        debug: bool,
    },
    /// Parse a search query string into its recognised fields.
    Parse { query: String },
}

pub fn run() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => StepConfig::from_file(path)?,
        None => StepConfig::default(),
    };
    if cli.catalog.is_some() {
        config.catalog_path = cli.catalog.clone();
    }

    match cli.command {
        Command::Resolve(args) => {
            let catalog = config.load_catalog()?;
            handle_resolve(&catalog, args, cli.json)
        }
        Command::Path(args) => {
            let catalog = config.load_catalog()?;
            handle_path(&catalog, args, cli.json)
        }
        Command::Url(UrlCommand::Build {
            q,
            options,
            display,
            page,
            context,
            filter,
            sort,
            pos,
            debug,
        }) => {
            let state = SearchUrlState {
                query: q,
                options,
                display,
                page,
                context,
                filter,
                sort,
                position: pos,
            };
            handle_url_build(&state, debug || config.debug, cli.json)
        }
        Command::Url(UrlCommand::Parse { query }) => handle_url_parse(&query, cli.json),
        Command::BookmarkKey { args } => handle_bookmark_key(&args, cli.json),
        #[cfg(feature = "web")]
        Command::Serve { addr } => handle_serve(addr, config),
    }
}

const DEFAULT_LOG_FILTER: &str = "info";

fn init_tracing() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .with_writer(std::io::stderr)
        .try_init();
}

/// `RUST_LOG` directives when they parse, `info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Builds a column state from the arguments, normalizing the interlinear
/// fields the way a save would.
fn passage_from_args(
    resolver: &PassageResolver<'_>,
    args: PassageArgs,
) -> Result<PassageState, Box<dyn Error>> {
    PassageResolver::validate(
        args.mode
            .as_deref()
            .map(|mode| InterlinearMode::resolve(mode).map_or(mode, |resolved| resolved.code())),
    )?;
    let extra = ExtraVersions::parse(&args.extra);
    let (interlinear_mode, extra_versions) =
        resolver.normalize_for_save(&args.version, args.mode.as_deref(), &extra);
    Ok(PassageState {
        passage_id: args.id,
        version: args.version,
        reference: args.reference,
        extra_versions,
        interlinear_mode,
        detail_level: args.detail,
        options: args
            .options
            .chars()
            .filter_map(DisplayOption::from_initial)
            .map(DisplayOption::initial)
            .collect(),
        ..PassageState::default()
    })
}

fn handle_resolve(
    catalog: &VersionCatalog,
    args: PassageArgs,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let resolver = PassageResolver::new(catalog);
    let state = passage_from_args(&resolver, args)?;
    let effective = resolver.effective_interlinear_mode(&state);
    let options = resolver.available_interlinear_options(&state);
    let modes = resolver.display_mode_availability(&state);

    if as_json {
        let payload = json!({
            "version": state.version,
            "extraVersions": state.extra_versions,
            "storedInterlinearMode": state.interlinear_mode,
            "interlinearMode": effective,
            "interlinearLabel": resolver.localized_interlinear_mode(&state),
            "effectiveExtraVersions": resolver.effective_extra_versions(&state),
            "availableOptions": options,
            "displayModes": modes,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let available = options
        .iter()
        .map(|option| option.mode.code())
        .collect::<Vec<_>>()
        .join(", ");
    let display_options = state
        .options
        .iter()
        .filter_map(|initial| DisplayOption::from_initial(*initial))
        .map(DisplayOption::label)
        .collect::<Vec<_>>()
        .join(", ");
    let rows = [
        ("Version", state.version.clone()),
        ("Extra versions", state.extra_versions.joined()),
        ("Stored mode", state.interlinear_mode.to_string()),
        ("Effective mode", effective.to_string()),
        ("Display options", display_options),
        ("Available modes", available),
        ("Interlinear offered", modes.interlinear.to_string()),
        ("Compare offered", modes.compare.to_string()),
    ];
    print_table("Passage display", &rows);
    Ok(())
}

fn handle_path(
    catalog: &VersionCatalog,
    args: PassageArgs,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let resolver = PassageResolver::new(catalog);
    let state = passage_from_args(&resolver, args)?;
    let path = resolver.navigation_path(&state);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&json!({ "path": path }))?);
    } else {
        println!("{path}");
    }
    Ok(())
}

fn handle_url_build(state: &SearchUrlState, debug: bool, as_json: bool) -> Result<(), Box<dyn Error>> {
    let url = build_search_url(state, debug);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&json!({ "url": url }))?);
    } else {
        println!("{url}");
    }
    Ok(())
}

fn handle_url_parse(query: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let fields = parse_query_into_state(query);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&fields)?);
        return Ok(());
    }
    let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "<none>".to_string());
    let rows = [
        ("q", show(&fields.query)),
        ("options", show(&fields.options)),
        ("display", show(&fields.display)),
        ("page", show(&fields.page)),
        ("context", show(&fields.context)),
        ("qFilter", show(&fields.filter)),
        ("sort", show(&fields.sort)),
    ];
    print_table("Query fields", &rows);
    Ok(())
}

fn handle_bookmark_key(args: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let key = normalize_bookmark_key(args);
    if as_json {
        let payload = json!({ "args": args, "key": key });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{key}");
    }
    Ok(())
}

#[cfg(feature = "web")]
fn handle_serve(addr: std::net::SocketAddr, config: StepConfig) -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(step_passage::web::serve(step_passage::web::WebConfig {
        addr,
        step: config,
    }))?;
    Ok(())
}

fn print_table(title: &str, rows: &[(&str, String)]) {
    if stdout_is_tty() {
        let mut markdown = format!("**{title}**\n\n|:-|:-|\n");
        for (name, value) in rows {
            markdown.push_str(&format!("|{name}|{}|\n", escape_cell(value)));
        }
        markdown.push_str("|-|-|\n");
        let skin = MadSkin::default();
        println!("{}", FmtText::from(&skin, &markdown, Some(markdown_width())));
        return;
    }

    let width = rows
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0);
    println!("{title}:");
    for (name, value) in rows {
        println!("  {:<width$}  {}", name, value, width = width);
    }
}

fn escape_cell(value: &str) -> String {
    if value.is_empty() {
        return "-".to_string();
    }
    value.replace('|', "\\|")
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_defaults_to_info() {
        assert_eq!(log_filter(None).to_string(), "info");
        assert_eq!(log_filter(Some("step_passage=loud")).to_string(), "info");
        assert_eq!(
            log_filter(Some("step_passage=debug")).to_string(),
            "step_passage=debug"
        );
    }

    #[test]
    fn passage_args_drop_unknown_display_options() {
        let catalog = VersionCatalog::builtin();
        let resolver = PassageResolver::new(catalog);
        let args = PassageArgs {
            id: 0,
            version: "KJV".to_string(),
            reference: "John 3".to_string(),
            extra: "ESV".to_string(),
            mode: Some("Interlinear".to_string()),
            detail: 2,
            options: "hv?N".to_string(),
        };
        let state = passage_from_args(&resolver, args).unwrap();
        assert_eq!(state.options, vec!['H', 'V', 'N']);
        assert_eq!(state.interlinear_mode, InterlinearMode::Interlinear);
    }
}
