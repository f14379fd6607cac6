use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::{debug, LevelFilter};
use md_pdf::config::{self, ColorMode, ConfigSource, PageSize, Settings};
use md_pdf::pdf::ChromeRasterizer;
use md_pdf::{ConversionRequest, MdpError};
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;

#[derive(Debug)]
enum AppError {
    InputNotFound(String),
    InvalidConfig(String),
    ConversionError(String),
}

impl From<MdpError> for AppError {
    fn from(err: MdpError) -> Self {
        match err {
            MdpError::InputNotFound { .. } => AppError::InputNotFound(err.to_string()),
            MdpError::ConfigError { .. } => AppError::InvalidConfig(err.to_string()),
            other => AppError::ConversionError(other.to_string()),
        }
    }
}

impl AppError {
    /// The line printed to stderr before exiting with status 1.
    fn report(&self) -> String {
        match self {
            AppError::InputNotFound(msg) | AppError::InvalidConfig(msg) => format!("Error: {}", msg),
            AppError::ConversionError(msg) => format!("Conversion failed: {}", msg),
        }
    }
}

/// Verbosity level for output
#[derive(Debug, Clone, Copy, PartialEq)]
enum Verbosity {
    Quiet,   // Errors only
    Normal,  // Warnings and the success line
    Verbose, // Progress from the library
}

impl Verbosity {
    fn from_matches(matches: &ArgMatches) -> Self {
        if matches.get_flag("quiet") {
            Verbosity::Quiet
        } else if matches.get_flag("verbose") {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    fn level(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::Error,
            Verbosity::Normal => LevelFilter::Warn,
            Verbosity::Verbose => LevelFilter::Info,
        }
    }
}

/// Configures the process-wide logger. Called once, before any conversion.
///
/// The browser automation crate is chatty at info level, so it is held to
/// errors. `RUST_LOG` still overrides everything.
fn init_logging(verbosity: Verbosity) {
    env_logger::Builder::new()
        .filter_level(verbosity.level())
        .filter_module("headless_chrome", LevelFilter::Error)
        .parse_default_env()
        .format_timestamp_millis()
        .init();
}

fn build_cli() -> Command {
    Command::new("md-pdf")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert a Markdown file to a PDF with GitHub-like rendering")
        .after_help(
            "EXAMPLES:\n  \
            md-pdf README.md\n  \
            md-pdf notes.md -o notes.pdf --mode DARK --size A4 --margin 0.75\n  \
            md-pdf notes.md --html\n  \
            md-pdf notes.md -c md-pdf.toml --verbose\n",
        )
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .help("Path to the Markdown file")
                .value_parser(value_parser!(PathBuf))
                .required_unless_present("list-bundled-fonts"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT_PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Output file (defaults to the input path with a .pdf extension)"),
        )
        .arg(
            Arg::new("size")
                .long("size")
                .value_name("SIZE")
                .help("Page size: LETTER or A4 [default: LETTER]"),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .value_name("MODE")
                .help("Color theme: LIGHT or DARK [default: LIGHT]"),
        )
        .arg(
            Arg::new("margin")
                .long("margin")
                .value_name("INCHES")
                .value_parser(value_parser!(f64))
                .allow_negative_numbers(true)
                .help("Page margin in inches on all sides [default: 0.5]"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("CONFIG_FILE")
                .help("Path to configuration file (TOML format)"),
        )
        .arg(
            Arg::new("html")
                .long("html")
                .help("Write the assembled HTML document instead of a PDF (no browser needed)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Show conversion progress")
                .action(ArgAction::SetTrue)
                .conflicts_with("quiet"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress all output except errors")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
        .arg(
            Arg::new("list-bundled-fonts")
                .long("list-bundled-fonts")
                .help("List fonts compiled into the binary and exit")
                .action(ArgAction::SetTrue),
        )
}

/// Resolves settings: built-in defaults, then the `--config` file, then flags.
fn resolve_settings(matches: &ArgMatches) -> Result<Settings, AppError> {
    let mut settings = match matches.get_one::<String>("config") {
        Some(path) => config::load_config_from_source(ConfigSource::File(path))?,
        None => Settings::default(),
    };

    if let Some(mode) = matches.get_one::<String>("mode") {
        settings.mode = ColorMode::from_str(mode)?;
    }
    if let Some(size) = matches.get_one::<String>("size") {
        settings.page_size = PageSize::from_str(size)?;
    }
    if let Some(margin) = matches.get_one::<f64>("margin") {
        settings.margin_inches = config::validate_margin(*margin)?;
    }

    Ok(settings)
}

/// Returns `--output`, or the input path with its extension replaced.
fn get_output_path(matches: &ArgMatches, input: &Path, html: bool) -> PathBuf {
    matches
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or_else(|| input.with_extension(if html { "html" } else { "pdf" }))
}

/// Refuses to write the result over the Markdown source.
fn ensure_distinct(input: &Path, output: &Path) -> Result<(), AppError> {
    let same = match (input.canonicalize(), output.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => input == output,
    };
    if same {
        return Err(MdpError::ConfigError {
            message: format!("Output path is the same as the input: {}", output.display()),
            suggestion: "Pass a different path with -o/--output".to_string(),
        }
        .into());
    }
    Ok(())
}

fn list_bundled_fonts() -> Result<(), AppError> {
    for font in md_pdf::fonts::bundled_fonts()? {
        println!("{}\t{}", font.family, font.file_name);
    }
    Ok(())
}

fn run(matches: &ArgMatches, verbosity: Verbosity) -> Result<(), AppError> {
    if matches.get_flag("list-bundled-fonts") {
        return list_bundled_fonts();
    }

    let input = matches
        .get_one::<PathBuf>("input")
        .ok_or_else(|| AppError::ConversionError("No input file provided".to_string()))?;
    let settings = resolve_settings(matches)?;
    let html = matches.get_flag("html");
    let output = get_output_path(matches, input, html);
    ensure_distinct(input, &output)?;
    debug!("Resolved settings: {:?}", settings);

    let request = ConversionRequest::new(
        input,
        &output,
        settings.mode,
        settings.page_size,
        settings.margin_inches,
    )?;

    if html {
        let document = md_pdf::prepare(&request)?;
        md_pdf::pdf::write_output(&output, document.as_str().as_bytes())?;
    } else {
        md_pdf::convert_with(&request, &ChromeRasterizer::new(settings.chrome.clone()))?;
    }

    if verbosity != Verbosity::Quiet {
        let kind = if html { "HTML" } else { "PDF" };
        eprintln!("{} written to: {}", kind, output.display());
    }

    Ok(())
}

fn main() {
    let matches = build_cli().get_matches();
    let verbosity = Verbosity::from_matches(&matches);
    init_logging(verbosity);

    if let Err(e) = run(&matches, verbosity) {
        debug!("{:?}", e);
        eprintln!("{}", e.report());
        process::exit(1);
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;
    use std::fs;

    fn parse(args: &[&str]) -> ArgMatches {
        let mut argv = vec!["md-pdf"];
        argv.extend_from_slice(args);
        build_cli().try_get_matches_from(argv).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        build_cli().debug_assert();
    }

    #[test]
    fn default_output_replaces_extension() {
        let matches = parse(&["docs/report.md"]);
        let input = PathBuf::from("docs/report.md");
        assert_eq!(
            get_output_path(&matches, &input, false),
            PathBuf::from("docs/report.pdf")
        );
        assert_eq!(
            get_output_path(&matches, &input, true),
            PathBuf::from("docs/report.html")
        );
        assert_eq!(
            get_output_path(&matches, Path::new("notes"), false),
            PathBuf::from("notes.pdf")
        );
    }

    #[test]
    fn explicit_output_wins() {
        let matches = parse(&["report.md", "-o", "out/final.pdf"]);
        assert_eq!(
            get_output_path(&matches, Path::new("report.md"), false),
            PathBuf::from("out/final.pdf")
        );
    }

    #[test]
    fn html_output_over_html_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.html");
        fs::write(&input, "# Page\n").unwrap();

        let output = get_output_path(&parse(&["page.html"]), &input, true);
        let err = ensure_distinct(&input, &output).unwrap_err();
        assert!(matches!(err, AppError::InvalidConfig(_)));
        assert!(err.report().starts_with("Error: "));

        let aliased = dir.path().join(".").join("page.html");
        assert!(ensure_distinct(&input, &aliased).is_err());
        assert!(ensure_distinct(&input, &dir.path().join("page.pdf")).is_ok());
    }

    #[test]
    fn defaults_without_flags() {
        let settings = resolve_settings(&parse(&["a.md"])).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn flags_override_defaults() {
        let matches = parse(&["a.md", "--mode", "dark", "--size", "A4", "--margin", "1.25"]);
        let settings = resolve_settings(&matches).unwrap();
        assert_eq!(settings.mode, ColorMode::Dark);
        assert_eq!(settings.page_size, PageSize::A4);
        assert_eq!(settings.margin_inches, 1.25);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("md-pdf.toml");
        fs::write(&cfg, "mode = \"DARK\"\nsize = \"A4\"\nmargin = 1.0\n").unwrap();
        let cfg = cfg.to_str().unwrap();

        let settings = resolve_settings(&parse(&["a.md", "-c", cfg])).unwrap();
        assert_eq!(settings.mode, ColorMode::Dark);
        assert_eq!(settings.margin_inches, 1.0);

        let settings = resolve_settings(&parse(&["a.md", "-c", cfg, "--mode", "LIGHT"])).unwrap();
        assert_eq!(settings.mode, ColorMode::Light);
        assert_eq!(settings.page_size, PageSize::A4);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        for args in [
            &["a.md", "--mode", "SEPIA"][..],
            &["a.md", "--size", "TABLOID"][..],
            &["a.md", "--margin", "-1"][..],
        ] {
            let err = resolve_settings(&parse(args)).unwrap_err();
            assert!(matches!(err, AppError::InvalidConfig(_)), "{:?}", args);
            assert!(err.report().starts_with("Error: "));
        }
    }

    #[test]
    fn error_reports() {
        let missing = AppError::from(MdpError::InputNotFound {
            path: "nope.md".into(),
        });
        assert_eq!(missing.report(), "Error: Input file not found: nope.md");

        let failed = AppError::from(MdpError::pdf_error("browser crashed"));
        assert!(failed.report().starts_with("Conversion failed: "));
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(Verbosity::from_matches(&parse(&["a.md", "-q"])), Verbosity::Quiet);
        assert_eq!(Verbosity::from_matches(&parse(&["a.md", "-v"])), Verbosity::Verbose);
        assert_eq!(Verbosity::from_matches(&parse(&["a.md"])).level(), LevelFilter::Warn);
        assert!(build_cli()
            .try_get_matches_from(["md-pdf", "a.md", "-q", "-v"])
            .is_err());
    }

    #[test]
    fn list_fonts_needs_no_input() {
        let matches = parse(&["--list-bundled-fonts"]);
        assert!(matches.get_flag("list-bundled-fonts"));
        assert!(build_cli().try_get_matches_from(["md-pdf"]).is_err());
    }
}
