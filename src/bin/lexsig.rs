//! Command-line interface for lexsig
//! Tokenizes source files and lists the function signatures found in them.
//!
//! Usage:
//!   lexsig tokens `<path>` [--lang `<lang>`] [--format text|json]      - Dump the token stream
//!   lexsig signatures `<path>` [--lang `<lang>`] [--format `<format>`] - List signatures
//!   lexsig languages [--format text|json]                          - List registered languages
//!
//! Every subcommand takes `--config <file>`, layered over the defaults and `./lexsig.toml`.
//! `-` reads from stdin. Without `--lang` the language is guessed from the file name; unknown
//! languages fall back to plain text.

use clap::{Arg, ArgMatches, Command};
use lexsig::config::{LexsigConfig, Loader, USER_CONFIG_FILE};
use lexsig::formats::{FormatRegistry, MarkdownFormatter, Report};
use lexsig::registry::LanguageInfo;
use lexsig::{Error, Registry, RuleSet, Token};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "LEXSIG_LOG";

fn main() {
    init_logging();

    let matches = cli().get_matches();
    let result = match matches.subcommand() {
        Some(("tokens", sub)) => handle_tokens_command(sub),
        Some(("signatures", sub)) => handle_signatures_command(sub),
        Some(("languages", sub)) => handle_languages_command(sub),
        _ => unreachable!(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cli() -> Command {
    Command::new("lexsig")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Tokenize source code and extract function signatures")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("Configuration file layered over the built-in defaults"),
        )
        .subcommand(
            Command::new("tokens")
                .about("Print the token stream")
                .arg(path_arg())
                .arg(lang_arg())
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
        .subcommand(
            Command::new("signatures")
                .about("List function and method signatures")
                .arg(path_arg())
                .arg(lang_arg())
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format (text, markdown, json); defaults to output.format"),
                ),
        )
        .subcommand(
            Command::new("languages").about("List registered languages").arg(
                Arg::new("format")
                    .long("format")
                    .short('f')
                    .help("Output format")
                    .value_parser(["text", "json"])
                    .default_value("text"),
            ),
        )
}

fn path_arg() -> Arg {
    Arg::new("path")
        .help("Source file, or - for stdin")
        .required(true)
        .index(1)
}

fn lang_arg() -> Arg {
    Arg::new("lang")
        .long("lang")
        .short('l')
        .help("Language name or alias (guessed from the file name when omitted)")
}

/// `LEXSIG_LOG` takes an `EnvFilter` directive; the default is `warn`. Logs go to stderr.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(matches: &ArgMatches) -> Result<LexsigConfig, Error> {
    let loader = Loader::new().with_optional_file(USER_CONFIG_FILE);
    let loader = match matches.get_one::<String>("config") {
        Some(path) => loader.with_file(path),
        None => loader,
    };
    Ok(loader.build()?)
}

fn read_source(path: &str) -> Result<String, Error> {
    if path == "-" {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        return Ok(source);
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Pick the rule set for `path`, falling back to plain text.
fn select_rules(registry: &Registry, path: &str, lang: Option<&String>) -> Arc<RuleSet> {
    if let Some(lang) = lang {
        return registry.resolve_or_plain(lang);
    }
    let file_name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let guessed = registry
        .languages()
        .into_iter()
        .find(|info| info.filenames.iter().any(|glob| glob_matches(glob, &file_name)));
    match guessed {
        Some(info) => registry.resolve_or_plain(&info.name),
        None => {
            tracing::info!(path = %path, "no language matches the file name, using plain text");
            Registry::plain_text()
        }
    }
}

/// `*.ext` suffix globs and exact file names.
fn glob_matches(glob: &str, file_name: &str) -> bool {
    match glob.strip_prefix('*') {
        Some(suffix) => file_name.len() > suffix.len() && file_name.ends_with(suffix),
        None => glob == file_name,
    }
}

fn handle_tokens_command(matches: &ArgMatches) -> Result<(), Error> {
    let config = load_config(matches)?;
    let path = matches.get_one::<String>("path").unwrap();
    let format = matches.get_one::<String>("format").unwrap();

    let source = read_source(path)?;
    let rules = select_rules(Registry::global(), path, matches.get_one::<String>("lang"));
    let tokens: Vec<Token<'_>> = lexsig::tokenize_with(&source, &rules, config.lexer).collect();

    let formats = FormatRegistry::with_defaults();
    print!("{}", formats.get(format)?.tokens(&tokens)?);
    if format == "json" {
        println!();
    }
    Ok(())
}

fn handle_signatures_command(matches: &ArgMatches) -> Result<(), Error> {
    let config = load_config(matches)?;
    let path = matches.get_one::<String>("path").unwrap();
    let format = matches
        .get_one::<String>("format")
        .unwrap_or(&config.output.format);

    let source = read_source(path)?;
    let rules = select_rules(Registry::global(), path, matches.get_one::<String>("lang"));
    let tokens: Vec<Token<'_>> = lexsig::tokenize_with(&source, &rules, config.lexer).collect();
    let signatures =
        lexsig::extract_with(tokens.iter().copied(), rules.family(), config.extractor);

    let mut markdown = config.output.markdown.clone();
    if markdown.lang.is_empty() {
        markdown.lang = rules
            .aliases()
            .first()
            .cloned()
            .unwrap_or_else(|| rules.name().to_lowercase());
    }
    let mut formats = FormatRegistry::with_defaults();
    formats.register(MarkdownFormatter::new(markdown));

    let report = Report::new(rules.name(), &source, &signatures).with_tokens(&tokens);
    print!("{}", formats.get(format)?.signatures(&report)?);
    if format == "json" {
        println!();
    }
    Ok(())
}

fn handle_languages_command(matches: &ArgMatches) -> Result<(), Error> {
    // Listing ignores the settings; a broken `--config` is still an error.
    load_config(matches)?;
    let languages = Registry::global().languages();
    match matches.get_one::<String>("format").map(String::as_str) {
        Some("json") => {
            let json = serde_json::to_string_pretty(&languages)
                .map_err(lexsig::formats::FormatError::from)?;
            println!("{}", json);
        }
        _ => print_languages(&languages),
    }
    Ok(())
}

fn print_languages(languages: &[LanguageInfo]) {
    let width = languages.iter().map(|l| l.name.len()).max().unwrap_or(0);
    for language in languages {
        println!(
            "  {:<width$}  {:<13}  {}",
            language.name,
            language.family.name(),
            language.aliases.join(", "),
            width = width
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subcommand(args: &[&str]) -> ArgMatches {
        let matches = cli().try_get_matches_from(args).unwrap();
        matches.subcommand().unwrap().1.clone()
    }

    #[test]
    fn test_languages_reports_missing_config() {
        let sub = subcommand(&["lexsig", "--config", "/nonexistent/lexsig.toml", "languages"]);
        assert!(matches!(handle_languages_command(&sub), Err(Error::Config(_))));
    }

    #[test]
    fn test_config_is_accepted_after_the_subcommand() {
        let sub = subcommand(&["lexsig", "languages", "-c", "custom.toml", "--format", "json"]);
        assert_eq!(
            sub.get_one::<String>("config").map(String::as_str),
            Some("custom.toml")
        );
    }

    #[test]
    fn test_glob_matches() {
        assert!(glob_matches("*.rs", "main.rs"));
        assert!(!glob_matches("*.rs", ".rs"));
        assert!(glob_matches("Rakefile", "Rakefile"));
        assert!(!glob_matches("Rakefile", "Rakefile.bak"));
    }

    #[test]
    fn test_rules_are_guessed_from_the_file_name() {
        let registry = Registry::global();
        assert_eq!(select_rules(registry, "src/lib.rs", None).name(), "Rust");
        assert_eq!(select_rules(registry, "notes.xyz", None).name(), "Text");
        let lang = "python".to_string();
        assert_eq!(select_rules(registry, "-", Some(&lang)).name(), "Python");
    }
}
