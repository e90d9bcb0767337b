mod test_runner;

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use dcl::diagnostic::Diagnostics;
use loader::load_file;

const SUBCOMMANDS: &[&str] = &["check", "test", "help"];

#[derive(Parser)]
#[command(name = "dcl", version, about = "DCL configuration checker")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse and validate a DCL configuration file
    Check(CheckArgs),

    /// Run .test.dcl test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct CheckArgs {
    /// DCL source file to check
    file: String,

    /// Dump the parsed document
    #[arg(long)]
    ast: bool,

    /// List the providers with a provider_meta block
    #[arg(long)]
    list_providers: bool,

    /// Suppress the summary line (diagnostics are still printed)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.dcl file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    // Convenience: if the first positional arg is not a known subcommand,
    // inject "check" so `dcl file.dcl` works like `dcl check file.dcl`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(first_pos) = args.iter().skip(1).find(|a| !a.starts_with('-')) {
        let first_pos = first_pos.clone();
        if !SUBCOMMANDS.contains(&first_pos.as_str()) {
            let pos = args.iter().position(|a| *a == first_pos).unwrap();
            args.insert(pos, "check".to_string());
        }
    }

    let cli = Cli::parse_from(&args);

    match cli.command {
        Command::Check(check_args) => do_check(check_args, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn do_check(args: CheckArgs, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    // Read source
    let source = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.file, e);
            process::exit(1);
        }
    };

    // Set up codespan file database
    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());

    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();

    // Parse. A partial document comes back alongside any errors, so
    // loading still runs and the user sees every problem in one pass.
    let parser = dcl::parser::Parser::new(source, file_id);
    let (document, mut diags) = parser.parse();

    // --ast: dump the document without loading it
    if args.ast {
        println!("{:#?}", document);
        emit_diagnostics(&writer, &config, &files, &diags);
        if diags.has_errors() {
            process::exit(1);
        }
        return;
    }

    let (config_file, load_diags) = load_file(document);
    diags.extend(load_diags);

    emit_diagnostics(&writer, &config, &files, &diags);
    if diags.has_errors() {
        process::exit(1);
    }

    // --list-providers: print the decoded provider names
    if args.list_providers {
        for name in config_file.provider_metas.keys() {
            println!("{}", name);
        }
        return;
    }

    if !args.quiet {
        let count = config_file.provider_metas.len();
        eprintln!(
            "ok: {} is valid ({} provider_meta block{})",
            args.file,
            count,
            if count == 1 { "" } else { "s" }
        );
    }
}

fn emit_diagnostics(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    diagnostics: &Diagnostics,
) {
    for diag in diagnostics {
        let rendered = diag.to_diagnostic();
        let _ = term::emit_to_write_style(&mut writer.lock(), config, files, &rendered);
    }
}
