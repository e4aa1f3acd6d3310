//! jsoncompose - Main binary entry point

use jsoncompose::cli::args::{
    Command, ComposeArgs, GetArgs, LeavesArgs, Mode, ResolveArgs, parse_args,
};
use jsoncompose::cli::output::{format_error, format_json, format_leaves};
use jsoncompose::{ComposeOptions, Composer, Error, Pointer, ResolveOptions, WrapperKind};
use serde_json::Value;
use std::path::Path;
use std::process;
use std::sync::Arc;

fn main() {
    // Initialize logger (controlled by RUST_LOG environment variable)
    // Example: RUST_LOG=debug jsoncompose compose request.json
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return;
    }

    match args[1].as_str() {
        "--help" | "-h" => {
            print_help();
            return;
        }
        "--version" | "-v" => {
            print_version();
            return;
        }
        _ => {}
    }

    let cli_args = match parse_args(&args) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Use --help for usage information");
            process::exit(2);
        }
    };

    let result = match &cli_args.command {
        Command::Compose(compose_args) => handle_compose(compose_args),
        Command::Resolve(resolve_args) => handle_resolve(resolve_args),
        Command::Get(get_args) => handle_get(get_args),
        Command::Leaves(leaves_args) => handle_leaves(leaves_args),
    };

    if let Err(err) = result {
        eprintln!("{}", format_error(&err));
        process::exit(exit_code(&err));
    }
}

/// 4 for unreadable or unparsable input, 3 for everything else.
fn exit_code(err: &Error) -> i32 {
    match err.root_cause() {
        Error::Io { .. } | Error::Parse { .. } => 4,
        _ => 3,
    }
}

/// Relative directive paths resolve against the input file's directory.
fn base_dir_of(file: &str) -> Option<std::path::PathBuf> {
    Path::new(file)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

fn handle_compose(args: &ComposeArgs) -> jsoncompose::Result<()> {
    let opts = ComposeOptions {
        wrapper: args.wrapper,
        file_cache: args.cache,
        base_dir: base_dir_of(&args.file),
        ..ComposeOptions::default()
    };

    let Some(raw_pointer) = args.pointer.as_deref() else {
        let composed = jsoncompose::compose_file(&args.file, &opts)?;
        println!("{}", format_json(&composed, args.compact));
        return Ok(());
    };

    // Compose only one subtree; the rest of the document stays as written
    let pointer = Pointer::parse(raw_pointer)?;
    let content = jsoncompose::io::DataReader::default().read_path(Path::new(&args.file), None)?;
    let handlers = jsoncompose::HandlerRegistry::standard(
        Arc::new(jsoncompose::GeneratorRegistry::with_builtins()),
        Arc::new(jsoncompose::MatcherRegistry::with_builtins()),
        opts.file_cache,
        opts.base_dir.clone(),
    );
    let mut composer = Composer::new(opts.wrapper.wrap(content), handlers);
    composer.compose_at(&pointer)?;
    println!("{}", format_json(composer.content().get(&pointer)?, args.compact));
    Ok(())
}

fn handle_resolve(args: &ResolveArgs) -> jsoncompose::Result<()> {
    let opts = ResolveOptions {
        wrapper: args.wrapper,
        enable_cache: args.cache,
        base_dir: base_dir_of(&args.file),
    };
    let resolved = jsoncompose::resolve_file(&args.file, &opts)?;
    println!("{}", format_json(&resolved, args.compact));
    Ok(())
}

fn load(file: &str, mode: Mode) -> jsoncompose::Result<Value> {
    let base_dir = base_dir_of(file);
    match mode {
        Mode::Raw => jsoncompose::io::DataReader::default().read_path(Path::new(file), None),
        Mode::Compose => jsoncompose::compose_file(
            file,
            &ComposeOptions {
                base_dir,
                ..ComposeOptions::default()
            },
        ),
        Mode::Resolve => jsoncompose::resolve_file(
            file,
            &ResolveOptions {
                base_dir,
                ..ResolveOptions::default()
            },
        ),
    }
}

fn handle_get(args: &GetArgs) -> jsoncompose::Result<()> {
    let pointer = Pointer::parse(&args.pointer)?;
    let wrapper = WrapperKind::Direct.wrap(load(&args.file, args.mode)?);
    println!("{}", format_json(wrapper.get(&pointer)?, args.compact));
    Ok(())
}

fn handle_leaves(args: &LeavesArgs) -> jsoncompose::Result<()> {
    let wrapper = WrapperKind::Direct.wrap(load(&args.file, args.mode)?);
    let listing = format_leaves(wrapper.iterate());
    if !listing.is_empty() {
        println!("{listing}");
    }
    Ok(())
}

fn print_help() {
    println!("jsoncompose - Pointer-addressed JSON documents with directive composition");
    println!();
    println!("USAGE:");
    println!("    jsoncompose compose <FILE> [OPTIONS]");
    println!("    jsoncompose resolve <FILE> [OPTIONS]");
    println!("    jsoncompose get <FILE> <POINTER> [OPTIONS]");
    println!("    jsoncompose leaves <FILE> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    compose   Expand structured directives (!ref, !xref, !file, !include, !gen, !match)");
    println!("    resolve   Expand string directives (\"!ref /a/b\", \"!file path\")");
    println!("    get       Print the value at a JSON pointer");
    println!("    leaves    List every scalar leaf with its pointer");
    println!();
    println!("GLOBAL OPTIONS:");
    println!("    -h, --help                 Show this help message");
    println!("    -v, --version              Show version information");
    println!();
    println!("COMPOSE OPTIONS:");
    println!("    --wrapper <KIND>          Document backend: indexed (default) or direct");
    println!("    --cache                   Cache file contents per path");
    println!("    --pointer <P>             Compose and print only the subtree at P");
    println!("    --compact                 Print JSON on a single line");
    println!();
    println!("RESOLVE OPTIONS:");
    println!("    --wrapper <KIND>          Document backend: direct (default) or indexed");
    println!("    --cache                   Memoize resolved references and files");
    println!("    --compact                 Print JSON on a single line");
    println!();
    println!("GET / LEAVES OPTIONS:");
    println!("    --compose                 Compose the file before reading");
    println!("    --resolve                 Resolve string directives before reading");
    println!("    --compact                 Print JSON on a single line (get only)");
    println!();
    println!("EXIT CODES:");
    println!("    0 success, 2 usage error, 3 composition/resolution failure, 4 unreadable input");
    println!();
    println!("EXAMPLES:");
    println!("    jsoncompose compose fixtures/booking.json --cache");
    println!("    jsoncompose get fixtures/booking.json /bookingdates/checkin --compose");
    println!("    RUST_LOG=debug jsoncompose resolve payload.json --compact");
}

fn print_version() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_DATE: &str = env!("GIT_DATE");
    const BUILD_TARGET: &str = env!("BUILD_TARGET");

    println!("jsoncompose {VERSION}");
    println!("Commit: {GIT_HASH} ({GIT_DATE})");
    println!("Target: {BUILD_TARGET}");

    #[cfg(debug_assertions)]
    println!("Build: debug");
    #[cfg(not(debug_assertions))]
    println!("Build: release");
}
