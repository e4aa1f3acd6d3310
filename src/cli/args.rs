//! CLI argument parsing

use crate::services::wrapper::WrapperKind;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub command: Command,
}

#[derive(Debug, Clone)]
pub enum Command {
    Compose(ComposeArgs),
    Resolve(ResolveArgs),
    Get(GetArgs),
    Leaves(LeavesArgs),
}

/// How a file is expanded before values are read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Read the file as is.
    #[default]
    Raw,
    /// Expand structured directives.
    Compose,
    /// Expand `!ref`/`!file` strings.
    Resolve,
}

#[derive(Debug, Clone)]
pub struct ComposeArgs {
    pub file: String,
    pub wrapper: WrapperKind,
    pub cache: bool,
    pub pointer: Option<String>,
    pub compact: bool,
}

#[derive(Debug, Clone)]
pub struct ResolveArgs {
    pub file: String,
    pub wrapper: WrapperKind,
    pub cache: bool,
    pub compact: bool,
}

#[derive(Debug, Clone)]
pub struct GetArgs {
    pub file: String,
    pub pointer: String,
    pub mode: Mode,
    pub compact: bool,
}

#[derive(Debug, Clone)]
pub struct LeavesArgs {
    pub file: String,
    pub mode: Mode,
}

impl Default for ComposeArgs {
    fn default() -> Self {
        Self {
            file: String::new(),
            wrapper: WrapperKind::Indexed,
            cache: false,
            pointer: None,
            compact: false,
        }
    }
}

/// Parse command line arguments
pub fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    if args.len() < 2 {
        return Err("No command specified".to_string());
    }

    let command = match args[1].as_str() {
        "compose" => Command::Compose(parse_compose_args(&args[2..])?),
        "resolve" => Command::Resolve(parse_resolve_args(&args[2..])?),
        "get" => Command::Get(parse_get_args(&args[2..])?),
        "leaves" => Command::Leaves(parse_leaves_args(&args[2..])?),
        _ => return Err(format!("Unknown command: {}", args[1])),
    };

    Ok(CliArgs { command })
}

fn next_value<'a>(
    args: &'a [String],
    i: &mut usize,
    flag: &str,
    what: &str,
) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires {what}"))
}

fn parse_wrapper(label: &str) -> Result<WrapperKind, String> {
    WrapperKind::from_str(label).map_err(|err| format!("{err} (use direct or indexed)"))
}

fn set_mode(mode: &mut Mode, requested: Mode) -> Result<(), String> {
    if *mode != Mode::Raw && *mode != requested {
        return Err("--compose and --resolve are mutually exclusive".to_string());
    }
    *mode = requested;
    Ok(())
}

fn parse_compose_args(args: &[String]) -> Result<ComposeArgs, String> {
    let mut compose_args = ComposeArgs::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--wrapper" => {
                let value = next_value(args, &mut i, "--wrapper", "a value")?;
                compose_args.wrapper = parse_wrapper(value)?;
            }
            "--pointer" => {
                let value = next_value(args, &mut i, "--pointer", "a value")?;
                compose_args.pointer = Some(value.to_string());
            }
            "--cache" => {
                compose_args.cache = true;
            }
            "--compact" => {
                compose_args.compact = true;
            }
            arg if !arg.starts_with("--") => {
                if compose_args.file.is_empty() {
                    compose_args.file = arg.to_string();
                } else {
                    return Err(format!("Unexpected argument: {arg}"));
                }
            }
            _ => return Err(format!("Unknown option: {}", args[i])),
        }
        i += 1;
    }

    if compose_args.file.is_empty() {
        return Err("Missing required argument: FILE".to_string());
    }

    Ok(compose_args)
}

fn parse_resolve_args(args: &[String]) -> Result<ResolveArgs, String> {
    let mut file = String::new();
    let mut wrapper = WrapperKind::Direct;
    let mut cache = false;
    let mut compact = false;
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--wrapper" => {
                wrapper = parse_wrapper(next_value(args, &mut i, "--wrapper", "a value")?)?;
            }
            "--cache" => {
                cache = true;
            }
            "--compact" => {
                compact = true;
            }
            arg if !arg.starts_with("--") => {
                if file.is_empty() {
                    file = arg.to_string();
                } else {
                    return Err(format!("Unexpected argument: {arg}"));
                }
            }
            _ => return Err(format!("Unknown option: {}", args[i])),
        }
        i += 1;
    }

    if file.is_empty() {
        return Err("Missing required argument: FILE".to_string());
    }

    Ok(ResolveArgs {
        file,
        wrapper,
        cache,
        compact,
    })
}

fn parse_get_args(args: &[String]) -> Result<GetArgs, String> {
    let mut positional: Vec<String> = Vec::new();
    let mut mode = Mode::Raw;
    let mut compact = false;

    for arg in args {
        match arg.as_str() {
            "--compose" => set_mode(&mut mode, Mode::Compose)?,
            "--resolve" => set_mode(&mut mode, Mode::Resolve)?,
            "--compact" => compact = true,
            // Pointers may legitimately be empty or start with "/", never with "--"
            other if !other.starts_with("--") => positional.push(other.to_string()),
            other => return Err(format!("Unknown option: {other}")),
        }
    }

    match <[String; 2]>::try_from(positional) {
        Ok([file, pointer]) => Ok(GetArgs {
            file,
            pointer,
            mode,
            compact,
        }),
        Err(positional) if positional.len() < 2 => {
            Err("Missing required arguments: FILE POINTER".to_string())
        }
        Err(positional) => Err(format!("Unexpected argument: {}", positional[2])),
    }
}

fn parse_leaves_args(args: &[String]) -> Result<LeavesArgs, String> {
    let mut file = String::new();
    let mut mode = Mode::Raw;

    for arg in args {
        match arg.as_str() {
            "--compose" => set_mode(&mut mode, Mode::Compose)?,
            "--resolve" => set_mode(&mut mode, Mode::Resolve)?,
            other if !other.starts_with("--") => {
                if file.is_empty() {
                    file = other.to_string();
                } else {
                    return Err(format!("Unexpected argument: {other}"));
                }
            }
            other => return Err(format!("Unknown option: {other}")),
        }
    }

    if file.is_empty() {
        return Err("Missing required argument: FILE".to_string());
    }

    Ok(LeavesArgs { file, mode })
}
