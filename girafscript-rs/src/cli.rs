//! Command-line argument parsing.
//!
//! Usage:
//!   girafscript [-f[<file>]] [-D<name>=<value>]… [-e<text>] [-d] [<input>]

use std::path::PathBuf;

use directories::ProjectDirs;

/// Name of the rc file inside the platform config directory.
pub const RC_FILE_NAME: &str = "girafscript.rc";
/// Name of the per-directory rc file.
pub const LOCAL_RC_FILE_NAME: &str = ".girafscriptrc";

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// Which rc file to load.
    pub config: ConfigFile,
    /// Variable definitions (`-D<name>=<value>`), in order.
    pub defines: Vec<String>,
    /// Fragment printed instead of an error (`-e<text>`).
    pub fallback: Option<String>,
    /// Debug logging (`-d`).
    pub debug: bool,
    /// Input file; stdin when absent or `-`.
    pub input: Option<PathBuf>,
}

/// How to choose the rc file.
#[derive(Debug, Default, PartialEq, Eq)]
pub enum ConfigFile {
    /// Search the platform config directory, then `./.girafscriptrc` (default).
    #[default]
    Search,
    /// `-f` with no file argument: skip the rc file.
    Skip,
    /// `-f<file>`: load this specific file.
    Explicit(PathBuf),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            i += 1;
            positional.extend(argv[i..].iter().cloned());
            break;
        }

        // Non-flag argument.
        if !arg.starts_with('-') || arg == "-" {
            positional.push(arg.to_owned());
            i += 1;
            continue;
        }

        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'd' => args.debug = true,

                // -f[<file>]
                'f' => {
                    if j + 1 < chars.len() {
                        let file: String = chars[j + 1..].iter().collect();
                        args.config = ConfigFile::Explicit(PathBuf::from(file));
                        j = chars.len();
                    } else if i + 1 < argv.len() && !argv[i + 1].starts_with('-') && i + 2 < argv.len() {
                        // `-f <file> <input>`; a lone trailing word is the input
                        i += 1;
                        args.config = ConfigFile::Explicit(PathBuf::from(&argv[i]));
                    } else {
                        args.config = ConfigFile::Skip;
                    }
                }

                // -D<name>=<value>
                'D' => {
                    let def = take_value(&chars, &mut j, argv, &mut i)
                        .ok_or("-D requires a name=value argument")?;
                    if !def.contains('=') {
                        return Err(format!("-D{def}: expected name=value"));
                    }
                    args.defines.push(def);
                }

                // -e<text>
                'e' => {
                    let text = take_value(&chars, &mut j, argv, &mut i)
                        .ok_or("-e requires a fallback text argument")?;
                    args.fallback = Some(text);
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    match positional.len() {
        0 => {}
        1 => {
            let input = positional.remove(0);
            if input != "-" {
                args.input = Some(PathBuf::from(input));
            }
        }
        n => return Err(format!("too many arguments ({n})")),
    }

    Ok(args)
}

/// Value of an option taking an argument: the rest of this word, or the next
/// word.  Advances the cursors past whatever it consumed.
fn take_value(chars: &[char], j: &mut usize, argv: &[String], i: &mut usize) -> Option<String> {
    if *j + 1 < chars.len() {
        let s: String = chars[*j + 1..].iter().collect();
        *j = chars.len();
        Some(s)
    } else if *i + 1 < argv.len() {
        *i += 1;
        Some(argv[*i].clone())
    } else {
        None
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// `girafscript.rc` in the platform config directory, if one is defined.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "girafscript").map(|dirs| dirs.config_dir().join(RC_FILE_NAME))
}

/// Search for the rc file in the standard locations.
/// Returns the first path that exists, or `None`.
pub fn find_user_config() -> Option<PathBuf> {
    default_config_path()
        .into_iter()
        .chain(std::iter::once(PathBuf::from(".").join(LOCAL_RC_FILE_NAME)))
        .find(|p| p.exists())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
