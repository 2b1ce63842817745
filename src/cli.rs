use std::env;
use std::path::Path;

use crate::error::{GzError, GzResult};

#[derive(Debug, Clone)]
pub struct GzArgs {
    pub files: Vec<String>,
    pub processes: usize,
    pub decompress: bool,
    pub test: bool,
    pub list: bool,
    pub stdout: bool,
    pub keep: bool,
    pub force: bool,
    pub quiet: bool,
    pub verbosity: u8,
    pub recursive: bool,
    pub suffix: String,
    /// Restore the file name stored in the gzip header (`-N`)
    pub name: bool,
    pub help: bool,
    pub version: bool,
}

impl Default for GzArgs {
    fn default() -> Self {
        GzArgs {
            files: Vec::new(),
            processes: num_cpus::get().max(1),
            decompress: true,
            test: false,
            list: false,
            stdout: false,
            keep: false,
            force: false,
            quiet: false,
            verbosity: 0,
            recursive: false,
            suffix: ".gz".to_string(),
            name: false,
            help: false,
            version: false,
        }
    }
}

impl GzArgs {
    pub fn parse() -> GzResult<Self> {
        Self::parse_from(env::args())
    }

    /// Parse a full argument vector, program name first
    pub fn parse_from<I>(argv: I) -> GzResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        let mut args = GzArgs::default();

        if !argv.is_empty() {
            let program = argv.remove(0);
            let program_name = Path::new(&program)
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("gzinflate");
            if program_name.contains("zcat") {
                args.stdout = true;
            }
        }

        let mut i = 0;
        let mut in_options = true;

        while i < argv.len() {
            let arg = &argv[i];

            if !in_options || !arg.starts_with('-') || arg == "-" {
                args.files.push(arg.clone());
                i += 1;
                continue;
            }

            if arg == "--" {
                in_options = false;
                i += 1;
                continue;
            }

            if let Some(long) = arg.strip_prefix("--") {
                let (option, inline_value) = match long.split_once('=') {
                    Some((option, value)) => (option, Some(value.to_string())),
                    None => (long, None),
                };

                match option {
                    "help" => args.help = true,
                    "version" => args.version = true,
                    "decompress" | "uncompress" => args.decompress = true,
                    "test" => args.test = true,
                    "list" => args.list = true,
                    "stdout" | "to-stdout" => args.stdout = true,
                    "keep" => args.keep = true,
                    "force" => args.force = true,
                    "quiet" | "silent" => args.quiet = true,
                    "verbose" => args.verbosity = args.verbosity.saturating_add(1),
                    "recursive" => args.recursive = true,
                    "name" => args.name = true,
                    "no-name" => args.name = false,
                    "suffix" | "processes" => {
                        let value = match inline_value {
                            Some(value) => value,
                            None => {
                                if i + 1 >= argv.len() {
                                    return Err(GzError::invalid_argument(format!(
                                        "--{} requires an argument",
                                        option
                                    )));
                                }
                                i += 1;
                                argv[i].clone()
                            }
                        };
                        if option == "suffix" {
                            args.suffix = value;
                        } else {
                            args.processes = parse_processes(&value)?;
                        }
                    }
                    _ => {
                        return Err(GzError::invalid_argument(format!(
                            "Unknown option: {}",
                            arg
                        )))
                    }
                }
            } else {
                let chars: Vec<char> = arg.chars().collect();
                let mut j = 1;

                while j < chars.len() {
                    match chars[j] {
                        'h' => args.help = true,
                        'V' => args.version = true,
                        'd' => args.decompress = true,
                        't' => args.test = true,
                        'l' => args.list = true,
                        'c' => args.stdout = true,
                        'k' => args.keep = true,
                        'f' => args.force = true,
                        'q' => args.quiet = true,
                        'v' => args.verbosity = args.verbosity.saturating_add(1),
                        'r' => args.recursive = true,
                        'N' => args.name = true,
                        'n' => args.name = false,
                        'p' | 'S' => {
                            let opt_char = chars[j];

                            let value = if j + 1 < chars.len() {
                                let value_str: String = chars[j + 1..].iter().collect();
                                j = chars.len();
                                value_str
                            } else {
                                if i + 1 >= argv.len() {
                                    return Err(GzError::invalid_argument(format!(
                                        "-{} requires an argument",
                                        opt_char
                                    )));
                                }
                                i += 1;
                                argv[i].clone()
                            };

                            if opt_char == 'p' {
                                args.processes = parse_processes(&value)?;
                            } else {
                                args.suffix = value;
                            }
                        }
                        _ => {
                            return Err(GzError::invalid_argument(format!(
                                "Unknown option: -{}",
                                chars[j]
                            )))
                        }
                    }
                    j += 1;
                }
            }

            i += 1;
        }

        if args.suffix.is_empty() {
            return Err(GzError::invalid_argument("Suffix must not be empty"));
        }

        if args.quiet {
            args.verbosity = 0;
        }

        Ok(args)
    }
}

fn parse_processes(value: &str) -> GzResult<usize> {
    let processes: usize = value
        .parse()
        .map_err(|_| GzError::invalid_argument(format!("Invalid processes: {}", value)))?;
    Ok(processes.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> GzResult<GzArgs> {
        GzArgs::parse_from(std::iter::once("gzinflate").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]).unwrap();
        assert!(args.files.is_empty());
        assert!(!args.stdout);
        assert_eq!(args.suffix, ".gz");
        assert!(args.processes >= 1);
        assert_eq!(args.verbosity, 0);
    }

    #[test]
    fn test_combined_short_flags() {
        let args = parse(&["-cdkv", "a.gz", "b.gz"]).unwrap();
        assert!(args.stdout && args.decompress && args.keep);
        assert_eq!(args.verbosity, 1);
        assert_eq!(args.files, vec!["a.gz", "b.gz"]);
    }

    #[test]
    fn test_repeated_verbose() {
        assert_eq!(parse(&["-vvv"]).unwrap().verbosity, 3);
        assert_eq!(parse(&["-v", "--verbose"]).unwrap().verbosity, 2);
        assert_eq!(parse(&["-vv", "-q"]).unwrap().verbosity, 0);
    }

    #[test]
    fn test_option_values() {
        let args = parse(&["-S", ".z", "-p4", "x.z"]).unwrap();
        assert_eq!(args.suffix, ".z");
        assert_eq!(args.processes, 4);

        let args = parse(&["--suffix=.gzip", "--processes", "2"]).unwrap();
        assert_eq!(args.suffix, ".gzip");
        assert_eq!(args.processes, 2);

        assert_eq!(parse(&["-p", "0"]).unwrap().processes, 1);
    }

    #[test]
    fn test_missing_and_bad_values() {
        assert!(matches!(parse(&["-S"]), Err(GzError::InvalidArgument(_))));
        assert!(matches!(
            parse(&["--processes"]),
            Err(GzError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse(&["-p", "many"]),
            Err(GzError::InvalidArgument(_))
        ));
        assert!(matches!(parse(&["-S", ""]), Err(GzError::InvalidArgument(_))));
    }

    #[test]
    fn test_unknown_options() {
        assert!(matches!(parse(&["-9"]), Err(GzError::InvalidArgument(_))));
        assert!(matches!(
            parse(&["--best"]),
            Err(GzError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_double_dash_and_stdin() {
        let args = parse(&["-k", "--", "-v", "-"]).unwrap();
        assert_eq!(args.files, vec!["-v", "-"]);
        assert_eq!(args.verbosity, 0);

        let args = parse(&["-"]).unwrap();
        assert_eq!(args.files, vec!["-"]);
    }

    #[test]
    fn test_name_flags() {
        assert!(parse(&["-N"]).unwrap().name);
        assert!(!parse(&["-N", "-n"]).unwrap().name);
        assert!(parse(&["--no-name", "--name"]).unwrap().name);
    }

    #[test]
    fn test_zcat_implies_stdout() {
        let args = GzArgs::parse_from(["/usr/bin/zcat", "a.gz"]).unwrap();
        assert!(args.stdout);
        let args = GzArgs::parse_from(["gzcat"]).unwrap();
        assert!(args.stdout);
        let args = GzArgs::parse_from(["gunzip", "a.gz"]).unwrap();
        assert!(!args.stdout);
    }
}
