use std::fs::{self, File};
use std::io::{self, stdout, BufWriter, Read, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use rayon::prelude::*;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::cli::GzArgs;
use crate::error::{GzError, GzResult};
use crate::gzip::GzipMember;
use crate::utils::{
    format_ratio, format_size, has_suffix, restored_name, same_file, strip_suffix,
};

const STREAM_BUFFER_SIZE: usize = 256 * 1024;

/// A whole input file, memory-mapped when it has any bytes at all
pub enum Input {
    Mapped(Mmap),
    Buffered(Vec<u8>),
}

impl Deref for Input {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Input::Mapped(mmap) => &mmap[..],
            Input::Buffered(bytes) => &bytes[..],
        }
    }
}

pub fn map_input(path: &Path) -> GzResult<Input> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(GzError::FileNotFound(path.display().to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    // Zero-length mappings are rejected by some platforms
    if file.metadata()?.len() == 0 {
        return Ok(Input::Buffered(Vec::new()));
    }

    let mmap = unsafe { Mmap::map(&file)? };
    Ok(Input::Mapped(mmap))
}

/// One unit of work for the pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Stdin,
    File(PathBuf),
}

impl Job {
    fn label(&self) -> String {
        match self {
            Job::Stdin => "stdin".to_string(),
            Job::File(path) => path.display().to_string(),
        }
    }
}

/// `gzip -l` row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub compressed: usize,
    pub uncompressed: u32,
    pub crc: u32,
    pub name: String,
}

#[derive(Debug)]
pub enum Outcome {
    Written {
        output: PathBuf,
        compressed: usize,
        decompressed: usize,
    },
    Stdout(Vec<u8>),
    Tested,
    Listed(ListEntry),
}

fn parse_member(data: &[u8]) -> GzResult<GzipMember<'_>> {
    GzipMember::parse(data).map_err(GzError::header)
}

fn inflate_member(member: &GzipMember<'_>) -> GzResult<Vec<u8>> {
    member.decompress().map_err(GzError::data)
}

fn report_header(label: &str, member: &GzipMember<'_>) {
    let header = &member.header;
    info!(
        file = label,
        name = %header.name_lossy().unwrap_or_default(),
        length = member.declared_len(),
        crc = %format!("{:08x}", member.trailer.crc32),
        method = header.method,
        mtime = header.mtime,
        os = %header.operating_system(),
        comment = %header.comment_lossy().unwrap_or_default(),
        "gzip header"
    );
}

fn list_entry(member: &GzipMember<'_>, compressed: usize, name: String) -> ListEntry {
    ListEntry {
        compressed,
        uncompressed: member.trailer.isize,
        crc: member.trailer.crc32,
        name,
    }
}

/// Decode an in-memory gzip stream that has no file of its own
pub fn process_buffer(label: &str, data: &[u8], args: &GzArgs) -> GzResult<Outcome> {
    let member = parse_member(data)?;
    report_header(label, &member);

    if args.list {
        let name = match member.header.name_lossy() {
            Some(name) if args.name => name.into_owned(),
            _ => label.to_string(),
        };
        return Ok(Outcome::Listed(list_entry(&member, data.len(), name)));
    }

    let decoded = inflate_member(&member)?;
    if args.test {
        return Ok(Outcome::Tested);
    }
    Ok(Outcome::Stdout(decoded))
}

fn output_path(input: &Path, member: &GzipMember<'_>, args: &GzArgs) -> GzResult<PathBuf> {
    if args.name {
        if let Some(path) = member
            .header
            .name_lossy()
            .and_then(|name| restored_name(input, &name))
        {
            return Ok(path);
        }
    }
    strip_suffix(input, &args.suffix)
        .ok_or_else(|| GzError::invalid_argument("unknown suffix -- ignored"))
}

fn write_output(output: &Path, data: &[u8], input_meta: &fs::Metadata) -> GzResult<()> {
    let result = (|| -> io::Result<()> {
        let file = File::create(output)?;
        let mut writer = BufWriter::with_capacity(STREAM_BUFFER_SIZE, file);
        writer.write_all(data)?;
        writer.flush()?;
        fs::set_permissions(output, input_meta.permissions())
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(output);
        return Err(e.into());
    }
    Ok(())
}

pub fn process_file(path: &Path, args: &GzArgs) -> GzResult<Outcome> {
    let writes_file = !(args.stdout || args.list || args.test);
    if writes_file && !has_suffix(path, &args.suffix) {
        return Err(GzError::invalid_argument("unknown suffix -- ignored"));
    }

    let input = map_input(path)?;
    let label = path.display().to_string();
    if !writes_file {
        if args.list {
            let member = parse_member(&input)?;
            report_header(&label, &member);
            let name = match member.header.name_lossy() {
                Some(name) if args.name => name.into_owned(),
                _ => strip_suffix(path, &args.suffix)
                    .unwrap_or_else(|| path.to_path_buf())
                    .display()
                    .to_string(),
            };
            return Ok(Outcome::Listed(list_entry(&member, input.len(), name)));
        }
        return process_buffer(&label, &input, args);
    }

    let input_meta = fs::metadata(path)?;
    let (output, decoded) = {
        let member = parse_member(&input)?;
        report_header(&label, &member);
        let output = output_path(path, &member, args)?;
        if same_file(&output, path) {
            return Err(GzError::invalid_argument(format!(
                "stored name {} would overwrite the input",
                output.display()
            )));
        }
        if output.exists() && !args.force {
            return Err(GzError::invalid_argument(format!(
                "{} already exists",
                output.display()
            )));
        }
        (output, inflate_member(&member)?)
    };

    write_output(&output, &decoded, &input_meta)?;

    let compressed = input.len();
    drop(input);
    if !args.keep {
        fs::remove_file(path)?;
    }

    debug!(input = %label, output = %output.display(), "decompressed");
    Ok(Outcome::Written {
        output,
        compressed,
        decompressed: decoded.len(),
    })
}

pub fn process_job(job: &Job, args: &GzArgs) -> GzResult<Outcome> {
    match job {
        Job::Stdin => {
            let mut data = Vec::new();
            io::stdin().lock().read_to_end(&mut data)?;
            process_buffer("stdin", &data, args)
        }
        Job::File(path) => process_file(path, args),
    }
}

/// Expand the command line into jobs. Directories are walked when `-r`
/// is given; anything else that cannot become a job is returned as an
/// error tagged with its name.
pub fn collect_jobs(args: &GzArgs) -> Vec<(String, GzResult<Job>)> {
    if args.files.is_empty() {
        return vec![(Job::Stdin.label(), Ok(Job::Stdin))];
    }

    let mut jobs = Vec::new();
    let mut stdin_listed = false;
    for file in &args.files {
        if file == "-" {
            let job = if stdin_listed {
                Err(GzError::invalid_argument("standard input is read only once"))
            } else {
                Ok(Job::Stdin)
            };
            stdin_listed = true;
            jobs.push((Job::Stdin.label(), job));
            continue;
        }

        let path = Path::new(file);
        if !path.is_dir() {
            jobs.push((file.clone(), Ok(Job::File(path.to_path_buf()))));
            continue;
        }

        if !args.recursive {
            jobs.push((
                file.clone(),
                Err(GzError::invalid_argument("is a directory -- ignored")),
            ));
            continue;
        }

        for entry in WalkDir::new(path).sort_by_file_name() {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && has_suffix(entry.path(), &args.suffix) {
                        let job = Job::File(entry.into_path());
                        jobs.push((job.label(), Ok(job)));
                    }
                }
                Err(e) => jobs.push((file.clone(), Err(e.into()))),
            }
        }
    }
    jobs
}

fn print_stats(label: &str, output: &Path, compressed: usize, decompressed: usize) {
    eprintln!(
        "{}:\t{} -- replaced with {} ({} -> {})",
        label,
        format_ratio(compressed, decompressed),
        output.display(),
        format_size(compressed),
        format_size(decompressed)
    );
}

fn print_list_header(verbose: bool) {
    if verbose {
        println!(
            "method  crc      {:>19} {:>19}  ratio uncompressed_name",
            "compressed", "uncompressed"
        );
    } else {
        println!(
            "{:>19} {:>19}  ratio uncompressed_name",
            "compressed", "uncompressed"
        );
    }
}

fn print_list_row(entry: &ListEntry, verbose: bool) {
    let ratio = format_ratio(entry.compressed, entry.uncompressed as usize);
    if verbose {
        println!(
            "defla   {:08x} {:>19} {:>19} {:>6} {}",
            entry.crc, entry.compressed, entry.uncompressed, ratio, entry.name
        );
    } else {
        println!(
            "{:>19} {:>19} {:>6} {}",
            entry.compressed, entry.uncompressed, ratio, entry.name
        );
    }
}

/// Run every input through the pool and report in command line order.
/// Returns the process exit code: 1 when any input failed.
pub fn process_inputs(args: &GzArgs) -> GzResult<i32> {
    let jobs = collect_jobs(args);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.processes)
        .build()
        .map_err(GzError::thread)?;

    let results: Vec<(String, GzResult<Outcome>)> = pool.install(|| {
        jobs.into_par_iter()
            .map(|(label, job)| {
                let outcome = job.and_then(|job| process_job(&job, args));
                (label, outcome)
            })
            .collect()
    });

    let verbose = args.verbosity > 0;
    if args.list {
        print_list_header(verbose);
    }

    let stdout = stdout();
    let mut writer = BufWriter::with_capacity(STREAM_BUFFER_SIZE, stdout.lock());
    let mut exit_code = 0;
    let mut totals = (0usize, 0usize);
    let mut listed = 0;

    for (label, result) in results {
        match result {
            Ok(Outcome::Stdout(data)) => writer.write_all(&data)?,
            Ok(Outcome::Written {
                output,
                compressed,
                decompressed,
            }) => {
                if verbose {
                    print_stats(&label, &output, compressed, decompressed);
                }
            }
            Ok(Outcome::Tested) => {
                if verbose {
                    eprintln!("{}:\t OK", label);
                }
            }
            Ok(Outcome::Listed(entry)) => {
                totals.0 += entry.compressed;
                totals.1 += entry.uncompressed as usize;
                listed += 1;
                print_list_row(&entry, verbose);
            }
            Err(e) => {
                if !args.quiet {
                    eprintln!("gzinflate: {}: {}", label, e);
                }
                exit_code = 1;
            }
        }
    }
    writer.flush()?;

    if listed > 1 {
        println!(
            "{:>19} {:>19} {:>6} (totals)",
            totals.0,
            totals.1,
            format_ratio(totals.0, totals.1)
        );
    }

    Ok(exit_code)
}
