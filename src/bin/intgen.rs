use std::fs;
use std::io::{self, prelude::*};
use std::process;

use byteorder::{BigEndian, WriteBytesExt};
use env_logger;
use log;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use page_sort::IntReader;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let result = match build_arg_parser().subcommand() {
        Some(("make", args)) => {
            let path = args.value_of("path").expect("value is required");
            let count: u64 = args.value_of_t_or_exit("count");
            let max: i32 = args.value_of_t_or_exit("max");
            let seed: u64 = args.value_of_t_or_exit("seed");
            make_ints(path, count, max, seed)
        }
        Some(("print", args)) => print_ints(args.value_of("path").expect("value is required")),
        _ => unreachable!("subcommand is required"),
    };

    if let Err(err) = result {
        log::error!("{}", err);
        process::exit(1);
    }
}

/// Writes `count` pseudo-random integers in `[0, max)` generated from `seed`.
fn make_ints(path: &str, count: u64, max: i32, seed: u64) -> io::Result<()> {
    let mut writer = io::BufWriter::new(fs::File::create(path)?);
    let mut rng = StdRng::seed_from_u64(seed);

    for _ in 0..count {
        writer.write_i32::<BigEndian>(rng.gen_range(0..max))?;
    }
    writer.flush()?;

    log::info!("{} integers written to {}", count, path);

    return Ok(());
}

/// Prints every integer of the file in file order, one per line.
fn print_ints(path: &str) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    for item in IntReader::open(fs::File::open(path)?, None)? {
        writeln!(out, "{}", item?)?;
    }
    out.flush()?;

    return Ok(());
}

fn build_arg_parser() -> clap::ArgMatches {
    let path = clap::Arg::new("path").help("integer file path").required(true).index(1);

    clap::App::new("intgen")
        .about("binary integer file generator and printer")
        .setting(clap::AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            clap::App::new("make")
                .about("writes a file of seeded pseudo-random non-negative integers")
                .arg(path.clone())
                .arg(
                    clap::Arg::new("count")
                        .help("number of integers")
                        .required(true)
                        .index(2),
                )
                .arg(
                    clap::Arg::new("max")
                        .help("exclusive upper bound of generated integers")
                        .required(true)
                        .index(3)
                        .validator(|v| match v.parse::<i32>() {
                            Ok(max) if max > 0 => Ok(()),
                            Ok(_) => Err("upper bound must be positive".to_string()),
                            Err(err) => Err(format!("Upper bound format incorrect: {}", err)),
                        }),
                )
                .arg(clap::Arg::new("seed").help("generator seed").required(true).index(4)),
        )
        .subcommand(
            clap::App::new("print")
                .about("prints the integers of a file, one per line")
                .arg(path),
        )
        .get_matches()
}
