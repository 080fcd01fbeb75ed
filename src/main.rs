use std::fs;
use std::path;
use std::process;

use bytesize::ByteSize;
use clap::ArgEnum;
use env_logger;
use log;

use page_sort::run::{self, IntReader};
use page_sort::ExternalSorterBuilder;

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let buffers: usize = arg_parser.value_of_t_or_exit("buffers");
    let page_size: usize = arg_parser.value_of_t_or_exit("page_size");
    let tmp_dir: Option<&str> = arg_parser.value_of("tmp_dir");
    let input = arg_parser.value_of("input").expect("value is required");
    let output = arg_parser.value_of("output").expect("value is required");

    let mut sorter_builder = ExternalSorterBuilder::new()
        .with_buffers(buffers)
        .with_page_size(page_size);

    if let Some(tmp_dir) = tmp_dir {
        sorter_builder = sorter_builder.with_tmp_dir(path::Path::new(tmp_dir));
    }

    let sorter = match sorter_builder.build() {
        Ok(sorter) => sorter,
        Err(err) => {
            log::error!("sorter initialization error: {}", err);
            process::exit(1);
        }
    };

    let summary = match sorter.sort(path::Path::new(input), path::Path::new(output)) {
        Ok(summary) => summary,
        Err(err) => {
            log::error!("data sorting error: {}", err);
            process::exit(1);
        }
    };
    log::info!(
        "{} integers ({}) sorted in {} merge passes",
        summary.items,
        ByteSize(summary.items * 4),
        summary.passes
    );

    // the output is checked independently of the sorter's own verification
    let sorted = fs::File::open(output)
        .and_then(|file| IntReader::open(file, None))
        .and_then(run::is_sorted);

    match sorted {
        Ok(true) => println!("Sort Succeeded"),
        Ok(false) => {
            println!("Sort Failed");
            process::exit(1);
        }
        Err(err) => {
            log::error!("output verification error: {}", err);
            println!("Sort Failed");
            process::exit(1);
        }
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("page-sort")
        .about("k-way external merge sort of binary integer files")
        .arg(
            clap::Arg::new("input")
                .short('i')
                .long("input")
                .help("file of big-endian 32-bit integers to be sorted")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("result file")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("buffers")
                .short('b')
                .long("buffers")
                .help("number of page buffers, at least 3")
                .required(true)
                .takes_value(true)
                .validator(|v| match v.parse::<usize>() {
                    Ok(buffers) if buffers >= 3 => Ok(()),
                    Ok(_) => Err("at least 3 page buffers required".to_string()),
                    Err(err) => Err(format!("Buffer number format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("page_size")
                .short('p')
                .long("page-size")
                .help("number of integers in a page")
                .required(true)
                .takes_value(true)
                .validator(|v| match v.parse::<usize>() {
                    Ok(page_size) if page_size > 0 => Ok(()),
                    Ok(_) => Err("page size must be positive".to_string()),
                    Err(err) => Err(format!("Page size format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .arg(
            clap::Arg::new("tmp_dir")
                .short('d')
                .long("tmp-dir")
                .help("directory to be used to store temporary data")
                .takes_value(true),
        )
        .get_matches()
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}
