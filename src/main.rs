use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use structopt::StructOpt;

// submodules
mod catalog;
mod config;
mod errors;
mod ga;
mod input;
mod output;
mod planner;
mod timetable;

use catalog::Catalog;
use config::PlannerConfig;
use errors::Error;
use input::TsvCatalog;
use output::{TimetableSink, TsvSink};
use planner::{GenerationStats, Planner};
use timetable::Day;

/// The command line options that can be given to this application.
#[derive(Debug, StructOpt)]
#[structopt(name = "timetable-planner", about = "An evolutionary planning application for weekly class timetables.")]
struct Opt {
    /// Directory containing scopes.tsv, courses.tsv, instructors.tsv and venues.tsv
    #[structopt(short = "c", long = "catalog", parse(from_os_str))]
    catalog: PathBuf,

    /// Programme to plan, e.g. "BTech Computer"
    #[structopt(short = "p", long = "programme")]
    programme: String,

    /// Semester to plan, e.g. "Semester 1"
    #[structopt(short = "s", long = "semester")]
    semester: String,

    /// Year of study, e.g. "2023-24"
    #[structopt(short = "y", long = "year")]
    year_of_study: String,

    /// Output file, stdout if not present
    #[structopt(short = "o", long = "output", parse(from_os_str))]
    output: Option<PathBuf>,

    /// Population size used for the evolutionary algorithm.
    #[structopt(short = "n", long = "population", default_value = "50")]
    population_size: usize,

    /// Number of generations to evolve.
    #[structopt(short = "g", long = "generations", default_value = "100")]
    generations: usize,

    /// Number of best timetables carried unchanged into the next generation.
    #[structopt(short = "e", long = "elite", default_value = "2")]
    elite_count: usize,

    /// Probability of mutating each session.
    #[structopt(short = "m", long = "mutation-rate", default_value = "0.1")]
    mutation_rate: f64,

    /// Comma separated teaching days, Monday to Friday if not present
    #[structopt(long = "days", use_delimiter = true)]
    days: Vec<Day>,

    /// Seed for the random number generator, random if not present
    #[structopt(long = "seed")]
    seed: Option<u64>,

    /// Stop after this many seconds and keep the best timetable found so far
    #[structopt(long = "time-limit")]
    time_limit: Option<u64>,

    /// Quiet mode, only print warnings and errors to stderr
    #[structopt(short = "q", long = "quiet")]
    quiet: bool,
}

/// Implements Write but doesn't write anything.
struct NullWrite;

impl Write for NullWrite {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn main() -> ! {
    let opt = Opt::from_args();

    let default_filter = if opt.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match run(opt) {
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1)
        },
        Ok(_) => {
            std::process::exit(0)
        }
    }
}

fn run(opt: Opt) -> errors::Result<()> {
    let provider = TsvCatalog::load(&opt.catalog)?;
    let catalog = match Catalog::snapshot(&provider, &opt.programme, &opt.semester, &opt.year_of_study) {
        Err(err @ Error::ScopeNotFound { .. }) => {
            warn!("Timetables known in {}:", provider.dir().display());
            for scope in provider.scopes() {
                warn!("Known timetable: {} - {} ({})", scope.programme, scope.semester, scope.year_of_study);
            }
            return Err(err);
        }
        result => result?,
    };

    let mut config = PlannerConfig {
        population_size: opt.population_size,
        generations: opt.generations,
        elite_count: opt.elite_count,
        mutation_rate: opt.mutation_rate,
        ..PlannerConfig::default()
    };
    if !opt.days.is_empty() {
        config.days = opt.days.clone();
    }

    let mut log_out: Box<dyn Write> = if opt.quiet {
        Box::new(NullWrite)
    } else {
        Box::new(std::io::stderr())
    };

    let rng = match opt.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut planner = Planner::new(rng, config, catalog)?;

    let stop = Arc::new(AtomicBool::new(false));
    if let Some(seconds) = opt.time_limit {
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs(seconds));
            warn!("Time limit of {} seconds reached", seconds);
            stop.store(true, Ordering::Relaxed);
        });
    }

    info!(
        "Beginning evolutionary optimization, population size {}, {} generations",
        planner.config().population_size,
        planner.config().generations
    );

    writeln!(log_out, "Generation | Average fitness | Best fitness | Conflicts")?;

    let mut print_stats = |stats: &GenerationStats| {
        // Progress output is best effort
        let _ = writeln!(
            log_out,
            "{: >10} | {: >15.3} | {: >12.3} | {: >9}",
            stats.generation, stats.average_fitness, stats.best_fitness.raw(), stats.best_conflicts
        );
    };

    let best = planner.run(&stop, &mut print_stats)?;

    writeln!(
        log_out,
        "Best timetable after {} generations: {} sessions, {} conflicts",
        planner.generation(),
        best.len(),
        best.conflicts().unwrap_or(0)
    )?;
    for (day, count) in best.lectures_per_day() {
        writeln!(log_out, "{: >10} | {} sessions", day, count)?;
    }

    let conflict_free = planner.population().iter()
        .filter(|chromosome| chromosome.conflicts() == Some(0))
        .count();
    info!(
        "{} of {} timetables in the final population are conflict free",
        conflict_free,
        planner.population().len()
    );

    match opt.output {
        None => {
            let mut sink = TsvSink::new(std::io::stdout());
            sink.publish(planner.catalog(), &best)?;
            sink.into_inner()?;
        },
        Some(file_name) => {
            let file = File::create(&file_name)?;
            let mut sink = TsvSink::new(file);
            sink.publish(planner.catalog(), &best)?;
            sink.into_inner()?.sync_all()?;
            info!("Timetable written to {}", file_name.display());
        },
    }

    Ok(())
}
