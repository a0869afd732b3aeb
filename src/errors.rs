use std::fmt;
use std::path::PathBuf;

use crate::timetable::{Day, TimeSlot};

pub type Result<T> = std::result::Result<T, Error>;

/// The various kinds of errors that can happen while planning a timetable.
#[derive(Debug)]
pub enum Error {
    /// An I/O error (such as not being able to read a catalog file)
    Io(std::io::Error),
    /// An error while reading or writing CSV.
    Csv(csv::Error),
    /// A catalog file is not valid.
    InvalidCatalog {
        file: PathBuf,
        line: usize,
        error: CatalogError,
    },
    /// No timetable is registered for this programme, semester and year of study.
    ScopeNotFound {
        programme: String,
        semester: String,
        year_of_study: String,
    },
    /// No gene can be built because one of the catalog collections is empty.
    EmptyCatalog(CatalogKind),
    /// Crossover parents with different gene counts.
    LengthMismatch {
        left: usize,
        right: usize,
    },
    /// The algorithm parameters are inconsistent.
    InvalidConfig(ConfigError),
}

#[derive(Debug)]
pub enum CatalogError {
    /// A row has fewer columns than the header requires.
    MissingField(&'static str),
    /// A mandatory column is blank.
    EmptyField(&'static str),
    /// The same programme, semester and year of study appear twice.
    DuplicateScope,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CatalogKind {
    Courses,
    Instructors,
    Venues,
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// The population cannot host a tournament or a pair of parents.
    PopulationTooSmall { population_size: usize, required: usize },
    MutationRateOutOfRange(f64),
    /// The elite would take up the whole population.
    EliteTooLarge { elite_count: usize, population_size: usize },
    LectureBoundsInverted { min: usize, max: usize },
    /// The upper bound has no successor, so no lecture count range can end at it.
    LectureBoundTooLarge(usize),
    NoDays,
    DuplicateDay(Day),
    DuplicateTimeSlot(TimeSlot),
    NoTimeSlots,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Error {
        Error::Csv(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Error {
        Error::InvalidConfig(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Csv(err) => err.fmt(f),
            Error::InvalidCatalog { file, line, error } => {
                write!(f, "{}:{}: {}", file.to_string_lossy(), line, error)
            }
            Error::ScopeNotFound { programme, semester, year_of_study } => write!(
                f,
                "No timetable registered for {} - {} ({})",
                programme, semester, year_of_study
            ),
            Error::EmptyCatalog(kind) => write!(f, "The catalog contains no {}", kind),
            Error::LengthMismatch { left, right } => write!(
                f,
                "Parents must have the same number of genes ({} vs. {})",
                left, right
            ),
            Error::InvalidConfig(err) => write!(f, "Invalid configuration: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(error) => Some(error),
            Error::Csv(error) => Some(error),
            Error::InvalidCatalog { error, .. } => Some(error),
            Error::InvalidConfig(error) => Some(error),
            Error::ScopeNotFound { .. } | Error::EmptyCatalog(_) | Error::LengthMismatch { .. } => None,
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CatalogError::MissingField(column) => write!(f, "Missing column '{}'", column),
            CatalogError::EmptyField(column) => write!(f, "Column '{}' must not be empty", column),
            CatalogError::DuplicateScope => write!(
                f,
                "Programme, semester and year of study are already registered"
            ),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CatalogKind::Courses => write!(f, "courses"),
            CatalogKind::Instructors => write!(f, "instructors"),
            CatalogKind::Venues => write!(f, "venues"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::PopulationTooSmall { population_size, required } => write!(
                f,
                "population size {} is too small, at least {} individuals are required",
                population_size, required
            ),
            ConfigError::MutationRateOutOfRange(rate) => {
                write!(f, "mutation rate {} is not a probability", rate)
            }
            ConfigError::EliteTooLarge { elite_count, population_size } => write!(
                f,
                "elite count {} must be smaller than the population size {}",
                elite_count, population_size
            ),
            ConfigError::LectureBoundsInverted { min, max } => write!(
                f,
                "minimum lectures per day ({}) exceed the maximum ({})",
                min, max
            ),
            ConfigError::LectureBoundTooLarge(max) => {
                write!(f, "maximum lectures per day ({}) is too large", max)
            }
            ConfigError::NoDays => write!(f, "at least one teaching day is required"),
            ConfigError::DuplicateDay(day) => write!(f, "{} is listed more than once", day),
            ConfigError::DuplicateTimeSlot(slot) => write!(f, "time slot {} is listed more than once", slot),
            ConfigError::NoTimeSlots => write!(f, "at least one time slot is required"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
