use std::error;
use std::fmt;
use std::str::FromStr;

use crate::catalog::{CourseId, InstructorId, VenueId};
use crate::ga::Fitness;

/// A teaching day of the week.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Day {
    pub const COUNT: usize = 5;

    pub const ALL: [Day; Day::COUNT] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
        };
        f.pad(name)
    }
}

/// A day name that is not one of the five teaching days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDayError(String);

impl fmt::Display for ParseDayError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "'{}' is not a teaching day (Monday to Friday)", self.0)
    }
}

impl error::Error for ParseDayError {}

impl FromStr for Day {
    type Err = ParseDayError;

    /// Accepts full day names in any letter case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Day::ALL
            .iter()
            .copied()
            .find(|day| day.to_string().eq_ignore_ascii_case(name))
            .ok_or_else(|| ParseDayError(name.to_owned()))
    }
}

/// A wall clock time of day with minute resolution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    hour: u8,
    minute: u8,
}

impl ClockTime {
    pub const fn new(hour: u8, minute: u8) -> Self {
        ClockTime { hour, minute }
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// A bookable teaching period. Start and end always travel together.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TimeSlot {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl TimeSlot {
    pub const fn hours(start: u8, end: u8) -> Self {
        TimeSlot {
            start: ClockTime::new(start, 0),
            end: ClockTime::new(end, 0),
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SessionType {
    Lecture,
    Tutorial,
    Lab,
    Discussion,
    Presentation,
}

impl SessionType {
    pub const ALL: [SessionType; 5] = [
        SessionType::Lecture,
        SessionType::Tutorial,
        SessionType::Lab,
        SessionType::Discussion,
        SessionType::Presentation,
    ];
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SessionType::Lecture => "Lecture",
            SessionType::Tutorial => "Tutorial",
            SessionType::Lab => "Lab",
            SessionType::Discussion => "Discussion",
            SessionType::Presentation => "Presentation",
        };
        f.write_str(name)
    }
}

/// One scheduled session. Genes are plain values, every chromosome owns its own copies.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Gene {
    pub course: CourseId,
    pub instructor: InstructorId,
    pub venue: VenueId,
    pub slot: TimeSlot,
    pub day: Day,
    pub session_type: SessionType,
}

impl Gene {
    pub fn time_start(&self) -> ClockTime {
        self.slot.start
    }

    pub fn time_end(&self) -> ClockTime {
        self.slot.end
    }
}

/// A candidate weekly timetable.
#[derive(Debug, Clone)]
pub struct Chromosome {
    genes: Vec<Gene>,
    /// Number of genes on each day, indexed by `Day`. Derived from `genes`.
    lectures_per_day: [usize; Day::COUNT],
    /// Zero until the chromosome has been evaluated.
    fitness: Fitness,
    conflicts: Option<usize>,
}

impl Chromosome {
    pub fn new(genes: Vec<Gene>) -> Self {
        let lectures_per_day = count_lectures_per_day(&genes);
        Chromosome {
            genes,
            lectures_per_day,
            fitness: Fitness::UNEVALUATED,
            conflicts: None,
        }
    }

    pub fn genes(&self) -> &[Gene] {
        self.genes.as_slice()
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn lectures_on(&self, day: Day) -> usize {
        self.lectures_per_day[day.index()]
    }

    pub fn lectures_per_day(&self) -> impl Iterator<Item = (Day, usize)> + '_ {
        (0..Day::COUNT).map(move |index| (Day::ALL[index], self.lectures_per_day[index]))
    }

    pub fn fitness(&self) -> Fitness {
        self.fitness
    }

    /// Number of conflicts found by the last evaluation, if any.
    pub fn conflicts(&self) -> Option<usize> {
        self.conflicts
    }

    pub(crate) fn record_evaluation(&mut self, fitness: Fitness, conflicts: usize) {
        self.fitness = fitness;
        self.conflicts = Some(conflicts);
    }

    /// Edit the genes in place. The per-day counts are recomputed afterwards and the
    /// previous evaluation is discarded.
    pub fn modify_genes<F: FnOnce(&mut [Gene])>(&mut self, edit: F) {
        edit(self.genes.as_mut_slice());
        self.lectures_per_day = count_lectures_per_day(&self.genes);
        self.fitness = Fitness::UNEVALUATED;
        self.conflicts = None;
    }
}

fn count_lectures_per_day(genes: &[Gene]) -> [usize; Day::COUNT] {
    let mut counts = [0; Day::COUNT];
    for gene in genes {
        counts[gene.day.index()] += 1;
    }
    counts
}
