use std::collections::HashSet;

use crate::errors::ConfigError;
use crate::timetable::{Day, TimeSlot};

/// Teaching periods of a day: three in the morning, lunch from 13:00 to 14:00,
/// three in the afternoon.
pub const DEFAULT_TIME_SLOTS: [TimeSlot; 6] = [
    TimeSlot::hours(10, 11),
    TimeSlot::hours(11, 12),
    TimeSlot::hours(12, 13),
    TimeSlot::hours(14, 15),
    TimeSlot::hours(15, 16),
    TimeSlot::hours(16, 17),
];

/// Parameters of one planning run. Every operator receives them explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub population_size: usize,
    /// Probability that a single gene is mutated.
    pub mutation_rate: f64,
    /// Number of best individuals copied unchanged into the next generation.
    pub elite_count: usize,
    pub generations: usize,
    pub tournament_size: usize,
    pub days: Vec<Day>,
    pub time_slots: Vec<TimeSlot>,
    pub min_lectures_per_day: usize,
    /// Note that the default of 7 exceeds the six default slots, so the excess
    /// penalty never applies with the default slots.
    pub max_lectures_per_day: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            population_size: 50,
            mutation_rate: 0.1,
            elite_count: 2,
            generations: 100,
            tournament_size: 3,
            days: Day::ALL.to_vec(),
            time_slots: DEFAULT_TIME_SLOTS.to_vec(),
            min_lectures_per_day: 6,
            max_lectures_per_day: 7,
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Crossover draws two distinct parents, a tournament draws `tournament_size` contestants.
        let required = self.tournament_size.max(2);
        if self.population_size < required {
            return Err(ConfigError::PopulationTooSmall {
                population_size: self.population_size,
                required,
            });
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(ConfigError::MutationRateOutOfRange(self.mutation_rate));
        }
        if self.elite_count >= self.population_size {
            return Err(ConfigError::EliteTooLarge {
                elite_count: self.elite_count,
                population_size: self.population_size,
            });
        }
        if self.min_lectures_per_day > self.max_lectures_per_day {
            return Err(ConfigError::LectureBoundsInverted {
                min: self.min_lectures_per_day,
                max: self.max_lectures_per_day,
            });
        }
        if self.max_lectures_per_day == usize::MAX {
            return Err(ConfigError::LectureBoundTooLarge(self.max_lectures_per_day));
        }
        if self.days.is_empty() {
            return Err(ConfigError::NoDays);
        }
        if let Some(day) = first_duplicate(&self.days) {
            return Err(ConfigError::DuplicateDay(day));
        }
        if self.time_slots.is_empty() {
            return Err(ConfigError::NoTimeSlots);
        }
        if let Some(slot) = first_duplicate(&self.time_slots) {
            return Err(ConfigError::DuplicateTimeSlot(slot));
        }
        Ok(())
    }
}

fn first_duplicate<T: Copy + Eq + std::hash::Hash>(values: &[T]) -> Option<T> {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().copied().find(|value| !seen.insert(*value))
}
