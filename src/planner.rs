use std::sync::atomic::{AtomicBool, Ordering};

use itertools::Itertools;
use log::{debug, info, trace, warn};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::catalog::Catalog;
use crate::config::PlannerConfig;
use crate::errors::{Error, Result};
use crate::ga::{self, Fitness};
use crate::timetable::{Chromosome, Gene, SessionType};

/// Build a random timetable. Every day independently receives between
/// `min_lectures_per_day` and `max_lectures_per_day` sessions, each in a
/// distinct time slot. A day runs out of slots before reaching its target
/// when the target exceeds the number of slots.
pub fn random_chromosome<R: Rng>(rng: &mut R, config: &PlannerConfig, catalog: &Catalog) -> Chromosome {
    let mut genes = Vec::with_capacity(config.days.len() * config.time_slots.len());

    for &day in config.days.iter() {
        let mut day_slots = config.time_slots.clone();
        let num_lectures = rng.gen_range(config.min_lectures_per_day, config.max_lectures_per_day + 1);

        for _ in 0..num_lectures {
            if day_slots.is_empty() {
                break;
            }
            let slot = day_slots.remove(rng.gen_range(0, day_slots.len()));

            genes.push(Gene {
                course: catalog.random_department_course(rng),
                instructor: catalog.random_department_instructor(rng),
                venue: catalog.random_venue(rng),
                slot,
                day,
                session_type: *SessionType::ALL.choose(rng).expect("session types are not empty"),
            });
        }
    }

    Chromosome::new(genes)
}

/// Count the constraint violations of a timetable.
///
/// Two sessions on the same day and with the same start time conflict once for
/// each of sharing the instructor, the venue and the course. Days with fewer
/// than `min_lectures_per_day` or more than `max_lectures_per_day` sessions
/// add the difference.
pub fn count_conflicts(config: &PlannerConfig, chromosome: &Chromosome) -> usize {
    let clashes: usize = chromosome.genes().iter()
        .tuple_combinations()
        .filter(|(gene1, gene2)| gene1.day == gene2.day && gene1.time_start() == gene2.time_start())
        .map(|(gene1, gene2)| {
            (gene1.instructor == gene2.instructor) as usize
                + (gene1.venue == gene2.venue) as usize
                + (gene1.course == gene2.course) as usize
        })
        .sum();

    let load_imbalance: usize = config.days.iter()
        .map(|&day| {
            let count = chromosome.lectures_on(day);
            if count < config.min_lectures_per_day {
                config.min_lectures_per_day - count
            } else if count > config.max_lectures_per_day {
                count - config.max_lectures_per_day
            } else {
                0
            }
        })
        .sum();

    clashes + load_imbalance
}

/// Score a timetable with `1 / (1 + conflicts)` and store the result on it.
pub fn evaluate(config: &PlannerConfig, chromosome: &mut Chromosome) -> Fitness {
    let conflicts = count_conflicts(config, chromosome);
    let fitness = Fitness::from_conflicts(conflicts);
    chromosome.record_evaluation(fitness, conflicts);
    fitness
}

/// Tournament selection with replacement. Returns as many parents as there are individuals.
pub fn select_parents<'a, R: Rng>(
    rng: &mut R, config: &PlannerConfig, population: &'a [Chromosome]
) -> Vec<&'a Chromosome> {
    std::iter::repeat_with(|| {
            ga::tournament_select(rng, population, config.tournament_size, Chromosome::fitness)
        })
        .take(population.len())
        .collect()
}

/// Single point crossover of two timetables. Both parents need the same number of genes.
pub fn crossover<R: Rng>(
    rng: &mut R, parent1: &Chromosome, parent2: &Chromosome
) -> Result<(Chromosome, Chromosome)> {
    if parent1.len() != parent2.len() {
        return Err(Error::LengthMismatch {
            left: parent1.len(),
            right: parent2.len(),
        });
    }

    let (child1, child2) = ga::single_point_crossover(rng, parent1.genes(), parent2.genes());
    Ok((Chromosome::new(child1), Chromosome::new(child2)))
}

/// The gene attributes a mutation can replace.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum MutationTarget {
    TimeSlot,
    Day,
    Venue,
    Instructor,
}

const MUTATION_TARGETS: [MutationTarget; 4] = [
    MutationTarget::TimeSlot,
    MutationTarget::Day,
    MutationTarget::Venue,
    MutationTarget::Instructor,
];

/// Replace one random attribute of each gene with probability `mutation_rate`.
/// The replacement always differs from the current value unless the attribute
/// has a single option. Venues and instructors are drawn from the whole catalog,
/// not only the department.
pub fn mutate<R: Rng>(rng: &mut R, config: &PlannerConfig, catalog: &Catalog, chromosome: &mut Chromosome) {
    if config.mutation_rate <= 0.0 {
        return;
    }

    chromosome.modify_genes(|genes| {
        for gene in genes.iter_mut() {
            if !rng.gen_bool(config.mutation_rate) {
                continue;
            }

            match MUTATION_TARGETS.choose(rng) {
                Some(MutationTarget::TimeSlot) => gene.slot = ga::choose_other(rng, &config.time_slots, gene.slot),
                Some(MutationTarget::Day) => gene.day = ga::choose_other(rng, &config.days, gene.day),
                Some(MutationTarget::Venue) => gene.venue = catalog.other_venue(rng, gene.venue),
                Some(MutationTarget::Instructor) => gene.instructor = catalog.other_instructor(rng, gene.instructor),
                None => {}
            }
        }
    });
}

/// Summary of one evaluated generation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GenerationStats {
    pub generation: usize,
    pub average_fitness: f64,
    pub best_fitness: Fitness,
    pub best_conflicts: usize,
}

impl GenerationStats {
    /// Expects an evaluated population sorted by descending fitness.
    fn of_ranked(generation: usize, ranked: &[Chromosome]) -> Self {
        let fitness_sum = ranked.iter().map(|chromosome| chromosome.fitness().raw()).sum::<f64>();
        let best = &ranked[0];

        GenerationStats {
            generation,
            average_fitness: fitness_sum / ranked.len() as f64,
            best_fitness: best.fitness(),
            best_conflicts: best.conflicts().unwrap_or(0),
        }
    }
}

/// Evolves a population of timetables for one catalog snapshot.
#[derive(Debug)]
pub struct Planner<R> {
    rng: R,
    config: PlannerConfig,
    catalog: Catalog,
    population: Vec<Chromosome>,
    generation: usize,
}

impl<R: Rng> Planner<R> {
    /// Validate the configuration and create the initial generation.
    pub fn new(mut rng: R, config: PlannerConfig, catalog: Catalog) -> Result<Self> {
        config.validate()?;

        let population: Vec<_> = std::iter::repeat_with(|| random_chromosome(&mut rng, &config, &catalog))
            .take(config.population_size)
            .collect();

        info!(
            "Initialized {} timetables with {} to {} sessions",
            population.len(),
            population.iter().map(Chromosome::len).min().unwrap_or(0),
            population.iter().map(Chromosome::len).max().unwrap_or(0)
        );

        Ok(Planner {
            rng,
            config,
            catalog,
            population,
            generation: 0,
        })
    }

    /// Run one generation: evaluate and rank the population, keep the elite,
    /// breed the rest of the next generation and mutate it.
    ///
    /// Returns the statistics of the generation that was ranked.
    pub fn improve(&mut self) -> Result<GenerationStats> {
        self.evaluate_population();
        // Stable, so equally fit individuals keep their order.
        self.population.sort_by(|a, b| b.fitness().cmp(&a.fitness()));
        let stats = GenerationStats::of_ranked(self.generation, &self.population);

        let population_size = self.config.population_size;
        let elite_count = self.config.elite_count;

        let mut next_generation: Vec<Chromosome> = Vec::with_capacity(population_size + 1);
        next_generation.extend(self.population[..elite_count].iter().cloned());

        let parents = select_parents(&mut self.rng, &self.config, &self.population);
        while next_generation.len() < population_size {
            let pair = rand::seq::index::sample(&mut self.rng, parents.len(), 2);
            let (child1, child2) = crossover(&mut self.rng, parents[pair.index(0)], parents[pair.index(1)])?;
            next_generation.push(child1);
            next_generation.push(child2);
        }
        next_generation.truncate(population_size);

        for chromosome in next_generation[elite_count..].iter_mut() {
            mutate(&mut self.rng, &self.config, &self.catalog, chromosome);
        }

        trace!(
            "Generation {}: average fitness {:.4}, best fitness {:.4}",
            stats.generation, stats.average_fitness, stats.best_fitness.raw()
        );

        self.population = next_generation;
        self.generation += 1;
        Ok(stats)
    }

    /// Run the remaining generations and return the best timetable of the final one.
    ///
    /// `stop` is checked before every generation. Once it is set, the search ends
    /// early and the best timetable found so far is returned.
    pub fn run<F>(&mut self, stop: &AtomicBool, mut report: F) -> Result<Chromosome>
    where
        F: FnMut(&GenerationStats),
    {
        debug!("Evolving for {} generations", self.config.generations - self.generation.min(self.config.generations));

        while self.generation < self.config.generations {
            if stop.load(Ordering::Relaxed) {
                warn!("Search cancelled after {} of {} generations", self.generation, self.config.generations);
                break;
            }
            let stats = self.improve()?;
            report(&stats);
        }

        self.evaluate_population();
        let best = self.best().clone();
        info!(
            "Best timetable has {} sessions and {} conflicts (fitness {:.4})",
            best.len(),
            best.conflicts().unwrap_or(0),
            best.fitness().raw()
        );
        Ok(best)
    }

    /// The fittest individual according to the last evaluation. Individuals bred
    /// since then are unevaluated and score zero.
    pub fn best(&self) -> &Chromosome {
        self.population.iter()
            .min_by_key(|chromosome| std::cmp::Reverse(chromosome.fitness()))
            .expect("population is at least 1")
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn population(&self) -> &[Chromosome] {
        self.population.as_slice()
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn evaluate_population(&mut self) {
        let config = &self.config;
        for chromosome in self.population.iter_mut() {
            evaluate(config, chromosome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{sample_catalog, Course, CourseId, InMemoryCatalog, Instructor, InstructorId, Scope, DepartmentId, Venue, VenueId};
    use crate::timetable::{Day, TimeSlot};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn computer_catalog() -> Catalog {
        Catalog::snapshot(&sample_catalog(), "BTech Computer", "Semester 1", "2023-24").unwrap()
    }

    fn gene(course: usize, instructor: usize, venue: usize, day: Day, start: u8) -> Gene {
        Gene {
            course: CourseId(course),
            instructor: InstructorId(instructor),
            venue: VenueId(venue),
            slot: TimeSlot::hours(start, start + 1),
            day,
            session_type: SessionType::Lecture,
        }
    }

    /// Six sessions on every day, no shared start times.
    fn conflict_free_genes() -> Vec<Gene> {
        Day::ALL.iter()
            .flat_map(|&day| vec![10, 11, 12, 14, 15, 16].into_iter().map(move |start| gene(0, 0, 0, day, start)))
            .collect()
    }

    fn single_record_catalog() -> Catalog {
        let department = DepartmentId::new("Computer Science Engineering");
        let provider = InMemoryCatalog::new(
            vec![Scope {
                programme: "BTech Computer".to_owned(),
                semester: "Semester 1".to_owned(),
                year_of_study: "2023-24".to_owned(),
                department: department.clone(),
            }],
            vec![Course {
                code: "CS201".to_owned(),
                name: "DSA".to_owned(),
                description: String::new(),
                department: Some(department.clone()),
            }],
            vec![Instructor {
                name: "Anil Sharma".to_owned(),
                specialization: String::new(),
                department: Some(department),
            }],
            vec![Venue { name: "Lab 101".to_owned() }],
        );
        Catalog::snapshot(&provider, "BTech Computer", "Semester 1", "2023-24").unwrap()
    }

    #[test]
    fn random_chromosome_fills_distinct_slots() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = PlannerConfig::default();
        let catalog = computer_catalog();

        for _ in 0..20 {
            let chromosome = random_chromosome(&mut rng, &config, &catalog);
            // Seven lectures never fit into six slots
            assert_eq!(chromosome.len(), 30);
            for (day, count) in chromosome.lectures_per_day() {
                assert_eq!(count, 6);
                let starts: Vec<_> = chromosome.genes().iter()
                    .filter(|gene| gene.day == day)
                    .map(|gene| gene.time_start())
                    .unique()
                    .collect();
                assert_eq!(starts.len(), 6);
            }
            for gene in chromosome.genes() {
                assert!(catalog.department_courses().contains(&gene.course));
                assert!(catalog.department_instructors().contains(&gene.instructor));
            }
        }
    }

    #[test]
    fn random_chromosome_respects_lower_targets() {
        let mut rng = StdRng::seed_from_u64(2);
        let config = PlannerConfig { min_lectures_per_day: 2, max_lectures_per_day: 4, ..PlannerConfig::default() };
        let catalog = computer_catalog();

        for _ in 0..20 {
            let chromosome = random_chromosome(&mut rng, &config, &catalog);
            for (_, count) in chromosome.lectures_per_day() {
                assert!(count >= 2 && count <= 4);
            }
        }
    }

    #[test]
    fn conflict_free_timetable_scores_one() {
        let config = PlannerConfig::default();
        let mut chromosome = Chromosome::new(conflict_free_genes());

        assert_eq!(evaluate(&config, &mut chromosome).raw(), 1.0);
        assert_eq!(chromosome.conflicts(), Some(0));
    }

    #[test]
    fn clashes_count_once_per_shared_attribute() {
        let config = PlannerConfig::default();
        let mut genes = conflict_free_genes();
        // Move Monday 11:00 to 10:00: same course, instructor and venue as Monday 10:00.
        genes[1].slot = TimeSlot::hours(10, 11);
        let chromosome = Chromosome::new(genes.clone());
        assert_eq!(count_conflicts(&config, &chromosome), 3);

        // Different venue and course, same instructor.
        genes[1].venue = VenueId(1);
        genes[1].course = CourseId(1);
        let chromosome = Chromosome::new(genes.clone());
        assert_eq!(count_conflicts(&config, &chromosome), 1);

        // Same start on different days is fine.
        genes[1].day = Day::Tuesday;
        genes[1].slot = TimeSlot::hours(11, 12);
        let chromosome = Chromosome::new(genes);
        // Tuesday now has 7 sessions (allowed), Monday 5 (one short), and Tuesday 11:00 clashes on the instructor.
        assert_eq!(count_conflicts(&config, &chromosome), 1 + 1);
    }

    #[test]
    fn load_imbalance_counts_shortfall_and_excess() {
        let config = PlannerConfig { min_lectures_per_day: 2, max_lectures_per_day: 3, ..PlannerConfig::default() };
        // Monday: 5 sessions (2 excess), Tuesday: 1 (1 short), other days: none (2 short each).
        let mut genes: Vec<Gene> = [10, 11, 12, 14, 15].iter()
            .map(|&start| gene(start as usize, start as usize, start as usize, Day::Monday, start))
            .collect();
        genes.push(gene(0, 0, 0, Day::Tuesday, 10));
        let mut chromosome = Chromosome::new(genes);

        assert_eq!(count_conflicts(&config, &chromosome), 2 + 1 + 3 * 2);
        let fitness = evaluate(&config, &mut chromosome);
        assert_eq!(fitness.raw(), 1.0 / 10.0);
        assert!(fitness.raw() > 0.0 && fitness.raw() < 1.0);
    }

    #[test]
    fn selection_keeps_population_size() {
        let mut rng = StdRng::seed_from_u64(5);
        let config = PlannerConfig::default();
        let catalog = computer_catalog();

        // All unevaluated, so every fitness is equal.
        let population: Vec<_> = (0..7).map(|_| random_chromosome(&mut rng, &config, &catalog)).collect();
        assert_eq!(select_parents(&mut rng, &config, &population).len(), 7);

        let mut population = population;
        for chromosome in population.iter_mut() {
            evaluate(&config, chromosome);
        }
        let parents = select_parents(&mut rng, &config, &population);
        assert_eq!(parents.len(), 7);

        let worst = population.iter().map(Chromosome::fitness).min().unwrap();
        let strictly_worst = population.iter().filter(|c| c.fitness() == worst).count() == 1;
        if strictly_worst {
            // The worst individual can never win a tournament of three.
            assert!(parents.iter().all(|parent| parent.fitness() > worst));
        }
    }

    #[test]
    fn crossover_preserves_genes() {
        let mut rng = StdRng::seed_from_u64(9);
        let config = PlannerConfig::default();
        let catalog = computer_catalog();
        let parent1 = random_chromosome(&mut rng, &config, &catalog);
        let parent2 = random_chromosome(&mut rng, &config, &catalog);

        let (child1, child2) = crossover(&mut rng, &parent1, &parent2).unwrap();
        assert_eq!(child1.len() + child2.len(), parent1.len() + parent2.len());
        assert_eq!(child1.fitness(), Fitness::UNEVALUATED);

        let cut = (0..=parent1.len())
            .find(|&cut| {
                child1.genes()[..cut] == parent1.genes()[..cut] && child1.genes()[cut..] == parent2.genes()[cut..]
            })
            .expect("child is a single cut of its parents");
        assert_eq!(child2.genes()[..cut], parent2.genes()[..cut]);
        assert_eq!(child2.genes()[cut..], parent1.genes()[cut..]);

        for (day, count) in child1.lectures_per_day() {
            assert_eq!(count, child1.genes().iter().filter(|gene| gene.day == day).count());
        }
    }

    #[test]
    fn crossover_rejects_different_lengths() {
        let mut rng = StdRng::seed_from_u64(9);
        let parent1 = Chromosome::new(conflict_free_genes());
        let parent2 = Chromosome::new(conflict_free_genes()[..29].to_vec());

        assert!(matches!(
            crossover(&mut rng, &parent1, &parent2),
            Err(Error::LengthMismatch { left: 30, right: 29 })
        ));
    }

    #[test]
    fn mutation_rate_zero_changes_nothing() {
        let mut rng = StdRng::seed_from_u64(13);
        let config = PlannerConfig { mutation_rate: 0.0, ..PlannerConfig::default() };
        let catalog = computer_catalog();
        let mut chromosome = random_chromosome(&mut rng, &config, &catalog);
        let before = chromosome.genes().to_vec();

        for _ in 0..10 {
            mutate(&mut rng, &config, &catalog, &mut chromosome);
        }
        assert_eq!(chromosome.genes(), before.as_slice());
    }

    #[test]
    fn mutation_rate_one_changes_every_gene() {
        let mut rng = StdRng::seed_from_u64(17);
        let config = PlannerConfig { mutation_rate: 1.0, ..PlannerConfig::default() };
        let catalog = computer_catalog();

        for _ in 0..20 {
            let mut chromosome = random_chromosome(&mut rng, &config, &catalog);
            let before = chromosome.genes().to_vec();

            mutate(&mut rng, &config, &catalog, &mut chromosome);

            for (old, new) in before.iter().zip(chromosome.genes()) {
                assert_ne!(old, new);
                // Exactly one of slot, day, venue and instructor moves.
                let moved = [old.slot != new.slot, old.day != new.day, old.venue != new.venue, old.instructor != new.instructor]
                    .iter()
                    .filter(|&&moved| moved)
                    .count();
                assert_eq!(moved, 1);
                // Course and session type are never mutated.
                assert_eq!(old.course, new.course);
                assert_eq!(old.session_type, new.session_type);
            }
            for (day, count) in chromosome.lectures_per_day() {
                assert_eq!(count, chromosome.genes().iter().filter(|gene| gene.day == day).count());
            }
        }
    }

    #[test]
    fn mutation_keeps_attributes_without_alternatives() {
        let mut rng = StdRng::seed_from_u64(19);
        let config = PlannerConfig {
            mutation_rate: 1.0,
            days: vec![Day::Wednesday],
            time_slots: vec![TimeSlot::hours(10, 11)],
            ..PlannerConfig::default()
        };
        let catalog = single_record_catalog();
        let mut chromosome = random_chromosome(&mut rng, &config, &catalog);
        assert_eq!(chromosome.len(), 1);
        let before = chromosome.genes().to_vec();

        for _ in 0..10 {
            mutate(&mut rng, &config, &catalog, &mut chromosome);
        }
        assert_eq!(chromosome.genes(), before.as_slice());
        assert_eq!(chromosome.lectures_on(Day::Wednesday), 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PlannerConfig { elite_count: 60, ..PlannerConfig::default() };
        let result = Planner::new(StdRng::seed_from_u64(0), config, computer_catalog());
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn elite_survives_unchanged() {
        let config = PlannerConfig { population_size: 20, elite_count: 2, mutation_rate: 0.5, ..PlannerConfig::default() };
        let mut planner = Planner::new(StdRng::seed_from_u64(21), config.clone(), computer_catalog()).unwrap();

        for _ in 0..5 {
            let mut ranked = planner.population().to_vec();
            for chromosome in ranked.iter_mut() {
                evaluate(&config, chromosome);
            }
            ranked.sort_by(|a, b| b.fitness().cmp(&a.fitness()));

            let stats = planner.improve().unwrap();
            assert_eq!(stats.best_fitness, ranked[0].fitness());
            assert_eq!(planner.population().len(), 20);
            assert_eq!(planner.population()[0].genes(), ranked[0].genes());
            assert_eq!(planner.population()[1].genes(), ranked[1].genes());
        }
        assert_eq!(planner.generation(), 5);
    }

    #[test]
    fn odd_population_is_truncated() {
        let config = PlannerConfig { population_size: 7, elite_count: 2, generations: 3, ..PlannerConfig::default() };
        let mut planner = Planner::new(StdRng::seed_from_u64(4), config, computer_catalog()).unwrap();
        planner.improve().unwrap();
        assert_eq!(planner.population().len(), 7);
    }

    #[test]
    fn single_record_catalog_terminates() {
        let config = PlannerConfig::default();
        let mut planner = Planner::new(StdRng::seed_from_u64(42), config, single_record_catalog()).unwrap();

        let mut reports = 0;
        let best = planner.run(&AtomicBool::new(false), |_| reports += 1).unwrap();

        assert_eq!(reports, 100);
        assert_eq!(planner.generation(), 100);
        for (_, count) in best.lectures_per_day() {
            assert!(count <= 6);
        }
        // The initial timetables already use six distinct slots per day, which the elite keeps.
        assert_eq!(best.fitness().raw(), 1.0);
    }

    #[test]
    fn cancelled_run_returns_best_so_far() {
        let config = PlannerConfig { population_size: 10, generations: 1000, ..PlannerConfig::default() };
        let mut planner = Planner::new(StdRng::seed_from_u64(8), config, computer_catalog()).unwrap();
        let stop = AtomicBool::new(false);

        let best = planner.run(&stop, |stats| {
            if stats.generation == 4 {
                stop.store(true, Ordering::Relaxed);
            }
        }).unwrap();

        assert_eq!(planner.generation(), 5);
        assert!(best.conflicts().is_some());
        assert_eq!(best.fitness(), planner.best().fitness());
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let config = PlannerConfig { population_size: 12, generations: 10, ..PlannerConfig::default() };
        let stop = AtomicBool::new(false);

        let best1 = Planner::new(StdRng::seed_from_u64(99), config.clone(), computer_catalog()).unwrap()
            .run(&stop, |_| {}).unwrap();
        let best2 = Planner::new(StdRng::seed_from_u64(99), config, computer_catalog()).unwrap()
            .run(&stop, |_| {}).unwrap();

        assert_eq!(best1.genes(), best2.genes());
    }
}
