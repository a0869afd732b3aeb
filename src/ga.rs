use rand::Rng;

#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub struct Fitness(f64);

impl Fitness {
    /// The fitness of an individual that has not been evaluated yet.
    pub const UNEVALUATED: Fitness = Fitness(0.0);

    pub fn new(fitness: f64) -> Self {
        assert!(! fitness.is_nan(), "fitness must not be Nan");
        Fitness(fitness)
    }

    /// Inverse conflict score, `1 / (1 + conflicts)`. Only a conflict free individual scores 1.
    pub fn from_conflicts(conflicts: usize) -> Self {
        Fitness::new(1.0 / (1 + conflicts) as f64)
    }

    pub fn raw(self) -> f64 {
        self.0
    }
}

impl Ord for Fitness {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.partial_cmp(other).unwrap()
    }
}

impl Eq for Fitness {}

/// Draw `tournament_size` distinct individuals and return the fittest of them.
/// On ties the individual drawn first wins.
pub fn tournament_select<'a, T, R, F>(
    rng: &mut R, population: &'a [T], tournament_size: usize, fitness: F
) -> &'a T
where
    R: Rng,
    F: Fn(&T) -> Fitness,
{
    assert!(tournament_size > 0, "tournament needs at least one contestant");
    assert!(population.len() >= tournament_size, "population is smaller than the tournament");

    let mut contestants = rand::seq::index::sample(rng, population.len(), tournament_size)
        .into_iter()
        .map(|index| &population[index]);

    let first = contestants.next().expect("tournament is not empty");
    contestants.fold(first, |winner, contestant| {
        if fitness(contestant) > fitness(winner) { contestant } else { winner }
    })
}

/// Index in `0..len` other than `current`, or `current` if `len` leaves no
/// alternative. The draw skips over `current` like an insertion into a sorted sample.
pub fn other_index<R: Rng>(rng: &mut R, len: usize, current: usize) -> usize {
    if len <= 1 {
        return current;
    }
    let drawn = rng.gen_range(0, len - 1);
    if drawn >= current { drawn + 1 } else { drawn }
}

/// An element of `options` different from `current`. `current` is kept when no
/// other option exists.
pub fn choose_other<T: Copy + PartialEq, R: Rng>(rng: &mut R, options: &[T], current: T) -> T {
    let others = options.iter().filter(|&&option| option != current).count();
    if others == 0 {
        return current;
    }
    let pick = rng.gen_range(0, others);
    options.iter()
        .copied()
        .filter(|&option| option != current)
        .nth(pick)
        .unwrap_or(current)
}

/// Single point crossover at a random cut in `[0, len - 1)`.
pub fn single_point_crossover<T: Clone, R: Rng>(
    rng: &mut R, parent1: &[T], parent2: &[T]
) -> (Vec<T>, Vec<T>) {
    let len = parent1.len();
    let split_point = if len > 1 { rng.gen_range(0, len - 1) } else { 0 };
    crossover_at(parent1, parent2, split_point)
}

/// `child1 = parent1[..split] + parent2[split..]`, `child2` the complement.
pub fn crossover_at<T: Clone>(parent1: &[T], parent2: &[T], split_point: usize) -> (Vec<T>, Vec<T>) {
    assert_eq!(parent1.len(), parent2.len(), "parents must have the same length");
    let len = parent1.len();

    let mut child1 = Vec::with_capacity(len);
    let mut child2 = Vec::with_capacity(len);

    child1.extend(parent1[0..split_point].iter().cloned());
    child1.extend(parent2[split_point..len].iter().cloned());

    child2.extend(parent2[0..split_point].iter().cloned());
    child2.extend(parent1[split_point..len].iter().cloned());

    (child1, child2)
}
