use itertools::Itertools;
use log::{debug, info};
use rand::Rng;

use crate::errors::{CatalogKind, Error, Result};
use crate::ga;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepartmentId(String);

impl DepartmentId {
    pub fn new<S: Into<String>>(name: S) -> Self {
        DepartmentId(name.into())
    }

    pub fn name(&self) -> &str {
        self.0.as_ref()
    }
}

/// Index of a course in the catalog snapshot of a run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct CourseId(pub usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct InstructorId(pub usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct VenueId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    /// Unique course code, e.g. `CS201`.
    pub code: String,
    pub name: String,
    pub description: String,
    pub department: Option<DepartmentId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instructor {
    pub name: String,
    pub specialization: String,
    pub department: Option<DepartmentId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Venue {
    pub name: String,
}

/// The programme, semester and year of study a timetable is planned for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub programme: String,
    pub semester: String,
    pub year_of_study: String,
    pub department: DepartmentId,
}

impl Scope {
    pub fn matches(&self, programme: &str, semester: &str, year_of_study: &str) -> bool {
        self.programme == programme && self.semester == semester && self.year_of_study == year_of_study
    }
}

/// Source of the courses, instructors and venues a timetable can be built from.
///
/// A department of `None` lists the whole, unscoped collection.
pub trait CatalogProvider {
    fn resolve_scope(&self, programme: &str, semester: &str, year_of_study: &str) -> Result<Scope>;

    fn list_courses(&self, department: Option<&DepartmentId>) -> Vec<Course>;

    fn list_instructors(&self, department: Option<&DepartmentId>) -> Vec<Instructor>;

    fn list_venues(&self) -> Vec<Venue>;
}

/// A catalog provider holding all of its records in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    scopes: Vec<Scope>,
    courses: Vec<Course>,
    instructors: Vec<Instructor>,
    venues: Vec<Venue>,
}

impl InMemoryCatalog {
    pub fn new(scopes: Vec<Scope>, courses: Vec<Course>, instructors: Vec<Instructor>, venues: Vec<Venue>) -> Self {
        InMemoryCatalog { scopes, courses, instructors, venues }
    }

    pub fn scopes(&self) -> &[Scope] {
        self.scopes.as_slice()
    }
}

fn in_department(department: Option<&DepartmentId>, record_department: Option<&DepartmentId>) -> bool {
    department.map_or(true, |wanted| record_department == Some(wanted))
}

impl CatalogProvider for InMemoryCatalog {
    fn resolve_scope(&self, programme: &str, semester: &str, year_of_study: &str) -> Result<Scope> {
        self.scopes.iter()
            .find(|scope| scope.matches(programme, semester, year_of_study))
            .cloned()
            .ok_or_else(|| Error::ScopeNotFound {
                programme: programme.to_owned(),
                semester: semester.to_owned(),
                year_of_study: year_of_study.to_owned(),
            })
    }

    fn list_courses(&self, department: Option<&DepartmentId>) -> Vec<Course> {
        self.courses.iter()
            .filter(|course| in_department(department, course.department.as_ref()))
            .cloned()
            .collect()
    }

    fn list_instructors(&self, department: Option<&DepartmentId>) -> Vec<Instructor> {
        self.instructors.iter()
            .filter(|instructor| in_department(department, instructor.department.as_ref()))
            .cloned()
            .collect()
    }

    fn list_venues(&self) -> Vec<Venue> {
        self.venues.clone()
    }
}

/// Immutable snapshot of the catalog for one planning run.
///
/// All ids index into the unscoped collections. The initial population draws
/// courses and instructors from the department of the scope, mutation draws
/// from everything.
#[derive(Debug, Clone)]
pub struct Catalog {
    scope: Scope,
    courses: Vec<Course>,
    instructors: Vec<Instructor>,
    venues: Vec<Venue>,
    department_courses: Vec<CourseId>,
    department_instructors: Vec<InstructorId>,
}

impl Catalog {
    /// Resolve the scope and capture the catalog records once.
    pub fn snapshot<P: CatalogProvider + ?Sized>(
        provider: &P, programme: &str, semester: &str, year_of_study: &str
    ) -> Result<Self> {
        let scope = provider.resolve_scope(programme, semester, year_of_study)?;

        let courses = provider.list_courses(None);
        let instructors = provider.list_instructors(None);
        let venues = provider.list_venues();

        if courses.is_empty() {
            return Err(Error::EmptyCatalog(CatalogKind::Courses));
        }
        if instructors.is_empty() {
            return Err(Error::EmptyCatalog(CatalogKind::Instructors));
        }
        if venues.is_empty() {
            return Err(Error::EmptyCatalog(CatalogKind::Venues));
        }

        let department = Some(&scope.department);
        let department_courses = department_subset(&courses, &provider.list_courses(department), CourseId, "courses", &scope);
        let department_instructors =
            department_subset(&instructors, &provider.list_instructors(department), InstructorId, "instructors", &scope);

        info!(
            "Found {} courses, {} instructors, {} venues for {} ({})",
            department_courses.len(),
            department_instructors.len(),
            venues.len(),
            scope.programme,
            scope.department.name()
        );

        Ok(Catalog {
            scope,
            courses,
            instructors,
            venues,
            department_courses,
            department_instructors,
        })
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn course(&self, id: CourseId) -> &Course {
        &self.courses[id.0]
    }

    pub fn instructor(&self, id: InstructorId) -> &Instructor {
        &self.instructors[id.0]
    }

    pub fn venue(&self, id: VenueId) -> &Venue {
        &self.venues[id.0]
    }

    #[cfg(test)]
    pub fn department_courses(&self) -> &[CourseId] {
        self.department_courses.as_slice()
    }

    #[cfg(test)]
    pub fn department_instructors(&self) -> &[InstructorId] {
        self.department_instructors.as_slice()
    }

    pub fn random_department_course<R: Rng>(&self, rng: &mut R) -> CourseId {
        self.department_courses[rng.gen_range(0, self.department_courses.len())]
    }

    pub fn random_department_instructor<R: Rng>(&self, rng: &mut R) -> InstructorId {
        self.department_instructors[rng.gen_range(0, self.department_instructors.len())]
    }

    pub fn random_venue<R: Rng>(&self, rng: &mut R) -> VenueId {
        VenueId(rng.gen_range(0, self.venues.len()))
    }

    /// Any instructor of the catalog except `current`, unless there is no other.
    pub fn other_instructor<R: Rng>(&self, rng: &mut R, current: InstructorId) -> InstructorId {
        InstructorId(ga::other_index(rng, self.instructors.len(), current.0))
    }

    /// Any venue except `current`, unless there is no other.
    pub fn other_venue<R: Rng>(&self, rng: &mut R, current: VenueId) -> VenueId {
        VenueId(ga::other_index(rng, self.venues.len(), current.0))
    }
}

/// Positions of the department records within `all`, or every position if the
/// department has no records of its own.
fn department_subset<T: PartialEq, Id>(
    all: &[T], scoped: &[T], make_id: fn(usize) -> Id, what: &str, scope: &Scope
) -> Vec<Id> {
    let positions: Vec<usize> = all.iter()
        .positions(|record| scoped.contains(record))
        .collect();

    if positions.is_empty() {
        debug!("No {} in department {}, using the whole catalog", what, scope.department.name());
        (0..all.len()).map(make_id).collect()
    } else {
        positions.into_iter().map(make_id).collect()
    }
}

#[cfg(test)]
pub(crate) fn sample_catalog() -> InMemoryCatalog {
    let cse = DepartmentId::new("Computer Science Engineering");
    let ece = DepartmentId::new("Electronics Engineering");

    let scope = |programme: &str, semester: &str, department: &DepartmentId| Scope {
        programme: programme.to_owned(),
        semester: semester.to_owned(),
        year_of_study: "2023-24".to_owned(),
        department: department.clone(),
    };
    let course = |code: &str, name: &str, department: &DepartmentId| Course {
        code: code.to_owned(),
        name: name.to_owned(),
        description: String::new(),
        department: Some(department.clone()),
    };
    let instructor = |name: &str, department: &DepartmentId| Instructor {
        name: name.to_owned(),
        specialization: String::new(),
        department: Some(department.clone()),
    };

    InMemoryCatalog::new(
        vec![
            scope("BTech Computer", "Semester 1", &cse),
            scope("BTech Electronics", "Semester 1", &ece),
            scope("BTech Mechanical", "Semester 1", &DepartmentId::new("Mechanical Engineering")),
        ],
        vec![
            course("CS201", "DSA", &cse),
            course("CS202", "COA", &cse),
            course("CS203", "DBMS", &cse),
            course("CS204", "OS", &cse),
            course("EC201", "DC", &ece),
            course("EC202", "AC", &ece),
        ],
        vec![
            instructor("Anil Sharma", &cse),
            instructor("Priya Patel", &cse),
            instructor("Rahul Gupta", &ece),
            instructor("Suresh Verma", &DepartmentId::new("Mechanical Engineering")),
        ],
        ["Lab 101", "Lab 102", "Classroom 201", "Classroom 202", "Seminar Hall 301"]
            .iter()
            .map(|name| Venue { name: (*name).to_owned() })
            .collect(),
    )
}
