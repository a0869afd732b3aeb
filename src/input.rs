use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::debug;

use crate::catalog::{CatalogProvider, Course, DepartmentId, InMemoryCatalog, Instructor, Scope, Venue};
use crate::errors::{CatalogError, Error, Result};

pub const SCOPES_FILE: &str = "scopes.tsv";
pub const COURSES_FILE: &str = "courses.tsv";
pub const INSTRUCTORS_FILE: &str = "instructors.tsv";
pub const VENUES_FILE: &str = "venues.tsv";

/// A catalog provider backed by a directory of tab separated files.
///
/// - `scopes.tsv`: programme, semester, year of study, department
/// - `courses.tsv`: code, name, description, department
/// - `instructors.tsv`: name, specialization, department
/// - `venues.tsv`: venue
///
/// Every file starts with a header row. A blank department means the record
/// belongs to no department.
#[derive(Debug, Clone)]
pub struct TsvCatalog {
    dir: PathBuf,
    records: InMemoryCatalog,
}

impl TsvCatalog {
    /// Read all four files of the directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let scopes = load_file(dir, SCOPES_FILE, load_scopes)?;
        let courses = load_file(dir, COURSES_FILE, load_courses)?;
        let instructors = load_file(dir, INSTRUCTORS_FILE, load_instructors)?;
        let venues = load_file(dir, VENUES_FILE, load_venues)?;

        debug!(
            "Loaded {} scopes, {} courses, {} instructors and {} venues from {}",
            scopes.len(), courses.len(), instructors.len(), venues.len(), dir.display()
        );

        Ok(TsvCatalog {
            dir: dir.to_owned(),
            records: InMemoryCatalog::new(scopes, courses, instructors, venues),
        })
    }

    pub fn dir(&self) -> &Path {
        self.dir.as_path()
    }

    pub fn scopes(&self) -> &[Scope] {
        self.records.scopes()
    }
}

impl CatalogProvider for TsvCatalog {
    fn resolve_scope(&self, programme: &str, semester: &str, year_of_study: &str) -> Result<Scope> {
        self.records.resolve_scope(programme, semester, year_of_study)
    }

    fn list_courses(&self, department: Option<&DepartmentId>) -> Vec<Course> {
        self.records.list_courses(department)
    }

    fn list_instructors(&self, department: Option<&DepartmentId>) -> Vec<Instructor> {
        self.records.list_instructors(department)
    }

    fn list_venues(&self) -> Vec<Venue> {
        self.records.list_venues()
    }
}

fn load_file<T>(
    dir: &Path, name: &str, load: fn(File, &Path) -> Result<Vec<T>>
) -> Result<Vec<T>> {
    let path = dir.join(name);
    let file = File::open(&path)?;
    load(file, &path)
}

/// A data row of a catalog file, with the position used in error messages.
struct Row<'a> {
    file: &'a Path,
    line: usize,
    record: csv::StringRecord,
}

impl<'a> Row<'a> {
    fn error(&self, error: CatalogError) -> Error {
        Error::InvalidCatalog {
            file: PathBuf::from(self.file),
            line: self.line,
            error,
        }
    }

    fn optional(&self, index: usize, column: &'static str) -> Result<&str> {
        self.record.get(index).ok_or_else(|| self.error(CatalogError::MissingField(column)))
    }

    fn required(&self, index: usize, column: &'static str) -> Result<String> {
        let value = self.optional(index, column)?;
        if value.is_empty() {
            return Err(self.error(CatalogError::EmptyField(column)));
        }
        Ok(value.to_owned())
    }

    fn department(&self, index: usize) -> Result<Option<DepartmentId>> {
        let value = self.optional(index, "Department")?;
        Ok(if value.is_empty() { None } else { Some(DepartmentId::new(value)) })
    }
}

fn rows<In: Read>(stream: In, file: &Path) -> Result<Vec<Row<'_>>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(stream);

    reader.into_records()
        .enumerate()
        .map(|(record_num, record)| -> Result<Row<'_>> {
            Ok(Row {
                file,
                // Line 1 is the header
                line: record_num + 2,
                record: record?,
            })
        })
        .collect()
}

fn load_scopes<In: Read>(stream: In, file: &Path) -> Result<Vec<Scope>> {
    let mut scopes: Vec<Scope> = Vec::new();
    for row in rows(stream, file)? {
        let scope = Scope {
            programme: row.required(0, "Programme")?,
            semester: row.required(1, "Semester")?,
            year_of_study: row.required(2, "YearOfStudy")?,
            department: DepartmentId::new(row.required(3, "Department")?),
        };

        if scopes.iter().any(|known| known.matches(&scope.programme, &scope.semester, &scope.year_of_study)) {
            return Err(row.error(CatalogError::DuplicateScope));
        }
        scopes.push(scope);
    }
    Ok(scopes)
}

fn load_courses<In: Read>(stream: In, file: &Path) -> Result<Vec<Course>> {
    rows(stream, file)?.iter()
        .map(|row| -> Result<Course> {
            Ok(Course {
                code: row.required(0, "Code")?,
                name: row.required(1, "Name")?,
                description: row.optional(2, "Description")?.to_owned(),
                department: row.department(3)?,
            })
        })
        .collect()
}

fn load_instructors<In: Read>(stream: In, file: &Path) -> Result<Vec<Instructor>> {
    rows(stream, file)?.iter()
        .map(|row| -> Result<Instructor> {
            Ok(Instructor {
                name: row.required(0, "Name")?,
                specialization: row.optional(1, "Specialization")?.to_owned(),
                department: row.department(2)?,
            })
        })
        .collect()
}

fn load_venues<In: Read>(stream: In, file: &Path) -> Result<Vec<Venue>> {
    rows(stream, file)?.iter()
        .map(|row| -> Result<Venue> { Ok(Venue { name: row.required(0, "Venue")? }) })
        .collect()
}
