use std::io::Write;

use itertools::Itertools;

use crate::catalog::Catalog;
use crate::errors::Result;
use crate::timetable::Chromosome;

/// Receives the winning timetable of a run.
pub trait TimetableSink {
    fn publish(&mut self, catalog: &Catalog, timetable: &Chromosome) -> Result<()>;
}

const HEADER: [&str; 10] = [
    "Programme", "Semester", "Year", "Day", "Start", "End", "Course", "Instructor", "Venue", "Session",
];

/// Writes one tab separated row per session, ordered by day and start time.
pub struct TsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> TsvSink<W> {
    pub fn new(out: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(out);
        TsvSink { writer }
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().map_err(|err| err.into_error().into())
    }
}

impl<W: Write> TimetableSink for TsvSink<W> {
    fn publish(&mut self, catalog: &Catalog, timetable: &Chromosome) -> Result<()> {
        let scope = catalog.scope();

        self.writer.write_record(&HEADER)?;

        for gene in timetable.genes().iter().sorted_by_key(|gene| (gene.day, gene.time_start())) {
            let day = gene.day.to_string();
            let start = gene.time_start().to_string();
            let end = gene.time_end().to_string();
            let session = gene.session_type.to_string();

            self.writer.write_record(&[
                scope.programme.as_str(),
                scope.semester.as_str(),
                scope.year_of_study.as_str(),
                day.as_str(),
                start.as_str(),
                end.as_str(),
                catalog.course(gene.course).code.as_str(),
                catalog.instructor(gene.instructor).name.as_str(),
                catalog.venue(gene.venue).name.as_str(),
                session.as_str(),
            ])?;
        }

        self.writer.flush()?;
        Ok(())
    }
}
