use std::{collections::HashMap, path::Path, sync::Arc, time::Instant};

use tracing::{debug, info, warn};

use crate::{
    gtfs::{
        self, EntityClass, FeedSource, LoadOptions, Registry, Row, Table, check_line_ends,
        decode_contents,
    },
    problems::{ProblemKind, Reporter},
    schedule::{
        Schedule,
        entities::{Entity, RowOutcome, ServiceDate, ServicePeriod, Shape, ShapePoint},
    },
};

const CALENDAR: &str = "calendar.txt";
const CALENDAR_DATES: &str = "calendar_dates.txt";
const SHAPES: &str = "shapes.txt";
const STOP_TIMES: &str = "stop_times.txt";

/// Loads a feed with the standard registry.
pub fn load<P: AsRef<Path>>(
    path: P,
    reporter: &mut Reporter,
    options: LoadOptions,
) -> Result<Schedule, gtfs::Error> {
    let registry = Registry::standard();
    Loader::new(&registry).with_options(options).load(path, reporter)
}

/// Reads the files of a feed in registry order into a [`Schedule`].
///
/// Calendars and shapes are read first by dedicated passes, then every file
/// with a loading order, then stop_times.txt.
pub struct Loader<'a> {
    registry: &'a Registry,
    options: LoadOptions,
    schedule: Schedule,
}

impl<'a> Loader<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            options: Default::default(),
            schedule: Schedule::new(),
        }
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    /// Loads into `schedule` instead of an empty one, e.g. to keep a custom
    /// language parser.
    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn load<P: AsRef<Path>>(
        mut self,
        path: P,
        reporter: &mut Reporter,
    ) -> Result<Schedule, gtfs::Error> {
        let path = path.as_ref();
        let registry = self.registry;
        info!("Loading feed {}", path.display());
        let started = Instant::now();
        reporter.clear_context();
        let mut source = FeedSource::open(path, reporter)?;

        self.check_file_names(&source, reporter)?;
        reporter.checkpoint()?;

        debug!("Loading calendar...");
        let now = Instant::now();
        self.load_calendar(&mut source, reporter)?;
        debug!("Loading calendar took {:?}", now.elapsed());

        debug!("Loading shapes...");
        let now = Instant::now();
        self.load_shapes(&mut source, reporter)?;
        debug!("Loading shapes took {:?}", now.elapsed());

        for file_name in registry.loading_order() {
            if !registry.is_required(file_name) && !source.has_file(file_name) {
                continue;
            }
            let Some(class) = registry.class_for_file(file_name)? else {
                continue;
            };
            debug!("Loading {file_name}...");
            let now = Instant::now();
            self.load_file(&mut source, file_name, class.as_ref(), reporter)?;
            debug!("Loading {file_name} took {:?}", now.elapsed());
        }

        if self.options.load_stop_times {
            debug!("Loading stop times...");
            let now = Instant::now();
            match registry.class_for_file(STOP_TIMES)? {
                Some(class) => {
                    self.load_file(&mut source, STOP_TIMES, class.as_ref(), reporter)?
                }
                None => warn!("No class loads {STOP_TIMES}, skipping it"),
            }
            debug!("Loading stop times took {:?}", now.elapsed());
        }

        info!(
            "Loaded {} stops, {} routes, {} trips and {} stop times in {:?}",
            self.schedule.stops.len(),
            self.schedule.routes.len(),
            self.schedule.trips.len(),
            self.schedule.stop_times.len(),
            started.elapsed()
        );

        if self.options.extra_validation {
            self.schedule
                .validate(reporter, &self.options.validate_options())?;
        }
        Ok(self.schedule)
    }

    fn check_file_names(
        &self,
        source: &FeedSource,
        reporter: &mut Reporter,
    ) -> Result<(), gtfs::Error> {
        for file_name in source.file_names()? {
            if !file_name.starts_with('.') && !self.registry.is_known(&file_name) {
                reporter.report(ProblemKind::UnknownFile { file_name });
            }
        }
        Ok(())
    }

    /// Reads `file_name` and checks its header. `None` when the file is
    /// missing, empty or unreadable, which has been reported already.
    fn open_table(
        &mut self,
        source: &mut FeedSource,
        file_name: &str,
        class: &dyn EntityClass,
        reporter: &mut Reporter,
    ) -> Result<Option<Table>, gtfs::Error> {
        let Some(contents) = source.read(file_name)? else {
            reporter.report(ProblemKind::MissingFile {
                file_name: file_name.to_string(),
            });
            return Ok(None);
        };
        if contents.is_empty() {
            reporter.report(ProblemKind::EmptyFile {
                file_name: file_name.to_string(),
            });
            return Ok(None);
        }
        let Some(contents) = decode_contents(file_name, contents, reporter) else {
            return Ok(None);
        };
        check_line_ends(file_name, &contents, reporter);
        let table = Table::open(file_name, contents, &class.columns(), reporter);
        if let Some(table) = &table {
            self.schedule.record_columns(file_name, table.header());
        }
        Ok(table)
    }

    fn load_file(
        &mut self,
        source: &mut FeedSource,
        file_name: &str,
        class: &dyn EntityClass,
        reporter: &mut Reporter,
    ) -> Result<(), gtfs::Error> {
        let Some(mut table) = self.open_table(source, file_name, class, reporter)? else {
            return Ok(reporter.checkpoint()?);
        };
        while let Some(row) = table.next() {
            set_row_context(reporter, file_name, &row);
            table.check_row(&row, reporter);
            class.load_row(&row, &mut self.schedule, reporter);
            reporter.clear_context();
            reporter.checkpoint()?;
        }
        Ok(())
    }

    /// Merges calendar.txt and calendar_dates.txt into service periods
    /// before any of them is added, so each period is checked with its
    /// exceptions in place.
    fn load_calendar(
        &mut self,
        source: &mut FeedSource,
        reporter: &mut Reporter,
    ) -> Result<(), gtfs::Error> {
        if !source.has_file(CALENDAR) && !source.has_file(CALENDAR_DATES) {
            reporter.report(ProblemKind::MissingFile {
                file_name: CALENDAR.to_string(),
            });
            return Ok(reporter.checkpoint()?);
        }

        let mut pending: Vec<(ServicePeriod, &'static str, Row)> = Vec::new();
        let mut lookup: HashMap<String, usize> = HashMap::new();

        let calendar_class = self.class_or_builtin::<ServicePeriod>(CALENDAR);
        if source.has_file(CALENDAR) && !calendar_class.is_builtin() {
            self.load_file(source, CALENDAR, calendar_class.as_ref(), reporter)?;
        } else if source.has_file(CALENDAR) {
            let table = self.open_table(source, CALENDAR, calendar_class.as_ref(), reporter)?;
            if let Some(mut table) = table {
                while let Some(row) = table.next() {
                    set_row_context(reporter, CALENDAR, &row);
                    table.check_row(&row, reporter);
                    if let RowOutcome::Accepted(period) = ServicePeriod::from_row(&row, reporter) {
                        if lookup.contains_key(&period.service_id) {
                            reporter.duplicate_id("service_id", &period.service_id);
                        } else {
                            lookup.insert(period.service_id.clone(), pending.len());
                            pending.push((period, CALENDAR, row));
                        }
                    }
                    reporter.clear_context();
                    reporter.checkpoint()?;
                }
            }
        }

        let dates_class = self.class_or_builtin::<ServiceDate>(CALENDAR_DATES);
        if source.has_file(CALENDAR_DATES) && !dates_class.is_builtin() {
            self.load_file(source, CALENDAR_DATES, dates_class.as_ref(), reporter)?;
        } else if source.has_file(CALENDAR_DATES) {
            let table = self.open_table(source, CALENDAR_DATES, dates_class.as_ref(), reporter)?;
            if let Some(mut table) = table {
                while let Some(row) = table.next() {
                    set_row_context(reporter, CALENDAR_DATES, &row);
                    table.check_row(&row, reporter);
                    if let RowOutcome::Accepted(date) = ServiceDate::from_row(&row, reporter) {
                        let index = match lookup.get(&date.service_id) {
                            Some(index) => *index,
                            None => {
                                lookup.insert(date.service_id.clone(), pending.len());
                                let period = ServicePeriod::new(&date.service_id);
                                pending.push((period, CALENDAR_DATES, row.clone()));
                                pending.len() - 1
                            }
                        };
                        date.apply(&mut pending[index].0, reporter);
                    }
                    reporter.clear_context();
                    reporter.checkpoint()?;
                }
            }
        }

        for (period, file_name, row) in pending {
            set_row_context(reporter, file_name, &row);
            self.schedule.add(period, reporter);
            reporter.clear_context();
            reporter.checkpoint()?;
        }
        Ok(())
    }

    /// Groups shape points by shape id, keeping each shape ordered by
    /// sequence, and adds the finished shapes.
    fn load_shapes(
        &mut self,
        source: &mut FeedSource,
        reporter: &mut Reporter,
    ) -> Result<(), gtfs::Error> {
        if !source.has_file(SHAPES) {
            return Ok(());
        }
        let class = self.class_or_builtin::<ShapePoint>(SHAPES);
        if !class.is_builtin() {
            return self.load_file(source, SHAPES, class.as_ref(), reporter);
        }
        let Some(mut table) = self.open_table(source, SHAPES, class.as_ref(), reporter)? else {
            return Ok(reporter.checkpoint()?);
        };

        let mut shapes: Vec<Shape> = Vec::new();
        let mut lookup: HashMap<String, usize> = HashMap::new();
        while let Some(row) = table.next() {
            set_row_context(reporter, SHAPES, &row);
            table.check_row(&row, reporter);
            if let RowOutcome::Accepted(point) = ShapePoint::from_row(&row, reporter) {
                let index = *lookup.entry(point.shape_id.clone()).or_insert_with(|| {
                    shapes.push(Shape::new(&point.shape_id));
                    shapes.len() - 1
                });
                shapes[index].add_point(point, reporter);
            }
            reporter.clear_context();
            reporter.checkpoint()?;
        }

        for shape in shapes {
            self.schedule.add(shape, reporter);
        }
        Ok(reporter.checkpoint()?)
    }

    /// The class registered for a dedicated pass file, or the built-in one
    /// when the registry maps the file to several classes.
    fn class_or_builtin<E: Entity + 'static>(
        &self,
        file_name: &str,
    ) -> Arc<dyn EntityClass> {
        // shapes.txt maps to both Shape and ShapePoint, rows are points.
        let class = match self.registry.class_for_file(file_name) {
            Ok(Some(class)) => Some(class),
            _ => self.registry.class(E::NAME),
        };
        class.cloned().unwrap_or_else(|| Arc::new(gtfs::Builtin::<E>::default()))
    }
}

fn set_row_context(reporter: &mut Reporter, file_name: &str, row: &Row) {
    reporter.set_file_context(file_name, row.line(), row.values(), row.header());
}
