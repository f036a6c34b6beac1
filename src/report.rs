//! CSV output for time series such as [`TownStatistics`](crate::statistics::TownStatistics).
//!
//! A report is any serializable row type registered with [`create_report_trait!`]. Rows are
//! written through a [`ReportWriter`], which owns one CSV file named after the report and the
//! [`ReportOptions`] in effect.
use std::any::TypeId;
use std::ffi::OsStr;
use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};

use csv::Writer;
use log::{debug, trace};

use crate::error::GasTownError;

pub trait Report: 'static {
    // Returns report type
    fn type_id(&self) -> TypeId;
    // Serializes the data with the correct writer
    fn serialize(&self, writer: &mut Writer<File>) -> Result<(), csv::Error>;
}

/// Use this macro to define a unique report type
#[macro_export]
macro_rules! create_report_trait {
    ($name:ident) => {
        impl $crate::report::Report for $name {
            fn type_id(&self) -> std::any::TypeId {
                std::any::TypeId::of::<$name>()
            }

            fn serialize(
                &self,
                writer: &mut csv::Writer<std::fs::File>,
            ) -> Result<(), csv::Error> {
                writer.serialize(self)
            }
        }
    };
}

/// Where report files go and how they are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub directory: PathBuf,
    /// Prepended to every report name.
    pub file_prefix: String,
    /// Replace existing files instead of refusing to write.
    pub overwrite: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            directory: PathBuf::from("."),
            file_prefix: String::new(),
            overwrite: false,
        }
    }
}

impl ReportOptions {
    #[must_use]
    pub fn new() -> Self {
        ReportOptions::default()
    }

    pub fn directory(&mut self, directory: impl Into<PathBuf>) -> &mut Self {
        self.directory = directory.into();
        self
    }

    pub fn file_prefix(&mut self, file_prefix: impl Into<String>) -> &mut Self {
        self.file_prefix = file_prefix.into();
        self
    }

    pub fn overwrite(&mut self, overwrite: bool) -> &mut Self {
        self.overwrite = overwrite;
        self
    }

    /// The file a report called `name` is written to.
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.directory
            .join(format!("{}{name}.csv", self.file_prefix))
    }
}

// Checks that the path is valid. Creates the file and all parent directories if
// they do not exist. Returns the file if successful.
fn generate_validate_filepath(path: &Path, overwrite: bool) -> Result<File, GasTownError> {
    match path.extension().and_then(OsStr::to_str) {
        Some("csv") => {
            let parent = path.parent().ok_or_else(|| {
                GasTownError::ReportError(format!("{} has no parent directory", path.display()))
            })?;
            create_dir_all(parent)?;
            if path.exists() && !overwrite {
                return Err(GasTownError::ReportError(format!(
                    "{} already exists, use overwrite to replace it",
                    path.display()
                )));
            }
            let file = File::create(path)?;
            Ok(file)
        }
        _ => Err(GasTownError::ReportError(
            "Report output files must be CSVs at this time".to_string(),
        )),
    }
}

/// Writes the rows of one report type to its CSV file, flushing after every row.
pub struct ReportWriter {
    path: PathBuf,
    type_id: TypeId,
    writer: Writer<File>,
    rows_written: usize,
}

impl ReportWriter {
    /// Creates the file for the report `name` of type `T`.
    ///
    /// # Errors
    ///
    /// Returns `GasTownError::ReportError` if the path is not a CSV file or the file exists and
    /// `options.overwrite` is false, and `GasTownError::IoError` if it cannot be created.
    pub fn create<T: Report>(name: &str, options: &ReportOptions) -> Result<Self, GasTownError> {
        let path = options.path_for(name);
        let file = generate_validate_filepath(&path, options.overwrite)?;
        debug!("writing report {name} to {}", path.display());
        Ok(ReportWriter {
            path,
            type_id: TypeId::of::<T>(),
            writer: Writer::from_writer(file),
            rows_written: 0,
        })
    }

    /// Writes a new row with columns following the fields of `report`.
    ///
    /// # Errors
    ///
    /// Returns `GasTownError::ReportError` if `report` is not the type this writer was created
    /// for, or `GasTownError::CSVError`/`GasTownError::IoError` if writing fails.
    pub fn send<T: Report>(&mut self, report: &T) -> Result<(), GasTownError> {
        if report.type_id() != self.type_id {
            return Err(GasTownError::ReportError(format!(
                "No writer found for the report type in {}",
                self.path.display()
            )));
        }
        report.serialize(&mut self.writer)?;
        self.writer.flush()?;
        self.rows_written += 1;
        trace!("row {} written to {}", self.rows_written, self.path.display());
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}
