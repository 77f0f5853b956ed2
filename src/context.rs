//! Per-operation state handed to resource handlers, setters and valuers.

use crate::codec::DEFAULT_TIME_FORMAT;
use crate::db::Db;
use crate::validations::ValidationError;

pub struct Context {
    db: Db,
    pub roles: Vec<String>,
    /// Primary value from the request path, comma-joined for composite keys.
    pub resource_id: String,
    pub time_format: String,
    /// Makes find-many return a count instead of rows.
    pub count_only: bool,
    errors: Vec<ValidationError>,
}

impl Context {
    pub fn new(db: Db) -> Self {
        Context {
            db,
            roles: Vec::new(),
            resource_id: String::new(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            count_only: false,
            errors: Vec::new(),
        }
    }

    pub fn with_roles<S: Into<String>>(mut self, roles: impl IntoIterator<Item = S>) -> Self {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = id.into();
        self
    }

    pub fn with_time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = format.into();
        self
    }

    /// A fresh database session for one logical operation.
    pub fn get_db(&self) -> Db {
        self.db.session()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_errors(&mut self, errors: impl IntoIterator<Item = ValidationError>) {
        self.errors.extend(errors);
    }

    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<ValidationError> {
        std::mem::take(&mut self.errors)
    }
}
