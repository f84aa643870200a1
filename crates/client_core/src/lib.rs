pub mod data_source;
pub mod debounce;
pub mod export;
pub mod form;
pub mod list_controller;
pub mod local;
pub mod notice;
pub mod remote;
pub mod view;

pub use data_source::{DataSource, DataSourceError, ListPage};
pub use debounce::{debounced, DebounceInput, Debouncer};
pub use export::{export_selection, CsvSpreadsheet, ExportError, ExportRow, SpreadsheetWriter};
pub use form::{FormController, FormFields, FormMode, SubmitError, ValidationError};
pub use list_controller::{ListController, ListPhase, ListSnapshot, ListState, Pagination};
pub use local::LocalDataSource;
pub use notice::{Notice, NoticeLevel};
pub use remote::{RemoteConfigError, RemoteDataSource};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
