//! Domain layer shared by the storage and HTTP crates: the record model, the
//! table view engine and the authentication contract.

pub mod auth;
pub mod table;
pub mod types;

pub use auth::{AuthOutcome, Authenticator, GENERIC_AUTH_ERROR};
pub use table::{compute_view, paginate, PageNav, Pagination, SortDirection, SortSpec, TableView, ViewState};
pub use types::{DomainRecord, Field, FieldKind, FieldValue};
