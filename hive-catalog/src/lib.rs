pub mod controller;
pub mod mock;
pub mod pager;

pub use controller::{CatalogController, CatalogState};
pub use pager::{LoadKind, LoadOutcome, LoadTicket, PageState, Pager};
