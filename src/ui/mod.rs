pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    dim, error, header, listing, missing, record, record_created, record_deleted, record_updated, section,
    success, summary_row, warn,
};
pub use table::{counts_table, TableBuilder};
pub use theme::{theme, Theme};
