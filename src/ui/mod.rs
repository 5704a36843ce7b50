pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, human_bytes, info, success, warn};
pub use table::{TableBuilder, metadata_table};
pub use theme::{Theme, stderr_theme, theme};
