pub mod environment;
pub mod paths;
pub mod terminal;

pub use environment::{default_config_path, default_export_search_dir, default_output_dir};
pub use paths::{format_path_with_tilde, sanitize_file_stem, validate_file_size, write_atomic};
