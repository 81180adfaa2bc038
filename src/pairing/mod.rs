pub mod matcher;

pub use matcher::{
    base_name, count_mismatch, duplicate_base_names, match_files, title_mismatch, FilePair,
};
