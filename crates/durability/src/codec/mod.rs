//! Low-level value codecs used by the stream façade.
//!
//! - `primitives`: strings, counts and nullable scalars
//! - `path`: IdPath

pub mod path;
pub mod primitives;

pub use path::{read_id_path, write_id_path};
pub use primitives::{
    read_count, read_flag, read_nullable_i32, read_nullable_i64, read_nullable_string,
    read_string, write_count, write_flag, write_nullable_i32, write_nullable_i64,
    write_nullable_string, write_string, MAX_PREALLOCATED_ITEMS,
};
