mod connection;
mod file_utils;

pub(crate) use connection::{Connection, SlotArgs, load_library, print_hex};
pub(crate) use file_utils::{
    read_bounded_file, read_bytes_from_file, with_appended_extension, write_bytes_to_file,
};
