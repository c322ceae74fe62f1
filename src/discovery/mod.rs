//! Finding what to launch from: the parameter file and the checkpoints on disk.

mod checkpoints;
mod parameter_file;

pub(crate) use checkpoints::enumerate_checkpoints;
pub(crate) use parameter_file::locate_parameter_file;
