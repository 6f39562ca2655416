mod args;

pub use args::{Cli, ColorMode, Commands, InspectType};
