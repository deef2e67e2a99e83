mod args;
mod driver;
mod output;

pub use args::{CompileArgs, OutputFormat};
pub use driver::execute;
