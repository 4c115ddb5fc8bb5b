mod aggregate;
mod config;
mod invoke;
mod measure;
mod parity;
mod report;
mod run;

pub use report::render_markdown;
pub use run::run;
