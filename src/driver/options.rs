use structopt::StructOpt;

use crate::analysis::Passes;
use crate::errors::{BindError, Severity};

#[derive(Clone, Debug, Default, StructOpt)]
pub struct Options {
    #[structopt(
        long = "full-binding-graph",
        help = "Resolve every declared key and every child component",
        long_help = "Resolves every key declared by every installed module and every child component, not only what entry points reach. Missing bindings are not reported in this mode."
    )]
    pub full_binding_graph: bool,

    #[structopt(
        long = "nullable-validation",
        help = "Severity of nullable mismatches",
        default_value = "error",
        possible_values = &["error", "warning"]
    )]
    pub nullable_validation: Severity,

    #[structopt(
        long = "skip",
        help = "Analysis passes to skip",
        possible_values = &["cycles", "duplicates", "missing", "scopes", "multibindings", "nullable", "production", "assisted", "factory-methods", "production-executor"],
        use_delimiter = true
    )]
    pub skip: Vec<String>,
}

impl Options {
    /// The analysis passes left after `skip`.
    pub fn passes(&self) -> Result<Passes, BindError> {
        Passes::without(&self.skip)
    }
}
