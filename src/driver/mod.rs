use std::fs;
use std::path::Path;

use itertools::Itertools;

use crate::{
    analysis::Analyzer,
    descriptor::{Declarations, DescriptorBuilder},
    errors::{BindError, BindErrorKind, Defect},
    graph::{Exporter, TopLevelBindingGraph},
    index::DeclarationIndex,
    resolve::{InjectRegistry, Resolver},
};

mod options;

pub use options::Options;

/// The exported graph of one root component and every defect found in it.
#[derive(Debug)]
pub struct CompiledGraph {
    pub graph: TopLevelBindingGraph,
    pub defects: Vec<Defect>,
}

impl CompiledGraph {
    pub fn has_errors(&self) -> bool {
        self.defects.iter().any(|d| d.is_error())
    }

    pub fn errors(&self) -> impl Iterator<Item = &Defect> {
        self.defects.iter().filter(|d| d.is_error())
    }
}

#[derive(Debug)]
pub struct Driver {
    options: Options,
    pub errors_emitted: usize,
    pub warnings_emitted: usize,
}

impl Driver {
    pub fn new(options: Options) -> Driver {
        Driver {
            options,
            errors_emitted: 0,
            warnings_emitted: 0,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Reads a JSON declaration manifest.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Declarations, Vec<BindError>> {
        let path = path.as_ref();
        log::debug!("[driver] reading {}", path.display());
        let src = fs::read_to_string(path).map_err(|err| {
            vec![BindError::new(
                BindErrorKind::IO,
                format!("{}: {}", path.display(), err),
            )]
        })?;
        serde_json::from_str(&src).map_err(|err| {
            vec![BindError::new(
                BindErrorKind::Manifest,
                format!("{}: {}", path.display(), err),
            )]
        })
    }

    /// Builds, resolves, exports and analyzes every root component.
    ///
    /// Returns `Err` only when the declarations themselves are malformed.
    /// Problems in well-formed declarations are reported as defects on each
    /// [`CompiledGraph`].
    pub fn compile(&self, decls: &Declarations) -> Result<Vec<CompiledGraph>, Vec<BindError>> {
        let passes = self.options.passes().map_err(|err| vec![err])?;
        let full = self.options.full_binding_graph;
        let descriptors = DescriptorBuilder::new(decls).build()?;

        let mut compiled = vec![];
        for tree in descriptors.trees.iter() {
            log::info!("resolving {}", tree.root().path);
            let index = DeclarationIndex::new(tree, &descriptors.modules);
            let registry = InjectRegistry::new(decls);
            let resolution = Resolver::new(tree, &index, &registry)
                .full_binding_graph(full)
                .run();
            let graph = Exporter::new(tree, &index, &resolution)
                .full_binding_graph(full)
                .export();

            let mut defects = resolution.defects.clone();
            defects.extend(
                Analyzer::new(&graph)
                    .passes(passes)
                    .nullable_severity(self.options.nullable_validation)
                    .analyze(),
            );
            defects.sort();
            defects.dedup();

            compiled.push(CompiledGraph { graph, defects });
        }

        log::info!(
            "resolved {} root component(s) with {} defect(s)",
            compiled.len(),
            compiled.iter().map(|c| c.defects.len()).sum::<usize>()
        );
        Ok(compiled)
    }

    pub fn emit_errors(&mut self, errs: Vec<BindError>) {
        for (kind, group) in &errs.into_iter().group_by(|err| err.kind) {
            let msg = group.map(|err| err.msg).collect::<Vec<_>>().join("\n");
            BindError { msg, kind }.emit();
            self.errors_emitted += 1;
        }
    }

    pub fn emit_defects(&mut self, defects: &[Defect]) {
        for defect in defects.iter() {
            defect.emit();
            if defect.is_error() {
                self.errors_emitted += 1;
            } else {
                self.warnings_emitted += 1;
            }
        }
    }
}

/// Compiles `decls` with default options.
pub fn compile(decls: &Declarations) -> Result<Vec<CompiledGraph>, Vec<BindError>> {
    Driver::new(Options::default()).compile(decls)
}
