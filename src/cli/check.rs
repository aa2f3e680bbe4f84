use std::path::Path;

use colored::Colorize;

use crate::driver::Driver;

/// Returns false when any error was emitted.
pub(super) fn action(driver: &mut Driver, manifest: &Path) -> bool {
    let compiled = match driver.load(manifest).and_then(|decls| driver.compile(&decls)) {
        Ok(compiled) => compiled,
        Err(errs) => {
            driver.emit_errors(errs);
            return false;
        }
    };

    for c in compiled.iter() {
        driver.emit_defects(&c.defects);
    }

    let summary = format!(
        "{} root component(s), {} error(s), {} warning(s)",
        compiled.len(),
        driver.errors_emitted,
        driver.warnings_emitted
    );
    if driver.errors_emitted == 0 {
        eprintln!("{} {}", "ok:".bold().green(), summary);
        true
    } else {
        eprintln!("{} {}", "failed:".bold().red(), summary);
        false
    }
}
