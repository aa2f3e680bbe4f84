use colored::{Color, Colorize};
use log::{Level, LevelFilter};

/// Dependencies log at `Warn` at most; `level` applies to this crate only.
pub fn base(level: LevelFilter) -> fern::Dispatch {
    fern::Dispatch::new()
        .level(level.min(LevelFilter::Warn))
        .level_for("bindgraph", level)
}

fn color(level: Level) -> Color {
    match level {
        Level::Error => Color::Red,
        Level::Warn => Color::Yellow,
        Level::Info => Color::Blue,
        Level::Debug => Color::Magenta,
        Level::Trace => Color::Green,
    }
}

pub fn stderr(base: fern::Dispatch) -> fern::Dispatch {
    base.format(|out, message, record| {
        let level = record.level();
        let prefix = format!("{}:", level.to_string().to_lowercase());
        out.finish(format_args!("{} {}", prefix.as_str().color(color(level)), message))
    })
    .chain(std::io::stderr())
}

/// Installs the stderr logger. Fails if a logger is already installed.
pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    stderr(base(level)).apply()
}
