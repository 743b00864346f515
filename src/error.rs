use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Top-level error taxonomy for the engine. Each variant wraps a
/// concern-specific enum so that callers can match narrowly while the
/// `ChapatyError`-style facade stays flat.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error(transparent)]
    Sales(#[from] SalesError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// Errors surfaced before any command executes: the parser rejected the
/// script, or handed the engine something it cannot interpret.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script rejected at {position}: {message}")]
    Malformed { position: String, message: String },

    #[error("command references unknown stanza '{0}'")]
    UnknownStanza(String),
}

/// Errors raised when a command names a scope inconsistently.
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("command for ({application}, {substance}) issued with no active application/substance scope")]
    Unset {
        application: String,
        substance: String,
    },

    #[error("substance '{0}' replaces itself; self-replacement is not permitted")]
    SelfReplacement(String),

    #[error("duplicate {kind} for scope ({application}, {substance}) at year {year}: target '{target}' already set")]
    DuplicateSingleton {
        kind: &'static str,
        application: String,
        substance: String,
        year: i64,
        target: String,
    },
}

/// Errors from unit conversion and cross-unit arithmetic.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("cannot convert '{from}' to '{to}': {reason}")]
    Mismatch {
        from: String,
        to: String,
        reason: String,
    },

    #[error("unit conversion to '{needed}' requires missing context")]
    MissingContext { needed: String },
}

/// Errors from the sales recalculation algorithm.
#[derive(Debug, Error)]
pub enum SalesError {
    #[error("sales share required but no enabled sales stream available in ({application}, {substance})")]
    NoEnabledSalesStream {
        application: String,
        substance: String,
    },
}

/// Errors raised while stepping years / executing commands for one
/// (scenario, trial) run. Carries the scope context a caller needs to
/// report which command failed, for which substance, in which year.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("[{application}/{substance} @ {year}] {command}: {source}")]
    Command {
        application: String,
        substance: String,
        year: i64,
        command: &'static str,
        #[source]
        source: Box<EngineError>,
    },

    #[error("scenario run exceeded its deadline")]
    Timeout,

    #[error("scenario run was cancelled")]
    Cancelled,
}

/// Errors from CSV emission and result serialization.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to write CSV row: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to open output '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
