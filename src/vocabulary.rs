use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::object::Object;
use crate::params::{BlockParams, Params};
use crate::pattern::{matches, normalize_core};

// ---------------------------------------------------------------------------
// Native behaviour traits
// ---------------------------------------------------------------------------

/// Behaviour of a plain command. Closures of the right shape implement it.
pub trait CommandFn: Send + Sync {
    fn run(&self, params: &mut Params<'_>) -> Result<()>;
}

impl<F> CommandFn for F
where
    F: Fn(&mut Params<'_>) -> Result<()> + Send + Sync,
{
    fn run(&self, params: &mut Params<'_>) -> Result<()> {
        self(params)
    }
}

/// Behaviour of a reporter: computes a fresh value on every evaluation.
pub trait ReporterFn: Send + Sync {
    fn report(&self, params: &mut Params<'_>) -> Result<Object>;
}

impl<F> ReporterFn for F
where
    F: Fn(&mut Params<'_>) -> Result<Object> + Send + Sync,
{
    fn report(&self, params: &mut Params<'_>) -> Result<Object> {
        self(params)
    }
}

/// Control-flow behaviour of a c-block.
///
/// Implementations decide how often to call [`BlockParams::run_body`] and
/// whether to hand over to the chained alternative with
/// [`BlockParams::run_chain`].
pub trait CBlockFn: Send + Sync {
    fn run(&self, params: &mut BlockParams<'_>) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HatTemplate {
    pub pattern: String,
}

#[derive(Clone)]
pub struct CommandTemplate {
    pub pattern: String,
    pub behavior: Arc<dyn CommandFn>,
}

#[derive(Clone)]
pub struct CBlockTemplate {
    pub pattern: String,
    /// Patterns that may continue this block without nesting (`else`).
    pub chains: Vec<String>,
    pub behavior: Arc<dyn CBlockFn>,
}

#[derive(Clone)]
pub struct ReporterTemplate {
    pub pattern: String,
    pub behavior: Arc<dyn ReporterFn>,
}

macro_rules! debug_pattern {
    ($ty:ty) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($ty))
                    .field("pattern", &self.pattern)
                    .finish_non_exhaustive()
            }
        }
    };
}

debug_pattern!(CommandTemplate);
debug_pattern!(CBlockTemplate);
debug_pattern!(ReporterTemplate);

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Every pattern the compiler can resolve lines and inputs against.
///
/// The compiler and interpreter only read it; vocabulary is added before
/// compilation and earlier registrations win when patterns overlap.
#[derive(Debug, Default, Clone)]
pub struct Vocabulary {
    pub(crate) hats: Vec<HatTemplate>,
    pub(crate) commands: Vec<CommandTemplate>,
    pub(crate) cblocks: Vec<CBlockTemplate>,
    pub(crate) reporters: Vec<ReporterTemplate>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in libraries: core, control, variables, math, strings,
    /// collections and custom objects.
    pub fn standard() -> Self {
        let mut vocabulary = Self::new();
        crate::functions::register_all(&mut vocabulary);
        vocabulary
    }

    pub fn add_hat(&mut self, pattern: &str) {
        self.hats.push(HatTemplate {
            pattern: normalize_core(pattern),
        });
    }

    pub fn add_command<F>(&mut self, pattern: &str, behavior: F)
    where
        F: Fn(&mut Params<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.commands.push(CommandTemplate {
            pattern: normalize_core(pattern),
            behavior: Arc::new(behavior),
        });
    }

    pub fn add_reporter<F>(&mut self, pattern: &str, behavior: F)
    where
        F: Fn(&mut Params<'_>) -> Result<Object> + Send + Sync + 'static,
    {
        self.reporters.push(ReporterTemplate {
            pattern: normalize_core(pattern),
            behavior: Arc::new(behavior),
        });
    }

    pub fn add_cblock<B: CBlockFn + 'static>(&mut self, pattern: &str, chains: &[&str], behavior: B) {
        self.cblocks.push(CBlockTemplate {
            pattern: normalize_core(pattern),
            chains: chains.iter().map(|c| normalize_core(c)).collect(),
            behavior: Arc::new(behavior),
        });
    }

    pub fn find_hat(&self, core: &str) -> Option<usize> {
        self.hats.iter().position(|t| matches(&t.pattern, core))
    }

    pub fn find_command(&self, core: &str) -> Option<usize> {
        self.commands.iter().position(|t| matches(&t.pattern, core))
    }

    pub fn find_cblock(&self, core: &str) -> Option<usize> {
        self.cblocks.iter().position(|t| matches(&t.pattern, core))
    }

    pub fn find_reporter(&self, core: &str) -> Option<usize> {
        self.reporters.iter().position(|t| matches(&t.pattern, core))
    }

    pub fn hats(&self) -> &[HatTemplate] {
        &self.hats
    }

    pub fn commands(&self) -> &[CommandTemplate] {
        &self.commands
    }

    pub fn cblocks(&self) -> &[CBlockTemplate] {
        &self.cblocks
    }

    pub fn reporters(&self) -> &[ReporterTemplate] {
        &self.reporters
    }
}
