//! Asynchronous engine APIs.
//!
//! [`AsyncEngine`] shares one interpreter behind a tokio mutex and reads
//! script files without blocking the runtime. [`ParallelCompiler`] lowers
//! independent sources on a rayon pool.

use std::path::Path;
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{Engine, EngineOptions, Error, Value};

/// An asynchronous JavaScript engine.
///
/// Evaluations are serialized: globals written by one are visible to the
/// next.
pub struct AsyncEngine {
    engine: Arc<Mutex<Engine>>,
}

impl AsyncEngine {
    /// Creates a new async engine.
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    /// Creates an async engine with explicit options.
    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            engine: Arc::new(Mutex::new(Engine::with_options(options))),
        }
    }

    /// Evaluates JavaScript source code.
    pub async fn eval(&self, source: &str) -> Result<Value, Error> {
        let mut engine = self.engine.lock().await;
        engine.eval(source)
    }

    /// Evaluates a JavaScript file, reading it with tokio's file I/O.
    pub async fn eval_file(&self, path: impl AsRef<Path>) -> Result<Value, Error> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .await
            .map_err(|e| Error::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), bytes = source.len(), "loaded script");
        self.eval(&source).await
    }

    /// Reads several files concurrently, then evaluates them in input order.
    pub async fn eval_files(&self, paths: &[impl AsRef<Path>]) -> Vec<Result<Value, Error>> {
        let reads = paths.iter().map(|path| async move {
            let path = path.as_ref();
            fs::read_to_string(path)
                .await
                .map_err(|e| Error::Io(format!("Failed to read {}: {}", path.display(), e)))
        });
        let sources = futures::future::join_all(reads).await;

        let mut results = Vec::with_capacity(sources.len());
        for source in sources {
            results.push(match source {
                Ok(source) => self.eval(&source).await,
                Err(e) => Err(e),
            });
        }
        results
    }

    /// Reads a global binding.
    pub async fn global(&self, name: &str) -> Option<Value> {
        self.engine.lock().await.global(name)
    }
}

impl Default for AsyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Compiles independent sources on a thread pool.
#[cfg(feature = "parallel")]
pub struct ParallelCompiler {
    pool: rayon::ThreadPool,
    options: crate::CompilerOptions,
}

#[cfg(feature = "parallel")]
impl ParallelCompiler {
    /// Creates a compiler pool sized by rayon's defaults.
    pub fn new(options: crate::CompilerOptions) -> Result<Self, Error> {
        Self::build(rayon::ThreadPoolBuilder::new(), options)
    }

    /// Creates a compiler pool with a fixed number of threads.
    pub fn with_threads(num_threads: usize, options: crate::CompilerOptions) -> Result<Self, Error> {
        Self::build(rayon::ThreadPoolBuilder::new().num_threads(num_threads), options)
    }

    fn build(builder: rayon::ThreadPoolBuilder, options: crate::CompilerOptions) -> Result<Self, Error> {
        let pool = builder
            .build()
            .map_err(|e| Error::InternalError(format!("Failed to create thread pool: {}", e)))?;
        Ok(Self { pool, options })
    }

    /// Compiles each source as script code.
    pub fn compile_all(&self, sources: &[&str]) -> Vec<Result<Arc<crate::FunctionCode>, Error>> {
        use rayon::prelude::*;

        self.pool.install(|| {
            sources
                .par_iter()
                .map(|source| {
                    let program = crate::parser::Parser::new(source).parse_program()?;
                    crate::compiler::Compiler::new(self.options.clone()).compile(&program)
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_async_eval() {
        let engine = AsyncEngine::new();
        let result = engine.eval("1 + 2;").await.unwrap();
        assert!(matches!(result, Value::Number(n) if n == 3.0));
    }

    #[tokio::test]
    async fn test_async_globals_persist() {
        let engine = AsyncEngine::new();
        engine.eval("var greeting = 'hello';").await.unwrap();
        assert_eq!(engine.global("greeting").await, Some(Value::from("hello")));
    }

    #[tokio::test]
    async fn test_async_eval_file_missing() {
        let engine = AsyncEngine::new();
        let result = engine.eval_file("/nonexistent/script.js").await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_compile() {
        let compiler = ParallelCompiler::with_threads(2, crate::CompilerOptions::default()).unwrap();
        let results = compiler.compile_all(&["var a = 1;", "return;", "a + 1;"]);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::SyntaxError(_))));
        assert!(results[2].is_ok());
    }
}
