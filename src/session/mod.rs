//! Query compilation sessions.
//!
//! A [`QuerySession`] owns the alias registry and join graph built for one
//! `(data source, join description, dialect, page limits)` combination. It is immutable once
//! built and can be shared read-only across threads, which is how
//! [`session_cache::SessionCache`] hands it out.

pub mod session_cache;

use crate::join_catalog::{
    AliasRegistry, DataSourceHandle, JoinCatalogError, JoinDescription, JoinGraph,
    JoinGraphBuilder, NodeLoader,
};
use crate::qr_parser::{parse_document, QueryDocument};
use crate::query_generator::{
    compile, Backend, BackendKind, CompileContext, CompileError, CompiledFor, DialectKind,
    PageLimits,
};

pub use session_cache::{CacheMetrics, SessionCache, SessionCacheConfig, SessionKey};

#[derive(Debug)]
pub struct QuerySession {
    source: DataSourceHandle,
    description: JoinDescription,
    registry: AliasRegistry,
    graph: JoinGraph,
    dialect: DialectKind,
    limits: PageLimits,
}

impl QuerySession {
    /// Load every node of `description` through `loader` and register it
    pub fn build<L: NodeLoader + ?Sized>(
        loader: &L,
        source: &DataSourceHandle,
        description: &JoinDescription,
        dialect: DialectKind,
        limits: PageLimits,
    ) -> Result<Self, JoinCatalogError> {
        let mut builder = JoinGraphBuilder::new(loader, source);
        let graph = builder.build(description)?;

        let mut registry = AliasRegistry::new();
        for node in graph.nodes() {
            registry.register(&node.table, &node.fields, &node.aliases)?;
        }

        log::debug!(
            "session built for `{}`: {} table(s), {} join(s), {} loader call(s)",
            description.root,
            graph.nodes().len(),
            graph.refs.len(),
            builder.loads()
        );

        Ok(QuerySession {
            source: source.clone(),
            description: description.clone(),
            registry,
            graph,
            dialect,
            limits,
        })
    }

    pub fn source(&self) -> &DataSourceHandle {
        &self.source
    }

    pub fn description(&self) -> &JoinDescription {
        &self.description
    }

    pub fn registry(&self) -> &AliasRegistry {
        &self.registry
    }

    pub fn graph(&self) -> &JoinGraph {
        &self.graph
    }

    pub fn dialect(&self) -> DialectKind {
        self.dialect
    }

    pub fn limits(&self) -> PageLimits {
        self.limits
    }

    pub fn context(&self) -> CompileContext<'_> {
        CompileContext {
            registry: &self.registry,
            graph: &self.graph,
            dialect: self.dialect.dialect(),
            limits: self.limits,
        }
    }

    pub fn compile<B: Backend>(
        &self,
        backend: &B,
        document: &QueryDocument,
    ) -> Result<CompiledFor<B>, CompileError> {
        compile(&self.context(), backend, document)
    }

    /// Parse and compile a JSON document in one step
    pub fn compile_json<B: Backend>(
        &self,
        backend: &B,
        document: &serde_json::Value,
    ) -> Result<CompiledFor<B>, CompileError> {
        let document = parse_document(document)?;
        self.compile(backend, &document)
    }

    /// Cache key this session would be stored under for `backend`
    pub fn key_for(&self, backend: BackendKind) -> SessionKey {
        SessionKey::new(
            self.source.clone(),
            self.description.clone(),
            backend,
            self.dialect,
            self.limits,
        )
    }
}
