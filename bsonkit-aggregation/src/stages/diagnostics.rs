//! Stages reporting on collections, operations and the plan cache.

use bsonkit_codec::{CodecResult, DocumentWriter, EncoderContext};

use super::Stage;

/// `$collStats`.
#[derive(Debug, Clone, Default)]
pub struct CollectionStats {
    histogram: bool,
    scale: Option<i32>,
    count: bool,
}

impl CollectionStats {
    /// Create a stage reporting nothing extra.
    pub fn new() -> Self {
        Self::default()
    }

    /// Include latency histograms.
    pub fn histogram(mut self, enabled: bool) -> Self {
        self.histogram = enabled;
        self
    }

    /// Include storage statistics scaled by `scale` bytes.
    pub fn scale(mut self, scale: i32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Include the document count.
    pub fn count(mut self, enabled: bool) -> Self {
        self.count = enabled;
        self
    }
}

impl Stage for CollectionStats {
    fn stage_name(&self) -> &'static str {
        "$collStats"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, _ctx: &EncoderContext<'_>) -> CodecResult<()> {
        writer.write_document(|w| {
            if self.histogram {
                w.write_document_named("latencyStats", |w| {
                    w.write_boolean_named("histograms", true)
                })?;
            }
            if let Some(scale) = self.scale {
                w.write_document_named("storageStats", |w| w.write_int32_named("scale", scale))?;
            }
            if self.count {
                w.write_document_named("count", |_| Ok(()))?;
            }
            Ok(())
        })
    }
}

/// `$currentOp`. Only flags that are set are written.
#[derive(Debug, Clone, Default)]
pub struct CurrentOp {
    all_users: bool,
    idle_connections: bool,
    idle_cursors: bool,
    idle_sessions: bool,
    local_ops: bool,
}

impl CurrentOp {
    /// Create a stage with every flag off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report operations of every user.
    pub fn all_users(mut self, enabled: bool) -> Self {
        self.all_users = enabled;
        self
    }

    /// Report idle connections.
    pub fn idle_connections(mut self, enabled: bool) -> Self {
        self.idle_connections = enabled;
        self
    }

    /// Report idle cursors.
    pub fn idle_cursors(mut self, enabled: bool) -> Self {
        self.idle_cursors = enabled;
        self
    }

    /// Report idle sessions.
    pub fn idle_sessions(mut self, enabled: bool) -> Self {
        self.idle_sessions = enabled;
        self
    }

    /// Report operations of the local `mongos` only.
    pub fn local_ops(mut self, enabled: bool) -> Self {
        self.local_ops = enabled;
        self
    }
}

impl Stage for CurrentOp {
    fn stage_name(&self) -> &'static str {
        "$currentOp"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, _ctx: &EncoderContext<'_>) -> CodecResult<()> {
        let flags = [
            ("allUsers", self.all_users),
            ("idleConnections", self.idle_connections),
            ("idleCursors", self.idle_cursors),
            ("idleSessions", self.idle_sessions),
            ("localOps", self.local_ops),
        ];
        writer.write_document(|w| {
            for (name, enabled) in flags {
                if enabled {
                    w.write_boolean_named(name, true)?;
                }
            }
            Ok(())
        })
    }
}

/// `$planCacheStats`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanCacheStats;

impl PlanCacheStats {
    /// Create the stage.
    pub fn new() -> Self {
        Self
    }
}

impl Stage for PlanCacheStats {
    fn stage_name(&self) -> &'static str {
        "$planCacheStats"
    }

    fn encode_body(&self, writer: &mut DocumentWriter, _ctx: &EncoderContext<'_>) -> CodecResult<()> {
        writer.write_document(|_| Ok(()))
    }
}
