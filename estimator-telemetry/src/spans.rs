//! Span helpers for the estimation pipeline.

use tracing::Span;

/// Span covering one end-to-end estimation request.
pub fn estimation_span(project_name: &str) -> Span {
    tracing::info_span!("estimation.run", project.name = project_name, otel.kind = "internal")
}

/// Span for a single pipeline stage attempt.
///
/// ```
/// use estimator_telemetry::stage_span;
/// let span = stage_span("generator", 1);
/// let _enter = span.enter();
/// ```
pub fn stage_span(stage: &str, attempt: u32) -> Span {
    tracing::info_span!("pipeline.stage", stage = stage, attempt = attempt)
}

/// Span for an outbound model call.
pub fn model_call_span(model_name: &str) -> Span {
    tracing::info_span!("model.call", model.name = model_name, otel.kind = "client")
}

/// Span for a knowledge-base similarity query.
pub fn retrieval_span(backend: &str, top_k: usize) -> Span {
    tracing::debug_span!("kb.search", kb.backend = backend, top_k = top_k)
}
