/*!
 * Monitoring
 * Structured tracing, the process table dump and invariant audits
 */

mod audit;
mod dump;
mod tracer;

pub use dump::render_table;
pub use tracer::{init_tracing, span_primitive, PrimitiveSpan};
