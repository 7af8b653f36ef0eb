use std::path::Path;

use async_trait::async_trait;

use crate::domain::models::DiagnosticRecord;

/// Executes a generated test file and reports one diagnostic per test case,
/// in declaration order.
///
/// Implementations never fail: an unusable run yields an empty list, which
/// the caller treats as "no evidence".
#[async_trait]
pub trait TestFramework: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, path: &Path) -> Vec<DiagnosticRecord>;
}
