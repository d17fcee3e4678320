//! The two model round trips: planning and code generation.

use tracing::info;

use crate::invoker::{InvokeError, ModelInvoker};
use crate::prompt::{code_prompt, plan_prompt, strip_markup};
use crate::types::{CodeArtifact, PlanArtifact, Request};

/// Ask the model for a plan. The response is used as-is (trimmed).
pub async fn build_plan(
    invoker: &dyn ModelInvoker,
    model: &str,
    request: &Request,
) -> Result<PlanArtifact, InvokeError> {
    info!(model, "generating plan");
    let response = invoker.invoke(&plan_prompt(request.as_str()), model).await?;
    Ok(PlanArtifact::new(response.trim()))
}

/// Ask the model for a script implementing `plan`, with fence markup removed.
pub async fn build_code(
    invoker: &dyn ModelInvoker,
    model: &str,
    plan: &PlanArtifact,
    request: &Request,
) -> Result<CodeArtifact, InvokeError> {
    info!(model, "generating code");
    let prompt = code_prompt(plan.as_str(), request.as_str());
    let response = invoker.invoke(&prompt, model).await?;
    Ok(CodeArtifact::new(strip_markup(&response)))
}
