//! Explain command - show the route a key takes, without network I/O

use anyhow::Result;
use console_router::{QueryKey, RequestRouter};

use crate::output::OutputContext;

pub fn explain(router: &RequestRouter, key: &QueryKey, ctx: &OutputContext) -> Result<()> {
    let plan = router.explain(key);

    let body = plan
        .body
        .as_ref()
        .map(|b| b.to_string())
        .unwrap_or_else(|| "-".to_string());

    ctx.print_kv(
        &[
            ("Key", key.to_string()),
            ("Route", plan.route.to_string()),
            ("Backend", plan.backend.to_string()),
            ("Request", format!("{} {}", plan.method, plan.path)),
            ("Body", body),
            ("Unwrap", plan.unwrap.to_string()),
        ],
        &plan,
    );

    Ok(())
}
