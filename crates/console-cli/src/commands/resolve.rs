//! Resolve command - fetch the payload for a query key

use anyhow::{Context, Result};
use console_router::{EventStream, Payload, QueryKey, RequestRouter};

use crate::output::{print_json, OutputContext, OutputFormat};

pub async fn resolve(router: &RequestRouter, key: &QueryKey, ctx: &OutputContext) -> Result<()> {
    let plan = router.explain(key);
    ctx.info(&format!(
        "{} {} via {} ({})",
        plan.method, plan.path, plan.backend, plan.route
    ));

    let payload = router
        .resolve(key)
        .await
        .with_context(|| format!("Failed to resolve {}", key))?;

    match payload {
        Payload::Json(value) => print_json(&value),
        Payload::Stream(stream) => follow(stream, ctx).await?,
    }

    Ok(())
}

/// Print events until the server closes the stream or Ctrl+C
async fn follow(mut stream: EventStream, ctx: &OutputContext) -> Result<()> {
    ctx.info("Streaming events, press Ctrl+C to stop");

    loop {
        tokio::select! {
            event = stream.next() => match event {
                Some(Ok(event)) => match ctx.format {
                    OutputFormat::Table => {
                        let label = event.event.as_deref().unwrap_or("message");
                        println!("[{}] {}", label, event.data);
                    }
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string(&event)?);
                    }
                },
                Some(Err(e)) => {
                    ctx.error(&format!("Stream error: {}", e));
                    break;
                }
                None => {
                    ctx.info("Stream ended");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                ctx.warn("Interrupted, closing stream");
                break;
            }
        }
    }

    Ok(())
}
